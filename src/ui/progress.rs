use crate::narration::NarrationSnapshot;
use crate::orchestrator::{TaskEvent, TaskStatus};
use crate::ui::icons::{CHECK, CROSS, RUNNING, SPEAKER};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;

/// Terminal UI for `run` and `build`, rendered via `indicatif` progress bars.
///
/// Three bars are stacked vertically:
/// - Units bar: completed units out of the catalog total
/// - Unit bar: spinner with the unit currently in flight
/// - Voice bar: the narration transcript
///
/// The UI never queries the orchestrator. It is driven only by
/// [`TaskEvent`]s and [`NarrationSnapshot`]s, see [`UiListener`].
pub struct BuildUI {
    multi: MultiProgress,
    units_bar: ProgressBar,
    unit_bar: ProgressBar,
    voice_bar: ProgressBar,
    verbose: bool,
    completed: Mutex<HashSet<String>>,
}

impl BuildUI {
    /// Create the UI on stderr.
    ///
    /// `completed` are the keys that already have an artifact; re-running
    /// one of them does not advance the units bar.
    pub fn new(total_units: u64, completed: impl IntoIterator<Item = String>, verbose: bool) -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr(), total_units, completed, verbose)
    }

    pub fn with_draw_target(
        target: ProgressDrawTarget,
        total_units: u64,
        completed: impl IntoIterator<Item = String>,
        verbose: bool,
    ) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let completed: HashSet<String> = completed.into_iter().collect();

        let units_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");
        let units_bar = multi.add(ProgressBar::new(total_units));
        units_bar.set_style(units_style);
        units_bar.set_prefix(" Units");
        units_bar.set_position(completed.len() as u64);

        let spinner_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");
        let unit_bar = multi.add(ProgressBar::new_spinner());
        unit_bar.set_style(spinner_style);
        unit_bar.set_prefix("  Task");

        let voice_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} {msg}")
            .expect("progress bar template is a valid static string");
        let voice_bar = multi.add(ProgressBar::new(0));
        voice_bar.set_style(voice_style);
        voice_bar.set_prefix(" Voice");

        Self {
            multi,
            units_bar,
            unit_bar,
            voice_bar,
            verbose,
            completed: Mutex::new(completed),
        }
    }

    /// Print a line above the bars, or straight to stdout when the bars are
    /// not drawn (no terminal).
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.is_hidden() || self.multi.println(msg.as_ref()).is_err() {
            println!("{}", msg.as_ref());
        }
    }

    pub fn completed_count(&self) -> usize {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn on_event(&self, event: &TaskEvent) {
        match event.status {
            TaskStatus::Running => {
                self.unit_bar.set_message(format!(
                    "{} {}",
                    style(format!("[{}]", event.key)).yellow(),
                    event.task
                ));
                self.unit_bar.enable_steady_tick(Duration::from_millis(100));
                if self.verbose {
                    self.print_line(format!(
                        "  {} {} {}",
                        RUNNING,
                        style(&event.key).dim(),
                        style(&event.task).dim()
                    ));
                }
            }
            TaskStatus::Completed => {
                let count = {
                    let mut completed = self
                        .completed
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    completed.insert(event.key.clone());
                    completed.len()
                };
                self.units_bar.set_position(count as u64);
                self.unit_bar.disable_steady_tick();
                self.unit_bar.set_message(format!("{}", style("idle").dim()));
                self.print_line(format!(
                    "  {} {} {}",
                    CHECK,
                    style(&event.key).green().bold(),
                    event.task
                ));
            }
            TaskStatus::Error => {
                self.unit_bar.disable_steady_tick();
                self.unit_bar.set_message(format!("{}", style("idle").dim()));
                self.print_line(format!(
                    "  {} {} {}",
                    CROSS,
                    style(&event.key).red().bold(),
                    style(format!("{} (failed, run it again to retry)", event.task)).red()
                ));
            }
        }
    }

    pub fn on_narration(&self, snapshot: &NarrationSnapshot) {
        self.voice_bar.set_message(narration_line(snapshot));
    }

    /// Stop all bars, leaving the units bar on screen.
    pub fn finish(&self) {
        self.units_bar.finish();
        self.unit_bar.finish_and_clear();
        self.voice_bar.finish_and_clear();
    }
}

/// Voice bar text for a narration snapshot.
pub fn narration_line(snapshot: &NarrationSnapshot) -> String {
    match (&snapshot.transcript, snapshot.speaking) {
        (Some(text), true) => format!("{}{}", SPEAKER, text),
        (Some(text), false) => format!("{}", style(text).dim()),
        (None, true) => format!("{}...", SPEAKER),
        (None, false) => String::new(),
    }
}

/// Background task feeding a [`BuildUI`] from the event and narration
/// channels.
pub struct UiListener {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl UiListener {
    /// Subscribe before starting the run, or early events are missed.
    pub fn spawn(
        ui: Arc<BuildUI>,
        mut events: broadcast::Receiver<TaskEvent>,
        narration: Option<watch::Receiver<NarrationSnapshot>>,
    ) -> Self {
        let (stop, mut stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut narration = narration;
            loop {
                tokio::select! {
                    biased;
                    event = events.recv() => match event {
                        Ok(event) => ui.on_event(&event),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "progress display fell behind events");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    snapshot = next_snapshot(&mut narration) => match snapshot {
                        Some(snapshot) => ui.on_narration(&snapshot),
                        None => narration = None,
                    },
                    _ = &mut stop_rx => break,
                }
            }
            // Events published before the stop signal are still pending here.
            while let Ok(event) = events.try_recv() {
                ui.on_event(&event);
            }
        });
        Self { stop, handle }
    }

    /// Process the events still queued, then end the task.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            tracing::debug!(error = %e, "progress display task ended abnormally");
        }
    }
}

async fn next_snapshot(
    rx: &mut Option<watch::Receiver<NarrationSnapshot>>,
) -> Option<NarrationSnapshot> {
    match rx {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}
