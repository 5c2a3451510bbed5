//! Spoken progress narration.
//!
//! A narration requests a synthesized utterance for a task, decodes the PCM
//! payload, plays it once and shows its transcript for a short grace period.
//! Narrations never report failure to the caller: a failed request, a missing
//! payload or an undecodable payload just returns the slot to idle.
//!
//! Overlapping narrations are allowed at the audio level. The observable
//! [`NarrationSnapshot`] always belongs to the most recently *requested*
//! narration; older ones keep playing but may no longer touch it.

use crate::audio::{AudioSink, NARRATION_CHANNELS, NARRATION_SAMPLE_RATE, PcmBuffer, decode_base64_audio};
use crate::backend::GenerationBackend;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Shown while the utterance is being synthesized.
pub const ANALYZING_PLACEHOLDER: &str = "Analyzing the current task...";
/// Shown when the utterance arrived without a transcript.
pub const REPORTING_PLACEHOLDER: &str = "Reporting status...";

/// What the presentation layer shows for narration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrationSnapshot {
    /// Id of the latest requested narration; 0 before the first one.
    pub request_id: u64,
    pub speaking: bool,
    pub transcript: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NarrationSettings {
    /// How long a transcript stays visible after playback ends.
    pub grace: Duration,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(3),
        }
    }
}

pub struct Narrator {
    backend: Arc<dyn GenerationBackend>,
    sink: Arc<dyn AudioSink>,
    settings: NarrationSettings,
    last_request: AtomicU64,
    state: watch::Sender<NarrationSnapshot>,
    /// The one retained playback buffer.
    current: Mutex<Option<Arc<PcmBuffer>>>,
}

impl Narrator {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        sink: Arc<dyn AudioSink>,
        settings: NarrationSettings,
    ) -> Self {
        let (state, _) = watch::channel(NarrationSnapshot::default());
        Self {
            backend,
            sink,
            settings,
            last_request: AtomicU64::new(0),
            state,
            current: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<NarrationSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> NarrationSnapshot {
        self.state.borrow().clone()
    }

    /// Whether a decoded buffer is currently held for playback.
    pub fn has_playback(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Start a detached narration. The request is registered before this
    /// returns, so its transcript wins over any earlier narration.
    pub fn spawn(self: &Arc<Self>, topic: impl Into<String>) -> JoinHandle<()> {
        let id = self.begin();
        let this = Arc::clone(self);
        let topic = topic.into();
        tokio::spawn(async move { this.run(id, &topic).await })
    }

    /// Narrate `topic` to completion, including the grace period.
    pub async fn narrate(&self, topic: &str) {
        let id = self.begin();
        self.run(id, topic).await;
    }

    fn begin(&self) -> u64 {
        let id = self.last_request.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.request_id = id;
            s.speaking = false;
            s.transcript = Some(ANALYZING_PLACEHOLDER.to_string());
        });
        id
    }

    fn is_latest(&self, id: u64) -> bool {
        self.last_request.load(Ordering::SeqCst) == id
    }

    /// Apply `f` only while `id` is still the latest request.
    fn update_if_latest(&self, id: u64, f: impl FnOnce(&mut NarrationSnapshot)) {
        self.state.send_if_modified(|s| {
            if s.request_id == id && self.is_latest(id) {
                f(s);
                true
            } else {
                false
            }
        });
    }

    fn go_idle(&self, id: u64) {
        self.update_if_latest(id, |s| {
            s.speaking = false;
            s.transcript = None;
        });
    }

    async fn run(&self, id: u64, topic: &str) {
        let utterance = match self.backend.synthesize(topic).await {
            Ok(utterance) => utterance,
            Err(e) => {
                tracing::warn!(request = id, error = %e, "narration request failed");
                self.go_idle(id);
                return;
            }
        };

        let Some(audio) = utterance.audio_base64 else {
            tracing::debug!(request = id, "narration reply carried no audio");
            self.go_idle(id);
            return;
        };

        let buffer = match decode_base64_audio(&audio, NARRATION_SAMPLE_RATE, NARRATION_CHANNELS) {
            Ok(buffer) => Arc::new(buffer),
            Err(e) => {
                tracing::warn!(request = id, error = %e, "narration audio could not be decoded");
                self.go_idle(id);
                return;
            }
        };

        let transcript = utterance
            .transcript
            .unwrap_or_else(|| REPORTING_PLACEHOLDER.to_string());
        self.update_if_latest(id, |s| {
            s.speaking = true;
            s.transcript = Some(transcript);
        });

        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&buffer));
        if let Err(e) = self.sink.play(&buffer).await {
            tracing::warn!(request = id, error = %e, "narration playback failed");
        }
        {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            if current.as_ref().is_some_and(|b| Arc::ptr_eq(b, &buffer)) {
                *current = None;
            }
        }

        self.update_if_latest(id, |s| s.speaking = false);
        tokio::time::sleep(self.settings.grace).await;
        self.update_if_latest(id, |s| s.transcript = None);
    }
}
