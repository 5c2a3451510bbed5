//! Unit scheduling: single runs, build-all batches and lifecycle events.

pub mod events;
pub mod runner;
pub mod state;

pub use events::{EventBus, TaskEvent, TaskStatus};
pub use runner::{BatchReport, RejectReason, RunOptions, RunOutcome, RunPolicy, TaskOrchestrator};
pub use state::RunRegistry;
