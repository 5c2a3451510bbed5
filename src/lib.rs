pub mod archive;
pub mod artifact;
pub mod audio;
pub mod autopilot_config;
pub mod backend;
pub mod catalog;
pub mod errors;
pub mod ideas;
pub mod init;
pub mod narration;
pub mod orchestrator;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod ui;
