//! Narration audio: PCM decoding and playback sinks.

pub mod decoder;
pub mod sink;

pub use decoder::{PcmBuffer, decode_audio, decode_base64_audio};
#[cfg(feature = "rodio")]
pub use sink::RodioSink;
pub use sink::{AudioSink, TimedSink};

/// Sample rate of narration payloads.
pub const NARRATION_SAMPLE_RATE: u32 = 24_000;
/// Channel count of narration payloads.
pub const NARRATION_CHANNELS: u16 = 1;
