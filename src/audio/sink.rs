//! Audio output.
//!
//! A sink's `play` resolves once the buffer has finished playing. Overlapping
//! calls are allowed; mixing is left to the device.

use super::PcmBuffer;
use crate::errors::PlaybackError;
use async_trait::async_trait;

/// Abstraction over the playback device for testability.
/// Real implementations: `TimedSink`, `RodioSink` (feature `rodio`).
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, buffer: &PcmBuffer) -> Result<(), PlaybackError>;
}

/// Sink without a device: waits out the buffer's duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimedSink;

#[async_trait]
impl AudioSink for TimedSink {
    async fn play(&self, buffer: &PcmBuffer) -> Result<(), PlaybackError> {
        tracing::debug!(
            frames = buffer.frame_count(),
            sample_rate = buffer.sample_rate(),
            "playing narration without an output device"
        );
        tokio::time::sleep(buffer.duration()).await;
        Ok(())
    }
}

/// Plays on the default output device.
#[cfg(feature = "rodio")]
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioSink;

#[cfg(feature = "rodio")]
#[async_trait]
impl AudioSink for RodioSink {
    async fn play(&self, buffer: &PcmBuffer) -> Result<(), PlaybackError> {
        let channels = buffer.channel_count() as u16;
        let sample_rate = buffer.sample_rate();
        let samples = buffer.interleaved();

        // OutputStream is not Send; it lives and dies on the blocking thread.
        tokio::task::spawn_blocking(move || {
            let (_stream, handle) = rodio::OutputStream::try_default()
                .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;
            let sink = rodio::Sink::try_new(&handle)
                .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;
            sink.append(rodio::buffer::SamplesBuffer::new(channels, sample_rate, samples));
            sink.sleep_until_end();
            Ok(())
        })
        .await
        .map_err(|e| PlaybackError::TaskFailed(e.to_string()))?
    }
}
