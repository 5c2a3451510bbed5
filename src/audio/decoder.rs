//! Raw PCM decoding for narration payloads.
//!
//! Payloads are headerless signed 16-bit little-endian samples, interleaved
//! across channels. Sample rate and channel count are supplied by the caller;
//! nothing is inferred from the bytes.

use crate::errors::DecodeError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::time::Duration;

/// Decoded audio: one equal-length sequence of samples per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples of one channel, each in `[-1.0, 1.0)`.
    pub fn channel(&self, idx: usize) -> Option<&[f32]> {
        self.channels.get(idx).map(Vec::as_slice)
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Playback length at the buffer's sample rate.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    /// Samples re-interleaved frame by frame, as output devices expect them.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frame_count() * self.channel_count());
        for frame in 0..self.frame_count() {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }
}

/// Decode interleaved 16-bit little-endian PCM into normalized float channels.
///
/// `frame_count = len / 2 / channels`; a trailing partial frame (or odd byte)
/// is dropped. Empty input yields `channels` empty sequences. Only a zero
/// sample rate or channel count is an error.
pub fn decode_audio(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<PcmBuffer, DecodeError> {
    if sample_rate == 0 || channels == 0 {
        return Err(DecodeError::InvalidFormat {
            sample_rate,
            channels,
        });
    }

    let channel_count = usize::from(channels);
    let frame_count = bytes.len() / 2 / channel_count;
    let mut decoded = vec![Vec::with_capacity(frame_count); channel_count];

    for frame in bytes.chunks_exact(2 * channel_count) {
        for (channel, sample) in frame.chunks_exact(2).enumerate() {
            let value = i16::from_le_bytes([sample[0], sample[1]]);
            decoded[channel].push(f32::from(value) / 32768.0);
        }
    }

    Ok(PcmBuffer {
        sample_rate,
        channels: decoded,
    })
}

/// Decode a base64 payload, then its PCM samples.
pub fn decode_base64_audio(
    payload: &str,
    sample_rate: u32,
    channels: u16,
) -> Result<PcmBuffer, DecodeError> {
    let bytes = STANDARD.decode(payload.trim())?;
    decode_audio(&bytes, sample_rate, channels)
}
