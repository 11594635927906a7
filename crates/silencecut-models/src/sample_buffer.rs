//! Decoded audio held in memory.

use std::borrow::Cow;

use crate::error::ConfigError;

/// Immutable decoded audio: interleaved `f32` samples with a known rate.
///
/// The buffer is produced once by the decoder and then only borrowed by
/// detection and materialization. Multi-channel audio is stored interleaved;
/// energy analysis works on a mono mix while slicing carries every channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl SampleBuffer {
    /// Create a buffer from interleaved samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self, ConfigError> {
        if sample_rate == 0 {
            return Err(ConfigError::NonPositive("sample_rate"));
        }
        if channels == 0 {
            return Err(ConfigError::NonPositive("channels"));
        }
        if samples.len() % channels as usize != 0 {
            return Err(ConfigError::MisalignedSamples {
                len: samples.len(),
                channels,
            });
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Create a single-channel buffer.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, ConfigError> {
        Self::new(samples, sample_rate, 1)
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of samples in each channel.
    pub fn samples_per_channel(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples_per_channel() as f64 / self.sample_rate as f64
    }

    /// Mono view used for energy analysis.
    ///
    /// Single-channel buffers are borrowed; otherwise channels are averaged.
    pub fn mono_mix(&self) -> Cow<'_, [f32]> {
        if self.channels == 1 {
            return Cow::Borrowed(&self.samples);
        }

        let channels = self.channels as usize;
        let mixed = self
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        Cow::Owned(mixed)
    }

    /// Interleaved samples for the per-channel index range `[start, end)`.
    ///
    /// Indices are clamped to the buffer; an inverted range yields an empty slice.
    pub fn channel_range(&self, start: usize, end: usize) -> &[f32] {
        let len = self.samples_per_channel();
        let end = end.min(len);
        let start = start.min(end);
        let channels = self.channels as usize;
        &self.samples[start * channels..end * channels]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_rate() {
        assert_eq!(
            SampleBuffer::mono(vec![0.0; 4], 0),
            Err(ConfigError::NonPositive("sample_rate"))
        );
    }

    #[test]
    fn test_rejects_misaligned_stereo() {
        let err = SampleBuffer::new(vec![0.0; 5], 8000, 2).unwrap_err();
        assert!(matches!(err, ConfigError::MisalignedSamples { len: 5, channels: 2 }));
    }

    #[test]
    fn test_duration() {
        let buffer = SampleBuffer::new(vec![0.0; 44100 * 2], 22050, 2).unwrap();
        assert_eq!(buffer.samples_per_channel(), 44100);
        assert!((buffer.duration_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_mono_mix_averages_channels() {
        let buffer = SampleBuffer::new(vec![1.0, 0.0, 0.5, 0.5], 8000, 2).unwrap();
        let mono = buffer.mono_mix();
        assert_eq!(mono.as_ref(), &[0.5, 0.5]);
    }

    #[test]
    fn test_mono_mix_borrows_single_channel() {
        let buffer = SampleBuffer::mono(vec![0.1, 0.2], 8000).unwrap();
        assert!(matches!(buffer.mono_mix(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_channel_range_is_interleaved_and_clamped() {
        let buffer = SampleBuffer::new(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 8000, 2).unwrap();
        assert_eq!(buffer.channel_range(1, 2), &[2.0, 3.0]);
        assert_eq!(buffer.channel_range(2, 10), &[4.0, 5.0]);
        assert!(buffer.channel_range(3, 1).is_empty());
    }
}
