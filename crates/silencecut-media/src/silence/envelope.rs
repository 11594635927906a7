//! Framed RMS energy envelope.
//!
//! Frame `i` covers samples `[i * hop, i * hop + frame_length)`. Only full
//! windows are produced; a trailing remainder shorter than one window is
//! truncated, so an input shorter than `frame_length` yields no frames.

use silencecut_models::{EnergyFrame, FrameConfig, SampleBuffer};

use crate::error::MediaResult;

/// RMS energy of every full window of `samples`.
pub fn compute_envelope(samples: &[f32], frames: &FrameConfig) -> MediaResult<Vec<f32>> {
    frames.validate()?;

    let count = frames.frame_count(samples.len());
    let envelope = (0..count)
        .map(|i| {
            let start = i * frames.hop_length;
            rms(&samples[start..start + frames.frame_length])
        })
        .collect();

    Ok(envelope)
}

/// Indexed energy frames for a buffer's mono mix.
pub fn energy_frames(buffer: &SampleBuffer, frames: &FrameConfig) -> MediaResult<Vec<EnergyFrame>> {
    let mono = buffer.mono_mix();
    let envelope = compute_envelope(&mono, frames)?;

    Ok(envelope
        .into_iter()
        .enumerate()
        .map(|(index, energy)| EnergyFrame { index, energy })
        .collect())
}

fn rms(window: &[f32]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = window.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / window.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;

    #[test]
    fn test_frame_count_matches_formula() {
        let frames = FrameConfig::new(2048, 512);
        let samples = vec![0.0f32; 10_000];
        let envelope = compute_envelope(&samples, &frames).unwrap();
        assert_eq!(envelope.len(), (10_000 - 2048) / 512 + 1);
    }

    #[test]
    fn test_short_input_has_no_frames() {
        let frames = FrameConfig::new(2048, 512);
        let envelope = compute_envelope(&vec![0.5f32; 2000], &frames).unwrap();
        assert!(envelope.is_empty());
    }

    #[test]
    fn test_rms_of_constant_signal() {
        let frames = FrameConfig::new(4, 2);
        let envelope = compute_envelope(&[0.5, -0.5, 0.5, -0.5, 0.5, -0.5], &frames).unwrap();
        assert_eq!(envelope.len(), 2);
        for energy in envelope {
            assert!((energy - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_overlapping_windows() {
        // frame 0: [0,0,1,1] -> sqrt(0.5); frame 1: [1,1,0,0] -> sqrt(0.5); frame 2: [0,0,0,0]
        let frames = FrameConfig::new(4, 2);
        let samples = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let envelope = compute_envelope(&samples, &frames).unwrap();
        assert_eq!(envelope.len(), 3);
        assert!((envelope[0] - 0.5f32.sqrt()).abs() < 1e-6);
        assert!((envelope[1] - 0.5f32.sqrt()).abs() < 1e-6);
        assert_eq!(envelope[2], 0.0);
    }

    #[test]
    fn test_invalid_hop_rejected() {
        let frames = FrameConfig::new(2048, 0);
        let err = compute_envelope(&[0.0; 4096], &frames).unwrap_err();
        assert!(matches!(err, MediaError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_energy_frames_use_mono_mix() {
        // Left channel loud, right silent: mono mix is half amplitude
        let buffer = SampleBuffer::new(vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0], 8000, 2).unwrap();
        let frames = energy_frames(&buffer, &FrameConfig::new(2, 1)).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].index, 2);
        assert!((frames[0].energy - 0.5).abs() < 1e-6);
    }
}
