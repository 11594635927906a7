//! FFmpeg CLI implementations of the collaborator traits.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use silencecut_models::{EncodingConfig, SampleBuffer};
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use super::{DecodedMedia, Decoder, SampleEncoder, Transcoder};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;

/// Seconds of fast (keyframe) input seek kept before the accurate output seek.
const FAST_SEEK_MARGIN_SECS: f64 = 5.0;

/// Containers that benefit from moving the index to the front.
const FASTSTART_EXTENSIONS: &[&str] = &["mp4", "mov", "m4a"];

/// Decodes any FFmpeg-readable input to interleaved `f32` samples.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    sample_rate: u32,
    /// `None` keeps the source's channel count
    channels: Option<u16>,
    runner: FfmpegRunner,
}

impl FfmpegDecoder {
    pub fn new(sample_rate: u32, channels: Option<u16>) -> Self {
        Self {
            sample_rate,
            channels,
            runner: FfmpegRunner::new(),
        }
    }

    pub fn with_runner(mut self, runner: FfmpegRunner) -> Self {
        self.runner = runner;
        self
    }
}

#[async_trait]
impl Decoder for FfmpegDecoder {
    async fn decode(&self, path: &Path) -> MediaResult<DecodedMedia> {
        let info = probe_media(path)
            .await
            .map_err(|e| unreadable_source(path, e))?;
        if !info.has_audio {
            return Err(MediaError::decode_failed(path, "no audio stream"));
        }

        let channels = self.channels.or(info.channels).unwrap_or(1).max(1);
        debug!(
            path = %path.display(),
            sample_rate = self.sample_rate,
            channels,
            has_video = info.has_video,
            "Decoding audio"
        );

        let raw = NamedTempFile::new()?;
        let cmd = FfmpegCommand::new(path, raw.path()).raw_f32_output(self.sample_rate, channels);
        self.runner.run(&cmd).await.map_err(|e| match e {
            MediaError::Cancelled | MediaError::Timeout(_) | MediaError::FfmpegNotFound => e,
            other => MediaError::decode_failed(path, other.to_string()),
        })?;

        let bytes = tokio::fs::read(raw.path()).await?;
        let mut samples = samples_from_le_bytes(&bytes);
        if samples.is_empty() {
            return Err(MediaError::EmptySource);
        }
        samples.truncate(samples.len() - samples.len() % channels as usize);

        let buffer = SampleBuffer::new(samples, self.sample_rate, channels)?;
        debug!(
            samples = buffer.samples_per_channel(),
            duration = format!("{:.2}", buffer.duration_secs()),
            "Loaded audio samples"
        );

        Ok(DecodedMedia { buffer, info })
    }
}

/// Encodes a sample buffer into the container implied by the output extension.
#[derive(Debug, Clone, Default)]
pub struct FfmpegSampleEncoder {
    encoding: EncodingConfig,
    runner: FfmpegRunner,
}

impl FfmpegSampleEncoder {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            runner: FfmpegRunner::new(),
        }
    }

    pub fn with_runner(mut self, runner: FfmpegRunner) -> Self {
        self.runner = runner;
        self
    }
}

#[async_trait]
impl SampleEncoder for FfmpegSampleEncoder {
    async fn encode_samples(&self, buffer: &SampleBuffer, output: &Path) -> MediaResult<()> {
        let raw = NamedTempFile::new()?;
        tokio::fs::write(raw.path(), samples_to_le_bytes(buffer.samples())).await?;

        let cmd = FfmpegCommand::new(raw.path(), output)
            .raw_f32_input(buffer.sample_rate(), buffer.channels())
            .output_args(self.encoding.sample_args());

        debug!(
            output = %output.display(),
            samples = buffer.samples_per_channel(),
            "Encoding trimmed samples"
        );
        self.runner.run(&cmd).await
    }
}

/// Re-encodes source ranges and joins them with the concat demuxer.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    encoding: EncodingConfig,
    runner: FfmpegRunner,
}

impl FfmpegTranscoder {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            runner: FfmpegRunner::new(),
        }
    }

    pub fn with_runner(mut self, runner: FfmpegRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Two-stage seek: a fast input seek to just before `start`, then an
    /// accurate output seek for the remainder. Re-encodes so cuts land on
    /// exact frames instead of keyframes.
    fn extract_command(&self, source: &Path, start: f64, end: f64, output: &Path) -> FfmpegCommand {
        let fast_seek = if start > FAST_SEEK_MARGIN_SECS {
            start - FAST_SEEK_MARGIN_SECS
        } else {
            0.0
        };

        FfmpegCommand::new(source, output)
            .seek(fast_seek)
            .output_seek(start - fast_seek)
            .duration((end - start).max(0.0))
            .output_args(self.encoding.segment_args())
            .output_args(["-avoid_negative_ts", "make_zero"])
    }

    fn concat_command(list: &Path, output: &Path) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(list, output)
            .input_args(["-f", "concat", "-safe", "0"])
            .codec_copy();

        let faststart = output
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| FASTSTART_EXTENSIONS.contains(&e.to_lowercase().as_str()));

        if faststart {
            cmd.output_args(["-movflags", "+faststart"])
        } else {
            cmd
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn extract_range(&self, source: &Path, start: f64, end: f64, output: &Path) -> MediaResult<()> {
        let cmd = self.extract_command(source, start, end, output);
        let total_ms = ((end - start) * 1000.0) as i64;

        self.runner
            .run_with_progress(&cmd, move |p| {
                trace!(
                    fraction = format!("{:.2}", p.fraction(total_ms)),
                    speed = p.speed,
                    "Segment encode progress"
                );
            })
            .await
    }

    async fn concat(&self, parts: &[PathBuf], output: &Path) -> MediaResult<()> {
        if parts.is_empty() {
            return Err(MediaError::NothingToKeep);
        }

        let list_dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let list = tempfile::Builder::new()
            .prefix("concat-")
            .suffix(".txt")
            .tempfile_in(list_dir)?;
        tokio::fs::write(list.path(), concat_list(parts)).await?;

        debug!(parts = parts.len(), output = %output.display(), "Concatenating segments");
        self.runner.run(&Self::concat_command(list.path(), output)).await
    }
}

/// Report a failed probe as a decode failure unless the tool itself is missing.
fn unreadable_source(path: &Path, err: MediaError) -> MediaError {
    match err {
        MediaError::FfprobeNotFound | MediaError::Decode { .. } => err,
        other => MediaError::decode_failed(path, other.to_string()),
    }
}

/// Concat demuxer list: one `file '<path>'` line per part.
fn concat_list(parts: &[PathBuf]) -> String {
    parts
        .iter()
        .map(|p| format!("file '{}'\n", p.display().to_string().replace('\'', r"'\''")))
        .collect()
}

fn samples_from_le_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn samples_to_le_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(args: &[String], value: &str) -> usize {
        args.iter().position(|a| a == value).unwrap()
    }

    #[test]
    fn test_extract_command_two_stage_seek() {
        let transcoder = FfmpegTranscoder::default();
        let args = transcoder
            .extract_command(Path::new("in.mp4"), 12.0, 15.5, Path::new("seg.mp4"))
            .build_args();

        let input = position(&args, "-i");
        assert!(position(&args, "7.000") < input);
        assert!(position(&args, "5.000") > input);
        assert!(args.contains(&"3.500".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"make_zero".to_string()));
    }

    #[test]
    fn test_extract_near_start_uses_accurate_seek_only() {
        let transcoder = FfmpegTranscoder::default();
        let args = transcoder
            .extract_command(Path::new("in.mp4"), 2.25, 4.0, Path::new("seg.mp4"))
            .build_args();

        assert!(position(&args, "0.000") < position(&args, "-i"));
        assert!(position(&args, "2.250") > position(&args, "-i"));
    }

    #[test]
    fn test_concat_command_faststart_only_for_mp4_family() {
        let args = FfmpegTranscoder::concat_command(Path::new("list.txt"), Path::new("out.MP4")).build_args();
        assert!(args.contains(&"+faststart".to_string()));
        assert!(position(&args, "concat") < position(&args, "-i"));
        assert!(args.contains(&"copy".to_string()));

        let args = FfmpegTranscoder::concat_command(Path::new("list.txt"), Path::new("out.mkv")).build_args();
        assert!(!args.contains(&"+faststart".to_string()));
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/it's.mp4")]);
        assert_eq!(list, "file '/tmp/a.mp4'\nfile '/tmp/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_sample_bytes_round_trip() {
        let samples = vec![0.0f32, 0.5, -1.0, 1.0e-7];
        assert_eq!(samples_from_le_bytes(&samples_to_le_bytes(&samples)), samples);
        // Trailing partial sample is ignored
        assert_eq!(samples_from_le_bytes(&[0, 0, 128, 63, 1, 2]), vec![1.0]);
    }

    #[tokio::test]
    async fn test_concat_rejects_empty_parts() {
        let dir = tempfile::tempdir().unwrap();
        let err = FfmpegTranscoder::default()
            .concat(&[], &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NothingToKeep));
    }

    #[tokio::test]
    async fn test_decode_missing_file() {
        let err = FfmpegDecoder::new(22050, Some(1))
            .decode(Path::new("/nonexistent/input.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Decode { .. }), "got {err:?}");
        assert!(err.to_string().contains("/nonexistent/input.wav"));
    }

    #[test]
    fn test_unparseable_media_info_is_decode_failure() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = unreadable_source(Path::new("broken.mp4"), MediaError::from(parse_err));
        assert!(matches!(err, MediaError::Decode { ref path, .. } if path == Path::new("broken.mp4")));

        let err = unreadable_source(Path::new("a.wav"), MediaError::FfprobeNotFound);
        assert!(matches!(err, MediaError::FfprobeNotFound));
    }
}
