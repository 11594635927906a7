//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// One `ffmpeg` invocation: a single input, a single output, and the
/// arguments that go on either side of `-i`.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Placed before `-i`
    before_input: Vec<String>,
    /// Placed after `-i`, before the output path
    after_input: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            before_input: Vec::new(),
            after_input: Vec::new(),
        }
    }

    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.before_input.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after_input.extend(args.into_iter().map(Into::into));
        self
    }

    /// Keyframe seek on the input; fast but imprecise.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_args(["-ss".to_string(), secs(seconds)])
    }

    /// Decode-and-discard seek on the output; exact.
    pub fn output_seek(self, seconds: f64) -> Self {
        self.output_args(["-ss".to_string(), secs(seconds)])
    }

    pub fn duration(self, seconds: f64) -> Self {
        self.output_args(["-t".to_string(), secs(seconds)])
    }

    /// Read the input as headerless interleaved `f32le`.
    pub fn raw_f32_input(self, sample_rate: u32, channels: u16) -> Self {
        self.input_args(raw_layout(sample_rate, channels))
    }

    /// Drop video and write audio as headerless interleaved `f32le`.
    pub fn raw_f32_output(self, sample_rate: u32, channels: u16) -> Self {
        self.output_args(["-vn".to_string()])
            .output_args(raw_layout(sample_rate, channels))
    }

    pub fn codec_copy(self) -> Self {
        self.output_args(["-c", "copy"])
    }

    /// Full argument list, excluding the program name.
    ///
    /// Progress is requested on stderr so the runner can read it alongside
    /// diagnostics.
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-v", "error", "-progress", "pipe:2"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        args.extend(self.before_input.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.after_input.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

fn secs(seconds: f64) -> String {
    format!("{:.3}", seconds)
}

fn raw_layout(sample_rate: u32, channels: u16) -> [String; 6] {
    [
        "-f".to_string(),
        "f32le".to_string(),
        "-ar".to_string(),
        sample_rate.to_string(),
        "-ac".to_string(),
        channels.to_string(),
    ]
}

/// Spawns FFmpeg, streams its progress and enforces an optional timeout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill any process still running after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run `cmd`, calling `on_progress` for every progress block FFmpeg emits.
    ///
    /// On a non-zero exit the last non-progress stderr line is attached to
    /// the error.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, on_progress: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        let ffmpeg = check_ffmpeg()?;
        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new(ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("stderr not captured", None, None))?;

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut progress = FfmpegProgress::default();
            let mut diagnostic = None;

            while let Ok(Some(line)) = lines.next_line().await {
                match parse_progress_line(&line, &mut progress) {
                    LineKind::BlockEnd => on_progress(progress.clone()),
                    LineKind::Field => {}
                    LineKind::Diagnostic => diagnostic = Some(line),
                }
            }
            diagnostic
        });

        let status = self.wait(&mut child).await;
        let diagnostic = reader.await.ok().flatten();

        match status {
            Err(MediaError::FfmpegFailed {
                message, exit_code, ..
            }) => Err(MediaError::ffmpeg_failed(message, diagnostic, exit_code)),
            other => other,
        }
    }

    async fn wait(&self, child: &mut Child) -> MediaResult<()> {
        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(timeout_secs = limit.as_secs(), "FFmpeg timed out, killing process");
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout(limit.as_secs()));
                }
            },
            None => child.wait().await?,
        };

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                None,
                status.code(),
            ))
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LineKind {
    /// A `key=value` line inside a progress block
    Field,
    /// `progress=continue|end`, closing a block
    BlockEnd,
    /// Anything else FFmpeg printed
    Diagnostic,
}

/// Keys FFmpeg writes in a `-progress` block besides the ones we read.
/// Per-stream quality keys (`stream_0_0_q`) are matched by prefix.
const PROGRESS_KEYS: &[&str] = &[
    "frame",
    "fps",
    "bitrate",
    "total_size",
    "out_time",
    "dup_frames",
    "drop_frames",
];

/// Fold one stderr line into `current`.
fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> LineKind {
    let line = line.trim();
    let Some((key, value)) = line.split_once('=') else {
        return if line.is_empty() {
            LineKind::Field
        } else {
            LineKind::Diagnostic
        };
    };

    match key {
        // Both keys carry microseconds in current FFmpeg builds
        "out_time_us" | "out_time_ms" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            current.finished = value == "end";
            return LineKind::BlockEnd;
        }
        _ if PROGRESS_KEYS.contains(&key) || key.starts_with("stream_") => {}
        // Errors such as `Unable to parse option value "x=y"` contain '='
        _ => return LineKind::Diagnostic,
    }
    LineKind::Field
}

pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(args: &[String], value: &str) -> usize {
        args.iter().position(|a| a == value).unwrap()
    }

    #[test]
    fn test_seek_placement() {
        let args = FfmpegCommand::new("input.mp4", "output.mp4")
            .seek(5.0)
            .output_seek(2.5)
            .duration(30.0)
            .output_args(["-c:v", "libx264"])
            .build_args();

        let input = position(&args, "-i");
        assert!(position(&args, "5.000") < input, "fast seek must precede -i");
        assert!(position(&args, "2.500") > input, "accurate seek must follow -i");
        assert!(args.contains(&"30.000".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");
        assert_eq!(args[0], "-y");
    }

    #[test]
    fn test_raw_layouts() {
        let args = FfmpegCommand::new("raw.f32", "out.wav")
            .raw_f32_input(22050, 2)
            .build_args();
        assert!(position(&args, "f32le") < position(&args, "-i"));
        assert!(args.contains(&"22050".to_string()));

        let args = FfmpegCommand::new("in.mp4", "raw.f32")
            .raw_f32_output(16000, 1)
            .build_args();
        assert!(position(&args, "-vn") > position(&args, "-i"));
        assert!(position(&args, "f32le") > position(&args, "-i"));
    }

    #[test]
    fn test_progress_block() {
        let mut progress = FfmpegProgress::default();

        assert_eq!(parse_progress_line("out_time_us=5000000", &mut progress), LineKind::Field);
        assert_eq!(progress.out_time_ms, 5000);

        parse_progress_line("speed=1.5x", &mut progress);
        parse_progress_line("speed=N/A", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        assert_eq!(parse_progress_line("progress=continue", &mut progress), LineKind::BlockEnd);
        assert!(!progress.finished);
        assert_eq!(parse_progress_line("progress=end", &mut progress), LineKind::BlockEnd);
        assert!(progress.finished);
    }

    #[test]
    fn test_diagnostic_lines() {
        let mut progress = FfmpegProgress::default();
        assert_eq!(
            parse_progress_line("in.wav: No such file or directory", &mut progress),
            LineKind::Diagnostic
        );
        assert_eq!(parse_progress_line("   ", &mut progress), LineKind::Field);
    }

    #[test]
    fn test_error_lines_with_equals_are_diagnostics() {
        let mut progress = FfmpegProgress::default();
        for line in [
            "frame=120",
            "fps=29.97",
            "stream_0_0_q=28.0",
            "bitrate= 128.0kbits/s",
            "total_size=48",
            "out_time=00:00:05.000000",
            "dup_frames=0",
            "drop_frames=0",
        ] {
            assert_eq!(parse_progress_line(line, &mut progress), LineKind::Field, "{line}");
        }

        assert_eq!(
            parse_progress_line(r#"Unable to parse option value "x=y""#, &mut progress),
            LineKind::Diagnostic
        );
        assert_eq!(
            parse_progress_line("[aac @ 0x55d] Invalid bitrate=abc", &mut progress),
            LineKind::Diagnostic
        );
        assert_eq!(progress.out_time_ms, 0);
    }
}
