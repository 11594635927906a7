//! `silencecut` command-line tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};

use silencecut_media::{MaterializeStrategy, ProgressEvent};
use silencecut_models::detection::{
    DEFAULT_FRAME_LENGTH, DEFAULT_HOP_LENGTH, DEFAULT_MIN_SILENCE_MS, DEFAULT_OFFSET_MS,
    DEFAULT_THRESHOLD_FRACTION,
};
use silencecut_models::{
    DetectionConfig, DetectionResult, FrameConfig, OffsetPolicy, ThresholdPolicy, TrailingSilence,
};
use silencecut_worker::{init_tracing, DetectionReport, Session, SessionEvent, SessionEvents, WorkerConfig};

#[derive(Parser)]
#[command(name = "silencecut")]
#[command(about = "Detect and remove silent stretches from audio and video", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect silence and print the intervals and keep plan
    Detect {
        /// Audio or video file to analyse
        input: PathBuf,
        #[command(flatten)]
        detection: DetectionArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Detect silence and write a copy with it removed
    Cut {
        /// Audio or video file to trim
        input: PathBuf,
        /// Where to write the trimmed output
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        detection: DetectionArgs,
        /// How to build the output
        #[arg(long, value_enum, default_value_t = Mode::Auto)]
        mode: Mode,
    },
}

#[derive(Args, Debug, Clone)]
struct DetectionArgs {
    /// Fraction (0-1) of the loudest frame's energy below which a frame is silent
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD_FRACTION)]
    threshold: f32,
    /// Shortest silence to cut, in milliseconds
    #[arg(long, default_value_t = DEFAULT_MIN_SILENCE_MS)]
    min_silence_ms: u64,
    /// Silence kept after speech ends, in milliseconds
    #[arg(long, default_value_t = DEFAULT_OFFSET_MS)]
    offset_in_ms: u64,
    /// Silence kept before speech starts; mirrors --offset-in-ms when omitted
    #[arg(long)]
    offset_out_ms: Option<u64>,
    /// Analysis window in samples
    #[arg(long, default_value_t = DEFAULT_FRAME_LENGTH)]
    frame_length: usize,
    /// Samples between analysis windows
    #[arg(long, default_value_t = DEFAULT_HOP_LENGTH)]
    hop_length: usize,
    /// What to do with silence still running at the end: drop or close
    #[arg(long, default_value = "drop")]
    trailing_silence: TrailingSilence,
}

impl DetectionArgs {
    fn to_config(&self) -> DetectionConfig {
        let offsets = match self.offset_out_ms {
            Some(out) => OffsetPolicy::independent(self.offset_in_ms, out),
            None => OffsetPolicy::locked(self.offset_in_ms),
        };

        DetectionConfig {
            threshold: ThresholdPolicy {
                threshold_fraction: self.threshold,
                min_silence_ms: self.min_silence_ms,
            },
            offsets,
            frames: FrameConfig::new(self.frame_length, self.hop_length),
            trailing_silence: self.trailing_silence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Sample slicing for audio, per-segment re-encode for video
    Auto,
    /// Always slice decoded samples (output is audio only)
    Samples,
    /// Always re-encode each kept segment and concat
    Segments,
}

impl Mode {
    fn strategy(self) -> Option<MaterializeStrategy> {
        match self {
            Mode::Auto => None,
            Mode::Samples => Some(MaterializeStrategy::SampleDomain),
            Mode::Segments => Some(MaterializeStrategy::EncodePerSegment),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();
    debug!(?config, "Worker config");

    match cli.command {
        Commands::Detect {
            input,
            detection,
            json,
        } => detect_command(&config, &input, &detection, json).await,
        Commands::Cut {
            input,
            output,
            detection,
            mode,
        } => cut_command(&config, &input, output, &detection, mode).await,
    }
}

async fn load_session(config: &WorkerConfig, input: &Path) -> Result<(Session, SessionEvents)> {
    Session::load(input, &config.decoder(), config.materializer())
        .await
        .with_context(|| format!("Could not load {}", input.display()))
}

async fn run_detection(session: &Session, args: &DetectionArgs) -> Result<Arc<DetectionResult>> {
    let handle = session.start_detection(args.to_config())?;
    let result = handle.await.context("Detection task panicked")??;
    Ok(result)
}

async fn detect_command(config: &WorkerConfig, input: &Path, args: &DetectionArgs, json: bool) -> Result<()> {
    let (session, _events) = load_session(config, input).await?;
    let result = run_detection(&session, args).await?;

    let report = DetectionReport::new(input, &result, session.keep_plan()?);
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(())
}

async fn cut_command(
    config: &WorkerConfig,
    input: &Path,
    output: PathBuf,
    args: &DetectionArgs,
    mode: Mode,
) -> Result<()> {
    let (session, events) = load_session(config, input).await?;
    let result = run_detection(&session, args).await?;

    print!(
        "{}",
        DetectionReport::new(input, &result, session.keep_plan()?).to_text()
    );
    if result.is_empty() {
        println!("No silence detected; nothing to save.");
        return Ok(());
    }

    let printer = tokio::spawn(log_events(events));
    let mut handle = session.start_materialization(output, mode.strategy())?;

    let outcome = tokio::select! {
        res = &mut handle => res,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping before the next segment");
            session.cancel();
            handle.await
        }
    };
    let path = outcome.context("Materialization task panicked")??;

    drop(session);
    printer.await.ok();

    println!("Output saved to: {}", path.display());
    Ok(())
}

async fn log_events(mut events: SessionEvents) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Progress {
                event:
                    ProgressEvent::Progress {
                        fraction,
                        eta_secs,
                        message,
                    },
                ..
            } => {
                info!(
                    progress = format!("{:.0}%", fraction * 100.0),
                    eta_secs = eta_secs.map(|s| format!("{:.1}", s)),
                    "{}", message
                );
            }
            SessionEvent::MaterializeStarted { strategy, .. } => {
                info!(strategy = %strategy, "Writing output");
            }
            other => debug!(event = ?other, "Session event"),
        }
    }
}
