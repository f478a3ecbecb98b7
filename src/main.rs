use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use deejay::audio::{CpalSampler, Sampler};
use deejay::config::SessionFlags;
use deejay::{Config, Daemon};

/// deejay - hands-free voice command assistant
#[derive(Parser)]
#[command(name = "deejay", version, about)]
struct Cli {
    /// Allow video downloads
    #[arg(long)]
    allow_download: bool,

    /// Allow arbitrary system commands (use with caution)
    #[arg(long)]
    allow_arbitrary: bool,

    /// OpenWeatherMap API key
    #[arg(long, env = "OPENWEATHER_API_KEY")]
    openweather_key: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,deejay=info",
        1 => "info,deejay=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Command::TestMic { duration }) = cli.command {
        return test_mic(duration).await;
    }

    let flags = SessionFlags {
        allow_arbitrary: cli.allow_arbitrary,
        allow_download: cli.allow_download,
    };
    let config = Config::load(flags, cli.openweather_key)?;

    tracing::info!(
        allow_download = config.allow_download,
        allow_arbitrary = config.allow_arbitrary,
        "starting deejay"
    );

    Daemon::new(config).run().await?;
    Ok(())
}

/// Meter microphone input levels, one line per second
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    let sampler = Arc::new(CpalSampler::new()?);
    println!(
        "Capturing {duration}s from the default input device at {} Hz. Speak now.",
        deejay::audio::SAMPLE_RATE
    );

    let mut heard_anything = false;
    for second in 1..=duration {
        let s = Arc::clone(&sampler);
        let chunk = tokio::task::spawn_blocking(move || s.capture(Duration::from_secs(1))).await??;

        let rms = calculate_rms(&chunk.samples);
        heard_anything |= rms > 0.005;
        println!("{second:>3}s  rms {rms:.4}  {}", level_meter(rms));
    }

    if heard_anything {
        println!("Input levels look alive - the microphone is working.");
    } else {
        println!("No signal detected. Check the device is plugged in and");
        println!("selected as the default source (pactl info, arecord -l).");
    }

    Ok(())
}

/// Fixed-width bar for an RMS level
fn level_meter(rms: f32) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = (rms * 100.0).min(40.0) as usize;
    format!("|{:<40}|", "#".repeat(filled))
}

/// RMS energy of a sample buffer
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
