//! Nano Wait Vision CLI
//!
//! Runs a single observe/wait from the command line. Prints the diagnostic
//! report (or JSON with `--json`) and exits with status 1 when a wait times
//! out, so it can gate shell scripts.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use nano_wait_vision::{Pattern, VisionConfig, VisionMode, VisionResult};

#[derive(Parser, Debug)]
#[command(
    name = "nano-wait-vision",
    version,
    about = "Wait for text or icons to appear on screen"
)]
struct Cli {
    /// Config file (defaults to ~/.nano-wait/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Monitor index, overrides the config
    #[arg(long)]
    screen: Option<usize>,

    /// Print the diagnostic report after a timeout
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture once and print the recognized text
    Observe,
    /// Wait until TEXT is visible
    WaitText {
        text: String,
        /// Seconds, defaults to the configured timeout
        #[arg(long)]
        timeout: Option<f64>,
    },
    /// Wait until the icon image at PATH is visible
    WaitIcon {
        path: PathBuf,
        /// Seconds, defaults to the configured timeout
        #[arg(long)]
        timeout: Option<f64>,
        /// Minimum match score, defaults to the configured threshold
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Store a named text pattern
    Learn { name: String, text: String },
    /// Store a named icon pattern
    LearnIcon { name: String, path: String },
    /// List stored patterns
    Patterns,
    /// Print the detected screen scale factor
    Scale,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => VisionConfig::load(path),
        None => VisionConfig::load_default(),
    };
    if let Some(screen) = cli.screen {
        config.screen_index = screen;
    }
    config.verbose |= cli.verbose;
    let default_timeout = config.timeout();
    let default_threshold = config.icon_threshold;

    let mut vision = VisionMode::new(config).context("Failed to start vision mode")?;

    let result = match cli.command {
        Commands::Observe => vision.observe()?,
        Commands::WaitText { text, timeout } => {
            vision.wait_text(&text, seconds_or(timeout, default_timeout)?)?
        }
        Commands::WaitIcon { path, timeout, threshold } => vision.wait_icon(
            &path,
            seconds_or(timeout, default_timeout)?,
            threshold.unwrap_or(default_threshold),
        )?,
        Commands::Learn { name, text } => {
            vision.learn(&name, &text)?;
            println!("Learned text pattern '{}'", name);
            return Ok(());
        }
        Commands::LearnIcon { name, path } => {
            vision.learn_icon(&name, &path)?;
            println!("Learned icon pattern '{}'", name);
            return Ok(());
        }
        Commands::Patterns => {
            let store = vision.patterns();
            if cli.json {
                let map: BTreeMap<&String, &Pattern> = store.iter().collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (name, pattern) in store.iter() {
                    println!("{:<20} {:?} {}", name, pattern.kind, pattern.value);
                }
            }
            return Ok(());
        }
        Commands::Scale => {
            println!("{:.3}", vision.screen_scale());
            return Ok(());
        }
    };

    print_result(&result, cli.json)?;
    if !result.detected() && result.reason().is_some() {
        nano_wait_vision::log("Exiting with status 1 (timeout)");
        std::process::exit(1);
    }
    Ok(())
}

/// CLI seconds, or the configured timeout when absent.
fn seconds_or(seconds: Option<f64>, default: Duration) -> Result<Duration> {
    match seconds {
        None => Ok(default),
        Some(s) => Duration::try_from_secs_f64(s)
            .with_context(|| format!("Invalid timeout: {}", s)),
    }
}

fn print_result(result: &VisionResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", result);
        if let Some(text) = result.text() {
            println!("Text        : {}", text);
        }
    }
    Ok(())
}
