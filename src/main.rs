use clap::Parser;
use scenetag_cv::{DetectionConfig, MergeStrategy, Result};
use std::path::PathBuf;
use tracing::Level;

mod report;

#[derive(Parser)]
#[command(name = "scenetag")]
#[command(about = "Label trees and buildings in a photograph")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// JSON detection config (camelCase keys)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Feature block size in pixels
    #[arg(long, value_name = "N")]
    block_size: Option<u32>,

    /// Seed variation for the fallback layout and box jitter
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    variation: Option<i64>,

    /// Attach ratio diagnostics to each detection
    #[arg(long)]
    debug: bool,

    /// Only use the image size, skip pixel analysis
    #[arg(long)]
    stable: bool,

    /// Overlap merge strategy (greedy or connected)
    #[arg(long, value_name = "STRATEGY")]
    strategy: Option<MergeStrategy>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Config file (or defaults) with flag overrides applied
    fn detection_config(&self) -> Result<DetectionConfig> {
        let mut config = match &self.config {
            Some(path) => DetectionConfig::from_json_file(path)?,
            None => DetectionConfig::default(),
        };

        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if let Some(variation) = self.variation {
            config.variation = Some(variation);
        }
        if let Some(strategy) = self.strategy {
            config.overlap.strategy = strategy;
        }
        if self.debug {
            config.debug = true;
        }

        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let config = args.detection_config()?;
    let report = report::analyze_file(&args.image_path, config, args.stable)?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        report.print();
    }

    Ok(())
}
