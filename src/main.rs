use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::{error, info};

use lidar_tree_metrics::config::{Analysis, Config};
use lidar_tree_metrics::logging::setup_logging;
use lidar_tree_metrics::pipeline::Pipeline;

#[derive(Parser)]
#[clap(author, version, about)]
struct Args {
    /// run configuration (JSON): input paths, output folder, CRS and analysis parameters
    config: PathBuf,

    /// folder to write the per-tree outputs to (overrides the config)
    #[clap(long)]
    output: Option<PathBuf>,

    /// run only the given analysis; repeat to select several
    #[clap(long, value_enum)]
    only: Vec<Analysis>,

    /// log level or filter spec, e.g. `debug` or `lidar_tree_metrics=debug`
    #[clap(long, default_value = "info")]
    log_level: String,

    /// also keep a log file in this folder
    #[clap(long)]
    log_dir: Option<PathBuf>,
}

fn handler(args: Args) -> anyhow::Result<()> {
    let mut config = Config::from_path(&args.config)
        .with_context(|| format!("failed to read config {}", args.config.display()))?;
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if !args.only.is_empty() {
        config.analyses = args.only;
    }

    let pipeline = Pipeline::new(config).context("invalid configuration")?;
    info!(
        "analyses: {:?}, output: {}",
        pipeline.config().analyses,
        pipeline.config().output_dir.display()
    );
    let summary = pipeline.run().context("processing failed")?;
    if !summary.failures.is_empty() {
        info!("{} per-tree failures, see summary.json", summary.failures.len());
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    let logger = match setup_logging(&args.log_level, args.log_dir.as_deref()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("error: failed to start logging: {}", e);
            std::process::exit(1);
        }
    };

    let code = match handler(args) {
        Ok(_) => {
            info!("success");
            0
        }
        Err(e) => {
            error!("error: {:?}", e);
            1
        }
    };
    logger.flush();
    std::process::exit(code);
}
