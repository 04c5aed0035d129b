//! `docscan` - identify scanned invoices, attach them to the matching
//! remote record and archive them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use docscan::{
    apply_thread_limit, expand_path_args, load_config, Pipeline, RankStatistics, Settings,
    XmlRpcStore,
};

#[derive(Parser, Debug)]
#[command(name = "docscan")]
#[command(about = "Read document numbers off scanned files, upload them and archive them")]
#[command(version)]
struct Args {
    /// Server profile from the config file
    #[arg(short, long, default_value = "production", env = "DS_SERVER")]
    server: String,

    /// Config file
    #[arg(short, long, default_value = "/etc/docscanner.conf", env = "DS_CONFIG")]
    config: PathBuf,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Load and save region rank statistics
    #[arg(long)]
    stats: bool,

    /// Files, directories or glob patterns to process
    #[arg(required = true, value_name = "FILE")]
    files: Vec<String>,
}

fn init_tracing(verbose: bool) -> Result<()> {
    tracing_log::LogTracer::init().context("Failed to bridge log records")?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(verbose));
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

/// Statistics are only read from and written to disk with `--stats`.
fn load_statistics(settings: &Settings, enabled: bool) -> docscan::Result<RankStatistics> {
    match (&settings.statistics_file, enabled) {
        (Some(path), true) => Ok(RankStatistics::load(path, settings.profiles.names())?),
        (None, true) => {
            warn!("--stats given but no statistics-file is configured");
            Ok(RankStatistics::in_memory())
        }
        (_, false) => Ok(RankStatistics::in_memory()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let settings = load_config(&args.config, &args.server)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    info!(
        "Using server '{}' with {} document type(s)",
        settings.server.name,
        settings.profiles.len()
    );

    let threads = apply_thread_limit(settings.ocr.thread_limit);
    info!("OCR thread limit: {}", threads);

    let stats = load_statistics(&settings, args.stats).context("Failed to load statistics")?;

    let store = XmlRpcStore::new(settings.server.clone())
        .context("Failed to set up the remote store client")?;

    let files = expand_path_args(&args.files);
    let mut pipeline = Pipeline::from_settings(&settings, store, stats);
    pipeline.run(&files);

    if args.stats {
        if let Err(e) = pipeline.into_stats().save() {
            warn!("Could not save statistics: {}", e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["docscan", "scan.jpg"]).unwrap();
        assert!(!args.verbose);
        assert!(!args.stats);
        assert_eq!(args.files, vec!["scan.jpg".to_string()]);
    }

    #[test]
    fn test_args_flags() {
        let args = Args::try_parse_from([
            "docscan",
            "-s",
            "development",
            "-c",
            "/tmp/docscan.yaml",
            "-v",
            "--stats",
            "a.jpg",
            "scans/*.png",
        ])
        .unwrap();
        assert_eq!(args.server, "development");
        assert_eq!(args.config, PathBuf::from("/tmp/docscan.yaml"));
        assert!(args.verbose);
        assert!(args.stats);
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn test_files_are_required() {
        assert!(Args::try_parse_from(["docscan"]).is_err());
    }
}
