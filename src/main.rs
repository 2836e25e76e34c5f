use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vdedup::config::VdedupConfig;
use vdedup::{
    build_index, detect, detect_with_producer, load_reference_records, RawFingerprint,
    UnavailableProducer,
};

/// Check whether a video already exists in the reference collection.
#[derive(Debug, Parser)]
#[command(name = "vdedup", version, about)]
struct Cli {
    /// Video share URL or bare identifier to check.
    query: String,

    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Record store JSON file (overrides the config file).
    #[arg(long)]
    database: Option<PathBuf>,

    /// Maximum Hamming distance classified as a duplicate (overrides config).
    #[arg(long)]
    threshold: Option<u32>,

    /// Leading digits used for candidate prefiltering; 0 scans everything
    /// (overrides config).
    #[arg(long)]
    prefix_length: Option<usize>,

    /// Producer-supplied fingerprint as binary digits. When omitted, the
    /// deterministic metadata fallback is used instead.
    #[arg(long)]
    fingerprint: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => VdedupConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => VdedupConfig::default(),
    };

    let mut match_cfg = config.matcher.to_match_config();
    if let Some(threshold) = cli.threshold {
        match_cfg.threshold = threshold;
    }
    if let Some(prefix_length) = cli.prefix_length {
        match_cfg.prefix_length = prefix_length;
    }

    let database = cli
        .database
        .unwrap_or_else(|| PathBuf::from(&config.store.database_path));
    let records = load_reference_records(&database)
        .with_context(|| format!("loading record store from {}", database.display()))?;
    if records.is_empty() {
        bail!("record store {} holds no records", database.display());
    }
    let index = Arc::new(build_index(records)?);

    let outcome = match cli.fingerprint {
        Some(bits) => detect(
            index,
            Some(&cli.query),
            RawFingerprint::Bits(bits),
            match_cfg,
        )?,
        None => detect_with_producer(index, &cli.query, &UnavailableProducer, match_cfg)?,
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
