//! The `conditionlog inspect` command: what the pipeline sees in one photo.

use clap::Args;
use conditionlog_core::pipeline::{AdaptiveCompressor, FileDiscovery, MetadataExtractor, Validator};
use conditionlog_core::{Config, ExtractedMetadata, ValidationResult};
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Photo file to inspect
    #[arg(required = true)]
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    size: u64,
    validation: ValidationResult,
    /// Whether the photo would be uploaded without re-encoding
    passthrough: bool,
    metadata: ExtractedMetadata,
}

/// Execute the inspect command.
pub async fn execute(args: InspectArgs, config: Config) -> anyhow::Result<()> {
    if !args.file.is_file() {
        anyhow::bail!("Not a file: {}", args.file.display());
    }
    let report = inspect(&args, &config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn inspect(args: &InspectArgs, config: &Config) -> anyhow::Result<InspectReport> {
    let file = FileDiscovery::discover(&args.file)
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Cannot read {}", args.file.display()))?;
    let input = FileDiscovery::load(&file).await?;

    let validation = Validator::new(config.limits.clone()).check(&input);
    let metadata = MetadataExtractor::new(config.metadata.clone()).extract(&input);
    let passthrough = AdaptiveCompressor::new(config.compression.clone(), &config.pipeline)
        .is_fast_path(&input);

    Ok(InspectReport {
        file_name: input.file_name.clone(),
        media_type: input.media_type.clone(),
        size: input.declared_size,
        validation,
        passthrough,
        metadata,
    })
}
