//! The `conditionlog ingest` command for uploading photos to a room.

use clap::{Args, ValueEnum};
use conditionlog_core::pipeline::{progress_channel, FileDiscovery, ProgressReceiver};
use conditionlog_core::{
    BatchReport, ConditionLog, Config, FileStage, IngestContext, JsonlRecordStore,
    LocalObjectStore, MemoryObjectStore, MemoryRecordStore, ObjectStore,
    OutputFormat as CoreOutputFormat, OutputWriter, RecordStore,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Arguments for the `ingest` command.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Photo file or directory to ingest
    #[arg(required = true)]
    pub input: PathBuf,

    /// Owner of the report
    #[arg(long = "user", env = "CONDITIONLOG_USER")]
    pub user_id: String,

    /// Report the photos belong to
    #[arg(long = "report")]
    pub report_id: String,

    /// Room the photos belong to
    #[arg(long = "room")]
    pub room_id: String,

    /// Photos already stored in the room (first new sort order)
    #[arg(long, default_value = "0")]
    pub existing_count: u32,

    /// Storage directory (defaults to storage.root_dir from the config)
    #[arg(long)]
    pub store_dir: Option<PathBuf>,

    /// Run the pipeline against in-memory stores; nothing is written
    #[arg(long)]
    pub dry_run: bool,

    /// Generate and store WebP thumbnails
    #[arg(long)]
    pub thumbnails: bool,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

/// Execute the ingest command.
pub async fn execute(args: IngestArgs, mut config: Config) -> anyhow::Result<()> {
    if args.thumbnails {
        config.thumbnail.enabled = true;
    }

    let files = FileDiscovery::discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported photos found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!(
        "Found {} photo(s), {:.1}MB total",
        files.len(),
        FileDiscovery::total_size(&files) as f64 / (1024.0 * 1024.0)
    );

    let mut inputs = Vec::with_capacity(files.len());
    for file in &files {
        match FileDiscovery::load(file).await {
            Ok(input) => inputs.push(input),
            Err(e) => tracing::warn!("Skipping {:?}: {}", file.path, e),
        }
    }

    let ctx = IngestContext {
        user_id: args.user_id.clone(),
        report_id: args.report_id.clone(),
        room_id: args.room_id.clone(),
        existing_count: args.existing_count,
    };
    let (objects, records) = open_stores(&args, &config).await?;

    let app = ConditionLog::new(config);
    let (tx, rx) = progress_channel(&app.config().pipeline);
    let progress = create_progress_bar(inputs.len() as u64);
    let consumer = tokio::spawn(drive_progress_bar(rx, progress.clone()));

    let start = std::time::Instant::now();
    let report = app
        .ingest(inputs, &ctx, objects.as_ref(), records.as_ref(), Some(&tx))
        .await;
    drop(tx);
    if let Err(e) = consumer.await {
        tracing::debug!("Progress consumer ended abnormally: {}", e);
    }
    progress.finish_and_clear();

    write_outcomes(&report, &args)?;
    print_summary(&report, start.elapsed(), args.dry_run);
    Ok(())
}

async fn open_stores(
    args: &IngestArgs,
    config: &Config,
) -> anyhow::Result<(Box<dyn ObjectStore>, Box<dyn RecordStore>)> {
    if args.dry_run {
        tracing::info!("Dry run: nothing will be stored");
        return Ok((
            Box::new(MemoryObjectStore::new()),
            Box::new(MemoryRecordStore::new()),
        ));
    }

    let (root, records_path) = match &args.store_dir {
        Some(dir) => (dir.clone(), dir.join(&config.storage.records_file)),
        None => (config.storage_root(), config.records_path()),
    };
    let objects = LocalObjectStore::new(&root).await?;
    let records = JsonlRecordStore::open(&records_path)?;
    tracing::debug!(
        "Storing objects under {:?}, records in {:?}",
        objects.root(),
        records.path()
    );
    Ok((Box::new(objects), Box::new(records)))
}

/// Advance the bar once per file reaching a terminal stage.
async fn drive_progress_bar(mut rx: ProgressReceiver, progress: ProgressBar) {
    while let Some(snapshot) = rx.recv().await {
        match snapshot.stage {
            FileStage::Done | FileStage::Error => progress.inc(1),
            _ => progress.set_message(format!("{} {}", snapshot.stage, snapshot.file_name)),
        }
        if let Some(error) = &snapshot.error {
            progress.println(format!("  ✗ {}", error));
        }
    }
}

fn write_outcomes(report: &BatchReport, args: &IngestArgs) -> anyhow::Result<()> {
    let (sink, pretty): (Box<dyn Write>, bool) = match &args.output {
        Some(path) => (Box::new(BufWriter::new(File::create(path)?)), false),
        None => (Box::new(std::io::stdout().lock()), true),
    };
    let mut writer = OutputWriter::new(sink, args.format.into(), pretty);
    writer.write_all(&report.outcomes)?;
    writer.flush()?;

    if let Some(path) = &args.output {
        tracing::info!("Output written to {:?}", path);
    }
    Ok(())
}

/// Create a progress bar for the batch.
fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after the batch.
fn print_summary(report: &BatchReport, elapsed: std::time::Duration, dry_run: bool) {
    let summary = &report.summary;
    let saved_mb = summary.bytes_saved as f64 / (1024.0 * 1024.0);

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Uploaded:     {:>8}", summary.succeeded);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    eprintln!("    Saved:        {:>7.1}MB", saved_mb);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    if dry_run {
        eprintln!("    (dry run, nothing stored)");
    }
    eprintln!("  ====================================");
    eprintln!("  {}", summary.message());
}
