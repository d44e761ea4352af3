//! The `phototag organize` command: tag and fingerprint a whole library,
//! group near-duplicates, and write the report for the backup step.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use phototag_core::{
    BatchProcessor, BatchStats, CancelFlag, Config, DirectorySource, LibraryReport, ModelCache,
    OutputFormat, PhotoSource, ReportWriter,
};

/// Report formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportFormat {
    /// Single JSON object
    Json,
    /// One JSON record per line (newline-delimited)
    Jsonl,
}

impl From<ReportFormat> for OutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Json => OutputFormat::Json,
            ReportFormat::Jsonl => OutputFormat::JsonLines,
        }
    }
}

/// Arguments for the `organize` command.
#[derive(Args, Debug)]
pub struct OrganizeArgs {
    /// Photo library directory
    #[arg(required = true)]
    pub input: PathBuf,

    /// Report file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format (defaults to `[output] format` from config)
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Number of photos processed concurrently
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Largest Hamming distance at which two photos count as duplicates
    #[arg(short = 'd', long)]
    pub max_distance: Option<u32>,

    /// Minimum confidence a tag needs, in [0, 1]
    #[arg(long)]
    pub min_confidence: Option<f32>,
}

impl OrganizeArgs {
    fn apply_to(&self, config: &mut Config) {
        if let Some(parallel) = self.parallel {
            config.processing.parallel_workers = parallel;
        }
        if let Some(max_distance) = self.max_distance {
            config.duplicates.max_distance = max_distance;
        }
        if let Some(min_confidence) = self.min_confidence {
            config.tagging.min_confidence = min_confidence;
        }
    }

    fn output_format(&self, config: &Config) -> anyhow::Result<OutputFormat> {
        match self.format {
            Some(format) => Ok(format.into()),
            None => OutputFormat::parse(&config.output.format).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown output format in config: {:?} (expected json or jsonl)",
                    config.output.format
                )
            }),
        }
    }
}

/// Execute the organize command.
pub async fn execute(args: OrganizeArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply_to(&mut config);
    let format = args.output_format(&config)?;

    let cache = Arc::new(ModelCache::from_config(&config));
    let processor = BatchProcessor::new(cache, &config)?;
    let source: Arc<dyn PhotoSource> =
        Arc::new(DirectorySource::new(&args.input, &config.processing));

    let cancel = CancelFlag::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing photos already in progress");
                cancel.cancel();
            }
        })
    };

    let progress = super::create_progress_bar(0);
    let bar = progress.clone();
    let result = processor
        .run(source, &cancel, move |p| {
            bar.set_length(p.total as u64);
            bar.set_position(p.completed as u64);
            bar.set_message(p.id.clone());
        })
        .await;
    interrupt.abort();
    progress.finish_and_clear();
    let report = result?;

    match &args.output {
        Some(path) => {
            write_report(BufWriter::new(File::create(path)?), format, &config, &report)?;
            tracing::info!("Report written to {:?}", path);
        }
        None => write_report(std::io::stdout().lock(), format, &config, &report)?,
    }

    print_summary(&report.stats, report.cancelled);
    Ok(())
}

fn write_report<W: Write>(
    writer: W,
    format: OutputFormat,
    config: &Config,
    report: &LibraryReport,
) -> anyhow::Result<()> {
    let mut writer = ReportWriter::new(writer, format, config.output.pretty);
    writer.write_report(report)?;
    writer.flush()?;
    Ok(())
}

/// Print a summary table to stderr.
fn print_summary(stats: &BatchStats, cancelled: bool) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", stats.succeeded);
    if stats.failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.failed);
    }
    eprintln!("    Dup. sets:    {:>8}", stats.duplicate_sets);
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", stats.total);
    eprintln!("    Duration:     {:>7.1}s", stats.total_seconds);
    eprintln!("    Rate:         {:>7.1} photos/sec", stats.photos_per_second);
    if cancelled {
        eprintln!("    Cancelled before completion");
    }
    eprintln!("  ====================================");
}
