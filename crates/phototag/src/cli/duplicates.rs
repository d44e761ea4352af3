//! The `phototag duplicates` command: fingerprint a directory and print
//! near-duplicate groups. No model is loaded.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use phototag_core::{
    read_error, Config, DirectorySource, DuplicateDetector, Fingerprint, Fingerprinter,
    ImageDecoder, PhotoEntry, PhotoFailure, PhotoId, PhotoSource,
};
use serde::Serialize;

/// Arguments for the `duplicates` command.
#[derive(Args, Debug)]
pub struct DuplicatesArgs {
    /// Directory (or single photo) to scan
    #[arg(required = true)]
    pub input: PathBuf,

    /// Largest Hamming distance at which two photos count as duplicates
    #[arg(short = 'd', long)]
    pub max_distance: Option<u32>,

    /// Also print photos that have no duplicate
    #[arg(long)]
    pub include_singletons: bool,
}

#[derive(Debug, Serialize)]
struct DuplicatesOutput {
    max_distance: u32,
    scanned: usize,
    failed: Vec<PhotoFailure>,
    groups: Vec<Vec<PhotoId>>,
}

/// Fingerprint every photo in `source`, skipping the ones that cannot be read.
fn fingerprint_all(
    source: &dyn PhotoSource,
    entries: Vec<PhotoEntry>,
    decoder: &ImageDecoder,
    fingerprinter: &Fingerprinter,
    progress: &indicatif::ProgressBar,
) -> (BTreeMap<PhotoId, Fingerprint>, Vec<PhotoFailure>) {
    let mut fingerprints = BTreeMap::new();
    let mut failed = Vec::new();

    for entry in entries {
        let decoded = source
            .read(&entry)
            .map_err(|e| read_error(&entry.path, e))
            .and_then(|bytes| decoder.decode_bytes(&bytes, &entry.path));
        match decoded {
            Ok(image) => {
                fingerprints.insert(entry.id, fingerprinter.fingerprint(&image));
            }
            Err(e) => {
                tracing::warn!("Skipping {}: {e}", entry.id);
                failed.push(PhotoFailure::from_error(entry.id, &e));
            }
        }
        progress.inc(1);
    }
    (fingerprints, failed)
}

/// Execute the duplicates command.
pub async fn execute(args: DuplicatesArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(max_distance) = args.max_distance {
        config.duplicates.max_distance = max_distance;
    }
    config.validate()?;

    let source = DirectorySource::new(&args.input, &config.processing);
    let decoder = ImageDecoder::new(config.limits.clone());
    let fingerprinter = Fingerprinter::new(&config.fingerprint);
    let detector = DuplicateDetector::from_config(&config.duplicates);
    let include_singletons = args.include_singletons;

    let output = tokio::task::spawn_blocking(move || -> anyhow::Result<DuplicatesOutput> {
        let entries = source.entries();
        let progress = super::create_progress_bar(entries.len() as u64);
        let (fingerprints, failed) =
            fingerprint_all(&source, entries, &decoder, &fingerprinter, &progress);
        progress.finish_and_clear();

        let groups = detector.detect(&fingerprints)?;
        Ok(DuplicatesOutput {
            max_distance: detector.max_distance(),
            scanned: fingerprints.len() + failed.len(),
            failed,
            groups: groups
                .into_iter()
                .filter(|g| include_singletons || g.len() > 1)
                .map(|g| g.members().to_vec())
                .collect(),
        })
    })
    .await??;

    tracing::info!(
        "{} duplicate group(s) among {} photo(s)",
        output.groups.iter().filter(|g| g.len() > 1).count(),
        output.scanned
    );
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
