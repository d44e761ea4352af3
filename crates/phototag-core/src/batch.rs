//! Library organization: tag and fingerprint every photo in a source, then
//! group near-duplicates.
//!
//! Photos are processed concurrently, one task per photo, bounded by a
//! semaphore. CPU work runs on the blocking pool. A photo that fails is
//! recorded next to the successes and the batch continues; only a model that
//! cannot be loaded stops the run.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::cancel::CancelFlag;
use crate::config::Config;
use crate::duplicates::DuplicateDetector;
use crate::error::{ConfigError, PipelineError, Result};
use crate::features::{Fingerprint, Fingerprinter};
use crate::model::ModelCache;
use crate::pipeline::{
    content_hash_from_bytes, read_error, ImageDecoder, ImageHandle, PhotoEntry,
    PhotoSource,
};
use crate::tagging::Tagger;
use crate::types::{BatchStats, LibraryReport, PhotoFailure, PhotoRecord};

/// Progress after one photo finishes.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    /// Photos finished so far, including this one
    pub completed: usize,
    pub total: usize,
    pub id: String,
    pub succeeded: bool,
}

/// What one photo produced. The fingerprint survives a tagging failure so the
/// photo still takes part in duplicate grouping.
struct Outcome {
    fingerprint: Option<Fingerprint>,
    result: std::result::Result<PhotoRecord, PipelineError>,
}

impl From<PipelineError> for Outcome {
    fn from(e: PipelineError) -> Self {
        Self {
            fingerprint: None,
            result: Err(e),
        }
    }
}

/// Shared per-photo stages, cloned into every task.
struct Stages {
    decoder: ImageDecoder,
    fingerprinter: Fingerprinter,
    tagger: Arc<Tagger>,
}

impl Stages {
    /// Read, hash and decode one photo.
    fn load(
        &self,
        source: &dyn PhotoSource,
        entry: &PhotoEntry,
        cancel: &CancelFlag,
    ) -> std::result::Result<(String, ImageHandle), PipelineError> {
        let path = entry.path.as_path();
        cancel.check(path, "read")?;
        let bytes = source.read(entry).map_err(|e| read_error(path, e))?;
        let content_hash = content_hash_from_bytes(&bytes);

        cancel.check(path, "decode")?;
        let image = self.decoder.decode_bytes(&bytes, path)?;
        Ok((content_hash, image))
    }

    fn process(&self, source: &dyn PhotoSource, entry: &PhotoEntry, cancel: &CancelFlag) -> Outcome {
        let (content_hash, image) = match self.load(source, entry, cancel) {
            Ok(loaded) => loaded,
            Err(e) => return e.into(),
        };
        let path = entry.path.as_path();

        let fingerprint = self.fingerprinter.fingerprint(&image);
        let result = self
            .tagger
            .tag_image(&image, path, cancel)
            .map(|tags| PhotoRecord {
                id: entry.id.clone(),
                path: entry.path.clone(),
                content_hash,
                width: image.width(),
                height: image.height(),
                format: image.format().as_str().to_string(),
                fingerprint: fingerprint.clone(),
                tags: tags.into_tags(),
            });
        Outcome {
            fingerprint: Some(fingerprint),
            result,
        }
    }
}

/// Runs the organize workflow over a [`PhotoSource`].
pub struct BatchProcessor {
    stages: Arc<Stages>,
    detector: DuplicateDetector,
    workers: usize,
}

impl BatchProcessor {
    /// Validates the whole configuration before anything runs.
    pub fn new(cache: Arc<ModelCache>, config: &Config) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            stages: Arc::new(Stages {
                decoder: ImageDecoder::new(config.limits.clone()),
                fingerprinter: Fingerprinter::new(&config.fingerprint),
                tagger: Arc::new(Tagger::new(cache, config)?),
            }),
            detector: DuplicateDetector::from_config(&config.duplicates),
            workers: config.processing.parallel_workers,
        })
    }

    /// Process every photo in `source` and group the near-duplicates.
    ///
    /// The model is loaded before any photo is dispatched; a load failure is
    /// returned as an error. Every other failure is listed in
    /// [`LibraryReport::failures`]. When `cancel` is set, photos not yet
    /// started are reported as cancelled and the report is marked
    /// `cancelled`.
    ///
    /// Duplicate groups cover every photo that was decoded, so a group may
    /// name a photo that is listed in `failures` because tagging it failed.
    pub async fn run<F>(
        &self,
        source: Arc<dyn PhotoSource>,
        cancel: &CancelFlag,
        on_progress: F,
    ) -> Result<LibraryReport>
    where
        F: Fn(&BatchProgress) + Send + Sync + 'static,
    {
        let start = Instant::now();
        let listing = source.clone();
        let entries = tokio::task::spawn_blocking(move || listing.entries())
            .await
            .map_err(|e| std::io::Error::other(format!("Listing task failed: {e}")))?;
        let total = entries.len();
        tracing::info!("Organizing {total} photos with {} workers", self.workers);

        if total > 0 {
            let cache = self.stages.tagger.cache().clone();
            tokio::task::spawn_blocking(move || cache.get_model())
                .await
                .map_err(|e| PipelineError::ModelLoad {
                    path: Default::default(),
                    message: format!("Model load task failed: {e}"),
                })??;
        }

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let on_progress = Arc::new(on_progress);
        let completed = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::with_capacity(total);
        let mut failures = Vec::new();

        let mut pending = entries.into_iter();
        for entry in pending.by_ref() {
            if cancel.is_cancelled() {
                failures.push(cancelled_failure(&entry));
                break;
            }
            let permit = semaphore.clone().acquire_owned().await;
            let Ok(permit) = permit else {
                tracing::warn!("Batch semaphore closed unexpectedly, stopping dispatch");
                failures.push(cancelled_failure(&entry));
                break;
            };

            let stages = self.stages.clone();
            let source = source.clone();
            let cancel = cancel.clone();
            let on_progress = on_progress.clone();
            let completed = completed.clone();
            let id = entry.id.clone();
            let task_id = id.clone();

            let handle = tokio::spawn(async move {
                let result = tokio::task::spawn_blocking(move || {
                    stages.process(source.as_ref(), &entry, &cancel)
                })
                .await;
                drop(permit);

                let outcome = match result {
                    Ok(outcome) => outcome,
                    Err(e) => Outcome::from(PipelineError::Inference {
                        path: Default::default(),
                        message: format!("Worker task failed: {e}"),
                    }),
                };
                on_progress(&BatchProgress {
                    completed: completed.fetch_add(1, Ordering::SeqCst) + 1,
                    total,
                    id: task_id,
                    succeeded: outcome.result.is_ok(),
                });
                outcome
            });
            handles.push((id, handle));
        }
        failures.extend(pending.map(|entry| cancelled_failure(&entry)));

        let mut photos = Vec::with_capacity(handles.len());
        let mut fingerprints = BTreeMap::new();
        for (id, handle) in handles {
            match handle.await {
                Ok(Outcome {
                    fingerprint,
                    result,
                }) => {
                    if let Some(fingerprint) = fingerprint {
                        fingerprints.insert(id.clone(), fingerprint);
                    }
                    match result {
                        Ok(record) => photos.push(record),
                        Err(e) => {
                            tracing::warn!("Failed {id}: {e}");
                            failures.push(PhotoFailure::from_error(id, &e));
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("Task for {id} panicked: {e}");
                    failures.push(PhotoFailure {
                        id,
                        kind: crate::error::ErrorKind::Inference,
                        message: format!("Worker task panicked: {e}"),
                    });
                }
            }
        }
        photos.sort_by(|a, b| a.id.cmp(&b.id));
        failures.sort_by(|a, b| a.id.cmp(&b.id));

        let duplicate_groups = self.detector.detect(&fingerprints)?;

        let total_seconds = start.elapsed().as_secs_f64();
        let stats = BatchStats {
            total,
            succeeded: photos.len(),
            failed: failures.len(),
            duplicate_sets: duplicate_groups.iter().filter(|g| g.len() > 1).count(),
            photos_per_second: if total_seconds > 0.0 {
                photos.len() as f64 / total_seconds
            } else {
                0.0
            },
            total_seconds,
        };
        let cancelled = cancel.is_cancelled();

        tracing::info!(
            "Organized {} photos: {} succeeded, {} failed, {} duplicate sets ({:.1}s){}",
            stats.total,
            stats.succeeded,
            stats.failed,
            stats.duplicate_sets,
            stats.total_seconds,
            if cancelled { ", cancelled" } else { "" }
        );

        Ok(LibraryReport {
            photos,
            duplicate_groups,
            failures,
            stats,
            cancelled,
        })
    }
}

fn cancelled_failure(entry: &PhotoEntry) -> PhotoFailure {
    PhotoFailure::from_error(
        entry.id.clone(),
        &PipelineError::Cancelled {
            path: entry.path.clone(),
            stage: "dispatch",
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, PhotoTagError};
    use crate::model::testing::FixedModel;
    use crate::model::ModelHandle;
    use crate::pipeline::DirectorySource;
    use image::{Rgb, RgbImage};
    use std::path::Path;
    use std::sync::Mutex;

    fn write_png(dir: &Path, name: &str, seed: u8) {
        RgbImage::from_fn(48, 32, |x, y| {
            Rgb([(x as u8).wrapping_mul(seed), (y * 7) as u8, seed])
        })
        .save(dir.join(name))
        .unwrap();
    }

    fn processor(config: &Config) -> BatchProcessor {
        let model = FixedModel::handle(&[("dog", 0.9), ("cat", 0.2)], config.model.input_size);
        BatchProcessor::new(Arc::new(ModelCache::with_model(model)), config).unwrap()
    }

    fn source(dir: &Path, config: &Config) -> Arc<dyn PhotoSource> {
        Arc::new(DirectorySource::new(dir, &config.processing))
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_going() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 3);
        write_png(dir.path(), "c.png", 11);
        std::fs::write(dir.path().join("b.jpg"), b"not really a jpeg").unwrap();

        let config = Config::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let report = processor(&config)
            .run(source(dir.path(), &config), &CancelFlag::new(), move |p| {
                sink.lock().unwrap().push((p.id.clone(), p.succeeded, p.total));
            })
            .await
            .unwrap();

        assert_eq!(report.stats.total, 3);
        assert_eq!(report.stats.succeeded, 2);
        assert_eq!(report.stats.failed, 1);
        assert!(!report.cancelled);

        let ids: Vec<&str> = report.photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a.png", "c.png"]);
        assert_eq!(report.photos[0].tags, vec![crate::Tag::new("dog", 0.9)]);
        assert_eq!(report.photos[0].format, "png");
        assert_eq!(report.photos[0].content_hash.len(), 64);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "b.jpg");
        assert_eq!(report.failures[0].kind, ErrorKind::InvalidImage);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1], ("b.jpg".to_string(), false, 3));
    }

    #[tokio::test]
    async fn test_identical_files_share_a_group() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 3);
        std::fs::copy(dir.path().join("a.png"), dir.path().join("copy.png")).unwrap();

        let config = Config::default();
        let report = processor(&config)
            .run(source(dir.path(), &config), &CancelFlag::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(report.photos[0].content_hash, report.photos[1].content_hash);
        assert_eq!(report.duplicate_groups.len(), 1);
        assert_eq!(report.duplicate_groups[0].members(), &["a.png", "copy.png"]);
        assert_eq!(report.stats.duplicate_sets, 1);
    }

    #[tokio::test]
    async fn test_failed_tagging_still_groups_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 3);
        std::fs::copy(dir.path().join("a.png"), dir.path().join("copy.png")).unwrap();

        let config = Config::default();
        let mut model = FixedModel::new(&[("dog", 0.9), ("cat", 0.2)], config.model.input_size);
        model.scores.pop();
        let cache = Arc::new(ModelCache::with_model(Arc::new(model)));
        let report = BatchProcessor::new(cache, &config)
            .unwrap()
            .run(source(dir.path(), &config), &CancelFlag::new(), |_| {})
            .await
            .unwrap();

        assert!(report.photos.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert!(report
            .failures
            .iter()
            .all(|f| f.kind == ErrorKind::Inference));
        assert_eq!(report.duplicate_groups.len(), 1);
        assert_eq!(report.duplicate_groups[0].members(), &["a.png", "copy.png"]);
        assert_eq!(report.stats.duplicate_sets, 1);
    }

    #[tokio::test]
    async fn test_model_load_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 3);
        let config = Config::default();
        let failing = || -> std::result::Result<ModelHandle, PipelineError> {
            Err(PipelineError::ModelLoad {
                path: "/models/resnet50/model.onnx".into(),
                message: "missing".to_string(),
            })
        };
        let processor = BatchProcessor::new(Arc::new(ModelCache::new(failing)), &config).unwrap();

        let err = processor
            .run(source(dir.path(), &config), &CancelFlag::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PhotoTagError::Pipeline(PipelineError::ModelLoad { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_run_reports_every_photo() {
        let dir = tempfile::tempdir().unwrap();
        for (i, name) in ["a.png", "b.png", "c.png"].iter().enumerate() {
            write_png(dir.path(), name, i as u8 + 2);
        }
        let config = Config::default();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let report = processor(&config)
            .run(source(dir.path(), &config), &cancel, |_| {})
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report.photos.is_empty());
        assert_eq!(report.failures.len(), 3);
        assert!(report
            .failures
            .iter()
            .all(|f| f.kind == ErrorKind::Cancelled));
    }

    #[tokio::test]
    async fn test_empty_source_skips_model_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let loader = || -> std::result::Result<ModelHandle, PipelineError> {
            Ok(FixedModel::handle(&[("dog", 0.9)], 224))
        };
        let cache = Arc::new(ModelCache::new(loader));
        let processor = BatchProcessor::new(cache.clone(), &config).unwrap();

        let report = processor
            .run(source(dir.path(), &config), &CancelFlag::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(report.stats.total, 0);
        assert!(report.duplicate_groups.is_empty());
        assert!(!cache.is_loaded());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.processing.parallel_workers = 0;
        let cache = Arc::new(ModelCache::with_model(FixedModel::handle(&[("dog", 0.9)], 224)));
        assert!(BatchProcessor::new(cache, &config).is_err());
    }
}
