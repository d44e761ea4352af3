//! Lazily loaded, process-wide classification model.
//!
//! The first successful [`ModelCache::get_model`] call loads the model; every
//! later call returns the same instance. Concurrent first calls run the loader
//! once and all observe its result. A failed load leaves the cache empty, so
//! the next call tries again.

use once_cell::sync::OnceCell;
use std::sync::Arc;

use super::{ModelHandle, OnnxLoader};
use crate::config::Config;
use crate::error::PipelineError;

/// Produces a model on demand.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<ModelHandle, PipelineError>;

    /// Human-readable name for log lines.
    fn describe(&self) -> String {
        "classification model".to_string()
    }
}

impl<F> ModelLoader for F
where
    F: Fn() -> Result<ModelHandle, PipelineError> + Send + Sync,
{
    fn load(&self) -> Result<ModelHandle, PipelineError> {
        self()
    }
}

/// Holds at most one loaded model for the life of the process.
///
/// Share it behind an `Arc`; it is never unloaded.
pub struct ModelCache {
    loader: Box<dyn ModelLoader>,
    model: OnceCell<ModelHandle>,
}

impl ModelCache {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            model: OnceCell::new(),
        }
    }

    /// Cache that loads the configured ONNX model on first use.
    pub fn from_config(config: &Config) -> Self {
        Self::new(OnnxLoader::from_config(config))
    }

    /// Cache that already holds `model`.
    pub fn with_model(model: ModelHandle) -> Self {
        let unreachable = || -> Result<ModelHandle, PipelineError> {
            Err(PipelineError::ModelLoad {
                path: Default::default(),
                message: "Preloaded cache has no loader".to_string(),
            })
        };
        Self {
            loader: Box::new(unreachable),
            model: OnceCell::with_value(model),
        }
    }

    /// Return the loaded model, loading it if this is the first call.
    pub fn get_model(&self) -> Result<ModelHandle, PipelineError> {
        self.model
            .get_or_try_init(|| {
                let name = self.loader.describe();
                tracing::info!("Loading {name}...");
                let start = std::time::Instant::now();
                match self.loader.load() {
                    Ok(model) => {
                        tracing::info!(
                            "Loaded {name}: {} labels, input {}px ({:.1}s)",
                            model.labels().len(),
                            model.input_size(),
                            start.elapsed().as_secs_f64()
                        );
                        Ok(model)
                    }
                    Err(e) => {
                        tracing::error!("Failed to load {name}: {e}");
                        Err(e)
                    }
                }
            })
            .map(Arc::clone)
    }

    /// Whether a model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("loader", &self.loader.describe())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::FixedModel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    fn counting_loader(calls: Arc<AtomicUsize>) -> impl ModelLoader {
        move || -> Result<ModelHandle, PipelineError> {
            calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(FixedModel::handle(&[("dog", 0.9)], 224))
        }
    }

    #[test]
    fn test_not_loaded_until_first_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ModelCache::new(counting_loader(calls.clone()));
        assert!(!cache.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        cache.get_model().unwrap();
        assert!(cache.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_repeated_calls_return_same_instance() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ModelCache::new(counting_loader(calls.clone()));
        let a = cache.get_model().unwrap();
        let b = cache.get_model().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_calls_load_once() {
        const THREADS: usize = 16;
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ModelCache::new(counting_loader(calls.clone()));
        let barrier = Barrier::new(THREADS);

        let handles: Vec<ModelHandle> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.get_model().unwrap()
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    }

    #[test]
    fn test_failed_load_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let cache = ModelCache::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(PipelineError::ModelLoad {
                    path: "/models/missing".into(),
                    message: "weights not found".to_string(),
                })
            } else {
                Ok(FixedModel::handle(&[("cat", 0.8)], 224))
            }
        });

        let err = cache.get_model().err().unwrap();
        assert!(matches!(err, PipelineError::ModelLoad { .. }));
        assert!(!cache.is_loaded());

        let model = cache.get_model().unwrap();
        assert_eq!(model.labels(), &["cat".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_with_model_is_preloaded() {
        let model = FixedModel::handle(&[("dog", 0.9)], 224);
        let cache = ModelCache::with_model(model.clone());
        assert!(cache.is_loaded());
        assert!(Arc::ptr_eq(&cache.get_model().unwrap(), &model));
    }
}
