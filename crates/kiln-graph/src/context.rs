//! Per-build state shared by every load task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use url::Url;

use crate::extract::TransformRegistry;
use crate::hash::HashAlgorithm;
use crate::resolve::ImportMap;
use crate::runtime::Runtime;

/// Cooperative cancellation shared between a build and whoever started it.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Everything a build invocation needs. There is no global state.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub runtime: Arc<dyn Runtime>,
    pub import_map: Option<Arc<ImportMap>>,
    pub registry: TransformRegistry,
    pub hash_algorithm: HashAlgorithm,
    /// Directory URL of the source root.
    pub root: Url,
    pub cancel: CancellationToken,
}

impl BuildContext {
    pub fn new(runtime: Arc<dyn Runtime>, root: Url) -> Self {
        Self {
            runtime,
            import_map: None,
            registry: TransformRegistry::with_defaults(),
            hash_algorithm: HashAlgorithm::default(),
            root,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_import_map(mut self, import_map: Option<ImportMap>) -> Self {
        self.import_map = import_map.filter(|map| !map.is_empty()).map(Arc::new);
        self
    }

    pub fn with_registry(mut self, registry: TransformRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
