//! Delegate script code loader
//!
//! Owns the single current compiled version of the delegate script. A
//! reader/writer lock guards the code slot: any number of hook invocations
//! read it concurrently, while a reload takes it exclusively, waiting for
//! in-flight invocations to finish and holding off new ones until the new
//! code is in place.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use hookscript_kernel::config::{ConfigurationSource, resolve_script_location};
use hookscript_kernel::{BackendError, ExecutionBackend};
use parking_lot::{Mutex, RwLock};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use super::script_watcher::{ScriptWatcher, checksum};

/// Script load error types
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("No delegate script is configured")]
    NoScriptConfigured,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Compile error: {0}")]
    Compile(#[from] BackendError),

    #[error("Load task interrupted: {0}")]
    Interrupted(String),
}

/// Result type for load operations
pub type LoadResult<T> = Result<T, LoadError>;

/// Loads delegate script code and keeps it current.
pub struct CodeLoader<B: ExecutionBackend> {
    /// Scripting engine
    backend: B,
    /// Host configuration
    config: Arc<dyn ConfigurationSource>,
    /// Current compiled code
    code: RwLock<Option<B::Code>>,
    /// Bumped on every successful load; 0 until the first one
    generation: AtomicU64,
    /// Resolved script location
    script_location: Mutex<Option<PathBuf>>,
    /// Run-once bootstrap
    initialized: OnceCell<()>,
    /// Background script watcher
    watcher: tokio::sync::Mutex<Option<ScriptWatcher>>,
}

impl<B: ExecutionBackend> CodeLoader<B> {
    /// Create a new loader. Nothing is read or compiled until
    /// [`ensure_initialized`](Self::ensure_initialized) or
    /// [`load`](Self::load) is called.
    pub fn new(backend: B, config: Arc<dyn ConfigurationSource>) -> Self {
        Self {
            backend,
            config,
            code: RwLock::new(None),
            generation: AtomicU64::new(0),
            script_location: Mutex::new(None),
            initialized: OnceCell::new(),
            watcher: tokio::sync::Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Version of the current code. 0 means nothing has been loaded.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_loaded(&self) -> bool {
        self.code.read().is_some()
    }

    /// Resolved delegate script location, cached after the first successful
    /// resolution. `None` when no script is configured.
    pub fn script_location(&self) -> Option<PathBuf> {
        if let Some(location) = self.script_location.lock().clone() {
            return Some(location);
        }
        let resolved = resolve_script_location(self.config.as_ref())?;
        debug!("Resolved delegate script location: {:?}", resolved);
        *self.script_location.lock() = Some(resolved.clone());
        Some(resolved)
    }

    /// Forget the cached script location so the next lookup re-reads the
    /// configuration.
    pub fn invalidate_script_location(&self) {
        self.script_location.lock().take();
    }

    /// Compiles `source` and makes it the current code.
    ///
    /// Blocks until in-flight invocations release the code slot. On failure
    /// the previous code stays current. Returns the new generation.
    pub fn load(&self, source: &str) -> LoadResult<u64> {
        let start = Instant::now();
        debug!("Loading script code");

        let mut slot = self.code.write();
        let compiled = self.backend.compile(source)?;
        *slot = Some(compiled);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        drop(slot);

        info!("Script code loaded (generation {}) in {:?}", generation, start.elapsed());
        Ok(generation)
    }

    /// [`load`](Self::load) on the blocking pool, for async callers.
    pub async fn load_async(self: &Arc<Self>, source: String) -> LoadResult<u64> {
        let loader = Arc::clone(self);
        tokio::task::spawn_blocking(move || loader.load(&source))
            .await
            .map_err(|e| LoadError::Interrupted(e.to_string()))?
    }

    /// Runs `f` against the current code while holding the shared lock.
    /// Returns `None` when no code is loaded.
    pub fn with_code<R>(&self, f: impl FnOnce(&B, &B::Code) -> R) -> Option<R> {
        let slot = self.code.read();
        slot.as_ref().map(|code| f(&self.backend, code))
    }

    /// Loads the configured script and starts watching it for changes.
    ///
    /// Runs once per loader; concurrent callers wait for the first to
    /// finish. Failures are logged and leave no code loaded.
    pub async fn ensure_initialized(self: &Arc<Self>) {
        self.initialized
            .get_or_init(|| async {
                if let Err(e) = self.initialize().await {
                    error!("Delegate initialization failed: {}", e);
                }
            })
            .await;
    }

    async fn initialize(self: &Arc<Self>) -> LoadResult<()> {
        let location = self.script_location().ok_or(LoadError::NoScriptConfigured)?;
        let bytes = tokio::fs::read(&location).await?;
        let digest = checksum(&bytes);
        let source = String::from_utf8_lossy(&bytes).into_owned();

        self.load_async(source).await?;

        let watcher = ScriptWatcher::start(&location, Arc::clone(self), Some(digest));
        *self.watcher.lock().await = Some(watcher);
        Ok(())
    }

    /// Whether a script watcher is running.
    pub async fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .await
            .as_ref()
            .is_some_and(ScriptWatcher::is_running)
    }

    /// Stops the script watcher, if any. Idempotent.
    pub async fn stop(&self) {
        if let Some(mut watcher) = self.watcher.lock().await.take() {
            watcher.stop().await;
        }
    }
}
