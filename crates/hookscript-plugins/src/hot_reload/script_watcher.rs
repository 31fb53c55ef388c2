//! Delegate script watcher
//!
//! Reloads the delegate script when its content changes. Events arrive
//! debounced per path, and each one is checked against the SHA-256 digest of
//! the content last handed to the loader so duplicates are skipped. An empty
//! file is never loaded: writers truncate before they write, and an empty
//! script would replace working code with nothing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hookscript_kernel::ExecutionBackend;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use super::loader::CodeLoader;
use super::watcher::{FilesystemCallback, FilesystemWatcher, WatchConfig};

/// Hex-encoded SHA-256 digest of `bytes`.
pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// What a single change event led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The event concerned some other file.
    Ignored,
    /// Content matches what was last loaded.
    Unchanged,
    /// The file is empty, most likely mid-write; nothing was loaded.
    Empty,
    /// New code is current, at the given generation.
    Reloaded(u64),
    /// The file could not be read or compiled; the previous code stays.
    Failed,
}

/// Filesystem callback reloading one script through a [`CodeLoader`].
pub struct ChangeCallback<B: ExecutionBackend> {
    script_path: PathBuf,
    loader: Arc<CodeLoader<B>>,
    current_checksum: Option<String>,
}

impl<B: ExecutionBackend> ChangeCallback<B> {
    /// `initial_checksum` is the digest of the content already loaded, if
    /// any, so the first event for unchanged content does not recompile.
    pub fn new(
        script_path: impl Into<PathBuf>,
        loader: Arc<CodeLoader<B>>,
        initial_checksum: Option<String>,
    ) -> Self {
        Self {
            script_path: script_path.into(),
            loader,
            current_checksum: initial_checksum,
        }
    }

    pub fn current_checksum(&self) -> Option<&str> {
        self.current_checksum.as_deref()
    }

    fn is_script(&self, path: &Path) -> bool {
        if path == self.script_path {
            return true;
        }
        // Event paths may name the directory differently (symlinks, relative
        // configuration values), so fall back to comparing canonical parents.
        path.file_name() == self.script_path.file_name()
            && match (path.parent(), self.script_path.parent()) {
                (Some(a), Some(b)) => match (a.canonicalize(), b.canonicalize()) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                },
                _ => false,
            }
    }

    /// Reloads the script if `path` is the script and its content changed.
    pub async fn handle(&mut self, path: &Path) -> ChangeOutcome {
        if !self.is_script(path) {
            return ChangeOutcome::Ignored;
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!("File not found: {}", path.display());
                return ChangeOutcome::Failed;
            }
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                return ChangeOutcome::Failed;
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            debug!("Script {} is empty; waiting for content", path.display());
            return ChangeOutcome::Empty;
        }

        let digest = checksum(&bytes);
        if self.current_checksum.as_deref() == Some(digest.as_str()) {
            debug!("Script checksums match; skipping reload");
            return ChangeOutcome::Unchanged;
        }

        debug!("Script checksums differ; reloading");
        self.current_checksum = Some(digest);
        let source = String::from_utf8_lossy(&bytes).into_owned();
        match self.loader.load_async(source).await {
            Ok(generation) => ChangeOutcome::Reloaded(generation),
            Err(e) => {
                error!("Failed to reload {}: {}", path.display(), e);
                ChangeOutcome::Failed
            }
        }
    }
}

#[async_trait::async_trait]
impl<B: ExecutionBackend> FilesystemCallback for ChangeCallback<B> {
    async fn created(&mut self, path: &Path) {
        self.handle(path).await;
    }

    async fn modified(&mut self, path: &Path) {
        self.handle(path).await;
    }

    async fn deleted(&mut self, path: &Path) {
        // The loaded code stays current until a new file appears.
        if self.is_script(path) {
            warn!("Delegate script no longer exists: {}", path.display());
        }
    }
}

/// Watches the delegate script's directory and reloads the script on change.
pub struct ScriptWatcher {
    watcher: Option<FilesystemWatcher>,
}

impl ScriptWatcher {
    /// Starts watching `script_path` with the default [`WatchConfig`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<B: ExecutionBackend>(
        script_path: &Path,
        loader: Arc<CodeLoader<B>>,
        initial_checksum: Option<String>,
    ) -> Self {
        Self::start_with_config(script_path, loader, initial_checksum, WatchConfig::default())
    }

    /// Starts watching `script_path`. Failure to set up the OS watcher is
    /// logged; the returned watcher is then inert.
    pub fn start_with_config<B: ExecutionBackend>(
        script_path: &Path,
        loader: Arc<CodeLoader<B>>,
        initial_checksum: Option<String>,
        config: WatchConfig,
    ) -> Self {
        let absolute = std::path::absolute(script_path).unwrap_or_else(|_| script_path.to_path_buf());
        let Some(directory) = absolute.parent().map(Path::to_path_buf) else {
            error!("Delegate script has no parent directory: {}", absolute.display());
            return Self { watcher: None };
        };

        let callback = ChangeCallback::new(absolute.clone(), loader, initial_checksum);
        match FilesystemWatcher::start(&directory, config, callback) {
            Ok(watcher) => {
                info!(
                    "Watching delegate script {} in {}",
                    absolute.display(),
                    watcher.directory().display()
                );
                Self { watcher: Some(watcher) }
            }
            Err(e) => {
                error!("Failed to watch {}: {}", directory.display(), e);
                Self { watcher: None }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.watcher.as_ref().is_some_and(FilesystemWatcher::is_running)
    }

    /// Stops watching. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockBackend;
    use hookscript_kernel::config::StaticConfig;
    use std::time::Duration;

    fn setup(content: &str) -> (tempfile::TempDir, PathBuf, Arc<CodeLoader<MockBackend>>) {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("delegates.rhai");
        std::fs::write(&script, content).unwrap();
        let loader = Arc::new(CodeLoader::new(
            MockBackend::default(),
            Arc::new(StaticConfig::new().with_script_pathname(&script)),
        ));
        (dir, script, loader)
    }

    #[test]
    fn test_checksum_is_sha256_hex() {
        assert_eq!(
            checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(checksum(b"v1").len(), 64);
        assert_ne!(checksum(b"v1"), checksum(b"v2"));
    }

    #[tokio::test]
    async fn test_duplicate_events_do_not_reload() {
        let (_dir, script, loader) = setup("v1");
        loader.load("v1").unwrap();
        let mut callback = ChangeCallback::new(&script, Arc::clone(&loader), Some(checksum(b"v1")));

        assert_eq!(callback.handle(&script).await, ChangeOutcome::Unchanged);
        assert_eq!(loader.generation(), 1);

        std::fs::write(&script, "v2").unwrap();
        assert_eq!(callback.handle(&script).await, ChangeOutcome::Reloaded(2));
        assert_eq!(callback.handle(&script).await, ChangeOutcome::Unchanged);
        assert_eq!(loader.generation(), 2);
        assert_eq!(loader.backend().compile_count(), 2);
        assert_eq!(callback.current_checksum(), Some(checksum(b"v2").as_str()));
    }

    #[tokio::test]
    async fn test_first_event_without_seed_reloads() {
        let (_dir, script, loader) = setup("v1");
        let mut callback = ChangeCallback::new(&script, Arc::clone(&loader), None);

        assert_eq!(callback.handle(&script).await, ChangeOutcome::Reloaded(1));
        assert_eq!(loader.with_code(|_, code| code.version.clone()), Some("v1".to_string()));
    }

    #[tokio::test]
    async fn test_other_files_are_ignored() {
        let (dir, script, loader) = setup("v1");
        let other = dir.path().join("notes.txt");
        std::fs::write(&other, "hello").unwrap();
        let mut callback = ChangeCallback::new(&script, Arc::clone(&loader), None);

        assert_eq!(callback.handle(&other).await, ChangeOutcome::Ignored);
        assert_eq!(loader.generation(), 0);
    }

    #[tokio::test]
    async fn test_deleted_script_keeps_code() {
        let (_dir, script, loader) = setup("v1");
        loader.load("v1").unwrap();
        let mut callback = ChangeCallback::new(&script, Arc::clone(&loader), Some(checksum(b"v1")));

        std::fs::remove_file(&script).unwrap();
        callback.deleted(&script).await;
        assert_eq!(callback.handle(&script).await, ChangeOutcome::Failed);

        assert_eq!(loader.generation(), 1);
        assert_eq!(loader.with_code(|_, code| code.version.clone()), Some("v1".to_string()));
    }

    #[tokio::test]
    async fn test_broken_reload_keeps_previous_code() {
        let (_dir, script, loader) = setup("v1");
        loader.load("v1").unwrap();
        let mut callback = ChangeCallback::new(&script, Arc::clone(&loader), Some(checksum(b"v1")));

        std::fs::write(&script, "!compile-error").unwrap();
        assert_eq!(callback.handle(&script).await, ChangeOutcome::Failed);
        assert_eq!(loader.with_code(|_, code| code.version.clone()), Some("v1".to_string()));

        std::fs::write(&script, "v3").unwrap();
        assert_eq!(callback.handle(&script).await, ChangeOutcome::Reloaded(2));
    }

    #[tokio::test]
    async fn test_truncated_script_is_never_loaded() {
        let (_dir, script, loader) = setup("v1");
        loader.load("v1").unwrap();
        let mut callback = ChangeCallback::new(&script, Arc::clone(&loader), Some(checksum(b"v1")));

        // A writer truncates the file, then writes the same content back.
        std::fs::write(&script, "").unwrap();
        assert_eq!(callback.handle(&script).await, ChangeOutcome::Empty);
        assert_eq!(loader.generation(), 1);
        assert_eq!(loader.with_code(|_, code| code.version.clone()), Some("v1".to_string()));
        assert_eq!(callback.current_checksum(), Some(checksum(b"v1").as_str()));

        std::fs::write(&script, "v1").unwrap();
        assert_eq!(callback.handle(&script).await, ChangeOutcome::Unchanged);
        assert_eq!(loader.backend().compile_count(), 1);

        // Truncate, then new content.
        std::fs::write(&script, "\n  ").unwrap();
        assert_eq!(callback.handle(&script).await, ChangeOutcome::Empty);
        std::fs::write(&script, "v2").unwrap();
        assert_eq!(callback.handle(&script).await, ChangeOutcome::Reloaded(2));
        assert_eq!(loader.with_code(|_, code| code.version.clone()), Some("v2".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_watcher_reloads_on_write() {
        let (_dir, script, loader) = setup("v1");
        loader.load("v1").unwrap();
        let mut watcher = ScriptWatcher::start_with_config(
            &script,
            Arc::clone(&loader),
            Some(checksum(b"v1")),
            WatchConfig::new().with_debounce(Duration::from_millis(100)),
        );
        assert!(watcher.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(&script, "v2").unwrap();

        let mut reloaded = false;
        for _ in 0..50 {
            if loader.generation() >= 2 {
                reloaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(reloaded, "script was not reloaded");
        assert_eq!(loader.with_code(|_, code| code.version.clone()), Some("v2".to_string()));

        watcher.stop().await;
        watcher.stop().await;
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_watcher_on_missing_directory_is_inert() {
        let loader = Arc::new(CodeLoader::new(MockBackend::default(), Arc::new(StaticConfig::new())));
        let mut watcher = ScriptWatcher::start(Path::new("/definitely/not/here/delegates.rhai"), loader, None);
        assert!(!watcher.is_running());
        watcher.stop().await;
    }
}
