//! Hot-reload support module
//!
//! Keeps delegate script code live-reloadable:
//! - Reader/writer-locked code slot with a generation counter
//! - Debounced file watching on the script's directory
//! - Content digests to skip duplicate change events

mod loader;
mod script_watcher;
mod watcher;

pub use loader::{CodeLoader, LoadError, LoadResult};
pub use script_watcher::{ChangeCallback, ChangeOutcome, ScriptWatcher, checksum};
pub use watcher::{
    FilesystemCallback, FilesystemWatcher, WatchConfig, WatchError, WatchEvent, WatchEventKind,
};
