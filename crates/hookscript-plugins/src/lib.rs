//! Hookscript Plugins
//!
//! The hot-reloadable script delegate:
//! - [`CodeLoader`]: the reader/writer-locked slot holding the current code
//! - [`ScriptWatcher`]: reloads the script when its content changes
//! - [`ScriptDelegate`]: typed hook access for one request, plus the host
//!   plugin lifecycle
//!
//! ```no_run
//! use std::sync::Arc;
//! use hookscript_kernel::config::AppConfig;
//! use hookscript_kernel::{Delegate, HostPlugin, RequestContext};
//! use hookscript_plugins::{RhaiCodeLoader, RhaiDelegate};
//! use hookscript_rhai::RhaiBackend;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AppConfig::from_file("hookscript.toml")?;
//! let loader = Arc::new(RhaiCodeLoader::new(RhaiBackend::default(), Arc::new(config)));
//!
//! let mut delegate = RhaiDelegate::new(Arc::clone(&loader));
//! delegate.on_application_start().await?;
//! delegate.initialize_plugin().await?;
//! delegate.set_request_context(RequestContext::new().with_identifier("cats"))?;
//! let pathname = delegate.filesystem_source_pathname()?;
//! # let _ = pathname;
//! delegate.on_application_stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod delegate;
pub mod hot_reload;

#[cfg(test)]
mod test_support;

pub use delegate::{PLUGIN_NAME, ScriptDelegate};
pub use hot_reload::{
    ChangeCallback, ChangeOutcome, CodeLoader, FilesystemCallback, FilesystemWatcher, LoadError,
    LoadResult, ScriptWatcher, WatchConfig, WatchError, WatchEvent, WatchEventKind, checksum,
};

pub use hookscript_kernel::{Delegate, DelegateError, DelegateMethod, DelegateResult, HostPlugin};

#[cfg(feature = "rhai")]
mod rhai_aliases {
    use hookscript_rhai::RhaiBackend;

    /// Code loader running delegate scripts on Rhai.
    pub type RhaiCodeLoader = crate::CodeLoader<RhaiBackend>;

    /// Script delegate running on Rhai.
    pub type RhaiDelegate = crate::ScriptDelegate<RhaiBackend>;
}

#[cfg(feature = "rhai")]
pub use rhai_aliases::{RhaiCodeLoader, RhaiDelegate};
