//! Typed errors for the host plugin lifecycle.

use thiserror::Error;

/// Errors that can occur during plugin lifecycle operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PluginError {
    /// Plugin failed during per-instance initialisation.
    #[error("Plugin initialization failed: {0}")]
    InitFailed(String),
}
