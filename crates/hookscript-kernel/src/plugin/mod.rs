use std::collections::BTreeSet;

pub mod error;
pub use error::PluginError;

/// Plugin lifecycle result type using the typed [`PluginError`].
pub type PluginResult<T> = Result<T, PluginError>;

// ============================================================================
// Host plugin lifecycle
// ============================================================================

/// Lifecycle hooks the embedding host drives.
///
/// `on_application_start` and `on_application_stop` are called once per
/// process; `initialize_plugin` is called on every new plugin instance before
/// it serves a request.
#[async_trait::async_trait]
pub trait HostPlugin: Send + Sync {
    /// Plugin name reported to the host.
    fn plugin_name(&self) -> &str;

    /// Configuration keys this plugin reads.
    fn plugin_config_keys(&self) -> BTreeSet<String>;

    /// Process-wide bootstrap.
    async fn on_application_start(&self) -> PluginResult<()>;

    /// Process-wide teardown.
    async fn on_application_stop(&self) -> PluginResult<()>;

    /// Per-instance initialisation.
    async fn initialize_plugin(&mut self) -> PluginResult<()>;
}
