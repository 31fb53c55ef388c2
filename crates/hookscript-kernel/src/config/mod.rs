//! Configuration
//!
//! The delegate runtime reads exactly one string value from its host
//! configuration: the pathname of the delegate script. This module provides
//! the [`ConfigurationSource`] seam the runtime depends on, an implementation
//! backed by the `config` crate that supports every common file format plus
//! environment overrides, and the script location lookup.
//!
//! ## Features
//!
//! - Auto-detection of format from file extension
//! - Environment variable substitution (`${VAR}` and `$VAR` syntax)
//! - `HOOKSCRIPT_`-prefixed environment variables layered over file values
//! - Search-path resolution of bare script file names

use config::{Config as Cfg, Environment, File, FileFormat};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub use config::FileFormat as ConfigFormat;

/// Configuration key naming the delegate script. The value may be an
/// absolute pathname or a bare file name.
pub const SCRIPT_PATHNAME_KEY: &str = "delegate.rhai.script_pathname";

/// Optional configuration key listing extra directories searched for a bare
/// script file name, separated by the platform path separator.
pub const SEARCH_PATH_KEY: &str = "delegate.rhai.search_path";

/// Prefix of environment variables layered over file configuration.
pub const ENV_PREFIX: &str = "HOOKSCRIPT";

/// Configuration error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// ============================================================================
// Configuration source seam
// ============================================================================

/// Read-only view of the host configuration.
pub trait ConfigurationSource: Send + Sync {
    /// String value for `key`, if set.
    fn get_string(&self, key: &str) -> Option<String>;

    /// Directories searched, in order, for bare file names.
    fn search_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .get_string(SEARCH_PATH_KEY)
            .map(|value| std::env::split_paths(&value).collect())
            .unwrap_or_default();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        paths
    }
}

/// Resolves the configured delegate script.
///
/// Returns `None` when the key is unset or blank. Absolute pathnames are
/// returned as-is; bare names resolve to the first existing match in
/// [`ConfigurationSource::search_paths`], falling back to the current
/// directory.
pub fn resolve_script_location(source: &dyn ConfigurationSource) -> Option<PathBuf> {
    let value = source.get_string(SCRIPT_PATHNAME_KEY)?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(locate(value, &source.search_paths()))
}

/// Locates `name` on `search_paths`.
pub fn locate(name: &str, search_paths: &[PathBuf]) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    search_paths
        .iter()
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        })
}

// ============================================================================
// config-crate backed source
// ============================================================================

/// Application configuration loaded through the `config` crate.
#[derive(Debug, Clone)]
pub struct AppConfig {
    inner: Cfg,
    base_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Configuration from environment variables only.
    pub fn from_env() -> ConfigResult<Self> {
        let inner = Cfg::builder()
            .add_source(env_source())
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(Self {
            inner,
            base_dir: None,
        })
    }

    /// Loads `path`, detecting the format from its extension, with
    /// environment overrides layered on top.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let format = detect_format(&path.to_string_lossy())?;
        let content = std::fs::read_to_string(path)?;
        let substituted = substitute_env_vars(&content);

        let inner = Cfg::builder()
            .add_source(File::from_str(&substituted, format))
            .add_source(env_source())
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(Self {
            inner,
            base_dir: path.parent().map(Path::to_path_buf),
        })
    }

    /// Parses `content` in the given format. Environment variables are
    /// substituted but not layered.
    pub fn from_content(content: &str, format: FileFormat) -> ConfigResult<Self> {
        let substituted = substitute_env_vars(content);
        let inner = Cfg::builder()
            .add_source(File::from_str(&substituted, format))
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(Self {
            inner,
            base_dir: None,
        })
    }
}

impl ConfigurationSource for AppConfig {
    fn get_string(&self, key: &str) -> Option<String> {
        self.inner.get_string(key).ok()
    }

    fn search_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .get_string(SEARCH_PATH_KEY)
            .map(|value| std::env::split_paths(&value).collect())
            .unwrap_or_default();
        // Bare names are relative to the configuration file first.
        if let Some(dir) = &self.base_dir {
            paths.push(dir.clone());
        }
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        paths
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator("__")
}

// ============================================================================
// In-memory source
// ============================================================================

/// In-memory configuration, for embedding hosts that own their own
/// configuration store.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    values: BTreeMap<String, String>,
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_script_pathname(self, pathname: impl AsRef<Path>) -> Self {
        self.with(SCRIPT_PATHNAME_KEY, &pathname.as_ref().to_string_lossy())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn clear(&mut self, key: &str) {
        self.values.remove(key);
    }
}

impl ConfigurationSource for StaticConfig {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Detect configuration format from file extension
///
/// # Supported Extensions
///
/// - YAML: `.yaml`, `.yml`
/// - TOML: `.toml`
/// - JSON: `.json`
/// - INI: `.ini`
/// - RON: `.ron`
/// - JSON5: `.json5`
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "ini" => Ok(FileFormat::Ini),
        "ron" => Ok(FileFormat::Ron),
        "json5" => Ok(FileFormat::Json5),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

static BRACED_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("braced variable pattern is valid")
});

static SIMPLE_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("simple variable pattern is valid")
});

/// Substitute environment variables in a string
///
/// Supports both `${VAR_NAME}` and `$VAR_NAME` syntax. Unset variables are
/// left untouched.
pub fn substitute_env_vars(content: &str) -> String {
    let braced = BRACED_VAR.replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });

    SIMPLE_VAR
        .replace_all(&braced, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
