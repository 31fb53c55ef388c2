//! Hookscript Kernel
//!
//! Contracts shared between the host application, the scripting backends and
//! the delegate runtime:
//! - the `ExecutionBackend` seam around an embedded scripting engine
//! - the closed registry of well-known delegate hooks
//! - the typed `Delegate` surface consumed by the host
//! - the host plugin lifecycle
//! - configuration sources and script location resolution
//! - bounded retry policy

// value module
pub mod value;
pub use value::*;

// backend module
pub mod backend;
pub use backend::*;

// delegate module
pub mod delegate;
pub use delegate::*;

// plugin module
pub mod plugin;
pub use plugin::*;

// request context module
pub mod context;
pub use context::RequestContext;

// retry module
pub mod retry;
pub use retry::RetryPolicy;

// config module
pub mod config;
