//! Rhai execution backend
//!
//! Runs delegate scripts written in [Rhai](https://rhai.rs) behind the
//! [`ExecutionBackend`](hookscript_kernel::ExecutionBackend) trait.
//!
//! A Rhai delegate script models its "class" as a constructor function that
//! returns an object map, and its methods as functions that operate on
//! `this`:
//!
//! ```rhai
//! fn CustomDelegate() {
//!     #{ context: #{} }
//! }
//!
//! fn set_context(context) {
//!     this.context = context;
//! }
//!
//! fn source() {
//!     if this.context.identifier == "bogus" { () } else { "FilesystemSource" }
//! }
//! ```
//!
//! Scripts can log through the host with `log_trace`, `log_debug`,
//! `log_info`, `log_warn` and `log_error`.

pub mod convert;
pub mod engine;

pub use convert::{dynamic_to_json, json_to_dynamic};
pub use engine::{RhaiBackend, RhaiCode, ScriptEngineConfig, ScriptSecurityConfig, SCRIPT_LOG_TARGET};
