//! Execution backend seam
//!
//! An execution backend is anything that can compile a source blob, construct
//! an instance of a named class against the compiled code and run a named
//! method on that instance with positional arguments. The delegate runtime
//! only ever talks to scripts through this trait.

use crate::value::ScriptValue;
use thiserror::Error;

/// Errors reported by an execution backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    /// The source failed to compile, or its top-level statements failed to run.
    #[error("Compile error: {0}")]
    Compile(String),

    /// The named class could not be constructed.
    #[error("Instantiation error for {class}: {message}")]
    Instantiate {
        /// Class that was requested.
        class: String,
        /// Backend diagnostic.
        message: String,
    },

    /// The instance has no method with the requested name and arity.
    #[error("Missing method: {0}")]
    MissingMethod(String),

    /// Script code raised an error while running.
    #[error("Runtime error in {method}: {message}")]
    Runtime {
        /// Method that was running.
        method: String,
        /// Backend diagnostic.
        message: String,
    },

    /// A value could not be converted across the script boundary.
    #[error("Conversion error: {0}")]
    Conversion(String),
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Opaque scripting engine capable of compiling code and dispatching methods.
///
/// `Code` is the compiled representation of one script version. The delegate
/// runtime keeps exactly one current `Code` and replaces it wholesale on
/// reload. `Instance` is one constructed delegate object; it is owned by a
/// single caller and is never shared between threads concurrently.
pub trait ExecutionBackend: Send + Sync + 'static {
    /// Compiled script.
    type Code: Send + Sync;

    /// Constructed script object.
    type Instance: Send + Sync;

    /// Compiles `source` and runs its top-level statements.
    fn compile(&self, source: &str) -> BackendResult<Self::Code>;

    /// Constructs a new instance of `class_name`.
    ///
    /// `Ok(None)` means the construction call itself succeeded but produced
    /// no object.
    fn instantiate(&self, code: &Self::Code, class_name: &str)
    -> BackendResult<Option<Self::Instance>>;

    /// Calls `method` on `instance`.
    ///
    /// Backends that support in-place mutation of arguments write the
    /// mutated values back into `args` before returning.
    fn call(
        &self,
        code: &Self::Code,
        instance: &mut Self::Instance,
        method: &str,
        args: &mut [ScriptValue],
    ) -> BackendResult<ScriptValue>;
}
