//! Typed errors for delegate invocation.

use crate::backend::BackendError;
use thiserror::Error;

/// Errors surfaced to callers of delegate hooks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DelegateError {
    /// No script code has been loaded yet.
    #[error("No delegate script code is loaded")]
    NoCodeLoaded,

    /// The delegate object was never constructed.
    #[error("Delegate object is not instantiated")]
    NotInstantiated,

    /// Every construction attempt succeeded but produced no object.
    #[error("Delegate construction produced no object after {0} attempts")]
    InstantiationExhausted(u32),

    /// Constructing the delegate object failed outright.
    #[error("Delegate instantiation failed: {0}")]
    Instantiation(#[source] BackendError),

    /// The backend reported a failed method call.
    #[error("Delegate method {method} failed: {source}")]
    Invocation {
        /// Method that was invoked.
        method: String,
        /// Underlying backend failure.
        #[source]
        source: BackendError,
    },

    /// A hook returned a value of a kind its typed accessor cannot use.
    #[error("Delegate method {method} returned {actual}, expected {expected}")]
    UnexpectedResult {
        /// Method that was invoked.
        method: String,
        /// Kind the accessor documents.
        expected: &'static str,
        /// Kind the script returned.
        actual: &'static str,
    },
}

/// Result alias for delegate operations.
pub type DelegateResult<T> = Result<T, DelegateError>;
