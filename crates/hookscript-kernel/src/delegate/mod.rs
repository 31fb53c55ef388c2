//! Delegate contract
//!
//! The typed surface the host application calls into. Each accessor maps to
//! one [`DelegateMethod`] and interprets the dynamically-typed script result
//! into the hook's documented shape.

pub mod error;
pub mod method;

pub use error::{DelegateError, DelegateResult};
pub use method::DelegateMethod;

use crate::context::RequestContext;
use crate::value::{ScriptMap, ScriptValue};

/// Name of the script class implementing the delegate hooks.
pub const DELEGATE_CLASS_NAME: &str = "CustomDelegate";

/// Name of the setter every delegate class must define to receive the
/// request context.
pub const REQUEST_CONTEXT_SETTER: &str = "set_context";

/// Key under which a plain-text HTTP source resource info result is wrapped.
pub const HTTP_SOURCE_URI_KEY: &str = "uri";

/// Typed access to delegate hooks for one request or session.
///
/// Implementations are not internally synchronized; one delegate serves one
/// caller at a time.
pub trait Delegate {
    /// The context most recently assigned with
    /// [`set_request_context`](Delegate::set_request_context).
    fn request_context(&self) -> Option<&RequestContext>;

    /// Hands an immutable snapshot of `context` to the script and keeps it.
    fn set_request_context(&mut self, context: RequestContext) -> DelegateResult<()>;

    /// Either a boolean or a redirect description mapping.
    fn authorize(&mut self) -> DelegateResult<ScriptValue>;

    /// Either a boolean or a redirect description mapping.
    fn authorize_before_access(&mut self) -> DelegateResult<ScriptValue>;

    /// The script mutates `info` in place.
    fn customize_iiif1_information_response(&mut self, info: &mut ScriptMap)
    -> DelegateResult<()>;

    /// The script mutates `info` in place.
    fn customize_iiif2_information_response(&mut self, info: &mut ScriptMap)
    -> DelegateResult<()>;

    /// The script mutates `info` in place.
    fn customize_iiif3_information_response(&mut self, info: &mut ScriptMap)
    -> DelegateResult<()>;

    /// Splits a meta-identifier into its components. Nil yields an empty map.
    fn deserialize_meta_identifier(&mut self, meta_identifier: &str)
    -> DelegateResult<ScriptMap>;

    /// Joins meta-identifier components.
    fn serialize_meta_identifier(&mut self, components: &ScriptMap)
    -> DelegateResult<Option<String>>;

    fn filesystem_source_pathname(&mut self) -> DelegateResult<Option<String>>;

    /// Plain text is wrapped under [`HTTP_SOURCE_URI_KEY`]; nil yields an
    /// empty map.
    fn http_source_resource_info(&mut self) -> DelegateResult<ScriptMap>;

    fn metadata(&mut self) -> DelegateResult<Option<String>>;

    /// Nil yields an empty map.
    fn overlay_properties(&mut self) -> DelegateResult<ScriptMap>;

    /// Nil and an empty sequence both yield an empty vector.
    fn redactions(&mut self) -> DelegateResult<Vec<ScriptMap>>;

    fn source(&mut self) -> DelegateResult<Option<String>>;

    /// Generic invocation of any method, registered or not.
    fn invoke(&mut self, method: &str, args: &mut [ScriptValue]) -> DelegateResult<ScriptValue>;

    /// Invocation of a registered hook.
    fn invoke_hook(
        &mut self,
        method: DelegateMethod,
        args: &mut [ScriptValue],
    ) -> DelegateResult<ScriptValue> {
        self.invoke(method.method_name(), args)
    }
}
