//! Script-backed delegate
//!
//! [`ScriptDelegate`] wraps one script object constructed against the code
//! currently held by a shared [`CodeLoader`]. Every backend call takes the
//! loader's read lock for the duration of that call only, so a reload can
//! slip in between two calls but never during one.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use hookscript_kernel::config::SCRIPT_PATHNAME_KEY;
use hookscript_kernel::value::{kind_name, kinds_summary};
use hookscript_kernel::{
    DELEGATE_CLASS_NAME, Delegate, DelegateError, DelegateMethod, DelegateResult, ExecutionBackend,
    HTTP_SOURCE_URI_KEY, HostPlugin, PluginError, PluginResult, REQUEST_CONTEXT_SETTER,
    RequestContext, RetryPolicy, ScriptMap, ScriptValue,
};
use tracing::{debug, error};

use crate::hot_reload::CodeLoader;

/// Name reported to the host.
pub const PLUGIN_NAME: &str = "ScriptDelegate";

/// Delegate for one request or session.
pub struct ScriptDelegate<B: ExecutionBackend> {
    loader: Arc<CodeLoader<B>>,
    instance: Option<B::Instance>,
    request_context: Option<RequestContext>,
    retry: RetryPolicy,
}

impl<B: ExecutionBackend> ScriptDelegate<B> {
    /// Create a delegate with no script object yet. Call
    /// [`instantiate`](Self::instantiate) before invoking hooks.
    pub fn new(loader: Arc<CodeLoader<B>>) -> Self {
        Self {
            loader,
            instance: None,
            request_context: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn loader(&self) -> &Arc<CodeLoader<B>> {
        &self.loader
    }

    pub fn is_instantiated(&self) -> bool {
        self.instance.is_some()
    }

    /// Constructs the script object, retrying while construction produces
    /// nothing.
    ///
    /// Each attempt holds the read lock for that attempt only. A construction
    /// failure is returned at once. When every attempt comes back empty the
    /// delegate stays uninstantiated.
    pub fn instantiate(&mut self) -> DelegateResult<()> {
        let loader = &self.loader;
        let instance = self.retry.run(|attempt| {
            debug!("Instantiating {} (attempt {})", DELEGATE_CLASS_NAME, attempt);
            loader
                .with_code(|backend, code| backend.instantiate(code, DELEGATE_CLASS_NAME))
                .ok_or(DelegateError::NoCodeLoaded)?
                .map_err(DelegateError::Instantiation)
        })?;

        match instance {
            Some(instance) => {
                self.instance = Some(instance);
                Ok(())
            }
            None => Err(DelegateError::InstantiationExhausted(self.retry.max_attempts())),
        }
    }

    fn text_result(method: DelegateMethod, value: ScriptValue) -> DelegateResult<Option<String>> {
        match value {
            ScriptValue::Null => Ok(None),
            ScriptValue::String(text) => Ok(Some(text)),
            other => Err(unexpected(method, "text", &other)),
        }
    }

    fn map_result(method: DelegateMethod, value: ScriptValue) -> DelegateResult<ScriptMap> {
        match value {
            ScriptValue::Null => Ok(ScriptMap::new()),
            ScriptValue::Object(map) => Ok(map),
            other => Err(unexpected(method, "mapping", &other)),
        }
    }

    /// Passes `info` to a mutation hook and takes back whatever the script
    /// left in it.
    fn customize(&mut self, method: DelegateMethod, info: &mut ScriptMap) -> DelegateResult<()> {
        let mut args = [ScriptValue::Object(std::mem::take(info))];
        let result = self.invoke_hook(method, &mut args);
        let [returned] = args;
        match returned {
            ScriptValue::Object(map) => *info = map,
            other => {
                result?;
                return Err(unexpected(method, "mapping", &other));
            }
        }
        result.map(|_| ())
    }
}

fn unexpected(method: DelegateMethod, expected: &'static str, actual: &ScriptValue) -> DelegateError {
    DelegateError::UnexpectedResult {
        method: method.method_name().to_string(),
        expected,
        actual: kind_name(actual),
    }
}

impl<B: ExecutionBackend> Delegate for ScriptDelegate<B> {
    fn request_context(&self) -> Option<&RequestContext> {
        self.request_context.as_ref()
    }

    fn set_request_context(&mut self, context: RequestContext) -> DelegateResult<()> {
        self.invoke(REQUEST_CONTEXT_SETTER, &mut [context.to_map()])?;
        self.request_context = Some(context);
        Ok(())
    }

    fn authorize(&mut self) -> DelegateResult<ScriptValue> {
        self.invoke_hook(DelegateMethod::Authorize, &mut [])
    }

    fn authorize_before_access(&mut self) -> DelegateResult<ScriptValue> {
        self.invoke_hook(DelegateMethod::AuthorizeBeforeAccess, &mut [])
    }

    fn customize_iiif1_information_response(&mut self, info: &mut ScriptMap) -> DelegateResult<()> {
        self.customize(DelegateMethod::CustomizeIiif1InformationResponse, info)
    }

    fn customize_iiif2_information_response(&mut self, info: &mut ScriptMap) -> DelegateResult<()> {
        self.customize(DelegateMethod::CustomizeIiif2InformationResponse, info)
    }

    fn customize_iiif3_information_response(&mut self, info: &mut ScriptMap) -> DelegateResult<()> {
        self.customize(DelegateMethod::CustomizeIiif3InformationResponse, info)
    }

    fn deserialize_meta_identifier(&mut self, meta_identifier: &str) -> DelegateResult<ScriptMap> {
        let method = DelegateMethod::DeserializeMetaIdentifier;
        let result = self.invoke_hook(method, &mut [ScriptValue::from(meta_identifier)])?;
        Self::map_result(method, result)
    }

    fn serialize_meta_identifier(&mut self, components: &ScriptMap) -> DelegateResult<Option<String>> {
        let method = DelegateMethod::SerializeMetaIdentifier;
        let result = self.invoke_hook(method, &mut [ScriptValue::Object(components.clone())])?;
        Self::text_result(method, result)
    }

    fn filesystem_source_pathname(&mut self) -> DelegateResult<Option<String>> {
        let method = DelegateMethod::FilesystemSourcePathname;
        let result = self.invoke_hook(method, &mut [])?;
        Self::text_result(method, result)
    }

    fn http_source_resource_info(&mut self) -> DelegateResult<ScriptMap> {
        let method = DelegateMethod::HttpSourceResourceInfo;
        match self.invoke_hook(method, &mut [])? {
            ScriptValue::String(uri) => {
                let mut info = ScriptMap::new();
                info.insert(HTTP_SOURCE_URI_KEY.to_string(), ScriptValue::String(uri));
                Ok(info)
            }
            ScriptValue::Null => Ok(ScriptMap::new()),
            ScriptValue::Object(info) => Ok(info),
            other => Err(unexpected(method, "text or mapping", &other)),
        }
    }

    fn metadata(&mut self) -> DelegateResult<Option<String>> {
        let method = DelegateMethod::Metadata;
        let result = self.invoke_hook(method, &mut [])?;
        Self::text_result(method, result)
    }

    fn overlay_properties(&mut self) -> DelegateResult<ScriptMap> {
        let method = DelegateMethod::Overlay;
        let result = self.invoke_hook(method, &mut [])?;
        Self::map_result(method, result)
    }

    fn redactions(&mut self) -> DelegateResult<Vec<ScriptMap>> {
        let method = DelegateMethod::Redactions;
        match self.invoke_hook(method, &mut [])? {
            ScriptValue::Null => Ok(Vec::new()),
            ScriptValue::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    ScriptValue::Object(map) => Ok(map),
                    other => Err(unexpected(method, "sequence of mappings", &other)),
                })
                .collect(),
            other => Err(unexpected(method, "sequence", &other)),
        }
    }

    fn source(&mut self) -> DelegateResult<Option<String>> {
        let method = DelegateMethod::Source;
        let result = self.invoke_hook(method, &mut [])?;
        Self::text_result(method, result)
    }

    fn invoke(&mut self, method: &str, args: &mut [ScriptValue]) -> DelegateResult<ScriptValue> {
        let instance = self.instance.as_mut().ok_or(DelegateError::NotInstantiated)?;

        let args_list = kinds_summary(args);
        debug!("Invoking {}() with args: ({})", method, args_list);

        let start = Instant::now();
        let result = self
            .loader
            .with_code(|backend, code| backend.call(code, instance, method, args))
            .ok_or(DelegateError::NoCodeLoaded)?
            .map_err(|source| DelegateError::Invocation {
                method: method.to_string(),
                source,
            })?;

        if method != REQUEST_CONTEXT_SETTER {
            debug!(
                "{}() returned a {} for args: ({}) in {:?}",
                method,
                kind_name(&result),
                args_list,
                start.elapsed()
            );
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl<B: ExecutionBackend> HostPlugin for ScriptDelegate<B> {
    fn plugin_name(&self) -> &str {
        PLUGIN_NAME
    }

    fn plugin_config_keys(&self) -> BTreeSet<String> {
        BTreeSet::from([SCRIPT_PATHNAME_KEY.to_string()])
    }

    async fn on_application_start(&self) -> PluginResult<()> {
        self.loader.ensure_initialized().await;
        Ok(())
    }

    async fn on_application_stop(&self) -> PluginResult<()> {
        self.loader.stop().await;
        Ok(())
    }

    async fn initialize_plugin(&mut self) -> PluginResult<()> {
        self.loader.ensure_initialized().await;
        self.instantiate().map_err(|e| {
            error!("Failed to instantiate {}: {}", DELEGATE_CLASS_NAME, e);
            PluginError::InitFailed(e.to_string())
        })
    }
}
