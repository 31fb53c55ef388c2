//! Rhai script engine backend
//!
//! Provides a bounded script execution environment implementing
//! [`ExecutionBackend`].

use crate::convert::{dynamic_to_json, json_to_dynamic};
use hookscript_kernel::{BackendError, BackendResult, ExecutionBackend, ScriptValue};
use rhai::{AST, CallFnOptions, Dynamic, Engine, EvalAltResult, Scope};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

/// Tracing target for messages logged by script code.
pub const SCRIPT_LOG_TARGET: &str = "hookscript::script";

// ============================================================================
// Script Engine Configuration
// ============================================================================

/// Script engine resource limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSecurityConfig {
    /// Maximum call stack depth
    pub max_call_stack_depth: usize,
    /// Maximum number of operations per call, 0 for unlimited
    pub max_operations: u64,
    /// Maximum array size
    pub max_array_size: usize,
    /// Maximum object map size
    pub max_map_size: usize,
    /// Maximum string length
    pub max_string_size: usize,
    /// Whether to allow loops
    pub allow_loops: bool,
}

impl Default for ScriptSecurityConfig {
    fn default() -> Self {
        Self {
            max_call_stack_depth: 64,
            max_operations: 1_000_000,
            max_array_size: 10_000,
            max_map_size: 10_000,
            max_string_size: 1_000_000,
            allow_loops: true,
        }
    }
}

/// Script engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptEngineConfig {
    /// Resource limits
    pub security: ScriptSecurityConfig,
    /// Whether undeclared variables are a compile error
    pub strict_mode: bool,
}

// ============================================================================
// Compiled code
// ============================================================================

/// One compiled version of a delegate script.
pub struct RhaiCode {
    ast: AST,
}

impl RhaiCode {
    /// Names of the script functions defined by this code.
    pub fn function_names(&self) -> Vec<String> {
        self.ast
            .iter_functions()
            .map(|f| f.name.to_string())
            .collect()
    }
}

// ============================================================================
// Rhai backend
// ============================================================================

/// Execution backend running delegate scripts on a single Rhai engine.
///
/// Script instances are object maps. Methods run with the instance bound as
/// `this`, so state assigned in one call is visible to the next call on the
/// same instance.
pub struct RhaiBackend {
    engine: Engine,
    config: ScriptEngineConfig,
}

impl Default for RhaiBackend {
    fn default() -> Self {
        Self::new(ScriptEngineConfig::default())
    }
}

impl RhaiBackend {
    /// Create a new backend
    pub fn new(config: ScriptEngineConfig) -> Self {
        let mut engine = Engine::new();

        Self::apply_security_limits(&mut engine, &config.security);
        engine.set_strict_variables(config.strict_mode);
        Self::register_builtin_functions(&mut engine);

        Self { engine, config }
    }

    pub fn config(&self) -> &ScriptEngineConfig {
        &self.config
    }

    fn apply_security_limits(engine: &mut Engine, security: &ScriptSecurityConfig) {
        engine.set_max_call_levels(security.max_call_stack_depth);
        engine.set_max_operations(security.max_operations);
        engine.set_max_array_size(security.max_array_size);
        engine.set_max_map_size(security.max_map_size);
        engine.set_max_string_size(security.max_string_size);

        if !security.allow_loops {
            engine.set_allow_looping(false);
        }
    }

    /// Host logging exposed to scripts, plus JSON helpers.
    fn register_builtin_functions(engine: &mut Engine) {
        engine.register_fn("log_trace", |msg: &str| {
            trace!(target: SCRIPT_LOG_TARGET, "{}", msg);
        });
        engine.register_fn("log_debug", |msg: &str| {
            debug!(target: SCRIPT_LOG_TARGET, "{}", msg);
        });
        engine.register_fn("log_info", |msg: &str| {
            info!(target: SCRIPT_LOG_TARGET, "{}", msg);
        });
        engine.register_fn("log_warn", |msg: &str| {
            warn!(target: SCRIPT_LOG_TARGET, "{}", msg);
        });
        engine.register_fn("log_error", |msg: &str| {
            error!(target: SCRIPT_LOG_TARGET, "{}", msg);
        });

        engine.on_print(|msg| debug!(target: SCRIPT_LOG_TARGET, "print: {}", msg));
        engine.on_debug(|msg, src, pos| {
            debug!(target: SCRIPT_LOG_TARGET, "debug [{}@{}]: {}", src.unwrap_or("script"), pos, msg);
        });

        engine.register_fn("to_json", |value: Dynamic| -> Result<String, Box<EvalAltResult>> {
            let value = dynamic_to_json(&value).map_err(|e| e.to_string())?;
            serde_json::to_string(&value).map_err(|e| format!("to_json: {}", e).into())
        });
        engine.register_fn("from_json", |json: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            serde_json::from_str::<ScriptValue>(json)
                .map(|v| json_to_dynamic(&v))
                .map_err(|e| format!("from_json: malformed JSON: {}", e).into())
        });
    }

    fn call_error(method: &str, err: Box<EvalAltResult>) -> BackendError {
        match *err {
            EvalAltResult::ErrorFunctionNotFound(ref signature, _)
                if signature.starts_with(method) =>
            {
                BackendError::MissingMethod(signature.clone())
            }
            other => BackendError::Runtime {
                method: method.to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl ExecutionBackend for RhaiBackend {
    type Code = RhaiCode;
    type Instance = Dynamic;

    fn compile(&self, source: &str) -> BackendResult<RhaiCode> {
        let ast = self
            .engine
            .compile(source)
            .map_err(|e| BackendError::Compile(e.to_string()))?;

        // Top-level statements run once per load, never per call.
        self.engine
            .run_ast(&ast)
            .map_err(|e| BackendError::Compile(e.to_string()))?;

        Ok(RhaiCode { ast })
    }

    fn instantiate(&self, code: &RhaiCode, class_name: &str) -> BackendResult<Option<Dynamic>> {
        let mut scope = Scope::new();
        let options = CallFnOptions::new().eval_ast(false);

        let instance: Dynamic = self
            .engine
            .call_fn_with_options(options, &mut scope, &code.ast, class_name, ())
            .map_err(|e| BackendError::Instantiate {
                class: class_name.to_string(),
                message: e.to_string(),
            })?;

        if instance.is_unit() {
            Ok(None)
        } else {
            Ok(Some(instance))
        }
    }

    fn call(
        &self,
        code: &RhaiCode,
        instance: &mut Dynamic,
        method: &str,
        args: &mut [ScriptValue],
    ) -> BackendResult<ScriptValue> {
        // Containers are passed shared so in-place mutation by the script is
        // visible after the call.
        let dynamic_args: Vec<Dynamic> = args
            .iter()
            .map(|arg| {
                let value = json_to_dynamic(arg);
                if arg.is_object() || arg.is_array() {
                    value.into_shared()
                } else {
                    value
                }
            })
            .collect();
        let handles = dynamic_args.clone();

        let mut scope = Scope::new();
        let options = CallFnOptions::new()
            .eval_ast(false)
            .rewind_scope(true)
            .bind_this_ptr(instance);

        let result: Dynamic = self
            .engine
            .call_fn_with_options(options, &mut scope, &code.ast, method, dynamic_args)
            .map_err(|e| Self::call_error(method, e))?;

        for (slot, handle) in args.iter_mut().zip(handles) {
            if handle.is_shared() {
                *slot = dynamic_to_json(&handle)?;
            }
        }

        dynamic_to_json(&result)
    }
}

// ============================================================================
// Tests
// ============================================================================
