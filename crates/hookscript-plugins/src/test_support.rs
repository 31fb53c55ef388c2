//! In-crate execution backend for exercising loader and delegate behavior
//! without a real scripting engine.
//!
//! Source text is `version[;option]*`. Options:
//! - `nil=N` / `nil=all`: the first N constructions (or every one) produce no object
//! - `ctor-error`: construction fails outright
//! - `no-setter`: instances have no context setter
//!
//! A version starting with `!` fails to compile.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use hookscript_kernel::{BackendError, BackendResult, ExecutionBackend, ScriptValue};
use serde_json::json;

#[derive(Default)]
pub(crate) struct MockBackend {
    compiles: AtomicUsize,
    constructions: AtomicU32,
}

impl MockBackend {
    pub(crate) fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    pub(crate) fn construction_count(&self) -> u32 {
        self.constructions.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockCode {
    pub(crate) version: String,
    nil_constructions: u32,
    constructor_fails: bool,
    has_setter: bool,
}

pub(crate) struct MockInstance {
    pub(crate) context: ScriptValue,
    pub(crate) calls: u32,
}

impl ExecutionBackend for MockBackend {
    type Code = MockCode;
    type Instance = MockInstance;

    fn compile(&self, source: &str) -> BackendResult<MockCode> {
        self.compiles.fetch_add(1, Ordering::SeqCst);

        let mut parts = source.trim().split(';');
        let version = parts.next().unwrap_or_default().to_string();
        if version.starts_with('!') {
            return Err(BackendError::Compile(format!("cannot compile {version}")));
        }

        let mut code = MockCode {
            version,
            nil_constructions: 0,
            constructor_fails: false,
            has_setter: true,
        };
        for option in parts {
            match option {
                "nil=all" => code.nil_constructions = u32::MAX,
                "ctor-error" => code.constructor_fails = true,
                "no-setter" => code.has_setter = false,
                other => {
                    if let Some(n) = other.strip_prefix("nil=") {
                        code.nil_constructions = n
                            .parse()
                            .map_err(|_| BackendError::Compile(format!("bad option {other}")))?;
                    }
                }
            }
        }
        Ok(code)
    }

    fn instantiate(&self, code: &MockCode, class_name: &str) -> BackendResult<Option<MockInstance>> {
        let attempt = self.constructions.fetch_add(1, Ordering::SeqCst) + 1;
        if code.constructor_fails {
            return Err(BackendError::Instantiate {
                class: class_name.to_string(),
                message: "constructor raised".to_string(),
            });
        }
        if attempt <= code.nil_constructions {
            return Ok(None);
        }
        Ok(Some(MockInstance {
            context: ScriptValue::Null,
            calls: 0,
        }))
    }

    fn call(
        &self,
        code: &MockCode,
        instance: &mut MockInstance,
        method: &str,
        args: &mut [ScriptValue],
    ) -> BackendResult<ScriptValue> {
        instance.calls += 1;
        match method {
            "set_context" if code.has_setter => {
                instance.context = args.first().cloned().unwrap_or_default();
                Ok(ScriptValue::Null)
            }
            "context" => Ok(instance.context.clone()),
            "calls" => Ok(json!(instance.calls)),
            "version" => Ok(json!(code.version)),
            "slow_version" => {
                let before = code.version.clone();
                std::thread::sleep(Duration::from_millis(5));
                Ok(json!([before, code.version]))
            }
            "echo" => Ok(args.first().cloned().unwrap_or_default()),
            "touch" => {
                if let Some(ScriptValue::Object(map)) = args.first_mut() {
                    map.insert("touched".to_string(), json!(true));
                }
                Ok(ScriptValue::Null)
            }
            "fail" => Err(BackendError::Runtime {
                method: method.to_string(),
                message: "script raised".to_string(),
            }),
            _ => Err(BackendError::MissingMethod(method.to_string())),
        }
    }
}
