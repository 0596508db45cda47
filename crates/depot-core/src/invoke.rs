//! Invocation Engine: instantiate or call a unit and check the result shape.
//!
//! One attempt per call. Agent failures, including panics, come back as
//! typed errors; nothing inside agent code can unwind past `invoke`.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use depot_state::JsonMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::error::{DepotError, Result};
use crate::loader::{AgentClass, AgentObject, Unit, RUN_METHOD};

/// Invokes a resolved unit with an input mapping.
pub trait Invoker: Send + Sync {
    /// `label` names the unit in error messages (usually the entrypoint).
    fn invoke(&self, unit: &Unit, label: &str, inputs: &JsonMap) -> Result<JsonMap>;
}

/// Calls agent code on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectInvoker;

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "agent panicked".to_string()
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Run agent code, mapping both `Err` and panics to `AgentExecutionError`.
fn guarded_call<F>(call: F) -> Result<Value>
where
    F: FnOnce() -> anyhow::Result<Value>,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DepotError::AgentExecution(format!("{e:#}"))),
        Err(payload) => Err(DepotError::AgentExecution(format!(
            "panic: {}",
            panic_message(payload)
        ))),
    }
}

fn instantiate(unit_label: &str, class: &dyn AgentClass) -> Result<Box<dyn AgentObject>> {
    let construction = |message: String| DepotError::Construction {
        unit: unit_label.to_string(),
        message,
    };
    match catch_unwind(AssertUnwindSafe(|| class.instantiate())) {
        Ok(Ok(obj)) => Ok(obj),
        Ok(Err(e)) => Err(construction(format!("{e:#}"))),
        Err(payload) => Err(construction(format!("panic: {}", panic_message(payload)))),
    }
}

impl Invoker for DirectInvoker {
    fn invoke(&self, unit: &Unit, label: &str, inputs: &JsonMap) -> Result<JsonMap> {
        let value = match unit {
            Unit::Class(class) => {
                let obj = instantiate(label, class.as_ref())?;
                if !obj.responds_to(RUN_METHOD) {
                    return Err(DepotError::MissingRunMethod {
                        unit: label.to_string(),
                    });
                }
                guarded_call(|| obj.call(RUN_METHOD, inputs))?
            }
            Unit::Function(f) => guarded_call(|| f.call(inputs))?,
        };

        match value {
            Value::Object(outputs) => {
                debug!(unit = %label, keys = outputs.len(), "invocation returned mapping");
                Ok(outputs)
            }
            other => {
                warn!(unit = %label, actual = describe(&other), "invocation returned non-mapping");
                Err(DepotError::InvalidResultShape {
                    actual: describe(&other).to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;
    use crate::loader::Agent;
    use serde_json::json;

    #[derive(Default)]
    struct ReturnsX;

    impl Agent for ReturnsX {
        fn run(&self, _inputs: &JsonMap) -> anyhow::Result<Value> {
            Ok(json!({"x": 1}))
        }
    }

    #[derive(Default)]
    struct ReturnsNumber;

    impl Agent for ReturnsNumber {
        fn run(&self, _inputs: &JsonMap) -> anyhow::Result<Value> {
            Ok(json!(42))
        }
    }

    struct NoRun;

    impl AgentObject for NoRun {
        fn responds_to(&self, _method: &str) -> bool {
            false
        }

        fn call(&self, method: &str, _inputs: &JsonMap) -> anyhow::Result<Value> {
            anyhow::bail!("no method {method}")
        }
    }

    #[test]
    fn class_round_trip() {
        let out = DirectInvoker
            .invoke(&Unit::class::<ReturnsX>(), "t:ReturnsX", &JsonMap::new())
            .unwrap();
        assert_eq!(Value::Object(out), json!({"x": 1}));
    }

    #[test]
    fn non_mapping_is_invalid_shape() {
        let err = DirectInvoker
            .invoke(&Unit::class::<ReturnsNumber>(), "t:N", &JsonMap::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResultShape);
        assert!(err.to_string().contains("number"));
    }

    #[test]
    fn function_called_with_inputs() {
        let unit = Unit::function(|inputs: &JsonMap| {
            let name = inputs.get("name").and_then(Value::as_str).unwrap_or("world");
            Ok(json!({ "greeting": format!("Hello, {name}!") }))
        });
        let mut inputs = JsonMap::new();
        inputs.insert("name".to_string(), json!("Ada"));
        let out = DirectInvoker.invoke(&unit, "g:greet", &inputs).unwrap();
        assert_eq!(out["greeting"], json!("Hello, Ada!"));
    }

    #[test]
    fn missing_run_method() {
        let unit = Unit::class_with(|| Ok(Box::new(NoRun) as Box<dyn AgentObject>));
        let err = DirectInvoker
            .invoke(&unit, "t:NoRun", &JsonMap::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRunMethod);
    }

    #[test]
    fn constructor_failure_and_panic() {
        let failing = Unit::class_with(|| Err(anyhow::anyhow!("missing model file")));
        let err = DirectInvoker
            .invoke(&failing, "t:Broken", &JsonMap::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstructionError);
        assert!(err.to_string().contains("missing model file"));

        let panicking = Unit::class_with(|| panic!("ctor exploded"));
        let err = DirectInvoker
            .invoke(&panicking, "t:Panics", &JsonMap::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstructionError);
    }

    #[test]
    fn agent_errors_and_panics_become_execution_errors() {
        let failing = Unit::function(|_: &JsonMap| Err(anyhow::anyhow!("bad input")));
        let err = DirectInvoker
            .invoke(&failing, "t:f", &JsonMap::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AgentExecutionError);
        assert!(err.to_string().contains("bad input"));

        let panicking = Unit::function(|_: &JsonMap| panic!("kaboom"));
        let err = DirectInvoker
            .invoke(&panicking, "t:p", &JsonMap::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AgentExecutionError);
        assert!(err.to_string().contains("kaboom"));
    }
}
