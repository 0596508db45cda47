//! Loadable units: instantiable agent classes and plain agent functions.
//!
//! Agent code reports failures through `anyhow::Result`; the invoker turns
//! them into `AgentExecutionError` with the full error chain as message.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use depot_state::JsonMap;
use serde_json::Value;

/// Name of the operation every agent object must expose.
pub const RUN_METHOD: &str = "run";

/// An agent with a single `run` operation.
///
/// Any `Agent` is automatically an [`AgentObject`] responding to `run`.
pub trait Agent: Send {
    fn run(&self, inputs: &JsonMap) -> anyhow::Result<Value>;
}

/// An instantiated agent, addressed by method name.
pub trait AgentObject: Send {
    fn responds_to(&self, method: &str) -> bool;
    fn call(&self, method: &str, inputs: &JsonMap) -> anyhow::Result<Value>;
}

impl<T: Agent> AgentObject for T {
    fn responds_to(&self, method: &str) -> bool {
        method == RUN_METHOD
    }

    fn call(&self, method: &str, inputs: &JsonMap) -> anyhow::Result<Value> {
        if method != RUN_METHOD {
            anyhow::bail!("object has no method '{method}'");
        }
        self.run(inputs)
    }
}

/// Something that can be instantiated with no constructor arguments.
pub trait AgentClass: Send + Sync {
    fn instantiate(&self) -> anyhow::Result<Box<dyn AgentObject>>;
}

impl<F> AgentClass for F
where
    F: Fn() -> anyhow::Result<Box<dyn AgentObject>> + Send + Sync,
{
    fn instantiate(&self) -> anyhow::Result<Box<dyn AgentObject>> {
        self()
    }
}

/// Class whose instances come from `T::default()`.
struct DefaultClass<T>(PhantomData<fn() -> T>);

impl<T> AgentClass for DefaultClass<T>
where
    T: Agent + Default + 'static,
{
    fn instantiate(&self) -> anyhow::Result<Box<dyn AgentObject>> {
        Ok(Box::new(T::default()))
    }
}

/// A plain function invoked directly with the input mapping.
pub trait AgentFunction: Send + Sync {
    fn call(&self, inputs: &JsonMap) -> anyhow::Result<Value>;
}

impl<F> AgentFunction for F
where
    F: Fn(&JsonMap) -> anyhow::Result<Value> + Send + Sync,
{
    fn call(&self, inputs: &JsonMap) -> anyhow::Result<Value> {
        self(inputs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Class,
    Function,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Class => f.write_str("callable-class"),
            UnitKind::Function => f.write_str("callable-function"),
        }
    }
}

/// A resolved entrypoint attribute.
#[derive(Clone)]
pub enum Unit {
    /// Must be instantiated before `run` is called.
    Class(Arc<dyn AgentClass>),
    /// Called directly.
    Function(Arc<dyn AgentFunction>),
}

impl Unit {
    /// Class built from `T::default()`.
    pub fn class<T>() -> Self
    where
        T: Agent + Default + 'static,
    {
        Unit::Class(Arc::new(DefaultClass::<T>(PhantomData)))
    }

    /// Class with a custom constructor.
    pub fn class_with<F>(constructor: F) -> Self
    where
        F: Fn() -> anyhow::Result<Box<dyn AgentObject>> + Send + Sync + 'static,
    {
        Unit::Class(Arc::new(constructor))
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&JsonMap) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Unit::Function(Arc::new(f))
    }

    pub fn kind(&self) -> UnitKind {
        match self {
            Unit::Class(_) => UnitKind::Class,
            Unit::Function(_) => UnitKind::Function,
        }
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Unit").field(&self.kind()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Echo;

    impl Agent for Echo {
        fn run(&self, inputs: &JsonMap) -> anyhow::Result<Value> {
            Ok(Value::Object(inputs.clone()))
        }
    }

    #[test]
    fn agent_objects_respond_only_to_run() {
        let obj = Echo;
        assert!(obj.responds_to("run"));
        assert!(!obj.responds_to("greet"));
        assert!(AgentObject::call(&obj, "greet", &JsonMap::new()).is_err());
    }

    #[test]
    fn class_units_instantiate_fresh_objects() {
        let Unit::Class(class) = Unit::class::<Echo>() else {
            panic!("expected class unit");
        };
        let obj = class.instantiate().unwrap();
        let mut inputs = JsonMap::new();
        inputs.insert("x".to_string(), json!(1));
        assert_eq!(obj.call("run", &inputs).unwrap(), json!({"x": 1}));
    }

    #[test]
    fn kinds_are_reported() {
        assert_eq!(Unit::class::<Echo>().kind(), UnitKind::Class);
        let f = Unit::function(|_inputs: &JsonMap| Ok(json!({})));
        assert_eq!(f.kind(), UnitKind::Function);
        assert_eq!(f.kind().to_string(), "callable-function");
    }
}
