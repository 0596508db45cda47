//! Entrypoint resolution and invocation through the public API.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{agent, json_map};
use depot_core::{
    Agent, AgentObject, CatalogLoader, DepotError, DirectInvoker, EntrypointResolver, ErrorKind,
    Invoker, ModuleDef, Runner, Unit, UnitKind,
};
use depot_state::JsonMap;
use serde_json::{json, Value};

#[derive(Default)]
struct Doubler;

impl Agent for Doubler {
    fn run(&self, inputs: &JsonMap) -> anyhow::Result<Value> {
        let x = inputs
            .get("x")
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow::anyhow!("x must be a number"))?;
        Ok(json!({ "doubled": x * 2.0 }))
    }
}

#[derive(Default)]
struct ListAgent;

impl Agent for ListAgent {
    fn run(&self, _inputs: &JsonMap) -> anyhow::Result<Value> {
        Ok(json!([1, 2, 3]))
    }
}

#[derive(Default)]
struct Panicky;

impl Agent for Panicky {
    fn run(&self, _inputs: &JsonMap) -> anyhow::Result<Value> {
        panic!("boom");
    }
}

struct Mute;

impl AgentObject for Mute {
    fn responds_to(&self, _method: &str) -> bool {
        false
    }

    fn call(&self, method: &str, _inputs: &JsonMap) -> anyhow::Result<Value> {
        anyhow::bail!("no method {method}")
    }
}

/// A staged tree containing `tools/math.rs`, plus the catalog for it.
fn staged_tree() -> (tempfile::TempDir, CatalogLoader) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("tools")).unwrap();
    std::fs::write(dir.path().join("tools").join("math.rs"), "// math").unwrap();

    let math = ModuleDef::new()
        .with("Doubler", Unit::class::<Doubler>())
        .with("ListAgent", Unit::class::<ListAgent>())
        .with("Panicky", Unit::class::<Panicky>())
        .with("Mute", Unit::class_with(|| Ok(Box::new(Mute) as Box<dyn AgentObject>)))
        .with(
            "Broken",
            Unit::class_with(|| Err(anyhow::anyhow!("missing model weights"))),
        )
        .with(
            "add",
            Unit::function(|inputs: &JsonMap| {
                let a = inputs.get("a").and_then(Value::as_i64).unwrap_or(0);
                let b = inputs.get("b").and_then(Value::as_i64).unwrap_or(0);
                Ok(json!({ "sum": a + b }))
            }),
        )
        .with("not_a_map", Unit::function(|_: &JsonMap| Ok(json!("text"))));
    (dir, CatalogLoader::new().with_staged("tools.math", math))
}

fn invoke(entrypoint: &str, inputs: Value) -> depot_core::Result<JsonMap> {
    let (dir, catalog) = staged_tree();
    let resolver = EntrypointResolver::new(Arc::new(catalog));
    let unit = resolver.resolve(dir.path(), entrypoint)?;
    DirectInvoker.invoke(&unit, entrypoint, &json_map(inputs))
}

#[test]
fn class_entrypoint_runs_with_inputs() {
    let out = invoke("tools.math:Doubler", json!({"x": 21})).unwrap();
    assert_eq!(out.get("doubled"), Some(&json!(42.0)));
}

#[test]
fn function_entrypoint_is_called_directly() {
    let (dir, catalog) = staged_tree();
    let unit = EntrypointResolver::new(Arc::new(catalog))
        .resolve(dir.path(), "tools.math:add")
        .unwrap();
    assert_eq!(unit.kind(), UnitKind::Function);

    let out = DirectInvoker
        .invoke(&unit, "tools.math:add", &json_map(json!({"a": 2, "b": 3})))
        .unwrap();
    assert_eq!(Value::Object(out), json!({"sum": 5}));
}

#[test]
fn failure_kinds_are_distinct() {
    let cases = [
        ("tools.math", ErrorKind::MalformedEntrypoint),
        (":Doubler", ErrorKind::MalformedEntrypoint),
        ("tools.math:", ErrorKind::MalformedEntrypoint),
        ("tools.nope:Doubler", ErrorKind::ModuleLoadError),
        ("tools.math:Nope", ErrorKind::AttributeNotFound),
        ("tools.math:Broken", ErrorKind::ConstructionError),
        ("tools.math:Mute", ErrorKind::MissingRunMethod),
        ("tools.math:Panicky", ErrorKind::AgentExecutionError),
        ("tools.math:ListAgent", ErrorKind::InvalidResultShape),
        ("tools.math:not_a_map", ErrorKind::InvalidResultShape),
    ];
    for (entrypoint, expected) in cases {
        let err = invoke(entrypoint, json!({})).unwrap_err();
        assert_eq!(err.kind(), expected, "{entrypoint}: {err}");
    }
}

#[test]
fn agent_error_message_is_preserved() {
    let err = invoke("tools.math:Doubler", json!({"x": "nope"})).unwrap_err();
    assert!(matches!(err, DepotError::AgentExecution(_)));
    assert!(err.to_string().contains("x must be a number"));
}

#[test]
fn construction_error_carries_cause() {
    let err = invoke("tools.math:Broken", json!({})).unwrap_err();
    assert!(err.to_string().contains("missing model weights"));
}

#[test]
fn staged_module_is_invisible_from_another_root() {
    let (_dir, catalog) = staged_tree();
    let other = tempfile::tempdir().unwrap();
    let err = EntrypointResolver::new(Arc::new(catalog))
        .resolve(other.path(), "tools.math:Doubler")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModuleLoadError);
}

#[tokio::test]
async fn runner_runs_on_blocking_pool() {
    let (dir, catalog) = staged_tree();
    let runner = Runner::new(
        EntrypointResolver::new(Arc::new(catalog)),
        Arc::new(DirectInvoker),
    );
    let a = agent("math", None, Some("tools.math:Doubler"));

    let out = runner
        .run(&a, json_map(json!({"x": 1.5})), dir.path())
        .await
        .unwrap();
    assert_eq!(out.get("doubled"), Some(&json!(3.0)));
}

#[tokio::test]
async fn runner_without_entrypoint_is_rejected() {
    let (dir, catalog) = staged_tree();
    let runner = Runner::new(
        EntrypointResolver::new(Arc::new(catalog)),
        Arc::new(DirectInvoker),
    );
    let a = agent("math", None, None);

    let err = runner.run(&a, JsonMap::new(), dir.path()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoEntrypoint);
}

#[tokio::test]
async fn runner_deadline_reports_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = CatalogLoader::new().with_builtin(
        "slow",
        ModuleDef::new().with(
            "sleep",
            Unit::function(|_: &JsonMap| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(json!({}))
            }),
        ),
    );
    let runner = Runner::new(
        EntrypointResolver::new(Arc::new(catalog)),
        Arc::new(DirectInvoker),
    )
    .with_timeout(Some(Duration::from_millis(20)));
    let a = agent("slow", None, Some("slow:sleep"));

    let err = runner.run(&a, JsonMap::new(), dir.path()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AgentExecutionError);
    assert!(err.to_string().contains("timeout after 20 ms"));
}
