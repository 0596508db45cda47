//! Greeter function agent.

use anyhow::anyhow;
use depot_state::JsonMap;
use serde_json::{json, Value};

/// `name: string` (default `world`) → `greeting`.
pub fn greet(inputs: &JsonMap) -> anyhow::Result<Value> {
    let name = match inputs.get("name") {
        None | Some(Value::Null) => "world",
        Some(Value::String(s)) => s.as_str(),
        Some(_) => return Err(anyhow!("Expected 'name' to be a string")),
    };
    Ok(json!({ "greeting": format!("Hello, {name}!") }))
}
