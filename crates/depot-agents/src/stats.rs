//! Summary statistics over a list of numbers.

use anyhow::{anyhow, bail};
use depot_core::Agent;
use depot_state::JsonMap;
use serde_json::{json, Value};
use tracing::debug;

/// `values: [number]` → `count`, `mean`, `min`, `max`, `values`.
///
/// Nulls are skipped. Numeric strings and booleans are coerced; anything
/// else is an error, as is a list with no numeric entries.
#[derive(Debug, Default)]
pub struct StatsDemoAgent;

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

impl Agent for StatsDemoAgent {
    fn run(&self, inputs: &JsonMap) -> anyhow::Result<Value> {
        let raw = match inputs.get("values") {
            None => return Err(anyhow!("No numeric values provided in 'values'")),
            Some(Value::Array(items)) => items,
            Some(_) => bail!("Expected 'values' to be a list"),
        };

        let mut values = Vec::with_capacity(raw.len());
        for v in raw.iter().filter(|v| !v.is_null()) {
            let n = as_number(v).ok_or_else(|| anyhow!("Non-numeric value in 'values': {v}"))?;
            values.push(n);
        }
        let skipped = raw.len() - values.len();
        if skipped > 0 {
            debug!(skipped, "ignored null entries in 'values'");
        }
        if values.is_empty() {
            bail!("No numeric values provided in 'values'");
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(json!({
            "count": count,
            "mean": mean,
            "min": min,
            "max": max,
            "values": values,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(inputs: Value) -> anyhow::Result<Value> {
        let Value::Object(map) = inputs else {
            panic!("inputs must be an object")
        };
        StatsDemoAgent.run(&map)
    }

    #[test]
    fn computes_summary() {
        let out = run(json!({"values": [1, 2, 3]})).unwrap();
        assert_eq!(
            out,
            json!({"count": 3, "mean": 2.0, "min": 1.0, "max": 3.0, "values": [1.0, 2.0, 3.0]})
        );
    }

    #[test]
    fn skips_nulls_and_coerces_strings() {
        let out = run(json!({"values": [null, "4", 2.0]})).unwrap();
        assert_eq!(out["count"], json!(2));
        assert_eq!(out["mean"], json!(3.0));
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(run(json!({"values": "1,2"})).is_err());
        assert!(run(json!({"values": []})).is_err());
        assert!(run(json!({"values": [null]})).is_err());
        assert!(run(json!({})).is_err());

        let err = run(json!({"values": [1, "x"]})).unwrap_err();
        assert!(err.to_string().contains("Non-numeric"));
    }
}
