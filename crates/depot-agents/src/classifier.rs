//! Toy binary classifier over numeric features.

use anyhow::anyhow;
use depot_core::Agent;
use depot_state::JsonMap;
use serde_json::{json, Value};

/// `features: [number]` → `score` (mean), `label` (`class A` when the
/// score is positive, else `class B`). No features scores 0.
#[derive(Debug, Default)]
pub struct SimpleMLClassifierAgent;

impl Agent for SimpleMLClassifierAgent {
    fn run(&self, inputs: &JsonMap) -> anyhow::Result<Value> {
        let features = match inputs.get("features") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| anyhow!("Expected 'features' to be a list of numbers"))?,
            Some(_) => return Err(anyhow!("Expected 'features' to be a list of numbers")),
        };

        let score = features.iter().sum::<f64>() / features.len().max(1) as f64;
        let label = if score > 0.0 { "class A" } else { "class B" };
        Ok(json!({ "score": score, "label": label }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(features: Value) -> JsonMap {
        let mut map = JsonMap::new();
        map.insert("features".to_string(), features);
        map
    }

    #[test]
    fn labels_by_mean_sign() {
        let out = SimpleMLClassifierAgent.run(&inputs(json!([1, 2, -0.5]))).unwrap();
        assert_eq!(out["label"], json!("class A"));

        let out = SimpleMLClassifierAgent.run(&inputs(json!([-1, -2]))).unwrap();
        assert_eq!(out["label"], json!("class B"));
        assert_eq!(out["score"], json!(-1.5));
    }

    #[test]
    fn empty_features_score_zero() {
        let out = SimpleMLClassifierAgent.run(&JsonMap::new()).unwrap();
        assert_eq!(out, json!({"score": 0.0, "label": "class B"}));
    }

    #[test]
    fn rejects_non_numeric_features() {
        assert!(SimpleMLClassifierAgent.run(&inputs(json!(["a"]))).is_err());
        assert!(SimpleMLClassifierAgent.run(&inputs(json!(3))).is_err());
    }
}
