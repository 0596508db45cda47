//! Random stability screening for candidate materials.

use anyhow::anyhow;
use depot_core::Agent;
use depot_state::JsonMap;
use serde_json::{json, Value};
use tracing::debug;

/// `materials: [string]` → `results: [{material, score, label}]`.
///
/// Scores are uniform in `[0, 1)`; the label thresholds are 0.75 and 0.3.
#[derive(Debug, Default)]
pub struct MaterialsScreeningAgent;

pub fn label_for(score: f64) -> &'static str {
    if score > 0.75 {
        "promising"
    } else if score > 0.3 {
        "borderline"
    } else {
        "poor"
    }
}

impl Agent for MaterialsScreeningAgent {
    fn run(&self, inputs: &JsonMap) -> anyhow::Result<Value> {
        let materials: Vec<&str> = match inputs.get("materials") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(Value::as_str)
                .collect::<Option<Vec<&str>>>()
                .ok_or_else(|| anyhow!("Expected 'materials' to be a list of strings"))?,
            Some(_) => return Err(anyhow!("Expected 'materials' to be a list of strings")),
        };

        let results: Vec<Value> = materials
            .into_iter()
            .map(|material| {
                let score = rand::random::<f64>();
                json!({ "material": material, "score": score, "label": label_for(score) })
            })
            .collect();
        debug!(screened = results.len(), "materials screened");
        Ok(json!({ "results": results }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds() {
        assert_eq!(label_for(0.9), "promising");
        assert_eq!(label_for(0.75), "borderline");
        assert_eq!(label_for(0.5), "borderline");
        assert_eq!(label_for(0.3), "poor");
    }

    #[test]
    fn scores_every_material() {
        let mut inputs = JsonMap::new();
        inputs.insert("materials".to_string(), json!(["LiFePO4", "NaCl"]));
        let out = MaterialsScreeningAgent.run(&inputs).unwrap();

        let results = out["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        for r in results {
            let score = r["score"].as_f64().unwrap();
            assert!((0.0..1.0).contains(&score));
            assert_eq!(r["label"], json!(label_for(score)));
        }
    }

    #[test]
    fn rejects_non_string_materials() {
        let mut inputs = JsonMap::new();
        inputs.insert("materials".to_string(), json!(["ok", 1]));
        assert!(MaterialsScreeningAgent.run(&inputs).is_err());
    }
}
