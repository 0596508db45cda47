//! Chemical formula atom counting.

use std::collections::BTreeMap;

use anyhow::anyhow;
use depot_core::Agent;
use depot_state::JsonMap;
use regex::Regex;
use serde_json::{json, Value};

const ELEMENT_PATTERN: &str = r"([A-Z][a-z]?)(\d*)";

/// `formula: string` → `formula`, `counts` (element → atom count).
///
/// Flat formulas only; parentheses and hydrates are not expanded.
#[derive(Debug)]
pub struct ChemicalFormulaParserAgent {
    pattern: Regex,
}

impl ChemicalFormulaParserAgent {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            pattern: Regex::new(ELEMENT_PATTERN)?,
        })
    }

    pub fn count_atoms(&self, formula: &str) -> anyhow::Result<BTreeMap<String, u64>> {
        let mut counts = BTreeMap::new();
        for cap in self.pattern.captures_iter(formula) {
            let element = cap[1].to_string();
            let n = match &cap[2] {
                "" => 1,
                digits => digits
                    .parse::<u64>()
                    .map_err(|e| anyhow!("bad count for {element}: {e}"))?,
            };
            *counts.entry(element).or_insert(0) += n;
        }
        Ok(counts)
    }
}

impl Agent for ChemicalFormulaParserAgent {
    fn run(&self, inputs: &JsonMap) -> anyhow::Result<Value> {
        let formula = inputs
            .get("formula")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Expected 'formula' to be a string"))?;
        let counts = self.count_atoms(formula)?;
        Ok(json!({ "formula": formula, "counts": counts }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_repeated_elements() {
        let agent = ChemicalFormulaParserAgent::new().unwrap();
        let counts = agent.count_atoms("CH3COOH").unwrap();
        assert_eq!(counts.get("C"), Some(&2));
        assert_eq!(counts.get("H"), Some(&4));
        assert_eq!(counts.get("O"), Some(&2));
    }

    #[test]
    fn run_requires_string_formula() {
        let agent = ChemicalFormulaParserAgent::new().unwrap();
        let mut inputs = JsonMap::new();
        inputs.insert("formula".to_string(), json!(42));
        assert!(agent.run(&inputs).is_err());

        inputs.insert("formula".to_string(), json!("NaCl"));
        let out = agent.run(&inputs).unwrap();
        assert_eq!(out["counts"], json!({"Cl": 1, "Na": 1}));
    }
}
