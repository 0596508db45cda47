//! Entrypoint references of the form `module_reference:attribute_name`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{DepotError, Result};

/// A parsed entrypoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntrypointRef {
    /// Dotted module reference, e.g. `pkg.mod`
    pub module: String,
    /// Attribute looked up on the loaded module, e.g. `StatsAgent`
    pub attribute: String,
}

impl EntrypointRef {
    /// Split on the first `:` and trim both halves.
    ///
    /// Fails with `MalformedEntrypoint` when the separator is missing or
    /// either half is empty after trimming.
    pub fn parse(raw: &str) -> Result<Self> {
        let malformed = || DepotError::MalformedEntrypoint {
            entrypoint: raw.to_string(),
        };

        let (module, attribute) = raw.split_once(':').ok_or_else(malformed)?;
        let module = module.trim();
        let attribute = attribute.trim();
        if module.is_empty() || attribute.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            module: module.to_string(),
            attribute: attribute.to_string(),
        })
    }
}

impl fmt::Display for EntrypointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.attribute)
    }
}

impl std::str::FromStr for EntrypointRef {
    type Err = DepotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
