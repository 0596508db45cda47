//! Domain models for Agent Depot.
//!
//! - `EntrypointRef`: parsed `module:attr` reference
//! - `RunRequest` / `RunResult`: ephemeral invocation input and output
//! - `ValidationOutcome`: result of a smoke validation
//! - `DepotError`: the error taxonomy

pub mod entrypoint;
pub mod error;
pub mod run;
pub mod validation;

pub use entrypoint::EntrypointRef;
pub use error::{DepotError, ErrorClass, ErrorKind, Result};
pub use run::{RunRequest, RunResult};
pub use validation::ValidationOutcome;
