//! Agent Depot Core Library
//!
//! The staging and invocation pipeline behind the agent registry:
//! - `source`: materialize a repository revision on disk
//! - `staging`: one live checkout per `(agent_id, target)`
//! - `loader`: resolve `module:attr` entrypoints within a staged tree
//! - `invoke` / `runner`: call agent code and normalize its result
//! - `validator`: stage-then-smoke-run validation
//! - `depot`: the registry facade tying these to storage

pub mod config;
pub mod depot;
pub mod domain;
pub mod git;
pub mod invoke;
pub mod loader;
pub mod metrics;
pub mod obs;
pub mod runner;
pub mod source;
pub mod staging;
pub mod telemetry;
pub mod validator;

pub use config::DepotConfig;
pub use depot::Depot;
pub use domain::{
    DepotError, EntrypointRef, ErrorClass, ErrorKind, Result, RunRequest, RunResult,
    ValidationOutcome,
};
pub use invoke::{DirectInvoker, Invoker};
pub use loader::{
    Agent, AgentClass, AgentFunction, AgentObject, CatalogLoader, EntrypointResolver,
    LoaderContext, ModuleDef, ModuleLoader, Unit, UnitKind,
};
pub use runner::Runner;
pub use source::{GitSourceResolver, SourceResolver};
pub use staging::StagingCache;
pub use validator::Validator;

pub use depot_state::{
    AgentFilter, AgentRecord, AgentRegistration, CodeSource, JsonMap, StagingRecord,
    StagingStatus, SurrealHandle, ValidationStatus,
};
