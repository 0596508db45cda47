//! Demo agents for Agent Depot.
//!
//! Every agent is registered as a builtin module under `agents_demo.*`, so
//! it resolves from any staged tree (including the empty directories
//! produced in skip-VCS mode).
//!
//! | Entrypoint | Kind |
//! |------------|------|
//! | `agents_demo.stats_agent:StatsDemoAgent` | class |
//! | `agents_demo.chemical_parser:ChemicalFormulaParserAgent` | class |
//! | `agents_demo.ml_classifier:SimpleMLClassifierAgent` | class |
//! | `agents_demo.materials_screening:MaterialsScreeningAgent` | class |
//! | `agents_demo.greeter:greet` | function |

pub mod chemical;
pub mod classifier;
pub mod greeter;
pub mod screening;
pub mod stats;

use depot_core::{AgentObject, CatalogLoader, ModuleDef, Unit};

pub use chemical::ChemicalFormulaParserAgent;
pub use classifier::SimpleMLClassifierAgent;
pub use greeter::greet;
pub use screening::MaterialsScreeningAgent;
pub use stats::StatsDemoAgent;

pub const STATS_MODULE: &str = "agents_demo.stats_agent";
pub const CHEMICAL_MODULE: &str = "agents_demo.chemical_parser";
pub const CLASSIFIER_MODULE: &str = "agents_demo.ml_classifier";
pub const SCREENING_MODULE: &str = "agents_demo.materials_screening";
pub const GREETER_MODULE: &str = "agents_demo.greeter";

/// Catalog with every demo agent registered as a builtin module.
pub fn demo_catalog() -> CatalogLoader {
    CatalogLoader::new()
        .with_builtin(
            STATS_MODULE,
            ModuleDef::new().with("StatsDemoAgent", Unit::class::<StatsDemoAgent>()),
        )
        .with_builtin(
            CHEMICAL_MODULE,
            ModuleDef::new().with(
                "ChemicalFormulaParserAgent",
                Unit::class_with(|| {
                    let agent = ChemicalFormulaParserAgent::new()?;
                    Ok(Box::new(agent) as Box<dyn AgentObject>)
                }),
            ),
        )
        .with_builtin(
            CLASSIFIER_MODULE,
            ModuleDef::new().with(
                "SimpleMLClassifierAgent",
                Unit::class::<SimpleMLClassifierAgent>(),
            ),
        )
        .with_builtin(
            SCREENING_MODULE,
            ModuleDef::new().with(
                "MaterialsScreeningAgent",
                Unit::class::<MaterialsScreeningAgent>(),
            ),
        )
        .with_builtin(GREETER_MODULE, ModuleDef::new().with("greet", Unit::function(greet)))
}
