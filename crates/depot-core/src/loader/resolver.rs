use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use super::unit::Unit;
use super::{LoaderContext, ModuleLoader};
use crate::domain::entrypoint::EntrypointRef;
use crate::domain::error::{DepotError, Result};

/// Resolves `module:attr` references against a staged directory.
#[derive(Clone)]
pub struct EntrypointResolver {
    loader: Arc<dyn ModuleLoader>,
}

impl EntrypointResolver {
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self { loader }
    }

    /// Parse the reference, load its module from a context scoped to
    /// `staged_path`, and return the named attribute.
    ///
    /// The reference is parsed before anything is loaded, so a malformed
    /// entrypoint never touches the loader.
    #[instrument(skip(self), fields(staged_path = %staged_path.display()))]
    pub fn resolve(&self, staged_path: &Path, entrypoint: &str) -> Result<Unit> {
        let ep = EntrypointRef::parse(entrypoint)?;
        let ctx = LoaderContext::new(staged_path);
        let module = self.loader.load(&ctx, &ep.module)?;

        let unit = module
            .attr(&ep.attribute)
            .ok_or_else(|| DepotError::AttributeNotFound {
                module: ep.module.clone(),
                attribute: ep.attribute.clone(),
            })?;
        debug!(entrypoint = %ep, kind = %unit.kind(), "entrypoint resolved");
        Ok(unit)
    }
}
