//! Entrypoint Resolver and module loading.
//!
//! Loading is scoped: every resolve builds a [`LoaderContext`] rooted at
//! one staged directory, and nothing about that root outlives the call.
//! Two agents whose staged trees use the same module names therefore
//! never see each other's code.

pub mod catalog;
pub mod resolver;
pub mod unit;

use std::path::{Component, Path, PathBuf};

use crate::domain::error::{DepotError, Result};

pub use catalog::{CatalogLoader, LoadedModule, ModuleDef, ModuleOrigin};
pub use resolver::EntrypointResolver;
pub use unit::{Agent, AgentClass, AgentFunction, AgentObject, Unit, UnitKind, RUN_METHOD};

/// Per-call loading context rooted at a staged directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderContext {
    root: PathBuf,
}

impl LoaderContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locate a dotted module reference below the root.
    ///
    /// `a.b.c` is present when `<root>/a/b/c` is a directory or
    /// `<root>/a/b/` holds a file whose stem is `c`.
    pub fn locate(&self, module_ref: &str) -> Result<Option<PathBuf>> {
        let segments = module_segments(module_ref)?;
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => return Err(load_error(module_ref, "empty module reference")),
        };

        let mut dir = self.root.clone();
        for seg in parents {
            dir.push(seg);
        }

        let as_dir = dir.join(last);
        if as_dir.is_dir() {
            return Ok(Some(as_dir));
        }

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(None),
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.file_stem().and_then(|s| s.to_str()) == Some(*last) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

fn load_error(module_ref: &str, reason: impl Into<String>) -> DepotError {
    DepotError::ModuleLoad {
        module: module_ref.to_string(),
        reason: reason.into(),
    }
}

/// Split a dotted module reference, rejecting empty or path-like segments.
pub fn module_segments(module_ref: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = module_ref.split('.').collect();
    for seg in &segments {
        if seg.is_empty() {
            return Err(load_error(module_ref, "empty segment in module reference"));
        }
        let mut components = Path::new(seg).components();
        let single_normal = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single_normal || seg.contains(|c| c == '/' || c == '\\') {
            return Err(load_error(
                module_ref,
                format!("invalid segment {seg:?} in module reference"),
            ));
        }
    }
    Ok(segments)
}

/// Loads modules by dotted reference within a scoped context.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, ctx: &LoaderContext, module_ref: &str) -> Result<LoadedModule>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;

    #[test]
    fn locates_files_by_stem_and_packages_by_dir() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("pkg").join("sub")).unwrap();
        std::fs::write(root.path().join("pkg").join("mod.rs"), "").unwrap();

        let ctx = LoaderContext::new(root.path());
        assert_eq!(
            ctx.locate("pkg.mod").unwrap(),
            Some(root.path().join("pkg").join("mod.rs"))
        );
        assert_eq!(
            ctx.locate("pkg.sub").unwrap(),
            Some(root.path().join("pkg").join("sub"))
        );
        assert_eq!(ctx.locate("pkg.other").unwrap(), None);
        assert_eq!(ctx.locate("nowhere.mod").unwrap(), None);
    }

    #[test]
    fn rejects_bad_segments() {
        for bad in ["pkg..mod", ".pkg", "pkg.", "a/b.c"] {
            let err = module_segments(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ModuleLoadError, "{bad}");
        }
        assert_eq!(module_segments("a.b.c").unwrap(), vec!["a", "b", "c"]);
    }
}
