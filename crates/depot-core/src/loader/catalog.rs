//! Compiled module table standing in for dynamic loading.
//!
//! A [`CatalogLoader`] knows two kinds of modules:
//! - staged modules, which load only when the module is present in the
//!   staged tree of the current [`LoaderContext`]
//! - builtin modules, which are always loadable (the counterpart of an
//!   installed package), regardless of the staged root
//!
//! When both are registered under one name and the staged tree holds the
//! module, the staged registration wins.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use super::unit::Unit;
use super::{module_segments, LoaderContext, ModuleLoader};
use crate::domain::error::{DepotError, Result};

/// Attributes exported by one module.
#[derive(Debug, Clone, Default)]
pub struct ModuleDef {
    attrs: HashMap<String, Unit>,
}

impl ModuleDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute registration.
    pub fn with(mut self, name: impl Into<String>, unit: Unit) -> Self {
        self.attrs.insert(name.into(), unit);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, unit: Unit) {
        self.attrs.insert(name.into(), unit);
    }

    pub fn get(&self, name: &str) -> Option<&Unit> {
        self.attrs.get(name)
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attrs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Found in the staged tree at this path.
    Staged(PathBuf),
    Builtin,
}

/// A module after loading.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub name: String,
    pub origin: ModuleOrigin,
    def: ModuleDef,
}

impl LoadedModule {
    pub fn attr(&self, name: &str) -> Option<Unit> {
        self.def.get(name).cloned()
    }

    pub fn def(&self) -> &ModuleDef {
        &self.def
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogLoader {
    staged: HashMap<String, ModuleDef>,
    builtin: HashMap<String, ModuleDef>,
}

impl CatalogLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module that must be present in the staged tree.
    pub fn with_staged(mut self, module_ref: impl Into<String>, def: ModuleDef) -> Self {
        self.staged.insert(module_ref.into(), def);
        self
    }

    /// Register a module that loads independently of the staged tree.
    pub fn with_builtin(mut self, module_ref: impl Into<String>, def: ModuleDef) -> Self {
        self.builtin.insert(module_ref.into(), def);
        self
    }

    /// Merge another catalog into this one; entries of `other` win.
    pub fn merge(mut self, other: CatalogLoader) -> Self {
        self.staged.extend(other.staged);
        self.builtin.extend(other.builtin);
        self
    }

    pub fn module_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .staged
            .keys()
            .chain(self.builtin.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl ModuleLoader for CatalogLoader {
    fn load(&self, ctx: &LoaderContext, module_ref: &str) -> Result<LoadedModule> {
        module_segments(module_ref)?;

        if let Some(path) = ctx.locate(module_ref)? {
            if let Some(def) = self.staged.get(module_ref) {
                debug!(module = %module_ref, path = %path.display(), "loaded staged module");
                return Ok(LoadedModule {
                    name: module_ref.to_string(),
                    origin: ModuleOrigin::Staged(path),
                    def: def.clone(),
                });
            }
            if !self.builtin.contains_key(module_ref) {
                return Err(DepotError::ModuleLoad {
                    module: module_ref.to_string(),
                    reason: format!(
                        "found at {} but no implementation is registered for it",
                        path.display()
                    ),
                });
            }
        }

        if let Some(def) = self.builtin.get(module_ref) {
            debug!(module = %module_ref, "loaded builtin module");
            return Ok(LoadedModule {
                name: module_ref.to_string(),
                origin: ModuleOrigin::Builtin,
                def: def.clone(),
            });
        }

        Err(DepotError::ModuleLoad {
            module: module_ref.to_string(),
            reason: format!("no module named '{}' under {}", module_ref, ctx.root().display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;
    use depot_state::JsonMap;
    use serde_json::json;

    fn unit(tag: &'static str) -> Unit {
        Unit::function(move |_: &JsonMap| Ok(json!({ "from": tag })))
    }

    fn staged_tree(module_file: &str) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("pkg")).unwrap();
        std::fs::write(root.path().join("pkg").join(module_file), "").unwrap();
        root
    }

    #[test]
    fn staged_module_requires_file() {
        let catalog =
            CatalogLoader::new().with_staged("pkg.mod", ModuleDef::new().with("Run", unit("a")));

        let present = staged_tree("mod.rs");
        let loaded = catalog
            .load(&LoaderContext::new(present.path()), "pkg.mod")
            .unwrap();
        assert!(matches!(loaded.origin, ModuleOrigin::Staged(_)));
        assert!(loaded.attr("Run").is_some());

        let empty = tempfile::tempdir().unwrap();
        let err = catalog
            .load(&LoaderContext::new(empty.path()), "pkg.mod")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModuleLoadError);
    }

    #[test]
    fn present_but_unregistered_module_fails() {
        let catalog = CatalogLoader::new();
        let root = staged_tree("other.py");
        let err = catalog
            .load(&LoaderContext::new(root.path()), "pkg.other")
            .unwrap_err();
        assert!(err.to_string().contains("no implementation"));
    }

    #[test]
    fn builtin_loads_from_any_root() {
        let catalog = CatalogLoader::new()
            .with_builtin("agents_demo.greeter", ModuleDef::new().with("greet", unit("b")));
        let empty = tempfile::tempdir().unwrap();
        let loaded = catalog
            .load(&LoaderContext::new(empty.path()), "agents_demo.greeter")
            .unwrap();
        assert_eq!(loaded.origin, ModuleOrigin::Builtin);
    }

    #[test]
    fn staged_file_does_not_shadow_builtin() {
        let catalog = CatalogLoader::new()
            .with_builtin("pkg.stats", ModuleDef::new().with("Run", unit("builtin")));
        let root = staged_tree("stats.py");
        let loaded = catalog
            .load(&LoaderContext::new(root.path()), "pkg.stats")
            .unwrap();
        assert_eq!(loaded.origin, ModuleOrigin::Builtin);
    }

    #[test]
    fn staged_registration_wins_over_builtin() {
        let catalog = CatalogLoader::new()
            .with_builtin("pkg.mod", ModuleDef::new().with("Run", unit("builtin")))
            .with_staged("pkg.mod", ModuleDef::new().with("Run", unit("staged")));

        let present = staged_tree("mod.rs");
        let loaded = catalog
            .load(&LoaderContext::new(present.path()), "pkg.mod")
            .unwrap();
        assert!(matches!(loaded.origin, ModuleOrigin::Staged(_)));

        let empty = tempfile::tempdir().unwrap();
        let loaded = catalog
            .load(&LoaderContext::new(empty.path()), "pkg.mod")
            .unwrap();
        assert_eq!(loaded.origin, ModuleOrigin::Builtin);
    }

    #[test]
    fn contexts_are_isolated_per_root() {
        // Same module name staged in two trees; only the tree that holds the
        // file can load it.
        let catalog =
            CatalogLoader::new().with_staged("pkg.mod", ModuleDef::new().with("Run", unit("a")));
        let with_module = staged_tree("mod.rs");
        let without = tempfile::tempdir().unwrap();

        assert!(catalog
            .load(&LoaderContext::new(with_module.path()), "pkg.mod")
            .is_ok());
        assert!(catalog
            .load(&LoaderContext::new(without.path()), "pkg.mod")
            .is_err());
        assert!(catalog
            .load(&LoaderContext::new(with_module.path()), "pkg.mod")
            .is_ok());
    }

    #[test]
    fn module_names_are_sorted_and_unique() {
        let catalog = CatalogLoader::new()
            .with_staged("b.mod", ModuleDef::new())
            .with_builtin("a.mod", ModuleDef::new())
            .with_builtin("b.mod", ModuleDef::new());
        assert_eq!(catalog.module_names(), vec!["a.mod", "b.mod"]);
    }
}
