//! Dotted-path module registry
//!
//! Every importable module is a flat table of members keyed by its dotted path (`os.path`,
//! `datasets.entertainment`). A submodule is also a member of its parent, so `os.path.join` resolves through
//! `os` -> `path` -> `join` at access time. Patches rewrite members in place; see [`super::mock`].

use std::rc::Rc;

use indexmap::IndexMap;

use crate::runtime::value::Value;

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: IndexMap<String, IndexMap<String, Value>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or extend) the module at `path`, creating parent modules as needed.
    pub fn register<I, K>(&mut self, path: &str, members: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.ensure_module(path);
        if let Some(table) = self.modules.get_mut(path) {
            table.extend(members.into_iter().map(|(k, v)| (k.into(), v)));
        }
    }

    /// Make `alias` import the same members as `path` (e.g. `unittest.mock` for `mock`).
    pub fn alias(&mut self, alias: &str, path: &str) {
        let members = self.modules.get(path).cloned().unwrap_or_default();
        self.register(alias, members);
    }

    fn ensure_module(&mut self, path: &str) {
        if self.modules.contains_key(path) {
            return;
        }
        self.modules.insert(path.to_string(), IndexMap::new());
        if let Some((parent, child)) = path.rsplit_once('.') {
            self.ensure_module(parent);
            if let Some(table) = self.modules.get_mut(parent) {
                table
                    .entry(child.to_string())
                    .or_insert_with(|| Value::Module(Rc::from(path)));
            }
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }

    pub fn get_attr(&self, module: &str, name: &str) -> Option<Value> {
        self.modules.get(module)?.get(name).cloned()
    }

    /// Replace an existing member, returning the previous value; `None` when the member does not exist.
    pub(crate) fn replace(&mut self, module: &str, name: &str, value: Value) -> Option<Value> {
        let slot = self.modules.get_mut(module)?.get_mut(name)?;
        Some(std::mem::replace(slot, value))
    }

    /// Split `a.b.c` into the module `a.b` and member `c`, if both exist.
    pub fn resolve<'a>(&self, target: &'a str) -> Option<(&'a str, &'a str)> {
        let (module, name) = target.rsplit_once('.')?;
        self.modules.get(module)?.get(name)?;
        Some((module, name))
    }

    /// Registered module paths, in registration order.
    pub fn module_paths(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_creates_parents() {
        let mut registry = ModuleRegistry::new();
        registry.register("datasets.entertainment", [("get_movielens", Value::None)]);
        assert!(registry.contains("datasets"));
        assert!(matches!(
            registry.get_attr("datasets", "entertainment"),
            Some(Value::Module(ref p)) if &**p == "datasets.entertainment"
        ));
    }

    #[test]
    fn test_resolve_requires_existing_member() {
        let mut registry = ModuleRegistry::new();
        registry.register("os", [("getenv", Value::None)]);
        assert_eq!(registry.resolve("os.getenv"), Some(("os", "getenv")));
        assert_eq!(registry.resolve("os.missing"), None);
        assert_eq!(registry.resolve("nope.getenv"), None);
        assert_eq!(registry.resolve("os"), None);
    }

    #[test]
    fn test_replace_returns_previous() {
        let mut registry = ModuleRegistry::new();
        registry.register("m", [("x", Value::Int(1))]);
        let old = registry.replace("m", "x", Value::Int(2));
        assert!(matches!(old, Some(Value::Int(1))));
        assert!(matches!(registry.get_attr("m", "x"), Some(Value::Int(2))));
        assert!(registry.replace("m", "y", Value::None).is_none());
    }

    #[test]
    fn test_alias_copies_members() {
        let mut registry = ModuleRegistry::new();
        registry.register("mock", [("patch", Value::None)]);
        registry.alias("unittest.mock", "mock");
        assert!(registry.get_attr("unittest.mock", "patch").is_some());
        assert!(registry.contains("unittest"));
    }
}
