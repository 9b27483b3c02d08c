//! Mock substitution
//!
//! A patch swaps one module member (`datasets.entertainment.get_movielens`) for a substitute and remembers the
//! original so it can be put back. [`PatchLedger`] tracks every active patch of a session; the harness tears the
//! ledger down when the session closes, so a patch never outlives the notebook that started it.
//!
//! Cell code reaches this layer through the `mock` module:
//!
//! ```text
//! from mock import patch
//! p1 = patch("datasets.entertainment.get_movielens", return_value=[train, valid])
//! p1.start()
//! ```

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use cellbook_core::ErrorKind;
use indexmap::IndexMap;

use super::registry::ModuleRegistry;
use crate::runtime::Interpreter;
use crate::runtime::errors::{RuntimeError, RuntimeResult};
use crate::runtime::object::{Args, HostObject};
use crate::runtime::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId(u64);

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "patch#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MockError {
    #[error("cannot patch '{target}': no such module member")]
    UnknownTarget { target: String },

    #[error("{id} is not active")]
    NotActive { id: PatchId },

    #[error("cannot restore '{target}' for {id}: {newer} still shadows it")]
    RestoreConflict { target: String, id: PatchId, newer: PatchId },
}

impl MockError {
    /// The error cell code sees when a patch operation fails.
    pub fn to_runtime(&self) -> RuntimeError {
        let kind = match self {
            MockError::UnknownTarget { .. } => ErrorKind::AttributeError,
            MockError::NotActive { .. } | MockError::RestoreConflict { .. } => ErrorKind::RuntimeError,
        };
        RuntimeError::new(kind, self.to_string())
    }
}

#[derive(Debug)]
struct ActivePatch {
    target: String,
    module: String,
    member: String,
    original: Value,
}

/// Active patches of one session, oldest first.
#[derive(Debug, Default)]
pub struct PatchLedger {
    next_id: u64,
    active: IndexMap<PatchId, ActivePatch>,
    order: Vec<(PatchId, String)>,
}

impl PatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(
        &mut self,
        registry: &mut ModuleRegistry,
        target: &str,
        substitute: Value,
    ) -> Result<PatchId, MockError> {
        let unknown = || MockError::UnknownTarget {
            target: target.to_string(),
        };
        let (module, member) = registry.resolve(target).ok_or_else(unknown)?;
        let (module, member) = (module.to_string(), member.to_string());
        let original = registry.replace(&module, &member, substitute).ok_or_else(unknown)?;

        self.next_id += 1;
        let id = PatchId(self.next_id);
        tracing::debug!(%id, member = %target, "patch started");
        self.active.insert(
            id,
            ActivePatch {
                target: target.to_string(),
                module,
                member,
                original,
            },
        );
        self.order.push((id, target.to_string()));
        Ok(id)
    }

    /// Restore the original member. Only the newest patch of a target may be stopped.
    pub fn stop(&mut self, registry: &mut ModuleRegistry, id: PatchId) -> Result<(), MockError> {
        let Some(patch) = self.active.get(&id) else {
            return Err(MockError::NotActive { id });
        };
        let newer = self
            .order
            .iter()
            .rev()
            .take_while(|(other, _)| *other != id)
            .find(|(_, target)| *target == patch.target);
        if let Some((newer, target)) = newer {
            return Err(MockError::RestoreConflict {
                target: target.clone(),
                id,
                newer: *newer,
            });
        }

        let Some(patch) = self.active.shift_remove(&id) else {
            return Err(MockError::NotActive { id });
        };
        self.order.retain(|(other, _)| *other != id);
        registry.replace(&patch.module, &patch.member, patch.original);
        tracing::debug!(%id, member = %patch.target, "patch stopped");
        Ok(())
    }

    pub fn is_active(&self, id: PatchId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn active(&self) -> &[(PatchId, String)] {
        &self.order
    }

    /// Stop every active patch, newest first, collecting every failure.
    pub fn teardown(&mut self, registry: &mut ModuleRegistry) -> Vec<MockError> {
        let mut failures = Vec::new();
        let ids: Vec<PatchId> = self.order.iter().rev().map(|(id, _)| *id).collect();
        for id in ids {
            if let Err(e) = self.stop(registry, id) {
                tracing::error!(%id, error = %e, "failed to restore patch");
                failures.push(e);
            }
        }
        failures
    }
}

/// What `patch(...)` returns in cell code.
#[derive(Debug)]
pub struct Patcher {
    target: String,
    substitute: Value,
    calls: Rc<Cell<usize>>,
    id: Cell<Option<PatchId>>,
}

impl Patcher {
    fn new(target: String, args: &Args) -> RuntimeResult<Self> {
        let calls = Rc::new(Cell::new(0));
        let substitute = match (args.named.get("new"), args.named.get("return_value")) {
            (Some(_), Some(_)) => {
                return Err(RuntimeError::type_error(
                    "patch() accepts either new= or return_value=, not both",
                ));
            }
            (Some(new), None) => new.clone(),
            (None, return_value) => {
                let result = return_value.cloned().unwrap_or(Value::None);
                let counter = Rc::clone(&calls);
                let name = target.rsplit('.').next().unwrap_or(&target).to_string();
                Value::native(name, move |_, _| {
                    counter.set(counter.get() + 1);
                    Ok(result.clone())
                })
            }
        };
        Ok(Self {
            target,
            substitute,
            calls,
            id: Cell::new(None),
        })
    }

    fn start(&self, interp: &mut Interpreter) -> RuntimeResult<Value> {
        if self.id.get().is_some() {
            return Err(RuntimeError::new(
                ErrorKind::RuntimeError,
                format!("patch of '{}' is already started", self.target),
            ));
        }
        let id = interp
            .start_patch(&self.target, self.substitute.clone())
            .map_err(|e| e.to_runtime())?;
        self.id.set(Some(id));
        Ok(self.substitute.clone())
    }

    fn stop(&self, interp: &mut Interpreter) -> RuntimeResult<Value> {
        let Some(id) = self.id.get() else {
            return Err(RuntimeError::new(
                ErrorKind::RuntimeError,
                format!("patch of '{}' is not started", self.target),
            ));
        };
        if !interp.is_patch_active(id) {
            // Torn down by the harness already
            self.id.set(None);
            return Err(MockError::NotActive { id }.to_runtime());
        }
        interp.stop_patch(id).map_err(|e| e.to_runtime())?;
        self.id.set(None);
        Ok(Value::None)
    }
}

impl HostObject for Patcher {
    fn type_name(&self) -> &str {
        "Patcher"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_attr(&self, name: &str) -> RuntimeResult<Value> {
        match name {
            "call_count" => Ok(Value::Int(self.calls.get() as i64)),
            "target" => Ok(Value::str(&self.target)),
            "new" => Ok(self.substitute.clone()),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn call_method(&self, interp: &mut Interpreter, name: &str, args: Args) -> RuntimeResult<Value> {
        args.check(name, 0, &[])?;
        match name {
            "start" => self.start(interp),
            "stop" => self.stop(interp),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn repr(&self) -> String {
        format!("<Patcher '{}'>", self.target)
    }
}

/// `patch(target, return_value=..., new=...)`
fn patch(_interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("patch", 1, &["return_value", "new"])?;
    let target = args.require("patch", 0, "target")?.expect_str("patch() target")?;
    Ok(Value::object(Patcher::new(target.to_string(), &args)?))
}

pub(crate) fn register(registry: &mut ModuleRegistry) {
    registry.register("mock", [("patch", Value::native("patch", patch))]);
    registry.alias("unittest.mock", "mock");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register("datasets.entertainment", [("get_movielens", Value::str("real"))]);
        registry
    }

    fn current(registry: &ModuleRegistry) -> String {
        registry
            .get_attr("datasets.entertainment", "get_movielens")
            .map(|v| v.to_display())
            .unwrap_or_default()
    }

    const TARGET: &str = "datasets.entertainment.get_movielens";

    #[test]
    fn test_start_and_stop_restore_original() {
        let mut registry = registry();
        let mut ledger = PatchLedger::new();
        let id = ledger.start(&mut registry, TARGET, Value::str("mock")).unwrap();
        assert_eq!(current(&registry), "mock");
        assert!(ledger.is_active(id));
        ledger.stop(&mut registry, id).unwrap();
        assert_eq!(current(&registry), "real");
        assert_eq!(ledger.stop(&mut registry, id), Err(MockError::NotActive { id }));
    }

    #[test]
    fn test_unknown_target() {
        let mut registry = registry();
        let err = PatchLedger::new()
            .start(&mut registry, "datasets.entertainment.get_imdb", Value::None)
            .unwrap_err();
        assert!(matches!(err, MockError::UnknownTarget { .. }));
        assert_eq!(err.to_runtime().kind, ErrorKind::AttributeError);
    }

    #[test]
    fn test_out_of_order_restore_is_a_conflict() {
        let mut registry = registry();
        let mut ledger = PatchLedger::new();
        let first = ledger.start(&mut registry, TARGET, Value::str("one")).unwrap();
        let second = ledger.start(&mut registry, TARGET, Value::str("two")).unwrap();
        let err = ledger.stop(&mut registry, first).unwrap_err();
        assert_eq!(
            err,
            MockError::RestoreConflict {
                target: TARGET.to_string(),
                id: first,
                newer: second
            }
        );
        assert_eq!(current(&registry), "two");
    }

    #[test]
    fn test_teardown_unwinds_newest_first() {
        let mut registry = registry();
        let mut ledger = PatchLedger::new();
        ledger.start(&mut registry, TARGET, Value::str("one")).unwrap();
        ledger.start(&mut registry, TARGET, Value::str("two")).unwrap();
        assert!(ledger.teardown(&mut registry).is_empty());
        assert_eq!(current(&registry), "real");
        assert!(ledger.active().is_empty());
    }

    #[test]
    fn test_patch_id_display() {
        assert_eq!(PatchId(3).to_string(), "patch#3");
    }
}
