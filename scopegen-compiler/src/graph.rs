//! Eager-edge cycle validation.
//!
//! Runs over a finished [`CompiledScope`] before it is handed out. An eager
//! edge means "creating this slot reads that slot immediately":
//! - cached slot → its `Slot` arguments, and its provider holder
//! - alias → its target
//!
//! Lazy arguments and whatever factories and injectors read are deferred
//! until call time, so they never close a cycle.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, trace, warn};

use crate::error::{CircularDependencyError, CompileError, Result};
use crate::plan::CompiledScope;

/// DFS over the eager edges of a plan.
pub struct GraphValidator<'a> {
    /// Slot identifiers in emission order
    order: Vec<&'a str>,
    /// Eager edges per slot
    edges: HashMap<&'a str, Vec<&'a str>>,
    /// Currently being visited (for cycle detection)
    visiting: HashSet<&'a str>,
    /// Already validated (cache)
    validated: HashSet<&'a str>,
    /// Current DFS path (for error reporting)
    path: Vec<&'a str>,
}

impl<'a> GraphValidator<'a> {
    pub fn new(plan: &'a CompiledScope) -> Self {
        let slots = plan.emission_order();
        let order = slots.iter().map(|slot| slot.identifier()).collect();
        let edges = slots
            .iter()
            .map(|slot| (slot.identifier(), slot.eager_dependencies()))
            .collect();

        Self {
            order,
            edges,
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
        }
    }

    /// Checks every slot, in emission order.
    ///
    /// # Errors
    /// [`CompileError::CircularDependency`] with the full chain, e.g.
    /// `a → b → a`.
    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(&mut self) -> Result<()> {
        debug!(slot_count = self.order.len(), "Starting cycle validation");

        let order = self.order.clone();
        for slot in order {
            self.visit(slot)?;
        }

        debug!("Cycle validation passed");
        Ok(())
    }

    fn visit(&mut self, slot: &'a str) -> Result<()> {
        if self.validated.contains(slot) {
            return Ok(());
        }

        if self.visiting.contains(slot) {
            let cycle_start = self.path.iter().position(|s| *s == slot).unwrap_or(0);
            let mut chain: Vec<String> = self.path[cycle_start..]
                .iter()
                .map(|s| s.to_string())
                .collect();
            chain.push(slot.to_string());

            warn!(cycle = ?chain, "Circular dependency detected");
            return Err(CompileError::CircularDependency(CircularDependencyError {
                chain,
            }));
        }

        let Some(deps) = self.edges.get(slot).cloned() else {
            // Not a slot of this plan; nothing to follow.
            trace!(slot = %slot, "Edge leaves the plan");
            self.validated.insert(slot);
            return Ok(());
        };

        self.visiting.insert(slot);
        self.path.push(slot);

        for dep in deps {
            self.visit(dep)?;
        }

        self.path.pop();
        self.visiting.remove(slot);
        self.validated.insert(slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{AliasSlot, Argument, CachedSlot, Recipe};

    fn cached(identifier: &str, args: Vec<Argument>) -> CachedSlot {
        CachedSlot {
            ordinal: 0,
            identifier: identifier.to_string(),
            declared: identifier.to_string(),
            descriptor: identifier.to_string(),
            recipe: Recipe::Constructor {
                ty: identifier.into(),
            },
            arguments: args,
            close_on_teardown: false,
        }
    }

    fn slot(identifier: &str) -> Argument {
        Argument::Slot {
            identifier: identifier.to_string(),
        }
    }

    fn lazy(identifier: &str) -> Argument {
        Argument::Lazy {
            identifier: identifier.to_string(),
        }
    }

    fn plan(cached: Vec<CachedSlot>) -> CompiledScope {
        CompiledScope {
            package: String::new(),
            scope_name: "TestScope".to_string(),
            values: Vec::new(),
            aliases: Vec::new(),
            cached,
            factories: Vec::new(),
            injectors: Vec::new(),
        }
    }

    #[test]
    fn acyclic_plan_passes() {
        let plan = plan(vec![
            cached("a", vec![slot("b"), slot("c")]),
            cached("b", vec![slot("c")]),
            cached("c", vec![]),
        ]);
        assert!(GraphValidator::new(&plan).validate().is_ok());
    }

    #[test]
    fn direct_cycle_detected() {
        let plan = plan(vec![cached("a", vec![slot("b")]), cached("b", vec![slot("a")])]);
        match GraphValidator::new(&plan).validate() {
            Err(CompileError::CircularDependency(e)) => {
                assert_eq!(e.chain, vec!["a", "b", "a"]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn self_cycle_detected() {
        let plan = plan(vec![cached("a", vec![slot("a")])]);
        match GraphValidator::new(&plan).validate() {
            Err(CompileError::CircularDependency(e)) => {
                assert_eq!(e.chain, vec!["a", "a"]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn lazy_edge_breaks_cycle() {
        let plan = plan(vec![cached("a", vec![slot("b")]), cached("b", vec![lazy("a")])]);
        assert!(GraphValidator::new(&plan).validate().is_ok());
    }

    #[test]
    fn cycle_through_alias() {
        let mut plan = plan(vec![cached("impl", vec![slot("iface")])]);
        plan.aliases.push(AliasSlot {
            identifier: "iface".to_string(),
            declared: "Iface".to_string(),
            descriptor: "Iface".to_string(),
            target: "impl".to_string(),
        });
        match GraphValidator::new(&plan).validate() {
            Err(CompileError::CircularDependency(e)) => {
                assert_eq!(e.chain, vec!["iface", "impl", "iface"]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }
}
