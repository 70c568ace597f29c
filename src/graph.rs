use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, warn};

use crate::entity::{Model, Module};

/// Module-level dependency graph derived from model `depend_on` references.
///
/// Edges point from the dependency's owning module to the dependent's
/// owning module, i.e. in the direction data flows: if model `b` in module
/// `m2` depends on model `a` in module `m1`, the graph holds `m1 -> m2`.
/// Same-module pairs never produce an edge and parallel model pairs
/// between the same two modules collapse into one edge.
///
/// Construction never fails; unresolvable `module_id` or `depend_on`
/// references are dropped and logged.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Module ids in slot order (ascending priority, stable ties).
    order: Vec<String>,
    slots: HashMap<String, usize>,
    graph: DiGraphMap<usize, ()>,
}

impl DependencyGraph {
    /// Build from modules already sorted into slot order and the full
    /// model list.
    pub fn build(sorted_modules: &[&Module], models: &[Model]) -> Self {
        let order: Vec<String> = sorted_modules
            .iter()
            .map(|m| m.module_id.clone())
            .collect();
        let slots: HashMap<String, usize> = order
            .iter()
            .enumerate()
            .map(|(slot, id)| (id.clone(), slot))
            .collect();

        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for slot in 0..order.len() {
            graph.add_node(slot);
        }

        for model in models {
            let Some(&dependent_slot) = slots.get(&model.module_id) else {
                debug!(
                    model = %model.model_id,
                    module = %model.module_id,
                    "dropping model with unresolvable owning module"
                );
                continue;
            };

            let Some(key) = model.dependency_ref() else {
                continue;
            };

            let Some(target) = resolve_dependency(models, key) else {
                debug!(
                    model = %model.model_id,
                    depend_on = %key,
                    "dropping unmatched dependency reference"
                );
                continue;
            };

            let Some(&dependency_slot) = slots.get(&target.module_id) else {
                debug!(
                    model = %target.model_id,
                    module = %target.module_id,
                    "dropping dependency on model with unresolvable owning module"
                );
                continue;
            };

            // Sibling models in the same module never form a module edge.
            if dependency_slot == dependent_slot {
                continue;
            }

            graph.add_edge(dependency_slot, dependent_slot, ());
        }

        Self {
            order,
            slots,
            graph,
        }
    }

    /// Module ids in slot order.
    pub fn slot_order(&self) -> &[String] {
        &self.order
    }

    /// The horizontal slot of a module, if it exists.
    pub fn slot(&self, module_id: &str) -> Option<usize> {
        self.slots.get(module_id).copied()
    }

    /// Modules that `module_id` depends on (its upstream modules).
    pub fn dependencies_of(&self, module_id: &str) -> BTreeSet<&str> {
        self.neighbors(module_id, Direction::Incoming)
    }

    /// Modules that depend on `module_id` (its downstream modules).
    pub fn dependents_of(&self, module_id: &str) -> BTreeSet<&str> {
        self.neighbors(module_id, Direction::Outgoing)
    }

    /// All deduplicated module edges as `(dependency, dependent)` pairs,
    /// ordered by source slot then target slot.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(usize, usize)> = self
            .graph
            .all_edges()
            .map(|(source, target, _)| (source, target))
            .collect();
        edges.sort_unstable();
        edges
            .into_iter()
            .map(|(source, target)| {
                (self.order[source].as_str(), self.order[target].as_str())
            })
            .collect()
    }

    fn neighbors(&self, module_id: &str, direction: Direction) -> BTreeSet<&str> {
        let Some(&slot) = self.slots.get(module_id) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(slot, direction)
            .map(|neighbor| self.order[neighbor].as_str())
            .collect()
    }
}

/// Resolve a `depend_on` key against the model list.
///
/// Ids are canonical; matching by label is a deprecated compatibility shim
/// for backend records that predate stable model ids, kept isolated here
/// so it can be removed once those records are gone. First match in list
/// order wins within each pass.
fn resolve_dependency<'a>(models: &'a [Model], key: &str) -> Option<&'a Model> {
    if let Some(found) = models.iter().find(|m| m.model_id == key) {
        return Some(found);
    }

    let fallback = models.iter().find(|m| m.label == key);
    if let Some(found) = fallback {
        warn!(
            depend_on = %key,
            resolved = %found.model_id,
            "resolved dependency by label; backend should reference model ids"
        );
    }
    fallback
}
