use std::collections::HashMap;

use serde::Serialize;

use crate::entity::{Model, Module, owned_models, sorted_modules};
use crate::graph::DependencyGraph;
use crate::state::UiSnapshot;
use crate::{
    EDGE_UNIT_OFFSET, HIGH_PRIORITY_CUTOFF, MODEL_OFFSET_X, MODEL_SPACING, MODULE_SPACING,
    MODULE_Y, START_OFFSET,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Module,
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// Containment: a module to one of its own models.
    ModuleToModel,
    /// A direct model-level dependency. The layout does not emit these
    /// itself; presentation layers may construct them from the entity data.
    ModelToModel,
    /// A module-level dependency derived from model references.
    ModuleToModule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityTier {
    High,
    Normal,
}

/// A render-facing node. `id` is engine-assigned per derivation pass and
/// distinct from the backing entity id carried in `entity_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub position: Point,
    pub entity_id: String,
    pub label: String,
    pub expanded: bool,
    pub animating: bool,
    pub highlighted: bool,
}

/// A render-facing edge. The vertical offsets spread the edge bundle
/// entering or leaving a node symmetrically around its anchor point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    pub kind: EdgeKind,
    pub source_offset: f32,
    pub target_offset: f32,
    pub priority_tier: PriorityTier,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Lay out the flow graph for the given entities and UI state.
///
/// Pure and deterministic: the same inputs always produce the same node
/// ids, positions and edge set. Malformed input (a model whose owning
/// module does not exist, an unmatched `depend_on`) degrades by omission
/// rather than failing.
///
/// Output order is module nodes in slot order, then the model nodes of
/// expanded modules, then containment edges, then module dependency edges.
pub fn compute_graph(modules: &[Module], models: &[Model], ui: &UiSnapshot) -> FlowGraph {
    let sorted = sorted_modules(modules);
    let graph = DependencyGraph::build(&sorted, models);

    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut seq = 0_usize;

    let mut module_node_ids: Vec<String> = Vec::with_capacity(sorted.len());
    let mut module_positions: Vec<Point> = Vec::with_capacity(sorted.len());

    let mut cursor_x = START_OFFSET;
    for module in &sorted {
        let id = next_node_id(&mut seq);
        let position = Point {
            x: cursor_x,
            y: MODULE_Y,
        };
        cursor_x += MODULE_SPACING;

        // Callers supply either engine node ids or module ids when
        // highlighting, so both keys are honored.
        let highlighted = ui.highlighted_modules.contains(&id)
            || ui.highlighted_modules.contains(&module.module_id);

        nodes.push(GraphNode {
            id: id.clone(),
            kind: NodeKind::Module,
            position,
            entity_id: module.module_id.clone(),
            label: module.label.clone(),
            expanded: ui.expanded_modules.contains(&module.module_id),
            animating: ui.animating_nodes.contains(&module.module_id),
            highlighted,
        });
        module_node_ids.push(id);
        module_positions.push(position);
    }

    for (slot, module) in sorted.iter().enumerate() {
        if !ui.expanded_modules.contains(&module.module_id) {
            continue;
        }

        let owned = owned_models(models, &module.module_id);
        let count = owned.len() as f32;
        let base = module_positions[slot];

        for (index, model) in owned.iter().enumerate() {
            let id = next_node_id(&mut seq);
            let position = Point {
                x: base.x + MODEL_OFFSET_X,
                y: base.y + (index as f32 - (count - 1.0) / 2.0) * MODEL_SPACING,
            };

            nodes.push(GraphNode {
                id: id.clone(),
                kind: NodeKind::Model,
                position,
                entity_id: model.model_id.clone(),
                label: model.label.clone(),
                expanded: false,
                animating: ui.animating_nodes.contains(&model.model_id),
                highlighted: false,
            });
            edges.push(GraphEdge {
                id: edge_identifier(&module.module_id, &model.model_id),
                source_node_id: module_node_ids[slot].clone(),
                target_node_id: id,
                kind: EdgeKind::ModuleToModel,
                source_offset: 0.0,
                target_offset: 0.0,
                priority_tier: tier(module.priority, module.priority),
            });
        }
    }

    // Incoming fan-out assignment: for each target, sources sorted by
    // ascending priority with slot order breaking ties, mirroring the
    // outgoing rule below.
    let mut incoming: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
    for (target_slot, module) in sorted.iter().enumerate() {
        let mut sources: Vec<usize> = graph
            .dependencies_of(&module.module_id)
            .iter()
            .filter_map(|id| graph.slot(id))
            .collect();
        sources.sort_by_key(|&slot| (sorted[slot].priority, slot));

        let count = sources.len();
        for (index, &source_slot) in sources.iter().enumerate() {
            incoming.insert((source_slot, target_slot), (index, count));
        }
    }

    for (source_slot, module) in sorted.iter().enumerate() {
        let mut targets: Vec<usize> = graph
            .dependents_of(&module.module_id)
            .iter()
            .filter_map(|id| graph.slot(id))
            .collect();
        targets.sort_by_key(|&slot| (sorted[slot].priority, slot));

        let outgoing_count = targets.len();
        for (k, &target_slot) in targets.iter().enumerate() {
            let target = sorted[target_slot];
            let (in_index, in_count) = incoming[&(source_slot, target_slot)];

            edges.push(GraphEdge {
                id: edge_identifier(&module.module_id, &target.module_id),
                source_node_id: module_node_ids[source_slot].clone(),
                target_node_id: module_node_ids[target_slot].clone(),
                kind: EdgeKind::ModuleToModule,
                source_offset: fan_out_offset(k, outgoing_count),
                target_offset: fan_out_offset(in_index, in_count),
                priority_tier: tier(module.priority, target.priority),
            });
        }
    }

    FlowGraph { nodes, edges }
}

/// Stable key for an edge, usable across derivation passes.
pub fn edge_identifier(source: &str, target: &str) -> String {
    format!("{source} -> {target}")
}

fn next_node_id(seq: &mut usize) -> String {
    let id = format!("n{seq}");
    *seq += 1;
    id
}

/// The k-th of `count` edges sits at a vertical offset centered around
/// the node anchor, so a bundle fans out instead of stacking.
fn fan_out_offset(index: usize, count: usize) -> f32 {
    (index as f32 - (count as f32 - 1.0) / 2.0) * EDGE_UNIT_OFFSET
}

fn tier(source_priority: i64, target_priority: i64) -> PriorityTier {
    if source_priority <= HIGH_PRIORITY_CUTOFF || target_priority <= HIGH_PRIORITY_CUTOFF {
        PriorityTier::High
    } else {
        PriorityTier::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn module(id: &str, priority: i64) -> Module {
        Module {
            module_id: id.to_string(),
            label: id.to_string(),
            priority,
            version: "1".to_string(),
        }
    }

    fn model(id: &str, module_id: &str, priority: i64, depend_on: &str) -> Model {
        Model {
            model_id: id.to_string(),
            label: id.to_string(),
            priority,
            module_id: module_id.to_string(),
            depend_on: if depend_on.is_empty() {
                None
            } else {
                Some(depend_on.to_string())
            },
        }
    }

    fn expand_all(modules: &[Module]) -> UiSnapshot {
        UiSnapshot {
            expanded_modules: modules.iter().map(|m| m.module_id.clone()).collect(),
            ..UiSnapshot::default()
        }
    }

    #[test]
    fn modules_are_placed_in_ascending_priority_order() {
        let modules = vec![module("a", 2), module("b", 0), module("c", 1)];
        let graph = compute_graph(&modules, &[], &UiSnapshot::default());

        let order: Vec<&str> = graph.nodes.iter().map(|n| n.entity_id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);

        let xs: Vec<f32> = graph.nodes.iter().map(|n| n.position.x).collect();
        assert_eq!(
            xs,
            vec![
                START_OFFSET,
                START_OFFSET + MODULE_SPACING,
                START_OFFSET + 2.0 * MODULE_SPACING
            ]
        );
        assert!(graph.nodes.iter().all(|n| n.position.y == MODULE_Y));
    }

    #[test]
    fn fan_out_offsets_sum_to_zero() {
        // hub feeds three downstream modules.
        let modules = vec![
            module("hub", 0),
            module("d1", 1),
            module("d2", 2),
            module("d3", 3),
        ];
        let models = vec![
            model("src", "hub", 0, ""),
            model("a", "d1", 0, "src"),
            model("b", "d2", 0, "src"),
            model("c", "d3", 0, "src"),
        ];

        let graph = compute_graph(&modules, &models, &UiSnapshot::default());
        let outgoing: Vec<&GraphEdge> = graph
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::ModuleToModule)
            .collect();

        assert_eq!(outgoing.len(), 3);
        let sum: f32 = outgoing.iter().map(|e| e.source_offset).sum();
        assert_eq!(sum, 0.0);

        // Three edges spread one unit apart, centered on the anchor.
        let offsets: Vec<f32> = outgoing.iter().map(|e| e.source_offset).collect();
        assert_eq!(
            offsets,
            vec![-EDGE_UNIT_OFFSET, 0.0, EDGE_UNIT_OFFSET]
        );
    }

    #[test]
    fn incoming_offsets_are_symmetric_too() {
        // two upstream modules feed one sink.
        let modules = vec![module("u1", 0), module("u2", 1), module("sink", 2)];
        let models = vec![
            model("a", "u1", 0, ""),
            model("b", "u2", 0, ""),
            model("c", "sink", 0, "a"),
            model("d", "sink", 1, "b"),
        ];

        let graph = compute_graph(&modules, &models, &UiSnapshot::default());
        let incoming: Vec<f32> = graph
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::ModuleToModule)
            .map(|e| e.target_offset)
            .collect();

        assert_eq!(incoming.len(), 2);
        assert_eq!(incoming.iter().sum::<f32>(), 0.0);
        assert_eq!(incoming, vec![-EDGE_UNIT_OFFSET / 2.0, EDGE_UNIT_OFFSET / 2.0]);
    }

    #[test]
    fn outgoing_edges_sort_by_target_priority_then_slot() {
        let modules = vec![
            module("hub", 0),
            module("late", 3),
            module("early", 1),
            module("tie", 3),
        ];
        let models = vec![
            model("src", "hub", 0, ""),
            model("x", "late", 0, "src"),
            model("y", "early", 0, "src"),
            model("z", "tie", 0, "src"),
        ];

        let graph = compute_graph(&modules, &models, &UiSnapshot::default());
        let targets: Vec<&str> = graph
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::ModuleToModule)
            .map(|e| e.id.as_str())
            .collect();

        // "late" sorts before "tie" because it holds the earlier slot.
        assert_eq!(
            targets,
            vec!["hub -> early", "hub -> late", "hub -> tie"]
        );
    }

    #[test]
    fn computation_is_idempotent() {
        let modules = vec![module("m1", 0), module("m2", 1)];
        let models = vec![model("a", "m1", 0, ""), model("b", "m2", 0, "a")];
        let ui = expand_all(&modules);

        let first = compute_graph(&modules, &models, &ui);
        let second = compute_graph(&modules, &models, &ui);

        assert_eq!(first, second);
    }

    #[test]
    fn dangling_module_reference_produces_no_node_or_edge() {
        let modules = vec![module("m1", 0)];
        let models = vec![model("orphan", "no-such-module", 0, "")];
        let ui = expand_all(&modules);

        let graph = compute_graph(&modules, &models, &ui);

        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn expanded_module_lays_models_in_centered_column() {
        let modules = vec![module("m1", 0)];
        let models = vec![
            model("a", "m1", 1, ""),
            model("b", "m1", 0, ""),
            model("c", "m1", 2, ""),
        ];
        let ui = expand_all(&modules);

        let graph = compute_graph(&modules, &models, &ui);
        let column: Vec<&GraphNode> = graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Model)
            .collect();

        // priority order b, a, c, centered on the module row.
        let ids: Vec<&str> = column.iter().map(|n| n.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);

        let ys: Vec<f32> = column.iter().map(|n| n.position.y).collect();
        assert_eq!(
            ys,
            vec![MODULE_Y - MODEL_SPACING, MODULE_Y, MODULE_Y + MODEL_SPACING]
        );
        assert!(column.iter().all(|n| n.position.x == START_OFFSET + MODEL_OFFSET_X));

        let containment = graph
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::ModuleToModel)
            .count();
        assert_eq!(containment, 3);
    }

    #[test]
    fn collapsed_module_emits_no_model_nodes_but_keeps_dependency_edges() {
        let modules = vec![module("m1", 0), module("m2", 1)];
        let models = vec![model("a", "m1", 0, ""), model("b", "m2", 0, "a")];

        let graph = compute_graph(&modules, &models, &UiSnapshot::default());

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].kind, EdgeKind::ModuleToModule);
    }

    #[test]
    fn priority_tier_is_high_when_either_endpoint_is_high_precedence() {
        let modules = vec![module("low1", 4), module("low2", 5), module("top", 1)];
        let models = vec![
            model("a", "low1", 0, ""),
            model("b", "low2", 0, "a"),
            model("c", "top", 0, "a"),
        ];

        let graph = compute_graph(&modules, &models, &UiSnapshot::default());
        let by_id: HashMap<&str, PriorityTier> = graph
            .edges
            .iter()
            .map(|e| (e.id.as_str(), e.priority_tier))
            .collect();

        assert_eq!(by_id["low1 -> low2"], PriorityTier::Normal);
        assert_eq!(by_id["low1 -> top"], PriorityTier::High);
    }

    #[test]
    fn highlight_matches_node_id_and_module_id() {
        let modules = vec![module("m1", 0), module("m2", 1)];
        let ui = UiSnapshot {
            // "n1" is the engine id of the second slot; "m1" is an entity id.
            highlighted_modules: ["n1".to_string(), "m1".to_string()].into_iter().collect(),
            ..UiSnapshot::default()
        };

        let graph = compute_graph(&modules, &[], &ui);

        assert!(graph.nodes.iter().all(|n| n.highlighted));
    }
}
