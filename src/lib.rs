//! Dependency derivation and flow-graph layout for pipeline admin consoles.
//!
//! The crate turns flat module/model/table records fetched from backend
//! services into a renderable execution-flow graph. Three layers, consumed
//! bottom-up:
//!
//! - [`RelationshipCache`] memoizes the three entity collections behind a
//!   pluggable [`EntitySource`], joining the fetches all-or-nothing.
//! - [`DependencyGraph`] lifts model-level `depend_on` references up to a
//!   deduplicated module-level dependency graph.
//! - [`compute_graph`] lays the graph out in two dimensions with
//!   deterministic ordering, symmetric edge fan-out and priority tiers.
//!
//! [`FlowConsole`] wires the layers together and carries the expansion
//! state machine and transient highlights the presentation layer drives.

use std::time::Duration;

pub mod cache;
pub mod console;
pub mod entity;
pub mod error;
pub mod graph;
pub mod layout;
pub mod state;

pub use cache::{EntitySnapshot, EntitySource, RelationshipCache, StaticSource};
pub use console::FlowConsole;
pub use entity::{Model, Module, Table};
pub use error::{Error, Result};
pub use graph::DependencyGraph;
pub use layout::{
    EdgeKind, FlowGraph, GraphEdge, GraphNode, NodeKind, Point, PriorityTier, compute_graph,
};
pub use state::{ExpansionState, HighlightToken, UiSnapshot, UiState};

/// Horizontal distance between adjacent module slots.
pub const MODULE_SPACING: f32 = 220.0;
/// Fixed y coordinate of the module row.
pub const MODULE_Y: f32 = 120.0;
/// X coordinate of the first module slot.
pub const START_OFFSET: f32 = 120.0;
/// Horizontal offset of a model column from its owning module.
pub const MODEL_OFFSET_X: f32 = 60.0;
/// Vertical spacing between model nodes in a column.
pub const MODEL_SPACING: f32 = 80.0;
/// Vertical distance between adjacent edge anchors in a fan-out bundle.
pub const EDGE_UNIT_OFFSET: f32 = 14.0;
/// Modules at or below this priority put their edges in the high tier.
pub const HIGH_PRIORITY_CUTOFF: i64 = 1;
/// How long a successful cache entry stays valid.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);
