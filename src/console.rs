use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{EntitySnapshot, EntitySource, RelationshipCache};
use crate::entity::{Model, Table, owned_models};
use crate::error::Result;
use crate::layout::{EdgeKind, FlowGraph, GraphEdge, GraphNode, NodeKind, compute_graph};
use crate::state::{ExpansionState, HighlightToken, UiState};

/// The outbound surface the presentation layer talks to: owns the
/// relationship cache and the UI state, recomputes the flow graph on
/// demand. Graph derivation is pure over the last fetched snapshot; call
/// [`refresh`](Self::refresh) after data changes.
pub struct FlowConsole<S> {
    cache: RelationshipCache<S>,
    ui: UiState,
    snapshot: Option<Arc<EntitySnapshot>>,
}

impl<S: EntitySource> FlowConsole<S> {
    pub fn new(source: S) -> Self {
        Self {
            cache: RelationshipCache::new(source),
            ui: UiState::new(),
            snapshot: None,
        }
    }

    /// Fetch entities through the cache and adopt the result as the
    /// current snapshot.
    pub async fn refresh(&mut self, force_refresh: bool) -> Result<Arc<EntitySnapshot>> {
        let snapshot = self.cache.fetch(force_refresh).await?;
        self.snapshot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    /// The full node/edge graph for the current snapshot and UI state.
    /// Empty until the first successful [`refresh`](Self::refresh).
    pub fn compute_graph(&self) -> FlowGraph {
        match &self.snapshot {
            Some(snapshot) => {
                compute_graph(&snapshot.modules, &snapshot.models, &self.ui.snapshot())
            }
            None => FlowGraph::default(),
        }
    }

    /// Only the module nodes, in slot order.
    pub fn get_module_nodes(&self) -> Vec<GraphNode> {
        self.compute_graph()
            .nodes
            .into_iter()
            .filter(|node| node.kind == NodeKind::Module)
            .collect()
    }

    /// Models owned by `module_id` in layout order, expanded or not.
    pub fn get_models_by_module(&self, module_id: &str) -> Vec<Model> {
        match &self.snapshot {
            Some(snapshot) => owned_models(&snapshot.models, module_id)
                .into_iter()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Module dependency edges touching `module_id` on either end.
    pub fn get_module_dependency_edges(&self, module_id: &str) -> Vec<GraphEdge> {
        let graph = self.compute_graph();
        let node_id = graph
            .nodes
            .iter()
            .find(|node| node.kind == NodeKind::Module && node.entity_id == module_id)
            .map(|node| node.id.clone());
        let Some(node_id) = node_id else {
            return Vec::new();
        };

        graph
            .edges
            .into_iter()
            .filter(|edge| {
                edge.kind == EdgeKind::ModuleToModule
                    && (edge.source_node_id == node_id || edge.target_node_id == node_id)
            })
            .collect()
    }

    /// Tables attached to a model. Linkage is by human-readable model
    /// name, which is what the backend records carry; fragile under
    /// renames and kept isolated here.
    pub fn get_tables_by_model(&self, model_name: &str) -> Vec<Table> {
        match &self.snapshot {
            Some(snapshot) => snapshot
                .tables
                .iter()
                .filter(|table| table.model_name == model_name)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn expansion_state(&self, module_id: &str) -> ExpansionState {
        self.ui.expansion_state(module_id)
    }

    /// Handle a click on a module node; see [`UiState::toggle`].
    pub fn toggle_module_expansion(&mut self, module_id: &str) -> Option<ExpansionState> {
        self.ui.toggle(module_id)
    }

    /// Settle an in-flight expand/collapse transition.
    pub fn complete_transition(&mut self, module_id: &str) -> Option<ExpansionState> {
        self.ui.complete_transition(module_id)
    }

    pub fn highlight<I>(&mut self, module_ids: I) -> HighlightToken
    where
        I: IntoIterator<Item = String>,
    {
        self.ui.highlight(module_ids)
    }

    pub fn clear_highlight(&mut self, token: HighlightToken) -> bool {
        self.ui.clear_highlight(token)
    }

    /// Highlight modules for a fixed duration, then clear. The clear is
    /// token-guarded, so a highlight requested while this one is pending
    /// survives the expiry.
    pub async fn highlight_for<I>(&mut self, module_ids: I, duration: Duration)
    where
        I: IntoIterator<Item = String>,
    {
        let token = self.highlight(module_ids);
        tokio::time::sleep(duration).await;
        if self.clear_highlight(token) {
            debug!("highlight expired");
        }
    }
}
