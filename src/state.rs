use std::collections::{HashMap, HashSet};

use tracing::debug;

/// Expansion lifecycle of a module node. Transitions are driven by user
/// clicks and settled by an explicit completion signal from the
/// presentation layer once its animation finishes, so tests advance the
/// machine without sleeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpansionState {
    #[default]
    Collapsed,
    Expanding,
    Expanded,
    Collapsing,
}

impl ExpansionState {
    pub fn is_animating(self) -> bool {
        matches!(self, ExpansionState::Expanding | ExpansionState::Collapsing)
    }
}

/// Opaque receipt for a highlight request. Clearing with a stale token is
/// a no-op, so a timer belonging to an earlier request cannot wipe out a
/// newer highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightToken {
    generation: u64,
}

/// The live UI state the layout engine is re-run against: per-module
/// expansion states and the transient highlight set.
#[derive(Debug, Default)]
pub struct UiState {
    expansion: HashMap<String, ExpansionState>,
    highlighted: HashSet<String>,
    highlight_generation: u64,
}

/// An immutable projection of [`UiState`] consumed by
/// [`compute_graph`](crate::layout::compute_graph).
///
/// A module counts as expanded while `Expanded` or `Collapsing`: its
/// children stay visible until the collapse animation settles. During
/// `Expanding` the children appear only once the transition completes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiSnapshot {
    pub expanded_modules: HashSet<String>,
    pub animating_nodes: HashSet<String>,
    pub highlighted_modules: HashSet<String>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expansion_state(&self, module_id: &str) -> ExpansionState {
        self.expansion.get(module_id).copied().unwrap_or_default()
    }

    /// Handle a click on a module node. Returns the state entered, or
    /// `None` when the click is ignored because a transition is already
    /// in flight.
    pub fn toggle(&mut self, module_id: &str) -> Option<ExpansionState> {
        let next = match self.expansion_state(module_id) {
            ExpansionState::Collapsed => ExpansionState::Expanding,
            ExpansionState::Expanded => ExpansionState::Collapsing,
            current @ (ExpansionState::Expanding | ExpansionState::Collapsing) => {
                debug!(module = %module_id, state = ?current, "ignoring click mid-transition");
                return None;
            }
        };
        self.expansion.insert(module_id.to_string(), next);
        Some(next)
    }

    /// Settle an in-flight transition. Returns the state entered, or
    /// `None` when the module was not transitioning.
    pub fn complete_transition(&mut self, module_id: &str) -> Option<ExpansionState> {
        let settled = match self.expansion_state(module_id) {
            ExpansionState::Expanding => ExpansionState::Expanded,
            ExpansionState::Collapsing => ExpansionState::Collapsed,
            ExpansionState::Collapsed | ExpansionState::Expanded => return None,
        };
        self.expansion.insert(module_id.to_string(), settled);
        Some(settled)
    }

    /// Add modules to the highlight set and start a new highlight
    /// generation. The returned token clears this and any earlier
    /// request; tokens from before a later `highlight` call go stale.
    pub fn highlight<I>(&mut self, module_ids: I) -> HighlightToken
    where
        I: IntoIterator<Item = String>,
    {
        self.highlighted.extend(module_ids);
        self.highlight_generation += 1;
        HighlightToken {
            generation: self.highlight_generation,
        }
    }

    /// Clear the highlight set if `token` is still current. Returns
    /// whether anything was cleared.
    pub fn clear_highlight(&mut self, token: HighlightToken) -> bool {
        if token.generation != self.highlight_generation {
            debug!("ignoring stale highlight clear");
            return false;
        }
        self.highlighted.clear();
        true
    }

    pub fn snapshot(&self) -> UiSnapshot {
        let mut expanded_modules = HashSet::new();
        let mut animating_nodes = HashSet::new();

        for (module_id, state) in &self.expansion {
            if matches!(state, ExpansionState::Expanded | ExpansionState::Collapsing) {
                expanded_modules.insert(module_id.clone());
            }
            if state.is_animating() {
                animating_nodes.insert(module_id.clone());
            }
        }

        UiSnapshot {
            expanded_modules,
            animating_nodes,
            highlighted_modules: self.highlighted.clone(),
        }
    }
}
