use serde::{Deserialize, Serialize};

/// A pipeline module record as returned by the backend.
///
/// Lower `priority` means higher precedence and an earlier horizontal slot
/// in the laid-out graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub module_id: String,
    pub label: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub version: String,
}

/// A model record. `module_id` names the owning module; `depend_on`
/// optionally references another model by id (or, as a deprecated
/// fallback, by label).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub model_id: String,
    pub label: String,
    #[serde(default)]
    pub priority: i64,
    pub module_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depend_on: Option<String>,
}

impl Model {
    /// The dependency reference, if present and non-empty. Backends send
    /// the empty string for "no dependency".
    pub fn dependency_ref(&self) -> Option<&str> {
        self.depend_on.as_deref().filter(|key| !key.is_empty())
    }
}

/// A table record. Tables hang off models by human-readable name rather
/// than id, which is how the backend ships them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub config_id: String,
    pub name: String,
    pub model_name: String,
}

/// Modules in ascending priority order, ties broken by input order.
/// This order defines the horizontal slot assignment everywhere.
pub fn sorted_modules(modules: &[Module]) -> Vec<&Module> {
    let mut sorted: Vec<&Module> = modules.iter().collect();
    sorted.sort_by_key(|module| module.priority);
    sorted
}

/// Models owned by `module_id`, in ascending priority order with ties
/// broken by input order, matching the module sort rule.
pub fn owned_models<'a>(models: &'a [Model], module_id: &str) -> Vec<&'a Model> {
    let mut owned: Vec<&Model> = models
        .iter()
        .filter(|model| model.module_id == module_id)
        .collect();
    owned.sort_by_key(|model| model.priority);
    owned
}
