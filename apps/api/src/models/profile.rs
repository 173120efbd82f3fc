use serde::{Deserialize, Serialize};

use super::ballot::Party;

/// Everything the prompt builder knows about the voter. Collected by the
/// intake flow; no field here is ever persisted server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterProfile {
    pub party: Party,
    /// Ordered most-important-first; order is preserved into the prompt.
    #[serde(default)]
    pub issue_priorities: Vec<String>,
    /// Free-text self-placement, e.g. "center-right".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub political_spectrum: Option<String>,
    #[serde(default)]
    pub policy_stances: Vec<PolicyStance>,
    /// Qualities the voter wants in a candidate, e.g. "integrity".
    #[serde(default)]
    pub valued_qualities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyStance {
    pub topic: String,
    pub position: String,
}
