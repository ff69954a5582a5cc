use agentconf_topology::{ApplicationType, Credentials};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One instrumentation the agent should activate, bound to a concrete host.
///
/// Entries are owned values: each one is built from its template on its
/// own, so no two entries share state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationEntry {
    #[serde(rename = "type")]
    pub application_type: ApplicationType,

    pub enabled: bool,

    pub port: u16,

    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

/// Agent configuration returned to the request layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Integration settings, echoed unchanged
    pub integrations: serde_json::Value,

    pub application_instrumentation: Vec<InstrumentationEntry>,
}

impl AgentConfig {
    pub fn empty(integrations: serde_json::Value) -> Self {
        Self {
            integrations,
            application_instrumentation: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.application_instrumentation.is_empty()
    }
}
