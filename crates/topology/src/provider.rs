use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::model::Snapshot;

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// Length of the window agent configuration is computed over
pub const CONFIG_WINDOW_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed time range `[from, to]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl TimeWindow {
    /// The configuration window: one hour ending at `to`
    pub fn ending_at(to: Timestamp) -> Self {
        Self {
            from: to.saturating_sub(CONFIG_WINDOW_SECS),
            to,
        }
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.from <= ts && ts <= self.to
    }
}

/// Source of topology snapshots.
///
/// Builds snapshots from whatever storage backs a project. Synthesis only
/// ever sees the finished [`Snapshot`].
#[async_trait]
pub trait TopologyProvider: Send + Sync {
    /// Newest fully cached timestamp; `None` when nothing is cached yet
    async fn newest_cached_timestamp(&self, project: &ProjectId) -> Result<Option<Timestamp>>;

    async fn load_snapshot(&self, project: &ProjectId, window: TimeWindow) -> Result<Snapshot>;

    /// Opaque integration settings echoed into the agent config
    async fn integrations(&self, _project: &ProjectId) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Object(serde_json::Map::new()))
    }
}
