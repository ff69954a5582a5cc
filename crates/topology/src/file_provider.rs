use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Result, TopologyError};
use crate::model::Snapshot;
use crate::provider::{ProjectId, TimeWindow, Timestamp, TopologyProvider};

const SNAPSHOTS_DIR: &str = "snapshots";
const INTEGRATIONS_FILE: &str = "integrations.json";

/// Topology provider reading pre-built snapshots from disk.
///
/// Layout:
///
/// ```text
/// <root>/<project>/snapshots/<unix-seconds>.json
/// <root>/<project>/integrations.json   (optional)
/// ```
#[derive(Debug, Clone)]
pub struct FileTopologyProvider {
    root: PathBuf,
    default_integrations: serde_json::Value,
}

impl FileTopologyProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_integrations: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Integrations used for projects without their own `integrations.json`
    pub fn with_default_integrations(mut self, integrations: serde_json::Value) -> Self {
        self.default_integrations = integrations;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project: &ProjectId) -> Result<PathBuf> {
        let id = project.as_str();
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\'])
            && !id.contains('\0');
        if !valid {
            return Err(TopologyError::SnapshotUnavailable(format!(
                "invalid project id: {id:?}"
            )));
        }
        Ok(self.root.join(id))
    }

    async fn existing_project_dir(&self, project: &ProjectId) -> Result<PathBuf> {
        let dir = self.project_dir(project)?;
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(TopologyError::SnapshotUnavailable(format!(
                "project not found: {project}"
            ))),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(
                TopologyError::SnapshotUnavailable(format!("project not found: {project}")),
            ),
            Err(err) => Err(TopologyError::upstream_with(
                format!("failed to stat {}", dir.display()),
                err,
            )),
        }
    }

    /// Cached snapshot timestamps for a project, ascending
    async fn cached_timestamps(&self, project: &ProjectId) -> Result<Vec<(Timestamp, PathBuf)>> {
        let dir = self.existing_project_dir(project).await?.join(SNAPSHOTS_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(TopologyError::upstream_with(
                    format!("failed to list {}", dir.display()),
                    err,
                ))
            }
        };

        let mut found = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|err| {
                TopologyError::upstream_with(format!("failed to list {}", dir.display()), err)
            })?;
            let Some(entry) = entry else {
                break;
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(ts) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<Timestamp>().ok())
            else {
                log::debug!("Ignoring snapshot file with non-numeric name: {}", path.display());
                continue;
            };
            found.push((ts, path));
        }
        found.sort_by_key(|(ts, _)| *ts);
        Ok(found)
    }
}

#[async_trait]
impl TopologyProvider for FileTopologyProvider {
    async fn newest_cached_timestamp(&self, project: &ProjectId) -> Result<Option<Timestamp>> {
        let cached = self.cached_timestamps(project).await?;
        Ok(cached.last().map(|(ts, _)| *ts))
    }

    async fn load_snapshot(&self, project: &ProjectId, window: TimeWindow) -> Result<Snapshot> {
        let cached = self.cached_timestamps(project).await?;
        let Some((ts, path)) = cached.iter().rev().find(|(ts, _)| window.contains(*ts)) else {
            return Err(TopologyError::WindowEmpty);
        };

        let bytes = tokio::fs::read(path).await.map_err(|err| {
            TopologyError::upstream_with(format!("failed to read {}", path.display()), err)
        })?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|err| {
            TopologyError::upstream_with(format!("failed to decode {}", path.display()), err)
        })?;

        log::debug!(
            "Loaded snapshot {ts} for project {project}: {} applications",
            snapshot.applications().len()
        );
        Ok(snapshot)
    }

    async fn integrations(&self, project: &ProjectId) -> Result<serde_json::Value> {
        let path = self.existing_project_dir(project).await?.join(INTEGRATIONS_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                TopologyError::upstream_with(format!("failed to decode {}", path.display()), err)
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(self.default_integrations.clone()),
            Err(err) => Err(TopologyError::upstream_with(
                format!("failed to read {}", path.display()),
                err,
            )),
        }
    }
}
