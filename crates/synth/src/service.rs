use agentconf_topology::{
    InstrumentationPolicy, ProjectId, Result, TimeWindow, TopologyError, TopologyProvider,
};
use std::sync::Arc;

use crate::entry::AgentConfig;
use crate::synthesizer::ConfigSynthesizer;

/// Request pipeline around synthesis: picks the window, loads the
/// snapshot and turns provider errors into results.
pub struct ConfigService<P> {
    provider: P,
    policy: Arc<InstrumentationPolicy>,
}

impl<P: TopologyProvider> ConfigService<P> {
    pub fn new(provider: P, policy: Arc<InstrumentationPolicy>) -> Self {
        Self { provider, policy }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn policy(&self) -> &InstrumentationPolicy {
        &self.policy
    }

    /// Agent config for `project` over the hour ending at the newest cached
    /// timestamp.
    ///
    /// No cached data, or an empty window, gives an empty config.
    pub async fn agent_config(&self, project: &ProjectId) -> Result<AgentConfig> {
        let integrations = self.provider.integrations(project).await?;

        let Some(to) = self.provider.newest_cached_timestamp(project).await? else {
            log::info!("Project {project}: no cached data yet, returning empty config");
            return Ok(AgentConfig::empty(integrations));
        };
        let window = TimeWindow::ending_at(to);
        log::debug!("Project {project}: window {}..{}", window.from, window.to);

        let snapshot = match self.provider.load_snapshot(project, window).await {
            Ok(snapshot) => snapshot,
            Err(TopologyError::WindowEmpty) => {
                log::info!("Project {project}: window is empty, returning empty config");
                return Ok(AgentConfig::empty(integrations));
            }
            Err(err) => return Err(err),
        };

        let config = ConfigSynthesizer::new(&self.policy).synthesize(&snapshot, integrations);
        log::info!(
            "Project {project}: {} applications -> {} instrumentation entries",
            snapshot.applications().len(),
            config.application_instrumentation.len()
        );
        Ok(config)
    }
}
