use agentconf_topology::{Instance, InstrumentationPolicy, Snapshot};
use indexmap::IndexMap;
use std::net::IpAddr;

use crate::address::AddressSelector;
use crate::entry::{AgentConfig, InstrumentationEntry};
use crate::grouper::group;
use crate::resolver::resolve;

/// Turns a topology snapshot into the agent's instrumentation list
#[derive(Debug, Clone)]
pub struct ConfigSynthesizer<'p> {
    policy: &'p InstrumentationPolicy,
    selector: AddressSelector,
}

impl<'p> ConfigSynthesizer<'p> {
    pub fn new(policy: &'p InstrumentationPolicy) -> Self {
        Self {
            policy,
            selector: AddressSelector::new(policy.bridge_network),
        }
    }

    /// Build the agent config for `snapshot`, echoing `integrations`.
    ///
    /// Entries are ordered by application, then application type, then
    /// instance. Anything that cannot be instrumented is skipped.
    pub fn synthesize(&self, snapshot: &Snapshot, integrations: serde_json::Value) -> AgentConfig {
        AgentConfig {
            integrations,
            application_instrumentation: self.entries(snapshot),
        }
    }

    pub fn entries(&self, snapshot: &Snapshot) -> Vec<InstrumentationEntry> {
        let mut entries = Vec::new();

        for app in snapshot.applications() {
            let groups = group(app, snapshot, self.policy);

            for (t, instances) in groups.iter() {
                let Some(instrumentation) = resolve(app, t, self.policy) else {
                    continue;
                };

                for instance in instances.iter() {
                    let candidates = candidate_addresses(instance, instrumentation.port());
                    match self.selector.select(&candidates) {
                        Some(host) => entries.push(instrumentation.instantiate(host)),
                        None => log::debug!(
                            "{}: no active listen on port {} for {t}",
                            instance.id,
                            instrumentation.port()
                        ),
                    }
                }
            }
        }

        entries
    }
}

/// Parsed IPs of the instance's active listens on `port`, deduplicated by
/// their textual form
pub fn candidate_addresses(instance: &Instance, port: u16) -> Vec<IpAddr> {
    let mut by_text: IndexMap<&str, IpAddr> = IndexMap::new();
    for listen in &instance.tcp_listens {
        if !listen.active || listen.port != port {
            continue;
        }
        match listen.ip.parse::<IpAddr>() {
            Ok(ip) => {
                by_text.entry(listen.ip.as_str()).or_insert(ip);
            }
            Err(err) => log::debug!("{}: ignoring listen ip {:?}: {err}", instance.id, listen.ip),
        }
    }
    by_text.into_values().collect()
}

/// Synthesize with a one-off synthesizer over `policy`
pub fn synthesize(
    snapshot: &Snapshot,
    policy: &InstrumentationPolicy,
    integrations: serde_json::Value,
) -> AgentConfig {
    ConfigSynthesizer::new(policy).synthesize(snapshot, integrations)
}
