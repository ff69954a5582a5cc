use agentconf_topology::{
    Application, ApplicationType, Instance, InstanceId, InstrumentationPolicy, Snapshot,
};
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Insertion-ordered set of instances, deduplicated by instance id
#[derive(Debug, Clone, Default)]
pub struct InstanceSet<'a> {
    members: IndexMap<&'a InstanceId, &'a Instance>,
}

impl<'a> InstanceSet<'a> {
    /// Returns `false` if the instance was already a member
    pub fn insert(&mut self, instance: &'a Instance) -> bool {
        self.members.insert(&instance.id, instance).is_none()
    }

    pub fn contains(&self, id: &InstanceId) -> bool {
        self.members.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Instance> + '_ {
        self.members.values().copied()
    }
}

/// Application type -> instances serving that role.
///
/// Types iterate in `ApplicationType` order, instances in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InstanceGroups<'a> {
    by_type: BTreeMap<ApplicationType, InstanceSet<'a>>,
}

impl<'a> InstanceGroups<'a> {
    pub fn insert(&mut self, t: ApplicationType, instance: &'a Instance) {
        self.by_type.entry(t).or_default().insert(instance);
    }

    pub fn get(&self, t: ApplicationType) -> Option<&InstanceSet<'a>> {
        self.by_type.get(&t)
    }

    pub fn types(&self) -> impl Iterator<Item = ApplicationType> + '_ {
        self.by_type.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ApplicationType, &InstanceSet<'a>)> + '_ {
        self.by_type.iter().map(|(t, set)| (*t, set))
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

/// Group the instances an application exposes by application type.
///
/// External services have no instances of their own: their groups come from
/// the remote instances behind downstream edges, typed by the protocols seen
/// on each edge. Obsolete instances and unknown types are never grouped.
pub fn group<'a>(
    app: &'a Application,
    snapshot: &'a Snapshot,
    policy: &InstrumentationPolicy,
) -> InstanceGroups<'a> {
    let mut groups = InstanceGroups::default();

    if app.is_external_service() {
        for downstream in &app.downstreams {
            let Some(remote) = downstream
                .remote_instance
                .as_ref()
                .and_then(|id| snapshot.instance(id))
            else {
                continue;
            };
            if remote.is_obsolete() {
                continue;
            }
            for protocol in downstream.requests_count.keys() {
                if let Some(t) = policy.application_type_for(protocol) {
                    groups.insert(t, remote);
                }
            }
        }
    } else {
        for instance in app.instances.iter().filter(|i| !i.is_obsolete()) {
            for &t in instance.application_types.iter().filter(|t| t.is_known()) {
                groups.insert(t, instance);
            }
        }
    }

    groups
}
