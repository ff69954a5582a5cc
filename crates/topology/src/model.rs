use crate::policy::InstrumentationSettings;
use crate::types::{ApplicationKind, ApplicationType, Protocol};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Composite application key: (kind, name)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId {
    pub kind: ApplicationKind,
    pub name: String,
}

impl ApplicationId {
    pub fn new(kind: ApplicationKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.name)
    }
}

/// Instance identity, unique within a snapshot
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId {
    pub application: ApplicationId,
    pub name: String,
}

impl InstanceId {
    pub fn new(application: ApplicationId, name: impl Into<String>) -> Self {
        Self {
            application,
            name: name.into(),
        }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.application, self.name)
    }
}

/// TCP bind observed for an instance.
///
/// `ip` is kept as the raw text reported by the collector; it is only
/// parsed when the record becomes an address candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenRecord {
    pub ip: String,
    pub port: u16,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl ListenRecord {
    pub fn new(ip: impl Into<String>, port: u16, active: bool) -> Self {
        Self {
            ip: ip.into(),
            port,
            active,
        }
    }
}

fn default_true() -> bool {
    true
}

/// One running copy of an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,

    #[serde(default)]
    pub tcp_listens: Vec<ListenRecord>,

    /// Roles the topology provider derived for this instance
    #[serde(default)]
    pub application_types: BTreeSet<ApplicationType>,

    /// No longer live in the current window
    #[serde(default)]
    pub obsolete: bool,
}

impl Instance {
    pub fn new(id: InstanceId) -> Self {
        Self {
            id,
            tcp_listens: Vec::new(),
            application_types: BTreeSet::new(),
            obsolete: false,
        }
    }

    pub fn listen(mut self, ip: &str, port: u16, active: bool) -> Self {
        self.tcp_listens.push(ListenRecord::new(ip, port, active));
        self
    }

    pub fn application_type(mut self, t: ApplicationType) -> Self {
        self.application_types.insert(t);
        self
    }

    pub fn obsolete(mut self, obsolete: bool) -> Self {
        self.obsolete = obsolete;
        self
    }

    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }
}

/// Dependency edge from an application to a remote instance
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Downstream {
    #[serde(default)]
    pub remote_instance: Option<InstanceId>,

    /// Requests observed per protocol over the window
    #[serde(default)]
    pub requests_count: BTreeMap<Protocol, u64>,
}

impl Downstream {
    pub fn new(remote_instance: Option<InstanceId>) -> Self {
        Self {
            remote_instance,
            requests_count: BTreeMap::new(),
        }
    }

    pub fn requests(mut self, protocol: &str, count: u64) -> Self {
        self.requests_count.insert(Protocol::new(protocol), count);
        self
    }
}

/// Per-application overrides of the default policy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// `None` values mean "no override for this type"
    #[serde(default)]
    pub instrumentation: BTreeMap<ApplicationType, Option<InstrumentationSettings>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,

    #[serde(default)]
    pub instances: Vec<Instance>,

    #[serde(default)]
    pub downstreams: Vec<Downstream>,

    #[serde(default)]
    pub settings: Option<ApplicationSettings>,
}

impl Application {
    pub fn new(id: ApplicationId) -> Self {
        Self {
            id,
            instances: Vec::new(),
            downstreams: Vec::new(),
            settings: None,
        }
    }

    /// Add an instance named `name` owned by this application
    pub fn instance(mut self, name: &str, build: impl FnOnce(Instance) -> Instance) -> Self {
        let instance = Instance::new(InstanceId::new(self.id.clone(), name));
        self.instances.push(build(instance));
        self
    }

    pub fn downstream(mut self, downstream: Downstream) -> Self {
        self.downstreams.push(downstream);
        self
    }

    pub fn override_instrumentation(
        mut self,
        t: ApplicationType,
        settings: Option<InstrumentationSettings>,
    ) -> Self {
        self.settings
            .get_or_insert_with(ApplicationSettings::default)
            .instrumentation
            .insert(t, settings);
        self
    }

    pub fn is_external_service(&self) -> bool {
        self.id.kind == ApplicationKind::ExternalService
    }

    /// Non-null override for `t`, if any
    pub fn instrumentation_override(&self, t: ApplicationType) -> Option<&InstrumentationSettings> {
        self.settings
            .as_ref()
            .and_then(|s| s.instrumentation.get(&t))
            .and_then(Option::as_ref)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
}

#[derive(Serialize, Deserialize)]
struct SnapshotRepr {
    #[serde(default)]
    applications: Vec<Application>,
    #[serde(default)]
    nodes: Vec<Node>,
}

/// Topology for one time window.
///
/// Immutable after construction; the instance index lets downstream edges
/// resolve their remote instance by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SnapshotRepr", into = "SnapshotRepr")]
pub struct Snapshot {
    applications: Vec<Application>,
    nodes: Vec<Node>,
    index: HashMap<InstanceId, (usize, usize)>,
}

impl Snapshot {
    pub fn new(applications: Vec<Application>, nodes: Vec<Node>) -> Self {
        let mut index = HashMap::new();
        for (app_idx, app) in applications.iter().enumerate() {
            for (instance_idx, instance) in app.instances.iter().enumerate() {
                if index
                    .insert(instance.id.clone(), (app_idx, instance_idx))
                    .is_some()
                {
                    log::warn!("Duplicate instance id in snapshot: {}", instance.id);
                }
            }
        }
        Self {
            applications,
            nodes,
            index,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Resolve an instance id against this snapshot
    pub fn instance(&self, id: &InstanceId) -> Option<&Instance> {
        let &(app_idx, instance_idx) = self.index.get(id)?;
        self.applications
            .get(app_idx)
            .and_then(|app| app.instances.get(instance_idx))
    }
}

impl From<SnapshotRepr> for Snapshot {
    fn from(repr: SnapshotRepr) -> Self {
        Self::new(repr.applications, repr.nodes)
    }
}

impl From<Snapshot> for SnapshotRepr {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            applications: snapshot.applications,
            nodes: snapshot.nodes,
        }
    }
}
