//! # Agentconf Topology
//!
//! Input side of agent-configuration synthesis: the topology snapshot model,
//! the instrumentation policy table and the providers that hand snapshots to
//! the synthesizer.
//!
//! ```text
//! TopologyProvider (trait)
//!     ├─ newest_cached_timestamp(project)
//!     ├─ load_snapshot(project, window)  ──> Snapshot
//!     │                                        ├─ Application (kind, name)
//!     │                                        │    ├─ Instance (listens, types, obsolete)
//!     │                                        │    ├─ Downstream (remote instance, protocols)
//!     │                                        │    └─ ApplicationSettings (overrides)
//!     │                                        └─ Node
//!     └─ integrations(project)          ──> opaque JSON
//!
//! InstrumentationPolicy
//!     ├─ protocol -> application type
//!     ├─ application type -> default InstrumentationSettings
//!     └─ credential-requiring types
//! ```

mod error;
mod file_provider;
mod model;
mod policy;
mod provider;
mod types;

pub use error::{PolicyError, Result, TopologyError};
pub use file_provider::FileTopologyProvider;
pub use model::{
    Application, ApplicationId, ApplicationSettings, Downstream, Instance, InstanceId,
    ListenRecord, Node, Snapshot,
};
pub use policy::{
    Credentials, InstrumentationPolicy, InstrumentationSettings, POLICY_SCHEMA_VERSION,
};
pub use provider::{ProjectId, TimeWindow, Timestamp, TopologyProvider, CONFIG_WINDOW_SECS};
pub use types::{ApplicationKind, ApplicationType, Protocol};
