//! # Agentconf Synth
//!
//! Decides, per discovered service instance, which instrumentation the
//! monitoring agent should activate and which address it should connect to.
//!
//! ## Architecture
//!
//! ```text
//! Snapshot
//!     │
//!     ├──> InstanceGrouper
//!     │      ├─ workloads: live instances by their application types
//!     │      └─ external services: remote instances by downstream protocol
//!     │
//!     ├──> InstrumentationResolver (per application type)
//!     │      ├─ override, else policy default
//!     │      └─ drop disabled / credential-less configs
//!     │
//!     ├──> AddressSelector (per instance)
//!     │      └─ active listens on the configured port, best address wins
//!     │
//!     └──> ConfigSynthesizer
//!            └─ one owned InstrumentationEntry per (type, instance)
//! ```
//!
//! Synthesis is pure and infallible. [`ConfigService`] wraps it with the
//! request pipeline: window selection, snapshot loading and error mapping.

mod address;
mod entry;
mod grouper;
mod resolver;
mod service;
mod synthesizer;

pub use address::{AddressClass, AddressSelector};
pub use entry::{AgentConfig, InstrumentationEntry};
pub use grouper::{group, InstanceGroups, InstanceSet};
pub use resolver::{resolve, Instrumentation, SettingsSource};
pub use service::ConfigService;
pub use synthesizer::{candidate_addresses, synthesize, ConfigSynthesizer};
