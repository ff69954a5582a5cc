use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;

use ipnetwork::{IpNetwork, Ipv4Network};
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::types::{ApplicationType, Protocol};

const BUILTIN_POLICY: &str = include_str!("../../../policy/default.toml");

pub const POLICY_SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both halves present
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() { "" } else { "***" };
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &password)
            .finish()
    }
}

/// How the agent should instrument one application type.
///
/// Used both for policy defaults and per-application overrides. The target
/// host is not part of the settings: it is chosen per instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstrumentationSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,

    /// Extra agent parameters passed through verbatim (e.g. `sslmode`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

impl InstrumentationSettings {
    pub fn new(port: u16) -> Self {
        Self {
            enabled: true,
            port,
            credentials: None,
            params: BTreeMap::new(),
        }
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn has_complete_credentials(&self) -> bool {
        self.credentials.as_ref().is_some_and(Credentials::is_complete)
    }
}

/// Policy table driving synthesis: protocol mapping, per-type defaults,
/// credential rules and the container bridge network used for address
/// ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstrumentationPolicy {
    pub schema_version: u32,

    /// Types that are never emitted without a username and a password
    #[serde(default)]
    pub credentials_required: BTreeSet<ApplicationType>,

    #[serde(default)]
    pub protocols: BTreeMap<Protocol, ApplicationType>,

    #[serde(default)]
    pub defaults: BTreeMap<ApplicationType, InstrumentationSettings>,

    #[serde(default = "default_bridge_network")]
    pub bridge_network: IpNetwork,
}

fn default_bridge_network() -> IpNetwork {
    Ipv4Network::new(Ipv4Addr::new(172, 17, 0, 0), 16)
        .expect("valid docker0 prefix")
        .into()
}

impl InstrumentationPolicy {
    /// Policy shipped with the binary (`policy/default.toml`)
    pub fn builtin() -> Result<Self, PolicyError> {
        Self::from_bytes(BUILTIN_POLICY.as_bytes())
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let bytes = std::fs::read(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes).map_err(|err| match err {
            PolicyError::Parse(msg) => PolicyError::Parse(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Parse a policy from JSON, falling back to TOML
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PolicyError> {
        let policy: Self = match serde_json::from_slice(bytes) {
            Ok(policy) => policy,
            Err(json_err) => {
                let utf8 = std::str::from_utf8(bytes)
                    .map_err(|err| PolicyError::Parse(format!("{json_err}; {err}")))?;
                toml::from_str(utf8).map_err(|toml_err| {
                    PolicyError::Parse(format!(
                        "Policy is not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}"
                    ))
                })?
            }
        };
        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if self.schema_version != POLICY_SCHEMA_VERSION {
            return Err(PolicyError::Invalid(format!(
                "schema_version {} is not supported (expected {POLICY_SCHEMA_VERSION})",
                self.schema_version
            )));
        }
        for (protocol, t) in &self.protocols {
            if !t.is_known() {
                return Err(PolicyError::Invalid(format!(
                    "protocols.{protocol} maps to an unknown application type"
                )));
            }
        }
        for (t, settings) in &self.defaults {
            if !t.is_known() {
                return Err(PolicyError::Invalid(
                    "defaults contains an unknown application type".to_string(),
                ));
            }
            if settings.port == 0 {
                return Err(PolicyError::Invalid(format!(
                    "defaults.{t}.port must be non-zero"
                )));
            }
        }
        if self.credentials_required.contains(&ApplicationType::Unknown) {
            return Err(PolicyError::Invalid(
                "credentials_required contains an unknown application type".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_for(&self, t: ApplicationType) -> Option<&InstrumentationSettings> {
        self.defaults.get(&t)
    }

    pub fn application_type_for(&self, protocol: &Protocol) -> Option<ApplicationType> {
        self.protocols.get(protocol).copied().filter(ApplicationType::is_known)
    }

    pub fn requires_credentials(&self, t: ApplicationType) -> bool {
        self.credentials_required.contains(&t)
    }
}
