use serde::{Deserialize, Serialize};
use std::fmt;

/// Observable service role an instance can play.
///
/// Each role may carry a default instrumentation in the policy table.
/// Tags the snapshot producer knows but this build does not deserialize
/// to [`ApplicationType::Unknown`], which is never instrumented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    Postgres,
    Mysql,
    Redis,
    Mongodb,
    Memcached,
    Elasticsearch,
    Opensearch,
    Kafka,
    Rabbitmq,
    Nats,
    Cassandra,
    Clickhouse,
    Zookeeper,
    #[serde(other)]
    Unknown,
}

impl ApplicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Redis => "redis",
            Self::Mongodb => "mongodb",
            Self::Memcached => "memcached",
            Self::Elasticsearch => "elasticsearch",
            Self::Opensearch => "opensearch",
            Self::Kafka => "kafka",
            Self::Rabbitmq => "rabbitmq",
            Self::Nats => "nats",
            Self::Cassandra => "cassandra",
            Self::Clickhouse => "clickhouse",
            Self::Zookeeper => "zookeeper",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network protocol observed on a connection (e.g. `postgres`, `mongo`).
///
/// Kept as an open tag: the policy table decides which protocols map to an
/// [`ApplicationType`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Protocol(String);

impl Protocol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Protocol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind half of an application's composite id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationKind {
    /// Endpoint seen only as somebody's downstream dependency
    ExternalService,
    Deployment,
    StatefulSet,
    DaemonSet,
    CronJob,
    Job,
    Pod,
    #[serde(other)]
    Unknown,
}

impl ApplicationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExternalService => "external_service",
            Self::Deployment => "deployment",
            Self::StatefulSet => "stateful_set",
            Self::DaemonSet => "daemon_set",
            Self::CronJob => "cron_job",
            Self::Job => "job",
            Self::Pod => "pod",
            Self::Unknown => "unknown",
        }
    }
}
