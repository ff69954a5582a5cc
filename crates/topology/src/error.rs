use thiserror::Error;

pub type Result<T> = std::result::Result<T, TopologyError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures surfaced by a topology provider.
///
/// Callers match on the variant: `WindowEmpty` is a legitimate empty
/// result, the other two abort the request.
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    #[error("No cached data for the requested window")]
    WindowEmpty,

    #[error("Upstream failure: {message}")]
    UpstreamFailure {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl TopologyError {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamFailure {
            message: message.into(),
            source: None,
        }
    }

    pub fn upstream_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::UpstreamFailure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Failed to read policy {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Policy parse error: {0}")]
    Parse(String),

    #[error("Invalid policy: {0}")]
    Invalid(String),
}
