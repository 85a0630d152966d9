use crate::profiling::{MarkerKind, Slot};
use std::path::PathBuf;

/// Identifies one of the GPU captures owned by the profiler.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Capture {
    Validity,
    Marker(MarkerKind),
}

impl std::fmt::Display for Capture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Capture::Validity => write!(f, "timestamp validity query"),
            Capture::Marker(marker) => write!(f, "timestamp query for {}", marker),
        }
    }
}

/// Failure reported by a [`Device`](crate::Device) or [`Context`](crate::Context).
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("out of device memory")]
    OutOfMemory,

    #[error("device lost")]
    DeviceLost,

    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProfilerError {
    #[error("could not create {capture} for {slot}: {source}")]
    ResourceCreation {
        capture: Capture,
        slot: Slot,
        source: QueryError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("failed to read configuration file {path:?}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
