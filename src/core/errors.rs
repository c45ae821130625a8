//! ARB-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, ArbError>;

/// Top-level error type for the authority arbiter.
#[derive(Debug, Error)]
pub enum ArbError {
    #[error("[ARB-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[ARB-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[ARB-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[ARB-2001] unrecognized control mode token: {token:?}")]
    InvalidModeToken { token: String },

    #[error("[ARB-2002] {field} out of range: {value} (expected [0, 1])")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("[ARB-2003] negative elapsed time: {value}")]
    NegativeElapsed { value: f64 },

    #[error("[ARB-2004] no recommendation received yet; arbitration cannot run")]
    MissingRecommendation,

    #[error("[ARB-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[ARB-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[ARB-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[ARB-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl ArbError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "ARB-1001",
            Self::MissingConfig { .. } => "ARB-1002",
            Self::ConfigParse { .. } => "ARB-1003",
            Self::InvalidModeToken { .. } => "ARB-2001",
            Self::OutOfRange { .. } => "ARB-2002",
            Self::NegativeElapsed { .. } => "ARB-2003",
            Self::MissingRecommendation => "ARB-2004",
            Self::Serialization { .. } => "ARB-2101",
            Self::Io { .. } => "ARB-3002",
            Self::ChannelClosed { .. } => "ARB-3003",
            Self::Runtime { .. } => "ARB-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::MissingRecommendation
                | Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for ArbError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for ArbError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
