//! Shared error type across promshim crates.

use thiserror::Error;

/// Stable error codes (for callers that branch on the failure class).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The registry refused a collector for a reason other than a name clash.
    Registry,
    /// The exported name is already taken in the registry.
    NameCollision,
    /// Malformed or out-of-range configuration.
    BadConfig,
    /// Unsupported configuration version.
    UnsupportedVersion,
    /// Rendering the exposition text failed.
    Encode,
    /// A value the metric cannot take (e.g. a negative counter increment).
    InvalidValue,
}

impl ErrorCode {
    /// String representation used in logs and assertions.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Registry => "REGISTRY",
            ErrorCode::NameCollision => "NAME_COLLISION",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Encode => "ENCODE",
            ErrorCode::InvalidValue => "INVALID_VALUE",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by core and registry.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Any failure reported by the external registry, passed through as-is.
    #[error(transparent)]
    Registry(#[from] prometheus::Error),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version: {0}")]
    UnsupportedVersion(u32),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("counter {metric} cannot be incremented by {amount}")]
    NegativeIncrement { metric: String, amount: f64 },
}

impl MetricsError {
    /// True when the registry rejected a collector because its name is
    /// already registered (possibly under a different metric kind).
    pub fn is_name_collision(&self) -> bool {
        matches!(self, MetricsError::Registry(prometheus::Error::AlreadyReg))
    }

    /// Map the error to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MetricsError::Registry(prometheus::Error::AlreadyReg) => ErrorCode::NameCollision,
            MetricsError::Registry(_) => ErrorCode::Registry,
            MetricsError::BadConfig(_) => ErrorCode::BadConfig,
            MetricsError::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
            MetricsError::Encode(_) => ErrorCode::Encode,
            MetricsError::NegativeIncrement { .. } => ErrorCode::InvalidValue,
        }
    }
}
