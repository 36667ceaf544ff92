use std::path::PathBuf;

use http::StatusCode;

/// Malformed route-policy document. Fatal at load time.
#[derive(Debug, thiserror::Error)]
pub enum RoutePolicyError {
    #[error("failed to read route policy {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed route policy: {0}")]
    Malformed(String),

    #[error("route policy document has no top-level 'security' key")]
    MissingSecurityKey,

    #[error("route '{path}' must have a non-empty methods list")]
    EmptyMethods { path: String },

    #[error("invalid route path '{path}': {reason}")]
    InvalidPathTemplate { path: String, reason: String },
}

/// Per-request authorization failure.
///
/// Display strings are safe to return to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No usable credential, rejected token, or unknown/inactive user.
    /// `reason` is a short code for server-side logs only.
    #[error("Authentication required")]
    Unauthenticated { reason: &'static str },

    #[error("Insufficient role. Required one of: {required:?}")]
    Forbidden { required: Vec<String> },

    #[error("Authorization misconfigured: {0}")]
    Misconfigured(String),
}

impl AuthzError {
    #[must_use]
    pub fn unauthenticated(reason: &'static str) -> Self {
        Self::Unauthenticated { reason }
    }

    /// HTTP status a gateway should answer with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
