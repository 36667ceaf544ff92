use std::path::PathBuf;

/// Malformed or inconsistent policy definition.
///
/// Always fatal at load time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed policy document: {0}")]
    Malformed(String),

    #[error("{owner}: rule requires a non-empty path")]
    MissingPath { owner: String },

    #[error("{owner}: rule '{path}' must have a non-empty methods list")]
    EmptyMethods { owner: String, path: String },

    #[error("{owner}: invalid path template '{path}': {reason}")]
    InvalidPathTemplate {
        owner: String,
        path: String,
        reason: String,
    },

    #[error("role '{role}' extends unknown role '{parent}'")]
    UnknownParentRole { role: String, parent: String },

    #[error("role '{role}' references unknown permissions: {permissions:?}")]
    UnknownPermission {
        role: String,
        permissions: Vec<String>,
    },

    #[error("cycle detected in role inheritance at '{role}'")]
    InheritanceCycle { role: String },
}
