//! Error types for colmap-core

use thiserror::Error;

use crate::pattern::PatternError;
use crate::rename::RenameError;
use crate::validator::ValidationError;

/// Result type alias for colmap-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in colmap-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML (configuration, catalogs, scripts, stored patterns)
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A proposed binding was rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A target rename was rejected
    #[error(transparent)]
    Rename(#[from] RenameError),

    /// A pattern could not be built
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// A target field could not be added to the catalog
    #[error("cannot add target field '{name}': {message}")]
    InvalidTargetField {
        /// Requested name
        name: String,
        /// Description of the problem
        message: String,
    },

    /// Mapping entry was not found
    #[error("no mapping entry for {what}")]
    EntryNotFound {
        /// Entry id or source field used in the lookup
        what: String,
    },

    /// Stored pattern was not found
    #[error("pattern not found: {id}")]
    PatternNotFound {
        /// Pattern id
        id: String,
    },

    /// Submission attempted with an empty mapping set
    #[error("please add at least one mapping")]
    NothingToSubmit,

    /// Submission attempted before a file was loaded
    #[error("no uploaded file to attach the mappings to")]
    MissingFileId,

    /// External collaborator failure (storage, catalog lookup, submission)
    #[error("{collaborator} failed: {message}")]
    External {
        /// Name of the collaborator
        collaborator: String,
        /// Description of the error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error is a user-correctable rejection that left engine state untouched
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Rename(_)
                | Self::Pattern(_)
                | Self::InvalidTargetField { .. }
                | Self::EntryNotFound { .. }
                | Self::NothingToSubmit
                | Self::MissingFileId
        )
    }
}
