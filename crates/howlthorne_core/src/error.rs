use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to read {}", path.display())]
    #[diagnostic(
        code(howlthorne_core::document_read_failed),
        help("Check that the data directory exists and is readable")
    )]
    DocumentReadFailed {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("Failed to write {}", path.display())]
    #[diagnostic(
        code(howlthorne_core::document_write_failed),
        help("Check free disk space and write permissions on the data directory")
    )]
    DocumentWriteFailed {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("Malformed JSON document {}", path.display())]
    #[diagnostic(
        code(howlthorne_core::document_malformed),
        help("The file was moved aside; restore it from a backup or let the bot start fresh")
    )]
    DocumentMalformed {
        path: PathBuf,
        #[source]
        cause: serde_json::Error,
    },

    #[error("Failed to serialize {document}")]
    #[diagnostic(code(howlthorne_core::document_serialize_failed))]
    DocumentSerializeFailed {
        document: &'static str,
        #[source]
        cause: serde_json::Error,
    },

    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(howlthorne_core::config_not_found),
        help("Create the file or point HOWLTHORNE_CONFIG at an existing one")
    )]
    ConfigNotFound {
        path: String,
        #[source]
        cause: std::io::Error,
    },

    #[error("Failed to parse configuration")]
    #[diagnostic(
        code(howlthorne_core::config_parse_failed),
        help("Fix the TOML syntax in {path}")
    )]
    ConfigParseFailed {
        path: String,
        #[source]
        cause: toml::de::Error,
    },

    #[error("Invalid configuration for `{field}`")]
    #[diagnostic(code(howlthorne_core::config_invalid), help("{reason}"))]
    ConfigInvalid { field: String, reason: String },

    #[error("Refresh failed: {reason}")]
    #[diagnostic(code(howlthorne_core::refresh_failed))]
    RefreshFailed {
        reason: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CoreError {
    /// True when the failure happened on the way to or from disk.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::DocumentReadFailed { .. }
                | Self::DocumentWriteFailed { .. }
                | Self::DocumentMalformed { .. }
                | Self::DocumentSerializeFailed { .. }
        )
    }

    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn refresh_failed(
        reason: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::RefreshFailed {
            reason: reason.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

/// Rejected input. Nothing is mutated when one of these is returned.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Slot must be 1, 2 or 3 (got `{given}`)")]
    #[diagnostic(code(howlthorne_core::invalid_slot))]
    InvalidSlot { given: String },

    #[error("Unknown class `{given}`")]
    #[diagnostic(
        code(howlthorne_core::unknown_class),
        help("Valid classes: hexcraft, alchemy, arts, history, flora, oddities")
    )]
    UnknownClass { given: String },

    #[error("Amount must be a non-negative whole number (got `{given}`)")]
    #[diagnostic(code(howlthorne_core::invalid_amount))]
    InvalidAmount { given: String },

    #[error("Slot name cannot be empty")]
    #[diagnostic(code(howlthorne_core::empty_slot_name))]
    EmptySlotName,

    #[error("`{given}` is not a user id")]
    #[diagnostic(code(howlthorne_core::invalid_user))]
    InvalidUser { given: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
