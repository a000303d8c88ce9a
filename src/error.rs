use thiserror::Error;

// ---------------------------------------------------------------------------
// Load errors
// ---------------------------------------------------------------------------

/// Why a tabular resource could not be turned into a [`Table`](crate::data::model::Table).
///
/// All variants are recoverable at the panel level: the caller keeps its last
/// good table and shows an empty-state message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Resource unreachable, non-success status, or unreadable file.
    #[error("failed to fetch {resource}: {reason}")]
    Fetch { resource: String, reason: String },

    /// Response looks like markup (an error page) rather than delimited text.
    #[error("{resource} returned markup instead of delimited text")]
    Format { resource: String },

    /// The delimited-text reader rejected a record.
    #[error("malformed record at line {line}: {reason}")]
    Parse { line: u64, reason: String },

    /// A newer load superseded this one before it completed.
    #[error("load superseded by a newer request")]
    Cancelled,
}

impl LoadError {
    pub(crate) fn fetch(resource: impl Into<String>, reason: impl ToString) -> Self {
        LoadError::Fetch {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }
}
