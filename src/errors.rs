use std::io;

use thiserror::Error;

use crate::types::SourceId;

/// Error type for corpus fetch, schema, and sampling-configuration failures.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// A provider could not produce the requested source/split.
    #[error("data source '{source_id}' is unavailable: {reason}")]
    SourceUnavailable {
        /// Resolved source id.
        source_id: SourceId,
        /// Underlying failure.
        reason: String,
    },
    /// A collection does not have the shape a strategy expects.
    #[error("schema error in '{collection}': {details}")]
    Schema {
        /// Collection name.
        collection: String,
        /// What was wrong.
        details: String,
    },
    /// A requested sample size or range does not fit the input.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Filesystem failure while writing outputs.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// JSON encoding failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CorpusError {
    pub(crate) fn schema(collection: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Schema {
            collection: collection.into(),
            details: details.into(),
        }
    }

    pub(crate) fn unavailable(source_id: impl Into<SourceId>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }
}
