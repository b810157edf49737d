use thiserror::Error;

use crate::domain::reference::ExternalId;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("'{0}' is not a recognized video reference")]
    InvalidReference(String),

    #[error("block {index} is out of range for track {video_id} ({blocks} blocks)")]
    BlockOutOfRange {
        video_id: ExternalId,
        index: usize,
        blocks: usize,
    },

    #[error("track {video_id} would need {blocks} blocks, more than the limit of {max}")]
    TooManyBlocks {
        video_id: ExternalId,
        blocks: usize,
        max: usize,
    },

    #[error("stored document '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("filesystem error: {0}")]
    Fs(#[from] std::io::Error),
}
