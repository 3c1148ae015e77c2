use thiserror::Error;

use crate::domain::id::MixtapeId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("mixtape {0} not found")]
    MixtapeNotFound(MixtapeId),

    #[error("malformed document for mixtape {id}: {source}")]
    BadDoc {
        id: MixtapeId,
        source: serde_json::Error,
    },

    #[error("invalid mixtape id")]
    InvalidMixtapeId,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
