//! Error types for the plugin core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid config: {0}")]
    Validation(String),

    #[error("Malformed item {id}: {reason}")]
    ItemParse { id: String, reason: String },

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl StoreError {
    /// Numeric code for the host's RPC error mapping.
    pub fn code(&self) -> i32 {
        match self {
            StoreError::AuthenticationRequired => -32100,
            StoreError::Transport(_) => -32101,
            StoreError::Validation(_) => -32102,
            StoreError::ItemParse { .. } => -32103,
            StoreError::NotFound(_) => -32104,
            StoreError::Io(_) => -32105,
            StoreError::Json(_) => -32700,
            StoreError::Unknown(_) => -32603,
        }
    }

    /// True for failures worth retrying on a later check cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Transport(_) | StoreError::Unknown(_) | StoreError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
