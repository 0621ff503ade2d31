use thiserror::Error;

pub type Result<T> = std::result::Result<T, RebalanceError>;

#[derive(Debug, Error)]
pub enum RebalanceError {
    #[error("Channel {short_channel_id} is missing its {side} endpoint")]
    MissingEndpoint {
        short_channel_id: String,
        side: &'static str,
    },

    #[error("Duplicate channel record for {from} -> {to}")]
    DuplicateChannel { from: String, to: String },

    #[error("Invalid channel {id}: {reason}")]
    InvalidChannel { id: String, reason: String },

    #[error("No channel from {from} to {to} in graph")]
    MissingChannel { from: String, to: String },

    #[error("Fee accumulation overflowed at hop {hop}")]
    FeeOverflow { hop: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}
