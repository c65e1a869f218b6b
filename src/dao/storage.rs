use std::error::Error;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A write was rejected because the record it would create already exists.
    #[error("storage conflict: {message}")]
    Conflict { message: String },
    /// The game targeted by the operation does not exist.
    #[error("game `{id}` not found")]
    MissingGame { id: Uuid },
    /// The player does not take part in the targeted game.
    #[error("player `{player_id}` does not play in game `{game_id}`")]
    NotParticipant { game_id: Uuid, player_id: Uuid },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a conflict error for a move that was already recorded.
    pub fn move_already_recorded(game_id: Uuid, player_id: Uuid, x: u8, y: u8) -> Self {
        StorageError::Conflict {
            message: format!(
                "player `{player_id}` already fired at ({x}, {y}) in game `{game_id}`"
            ),
        }
    }
}
