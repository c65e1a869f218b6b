use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Game record shared by every storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// First participant; holds the first turn.
    pub player1: Uuid,
    /// Second participant.
    pub player2: Uuid,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Participant expected to fire next.
    pub next_turn: Uuid,
}

impl GameEntity {
    /// Build a fresh game where `player1` moves first.
    pub fn new(player1: Uuid, player2: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            player1,
            player2,
            created_at: SystemTime::now(),
            next_turn: player1,
        }
    }

    /// Whether `player_id` is one of the two participants.
    pub fn has_player(&self, player_id: Uuid) -> bool {
        self.player1 == player_id || self.player2 == player_id
    }

    /// The other participant, or `None` when `player_id` does not play this game.
    pub fn opponent_of(&self, player_id: Uuid) -> Option<Uuid> {
        if self.player1 == player_id {
            Some(self.player2)
        } else if self.player2 == player_id {
            Some(self.player1)
        } else {
            None
        }
    }
}

/// Single-cell piece owned by one player of one game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PieceEntity {
    /// Game the piece belongs to.
    pub game_id: Uuid,
    /// Owner of the piece.
    pub player_id: Uuid,
    /// Column, `0..BOARD_SIZE`.
    pub x: u8,
    /// Row, `0..BOARD_SIZE`.
    pub y: u8,
}

/// Recorded fire; `player_id` is the player who fired.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveEntity {
    /// Game the move was fired in.
    pub game_id: Uuid,
    /// Player who fired.
    pub player_id: Uuid,
    /// Target column.
    pub x: u8,
    /// Target row.
    pub y: u8,
    /// Whether an opposing piece occupied the target cell.
    pub hit: bool,
}

/// Registered user identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Stable identifier for the user.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}
