use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, MoveEntity, PieceEntity},
    dto::format_system_time,
};

/// Payload used to start a game between two registered users.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGameRequest {
    /// Moves first.
    pub player1: Uuid,
    pub player2: Uuid,
}

/// Game record returned by the REST API.
#[derive(Debug, Serialize, ToSchema)]
pub struct Game {
    pub id: Uuid,
    pub player1: Uuid,
    pub player2: Uuid,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Participant expected to fire next.
    pub next_turn: Uuid,
}

impl From<GameEntity> for Game {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game.id,
            player1: game.player1,
            player2: game.player2,
            created_at: format_system_time(game.created_at),
            next_turn: game.next_turn,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Piece {
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub x: u8,
    pub y: u8,
}

impl From<PieceEntity> for Piece {
    fn from(piece: PieceEntity) -> Self {
        Self {
            game_id: piece.game_id,
            player_id: piece.player_id,
            x: piece.x,
            y: piece.y,
        }
    }
}

/// A recorded fire; `player_id` is the firer.
#[derive(Debug, Serialize, ToSchema)]
pub struct Move {
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub x: u8,
    pub y: u8,
    pub hit: bool,
}

impl From<MoveEntity> for Move {
    fn from(mv: MoveEntity) -> Self {
        Self {
            game_id: mv.game_id,
            player_id: mv.player_id,
            x: mv.x,
            y: mv.y,
            hit: mv.hit,
        }
    }
}

/// Where a player currently plays, against whom, and whose turn it is.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct PlayerGame {
    pub game_id: Uuid,
    pub opponent: Uuid,
    pub next_turn: Uuid,
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    #[test]
    fn game_timestamp_is_rfc3339() {
        let mut entity = GameEntity::new(Uuid::new_v4(), Uuid::new_v4());
        entity.created_at = SystemTime::UNIX_EPOCH + Duration::from_secs(86_400);

        let game = Game::from(entity);
        assert_eq!(game.created_at, "1970-01-02T00:00:00Z");
    }
}
