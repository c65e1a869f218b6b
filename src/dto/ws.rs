use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::state::board::Coordinate;

#[derive(Debug, Deserialize, ToSchema, PartialEq)]
/// Messages accepted on the move stream.
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveStreamInbound {
    /// Shot at the opponent's board.
    #[serde(alias = "fire")]
    Fire(FireRequest),
    /// Any other message type; ignored.
    #[serde(other)]
    Unknown,
}

impl MoveStreamInbound {
    /// Parse one text frame.
    pub fn from_json_str(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

/// A shot at `target_player`'s board.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate, PartialEq)]
pub struct FireRequest {
    pub game_id: Uuid,
    pub firer: Uuid,
    pub target_player: Uuid,
    #[validate(range(min = 0, max = 7))]
    pub x: i32,
    #[validate(range(min = 0, max = 7))]
    pub y: i32,
}

impl FireRequest {
    /// Validated target cell.
    pub fn coordinate(&self) -> Result<Coordinate, ValidationErrors> {
        self.validate()?;
        // Both values are within 0..=7 once validated.
        Ok(Coordinate {
            x: self.x as u8,
            y: self.y as u8,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveOutcome {
    /// The cell held an opposing piece.
    Hit,
    /// Open water.
    Miss,
    /// The firer already shot at this cell; nothing was recorded.
    Duplicate,
}

impl MoveOutcome {
    /// Map a resolved move to its outcome.
    pub fn from_hit(hit: bool) -> Self {
        if hit { Self::Hit } else { Self::Miss }
    }
}

/// Result of a fire, pushed to every attached stream.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct MoveEvent {
    #[serde(rename = "type")]
    pub outcome: MoveOutcome,
    pub game_id: Uuid,
    pub firer: Uuid,
    pub target_player: Uuid,
    pub x: u8,
    pub y: u8,
}

impl MoveEvent {
    /// Build the event for a fire resolved at `cell`.
    pub fn new(request: &FireRequest, cell: Coordinate, outcome: MoveOutcome) -> Self {
        Self {
            outcome,
            game_id: request.game_id,
            firer: request.firer,
            target_player: request.target_player,
            x: cell.x,
            y: cell.y,
        }
    }
}
