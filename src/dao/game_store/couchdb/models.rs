use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::{
    game_store::couchdb::error::CouchDaoError,
    models::{GameEntity, MoveEntity, PieceEntity, UserEntity},
};

pub const GAME_PREFIX: &str = "game::";
pub const USER_PREFIX: &str = "user::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub game: GameBody,
}

/// Game aggregate body; pieces and moves are embedded so a move and the turn flip
/// land in the same revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameBody {
    pub player1: Uuid,
    pub player2: Uuid,
    pub created_at: SystemTime,
    pub next_turn: Uuid,
    #[serde(default)]
    pub pieces: Vec<CellBody>,
    #[serde(default)]
    pub moves: Vec<MoveBody>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellBody {
    pub player_id: Uuid,
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoveBody {
    pub player_id: Uuid,
    pub x: u8,
    pub y: u8,
    pub hit: bool,
}

impl From<GameEntity> for CouchGameDocument {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game_doc_id(game.id),
            rev: None,
            game: GameBody {
                player1: game.player1,
                player2: game.player2,
                created_at: game.created_at,
                next_turn: game.next_turn,
                pieces: Vec::new(),
                moves: Vec::new(),
            },
        }
    }
}

impl CouchGameDocument {
    pub fn to_entity(&self) -> Result<GameEntity, CouchDaoError> {
        Ok(GameEntity {
            id: extract_uuid(&self.id)?,
            player1: self.game.player1,
            player2: self.game.player2,
            created_at: self.game.created_at,
            next_turn: self.game.next_turn,
        })
    }
}

impl GameBody {
    pub fn has_move(&self, player_id: Uuid, x: u8, y: u8) -> bool {
        self.moves
            .iter()
            .any(|mv| mv.player_id == player_id && mv.x == x && mv.y == y)
    }

    pub fn pieces_of(&self, game_id: Uuid, player_id: Uuid) -> Vec<PieceEntity> {
        self.pieces
            .iter()
            .filter(|cell| cell.player_id == player_id)
            .map(|cell| PieceEntity {
                game_id,
                player_id,
                x: cell.x,
                y: cell.y,
            })
            .collect()
    }

    pub fn moves_of(&self, game_id: Uuid, player_id: Uuid) -> Vec<MoveEntity> {
        self.moves
            .iter()
            .filter(|mv| mv.player_id == player_id)
            .map(|mv| MoveEntity {
                game_id,
                player_id,
                x: mv.x,
                y: mv.y,
                hit: mv.hit,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchUserDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub name: String,
    pub email: String,
}

impl From<UserEntity> for CouchUserDocument {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user_doc_id(user.id),
            rev: None,
            name: user.name,
            email: user.email,
        }
    }
}

impl TryFrom<CouchUserDocument> for UserEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchUserDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: extract_uuid(&doc.id)?,
            name: doc.name,
            email: doc.email,
        })
    }
}

pub fn game_doc_id(id: Uuid) -> String {
    format!("{}{}", GAME_PREFIX, id)
}

pub fn user_doc_id(id: Uuid) -> String {
    format!("{}{}", USER_PREFIX, id)
}

pub fn extract_uuid(doc_id: &str) -> Result<Uuid, CouchDaoError> {
    let (_, id) = doc_id
        .split_once("::")
        .ok_or_else(|| CouchDaoError::InvalidDocId {
            doc_id: doc_id.to_string(),
            kind: "missing separator",
        })?;

    Uuid::parse_str(id).map_err(|_| CouchDaoError::InvalidDocId {
        doc_id: doc_id.to_string(),
        kind: "invalid UUID",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_ids_roundtrip() {
        let id = Uuid::new_v4();
        assert_eq!(extract_uuid(&game_doc_id(id)).unwrap(), id);
        assert_eq!(extract_uuid(&user_doc_id(id)).unwrap(), id);
    }

    #[test]
    fn malformed_doc_ids_are_rejected() {
        assert!(matches!(
            extract_uuid("game-123"),
            Err(CouchDaoError::InvalidDocId {
                kind: "missing separator",
                ..
            })
        ));
        assert!(matches!(
            extract_uuid("game::not-a-uuid"),
            Err(CouchDaoError::InvalidDocId {
                kind: "invalid UUID",
                ..
            })
        ));
    }

    #[test]
    fn game_document_flattens_body() {
        let game = GameEntity::new(Uuid::new_v4(), Uuid::new_v4());
        let doc = CouchGameDocument::from(game.clone());
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["_id"], Value::String(game_doc_id(game.id)));
        assert!(json.get("_rev").is_none());
        assert_eq!(json["next_turn"], Value::String(game.player1.to_string()));

        let parsed: CouchGameDocument = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.to_entity().unwrap(), game);
    }
}
