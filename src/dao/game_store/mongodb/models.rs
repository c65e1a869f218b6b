use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{GameEntity, MoveEntity, PieceEntity, UserEntity};

use super::error::MongoDaoError;

pub const GAME_COLLECTION_NAME: &str = "games";
pub const USER_COLLECTION_NAME: &str = "users";

/// Game aggregate: the game row plus its embedded pieces and moves, so recording a
/// move and flipping the turn is a single document update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub player1: String,
    pub player2: String,
    pub created_at: DateTime,
    pub next_turn: String,
    #[serde(default)]
    pub pieces: Vec<MongoCell>,
    #[serde(default)]
    pub moves: Vec<MongoMove>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCell {
    pub player_id: String,
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMove {
    pub player_id: String,
    pub x: u8,
    pub y: u8,
    pub hit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id.to_string(),
            player1: value.player1.to_string(),
            player2: value.player2.to_string(),
            created_at: DateTime::from_system_time(value.created_at),
            next_turn: value.next_turn.to_string(),
            pieces: Vec::new(),
            moves: Vec::new(),
        }
    }
}

impl MongoGameDocument {
    pub fn to_entity(&self) -> Result<GameEntity, MongoDaoError> {
        Ok(GameEntity {
            id: self.parse(&self.id)?,
            player1: self.parse(&self.player1)?,
            player2: self.parse(&self.player2)?,
            created_at: self.created_at.to_system_time(),
            next_turn: self.parse(&self.next_turn)?,
        })
    }

    pub fn pieces_of(&self, game_id: Uuid, player_id: Uuid) -> Vec<PieceEntity> {
        let player = player_id.to_string();
        self.pieces
            .iter()
            .filter(|cell| cell.player_id == player)
            .map(|cell| PieceEntity {
                game_id,
                player_id,
                x: cell.x,
                y: cell.y,
            })
            .collect()
    }

    pub fn moves_of(&self, game_id: Uuid, player_id: Uuid) -> Vec<MoveEntity> {
        let player = player_id.to_string();
        self.moves
            .iter()
            .filter(|mv| mv.player_id == player)
            .map(|mv| MoveEntity {
                game_id,
                player_id,
                x: mv.x,
                y: mv.y,
                hit: mv.hit,
            })
            .collect()
    }

    /// Whether a piece owned by anyone but `firer` sits at `(x, y)`.
    pub fn opposing_piece_at(&self, firer: Uuid, x: u8, y: u8) -> bool {
        let firer = firer.to_string();
        self.pieces
            .iter()
            .any(|cell| cell.player_id != firer && cell.x == x && cell.y == y)
    }

    fn parse(&self, value: &str) -> Result<Uuid, MongoDaoError> {
        Uuid::parse_str(value).map_err(|_| MongoDaoError::CorruptDocument {
            collection: GAME_COLLECTION_NAME,
            id: self.id.clone(),
            kind: "invalid UUID",
        })
    }
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            email: value.email,
        }
    }
}

impl TryFrom<MongoUserDocument> for UserEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoUserDocument) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id).map_err(|_| MongoDaoError::CorruptDocument {
            collection: USER_COLLECTION_NAME,
            id: value.id.clone(),
            kind: "invalid UUID",
        })?;
        Ok(Self {
            id,
            name: value.name,
            email: value.email,
        })
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

/// Sub-document matching one player's shot (or piece) at a cell.
pub fn cell_match(player_id: Uuid, x: u8, y: u8) -> Document {
    doc! {
        "player_id": player_id.to_string(),
        "x": i32::from(x),
        "y": i32::from(y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_document(game: &GameEntity) -> MongoGameDocument {
        let mut document = MongoGameDocument::from(game.clone());
        document.pieces = vec![
            MongoCell {
                player_id: game.player1.to_string(),
                x: 1,
                y: 1,
            },
            MongoCell {
                player_id: game.player2.to_string(),
                x: 4,
                y: 6,
            },
        ];
        document.moves = vec![MongoMove {
            player_id: game.player1.to_string(),
            x: 4,
            y: 6,
            hit: true,
        }];
        document
    }

    #[test]
    fn game_document_converts_back_to_entity() {
        let game = GameEntity::new(Uuid::new_v4(), Uuid::new_v4());
        let document = MongoGameDocument::from(game.clone());

        assert_eq!(document.id, game.id.to_string());
        assert!(document.pieces.is_empty() && document.moves.is_empty());

        let entity = document.to_entity().unwrap();
        assert_eq!(entity.id, game.id);
        assert_eq!(entity.player1, game.player1);
        assert_eq!(entity.next_turn, game.player1);
    }

    #[test]
    fn invalid_uuid_is_reported_as_corrupt() {
        let mut document = MongoGameDocument::from(GameEntity::new(Uuid::new_v4(), Uuid::new_v4()));
        document.next_turn = "not-a-uuid".into();

        assert!(matches!(
            document.to_entity(),
            Err(MongoDaoError::CorruptDocument {
                collection: GAME_COLLECTION_NAME,
                ..
            })
        ));
    }

    #[test]
    fn pieces_and_moves_are_filtered_by_player() {
        let game = GameEntity::new(Uuid::new_v4(), Uuid::new_v4());
        let document = game_document(&game);

        let pieces = document.pieces_of(game.id, game.player2);
        assert_eq!(
            pieces,
            vec![PieceEntity {
                game_id: game.id,
                player_id: game.player2,
                x: 4,
                y: 6,
            }]
        );

        let moves = document.moves_of(game.id, game.player1);
        assert_eq!(moves.len(), 1);
        assert!(moves[0].hit);
        assert!(document.moves_of(game.id, game.player2).is_empty());
    }

    #[test]
    fn only_opposing_pieces_count_as_hits() {
        let game = GameEntity::new(Uuid::new_v4(), Uuid::new_v4());
        let document = game_document(&game);

        assert!(document.opposing_piece_at(game.player1, 4, 6));
        assert!(!document.opposing_piece_at(game.player2, 4, 6));
        assert!(!document.opposing_piece_at(game.player1, 1, 1));
        assert!(!document.opposing_piece_at(game.player1, 0, 0));
    }

    #[test]
    fn cell_match_mirrors_stored_cell_layout() {
        let player = Uuid::new_v4();
        let cell = cell_match(player, 3, 7);

        // `$addToSet` compares whole sub-documents, field order included.
        assert_eq!(cell.keys().collect::<Vec<_>>(), vec!["player_id", "x", "y"]);
        assert_eq!(cell.get_str("player_id").unwrap(), player.to_string());
        assert_eq!(cell.get_i32("x").unwrap(), 3);
        assert_eq!(cell.get_i32("y").unwrap(), 7);
        assert_eq!(cell_match(player, 3, 7), cell);
    }
}
