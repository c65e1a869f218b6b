//! Game lifecycle: creation with random fleets, and the read side clients poll to
//! rebuild their boards.

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::PieceEntity,
    dto::game::{CreateGameRequest, Game, Move, Piece, PlayerGame},
    error::ServiceError,
    state::{SharedState, board::random_layout},
};

/// Create a game between two registered users and lay out both fleets.
///
/// `player1` holds the first turn.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<Game, ServiceError> {
    let CreateGameRequest { player1, player2 } = request;
    if player1 == player2 {
        return Err(ServiceError::InvalidInput(
            "a game needs two distinct players".into(),
        ));
    }

    let store = state.game_store();
    for player in [player1, player2] {
        if store.find_user(player).await?.is_none() {
            return Err(ServiceError::NotFound(format!("user `{player}` not found")));
        }
    }

    let game = store.create_game(player1, player2).await?;

    // Each fleet is drawn independently; the two may share cells.
    let fleets = [player1, player2].map(|player| (player, random_layout(&mut rand::rng())));
    for (player_id, layout) in fleets {
        for cell in layout {
            store
                .add_piece(PieceEntity {
                    game_id: game.id,
                    player_id,
                    x: cell.x,
                    y: cell.y,
                })
                .await?;
        }
    }

    info!(game_id = %game.id, %player1, %player2, "game created");
    Ok(game.into())
}

/// Every stored game.
pub async fn list_games(state: &SharedState) -> Result<Vec<Game>, ServiceError> {
    let games = state.game_store().list_games().await?;
    Ok(games.into_iter().map(Game::from).collect())
}

/// Pieces owned by `player_id` in `game_id`.
pub async fn list_pieces(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<Vec<Piece>, ServiceError> {
    let pieces = state.game_store().list_pieces(game_id, player_id).await?;
    Ok(pieces.into_iter().map(Piece::from).collect())
}

/// Moves fired by `player_id` in `game_id`.
pub async fn list_moves(
    state: &SharedState,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<Vec<Move>, ServiceError> {
    let moves = state.game_store().list_moves(game_id, player_id).await?;
    Ok(moves.into_iter().map(Move::from).collect())
}

/// Oldest game in which `player_id` takes part, whatever order the store lists.
pub async fn get_opponent_and_turn(
    state: &SharedState,
    player_id: Uuid,
) -> Result<PlayerGame, ServiceError> {
    let games = state.game_store().list_games().await?;
    games
        .into_iter()
        .filter(|game| game.has_player(player_id))
        .min_by_key(|game| (game.created_at, game.id))
        .and_then(|game| {
            game.opponent_of(player_id).map(|opponent| PlayerGame {
                game_id: game.id,
                opponent,
                next_turn: game.next_turn,
            })
        })
        .ok_or_else(|| ServiceError::NotFound(format!("player `{player_id}` has no game")))
}
