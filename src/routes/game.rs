use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::game::{CreateGameRequest, Game, Move, Piece, PlayerGame},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes handling game creation and the board read side.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", get(list_games).post(create_game))
        .route(
            "/games/{game_id}/players/{player_id}/pieces",
            get(list_pieces),
        )
        .route("/games/{game_id}/players/{player_id}/moves", get(list_moves))
        .route("/players/{player_id}/game", get(player_game))
}

/// Start a game between two registered users and lay out both fleets.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = Game),
        (status = 400, description = "Both players are the same user"),
        (status = 404, description = "A player is not registered")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<Json<Game>, AppError> {
    let game = game_service::create_game(&state, payload).await?;
    Ok(Json(game))
}

#[utoipa::path(
    get,
    path = "/games",
    tag = "game",
    responses((status = 200, description = "Every game", body = [Game]))
)]
pub async fn list_games(State(state): State<SharedState>) -> Result<Json<Vec<Game>>, AppError> {
    Ok(Json(game_service::list_games(&state).await?))
}

/// Pieces owned by a player.
#[utoipa::path(
    get,
    path = "/games/{game_id}/players/{player_id}/pieces",
    tag = "game",
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("player_id" = Uuid, Path, description = "Owner of the pieces")
    ),
    responses((status = 200, description = "Player pieces", body = [Piece]))
)]
pub async fn list_pieces(
    State(state): State<SharedState>,
    Path((game_id, player_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Piece>>, AppError> {
    Ok(Json(
        game_service::list_pieces(&state, game_id, player_id).await?,
    ))
}

/// Moves fired by a player.
#[utoipa::path(
    get,
    path = "/games/{game_id}/players/{player_id}/moves",
    tag = "game",
    params(
        ("game_id" = Uuid, Path, description = "Game identifier"),
        ("player_id" = Uuid, Path, description = "Player who fired")
    ),
    responses((status = 200, description = "Player moves", body = [Move]))
)]
pub async fn list_moves(
    State(state): State<SharedState>,
    Path((game_id, player_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<Move>>, AppError> {
    Ok(Json(
        game_service::list_moves(&state, game_id, player_id).await?,
    ))
}

/// Game, opponent and next turn for a player.
#[utoipa::path(
    get,
    path = "/players/{player_id}/game",
    tag = "game",
    params(("player_id" = Uuid, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Current game of the player", body = PlayerGame),
        (status = 404, description = "The player has no game")
    )
)]
pub async fn player_game(
    State(state): State<SharedState>,
    Path(player_id): Path<Uuid>,
) -> Result<Json<PlayerGame>, AppError> {
    Ok(Json(
        game_service::get_opponent_and_turn(&state, player_id).await?,
    ))
}
