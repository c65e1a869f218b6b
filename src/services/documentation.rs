use utoipa::OpenApi;

#[derive(OpenApi)]
/// OpenAPI document for the battleships backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::user::create_user,
        crate::routes::user::list_users,
        crate::routes::user::get_user,
        crate::routes::game::create_game,
        crate::routes::game::list_games,
        crate::routes::game::list_pieces,
        crate::routes::game::list_moves,
        crate::routes::game::player_game,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::user::CreateUserRequest,
            crate::dto::user::User,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::Game,
            crate::dto::game::Piece,
            crate::dto::game::Move,
            crate::dto::game::PlayerGame,
            crate::dto::ws::MoveStreamInbound,
            crate::dto::ws::FireRequest,
            crate::dto::ws::MoveEvent,
            crate::dto::ws::MoveOutcome,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "user", description = "User directory"),
        (name = "game", description = "Game creation and board state"),
        (name = "moves", description = "WebSocket move stream"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/users",
            "/users/{id}",
            "/games",
            "/games/{game_id}/players/{player_id}/pieces",
            "/games/{game_id}/players/{player_id}/moves",
            "/players/{player_id}/game",
            "/ws",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
