/// OpenAPI documentation generation.
pub mod documentation;
/// Game creation and board read side.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Fire resolution and move broadcast.
pub mod turn_service;
/// User directory.
pub mod user_service;
/// WebSocket move stream handling.
pub mod websocket_service;
