use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::user::{CreateUserRequest, User},
    error::AppError,
    services::user_service,
    state::SharedState,
};

/// User directory routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "user",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = User),
        (status = 400, description = "Empty name or invalid email")
    )
)]
pub async fn create_user(
    State(state): State<SharedState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<User>, AppError> {
    Ok(Json(user_service::create_user(&state, payload).await?))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "user",
    responses((status = 200, description = "Registered users", body = [User]))
)]
pub async fn list_users(State(state): State<SharedState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(user_service::list_users(&state).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "user",
    params(("id" = Uuid, Path, description = "User identifier")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn get_user(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    Ok(Json(user_service::get_user(&state, id).await?))
}
