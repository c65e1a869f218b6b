use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::UserEntity,
    dto::user::{CreateUserRequest, User},
    error::ServiceError,
    state::SharedState,
};

/// Register a user under a fresh identifier.
pub async fn create_user(
    state: &SharedState,
    request: CreateUserRequest,
) -> Result<User, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let user = UserEntity {
        id: Uuid::new_v4(),
        name: request.name,
        email: request.email,
    };
    state.game_store().create_user(user.clone()).await?;
    info!(user_id = %user.id, "user created");

    Ok(user.into())
}

pub async fn get_user(state: &SharedState, id: Uuid) -> Result<User, ServiceError> {
    state
        .game_store()
        .find_user(id)
        .await?
        .map(User::from)
        .ok_or_else(|| ServiceError::NotFound(format!("user `{id}` not found")))
}

pub async fn list_users(state: &SharedState) -> Result<Vec<User>, ServiceError> {
    let users = state.game_store().list_users().await?;
    Ok(users.into_iter().map(User::from).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{dao::game_store::memory::MemoryGameStore, state::AppState};

    fn request(name: &str, email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: name.into(),
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn created_users_can_be_fetched_and_listed() {
        let state = AppState::new(Arc::new(MemoryGameStore::new()));

        let bob = create_user(&state, request("Bob", "bob@example.com"))
            .await
            .unwrap();
        let alice = create_user(&state, request("Alice", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(get_user(&state, bob.id).await.unwrap().name, "Bob");
        let names: Vec<_> = list_users(&state)
            .await
            .unwrap()
            .into_iter()
            .map(|user| user.name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert_ne!(alice.id, bob.id);
    }

    #[tokio::test]
    async fn invalid_users_are_rejected() {
        let state = AppState::new(Arc::new(MemoryGameStore::new()));

        let err = create_user(&state, request("", "x@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = create_user(&state, request("Eve", "eve"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(list_users(&state).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let state = AppState::new(Arc::new(MemoryGameStore::new()));
        let err = get_user(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
