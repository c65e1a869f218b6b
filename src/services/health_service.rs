use tracing::warn;

use crate::{
    dto::health::{HealthResponse, HealthStatus},
    state::SharedState,
};

/// Probe the storage backend and report how many move streams are attached.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let status = match state.game_store().health_check().await {
        Ok(()) => HealthStatus::Ok,
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthStatus::Degraded
        }
    };

    HealthResponse {
        status,
        streams: state.sessions().len().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;
    use crate::{dao::game_store::memory::MemoryGameStore, state::AppState};

    #[tokio::test]
    async fn memory_store_is_healthy() {
        let state = AppState::new(Arc::new(MemoryGameStore::new()));
        let (tx, _rx) = mpsc::unbounded_channel();
        state.sessions().attach(Uuid::new_v4(), tx).await;

        let response = health_status(&state).await;
        assert_eq!(response.status, HealthStatus::Ok);
        assert_eq!(response.streams, 1);
    }
}
