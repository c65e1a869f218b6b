//! Fire resolution.
//!
//! Nothing about a game is kept in memory: every fire re-reads the store, and the
//! outcome is broadcast to every attached stream.

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::storage::StorageError,
    dto::ws::{FireRequest, MoveEvent, MoveOutcome},
    error::ServiceError,
    state::{SharedState, board::Coordinate},
};

/// Resolve a fire into a Hit, Miss or Duplicate without broadcasting it.
///
/// Turn order is not enforced: either participant may fire at any time.
pub async fn process_fire(
    state: &SharedState,
    request: &FireRequest,
) -> Result<MoveEvent, ServiceError> {
    run_fire(state, request, false).await
}

/// Resolve a fire and push the outcome to every attached stream.
pub async fn handle_fire(
    state: &SharedState,
    request: FireRequest,
) -> Result<MoveEvent, ServiceError> {
    run_fire(state, &request, true).await
}

async fn run_fire(
    state: &SharedState,
    request: &FireRequest,
    broadcast: bool,
) -> Result<MoveEvent, ServiceError> {
    let cell = request
        .coordinate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let game = state
        .game_store()
        .find_game(request.game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{}` not found", request.game_id)))?;
    if !game.has_player(request.firer) {
        return Err(ServiceError::InvalidInput(format!(
            "player `{}` does not play in game `{}`",
            request.firer, game.id
        )));
    }

    // Held through the broadcast so events of one game go out in resolution order.
    let gate = state.game_gate(game.id);
    let guard = gate.lock().await;
    let result = resolve(state, request, cell, game.id).await;
    if let (true, Ok(event)) = (broadcast, &result) {
        let delivered = state.sessions().broadcast(event).await;
        info!(
            game_id = %event.game_id,
            firer = %event.firer,
            x = event.x,
            y = event.y,
            outcome = ?event.outcome,
            delivered,
            "move broadcast"
        );
    }
    drop(guard);
    state.release_game_gate(game.id, gate);

    result
}

/// Duplicate check and atomic write; the caller holds the game's gate.
async fn resolve(
    state: &SharedState,
    request: &FireRequest,
    cell: Coordinate,
    game_id: Uuid,
) -> Result<MoveEvent, ServiceError> {
    let store = state.game_store();
    if store
        .coordinate_already_fired(game_id, request.firer, cell.x, cell.y)
        .await?
    {
        debug!(%game_id, firer = %request.firer, x = cell.x, y = cell.y, "repeat fire");
        return Ok(MoveEvent::new(request, cell, MoveOutcome::Duplicate));
    }

    let outcome = match store
        .resolve_move(game_id, request.firer, cell.x, cell.y)
        .await
    {
        Ok(hit) => MoveOutcome::from_hit(hit),
        // Another writer recorded the same move between the check and the write.
        Err(StorageError::Conflict { message }) => {
            debug!(%game_id, %message, "move recorded concurrently");
            MoveOutcome::Duplicate
        }
        Err(err) => return Err(err.into()),
    };

    Ok(MoveEvent::new(request, cell, outcome))
}

#[cfg(test)]
mod tests {
    use std::{io, sync::Arc};

    use axum::extract::ws::Message;
    use futures::future::BoxFuture;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        dao::{
            game_store::{GameStore, memory::MemoryGameStore},
            models::{GameEntity, MoveEntity, PieceEntity, UserEntity},
            storage::StorageResult,
        },
        state::AppState,
    };

    struct Table {
        state: SharedState,
        game: GameEntity,
        a: Uuid,
        b: Uuid,
    }

    /// Game between A and B where B has a single piece at (5, 5) and A one at (3, 4).
    async fn table() -> Table {
        let store = MemoryGameStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let game = store.create_game(a, b).await.unwrap();
        for (player_id, x, y) in [(b, 5, 5), (a, 3, 4)] {
            store
                .add_piece(PieceEntity {
                    game_id: game.id,
                    player_id,
                    x,
                    y,
                })
                .await
                .unwrap();
        }
        Table {
            state: AppState::new(Arc::new(store)),
            game,
            a,
            b,
        }
    }

    fn fire(table: &Table, firer: Uuid, x: i32, y: i32) -> FireRequest {
        let target_player = if firer == table.a { table.b } else { table.a };
        FireRequest {
            game_id: table.game.id,
            firer,
            target_player,
            x,
            y,
        }
    }

    async fn next_turn(table: &Table) -> Uuid {
        table
            .state
            .game_store()
            .find_game(table.game.id)
            .await
            .unwrap()
            .unwrap()
            .next_turn
    }

    #[tokio::test]
    async fn miss_then_repeat_is_duplicate() {
        let table = table().await;
        let (a, b) = (table.a, table.b);

        let event = process_fire(&table.state, &fire(&table, a, 3, 4))
            .await
            .unwrap();
        assert_eq!(event.outcome, MoveOutcome::Miss);
        assert_eq!(next_turn(&table).await, b);

        let event = process_fire(&table.state, &fire(&table, b, 0, 0))
            .await
            .unwrap();
        assert_eq!(event.outcome, MoveOutcome::Miss);
        assert_eq!(next_turn(&table).await, a);

        process_fire(&table.state, &fire(&table, a, 1, 1))
            .await
            .unwrap();
        let event = process_fire(&table.state, &fire(&table, a, 3, 4))
            .await
            .unwrap();
        assert_eq!(event.outcome, MoveOutcome::Duplicate);
        assert_eq!(next_turn(&table).await, b);

        let moves = table.state.game_store().list_moves(table.game.id, a).await.unwrap();
        assert_eq!(moves.len(), 2);
    }

    #[tokio::test]
    async fn hit_only_on_opposing_piece() {
        let table = table().await;

        let event = process_fire(&table.state, &fire(&table, table.a, 5, 5))
            .await
            .unwrap();
        assert_eq!(event.outcome, MoveOutcome::Hit);

        // B's shot at B's own cell misses; A's piece is at (3, 4).
        let event = process_fire(&table.state, &fire(&table, table.b, 5, 5))
            .await
            .unwrap();
        assert_eq!(event.outcome, MoveOutcome::Miss);
        let event = process_fire(&table.state, &fire(&table, table.b, 3, 4))
            .await
            .unwrap();
        assert_eq!(event.outcome, MoveOutcome::Hit);
    }

    #[tokio::test]
    async fn out_of_turn_fire_is_accepted() {
        let table = table().await;

        for y in 0..3 {
            let event = process_fire(&table.state, &fire(&table, table.b, 0, y))
                .await
                .unwrap();
            assert_eq!(event.outcome, MoveOutcome::Miss);
        }
        assert_eq!(next_turn(&table).await, table.a);
    }

    #[tokio::test]
    async fn invalid_fires_are_rejected_before_storage() {
        let table = table().await;

        let err = process_fire(&table.state, &fire(&table, table.a, 8, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = process_fire(&table.state, &fire(&table, Uuid::new_v4(), 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let mut unknown = fire(&table, table.a, 0, 0);
        unknown.game_id = Uuid::new_v4();
        let err = process_fire(&table.state, &unknown).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let store = table.state.game_store();
        assert!(store.list_moves(table.game.id, table.a).await.unwrap().is_empty());
        assert_eq!(next_turn(&table).await, table.a);
    }

    #[tokio::test]
    async fn handle_fire_broadcasts_to_every_stream() {
        let table = table().await;
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_other, mut rx_other) = mpsc::unbounded_channel();
        table.state.sessions().attach(Uuid::new_v4(), tx_a).await;
        table.state.sessions().attach(Uuid::new_v4(), tx_other).await;

        handle_fire(&table.state, fire(&table, table.a, 5, 5))
            .await
            .unwrap();

        for rx in [&mut rx_a, &mut rx_other] {
            let Some(Message::Text(payload)) = rx.recv().await else {
                panic!("expected a text frame");
            };
            let value: serde_json::Value = serde_json::from_str(payload.as_str()).unwrap();
            assert_eq!(value["type"], "HIT");
            assert_eq!(value["firer"], table.a.to_string());
            assert_eq!(value["target_player"], table.b.to_string());
        }
    }

    #[tokio::test]
    async fn rejected_fire_is_not_broadcast() {
        let table = table().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        table.state.sessions().attach(Uuid::new_v4(), tx).await;

        assert!(
            handle_fire(&table.state, fire(&table, table.a, -1, 0))
                .await
                .is_err()
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_identical_fires_resolve_once() {
        let table = table().await;
        let request = fire(&table, table.a, 6, 2);

        let handles = (0..16)
            .map(|_| {
                let state = table.state.clone();
                let request = request.clone();
                tokio::spawn(async move { process_fire(&state, &request).await })
            })
            .collect::<Vec<_>>();

        let mut resolved = 0;
        for handle in handles {
            let event = handle.await.unwrap().unwrap();
            if event.outcome != MoveOutcome::Duplicate {
                resolved += 1;
            }
        }
        assert_eq!(resolved, 1);
    }

    /// Store whose backend is permanently unreachable.
    struct DownStore;

    fn down<T: Send + 'static>() -> BoxFuture<'static, StorageResult<T>> {
        Box::pin(async {
            Err(StorageError::unavailable(
                "backend down".into(),
                io::Error::other("connection refused"),
            ))
        })
    }

    impl GameStore for DownStore {
        fn create_game(&self, _: Uuid, _: Uuid) -> BoxFuture<'static, StorageResult<GameEntity>> {
            down()
        }
        fn add_piece(&self, _: PieceEntity) -> BoxFuture<'static, StorageResult<()>> {
            down()
        }
        fn find_game(&self, _: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
            down()
        }
        fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
            down()
        }
        fn list_pieces(
            &self,
            _: Uuid,
            _: Uuid,
        ) -> BoxFuture<'static, StorageResult<Vec<PieceEntity>>> {
            down()
        }
        fn list_moves(&self, _: Uuid, _: Uuid) -> BoxFuture<'static, StorageResult<Vec<MoveEntity>>> {
            down()
        }
        fn coordinate_already_fired(
            &self,
            _: Uuid,
            _: Uuid,
            _: u8,
            _: u8,
        ) -> BoxFuture<'static, StorageResult<bool>> {
            down()
        }
        fn resolve_move(
            &self,
            _: Uuid,
            _: Uuid,
            _: u8,
            _: u8,
        ) -> BoxFuture<'static, StorageResult<bool>> {
            down()
        }
        fn create_user(&self, _: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
            down()
        }
        fn find_user(&self, _: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
            down()
        }
        fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
            down()
        }
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            down()
        }
    }

    #[tokio::test]
    async fn storage_failure_drops_the_event() {
        let state = AppState::new(Arc::new(DownStore));
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.sessions().attach(Uuid::new_v4(), tx).await;

        let request = FireRequest {
            game_id: Uuid::new_v4(),
            firer: Uuid::new_v4(),
            target_player: Uuid::new_v4(),
            x: 0,
            y: 0,
        };
        let err = handle_fire(&state, request).await.unwrap_err();

        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn broadcasts_follow_resolution_order() {
        let table = table().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        table.state.sessions().attach(Uuid::new_v4(), tx).await;

        let handles = (0..8)
            .map(|n| {
                let state = table.state.clone();
                let request = fire(&table, table.a, n, 7 - n);
                tokio::spawn(async move { handle_fire(&state, request).await })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut broadcast = Vec::new();
        while let Ok(Message::Text(payload)) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(payload.as_str()).unwrap();
            broadcast.push((value["x"].as_u64().unwrap(), value["y"].as_u64().unwrap()));
        }
        let recorded = table
            .state
            .game_store()
            .list_moves(table.game.id, table.a)
            .await
            .unwrap()
            .into_iter()
            .map(|mv| (u64::from(mv.x), u64::from(mv.y)))
            .collect::<Vec<_>>();

        assert_eq!(broadcast.len(), 8);
        assert_eq!(broadcast, recorded);
    }
}
