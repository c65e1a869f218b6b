//! In-process [`GameStore`] backed by concurrent hash maps.
//!
//! Each game is one entry; the entry write guard serializes every mutation of that
//! game, which makes [`GameStore::resolve_move`] atomic without any extra locking.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use indexmap::IndexSet;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameEntity, MoveEntity, PieceEntity, UserEntity},
    storage::{StorageError, StorageResult},
};

/// Volatile store used by default and in tests.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    games: DashMap<Uuid, GameRecord>,
    users: DashMap<Uuid, UserEntity>,
}

struct GameRecord {
    game: GameEntity,
    pieces: IndexSet<PieceEntity>,
    moves: Vec<MoveEntity>,
}

impl MemoryGameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryInner {
    fn create_game(&self, player1: Uuid, player2: Uuid) -> GameEntity {
        let game = GameEntity::new(player1, player2);
        self.games.insert(
            game.id,
            GameRecord {
                game: game.clone(),
                pieces: IndexSet::new(),
                moves: Vec::new(),
            },
        );
        game
    }

    fn add_piece(&self, piece: PieceEntity) -> StorageResult<()> {
        let mut record = self
            .games
            .get_mut(&piece.game_id)
            .ok_or(StorageError::MissingGame { id: piece.game_id })?;
        record.pieces.insert(piece);
        Ok(())
    }

    fn list_games(&self) -> Vec<GameEntity> {
        let mut games: Vec<GameEntity> = self
            .games
            .iter()
            .map(|entry| entry.value().game.clone())
            .collect();
        games.sort_by_key(|game| game.created_at);
        games
    }

    fn list_pieces(&self, game_id: Uuid, player_id: Uuid) -> Vec<PieceEntity> {
        self.games
            .get(&game_id)
            .map(|record| {
                record
                    .pieces
                    .iter()
                    .filter(|piece| piece.player_id == player_id)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn list_moves(&self, game_id: Uuid, player_id: Uuid) -> Vec<MoveEntity> {
        self.games
            .get(&game_id)
            .map(|record| {
                record
                    .moves
                    .iter()
                    .filter(|mv| mv.player_id == player_id)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn coordinate_already_fired(&self, game_id: Uuid, player_id: Uuid, x: u8, y: u8) -> bool {
        self.games.get(&game_id).is_some_and(|record| {
            record
                .moves
                .iter()
                .any(|mv| mv.player_id == player_id && mv.x == x && mv.y == y)
        })
    }

    fn resolve_move(&self, game_id: Uuid, firer: Uuid, x: u8, y: u8) -> StorageResult<bool> {
        let mut record = self
            .games
            .get_mut(&game_id)
            .ok_or(StorageError::MissingGame { id: game_id })?;

        let opponent =
            record
                .game
                .opponent_of(firer)
                .ok_or(StorageError::NotParticipant {
                    game_id,
                    player_id: firer,
                })?;

        if record
            .moves
            .iter()
            .any(|mv| mv.player_id == firer && mv.x == x && mv.y == y)
        {
            return Err(StorageError::move_already_recorded(game_id, firer, x, y));
        }

        let hit = record
            .pieces
            .iter()
            .any(|piece| piece.player_id != firer && piece.x == x && piece.y == y);

        record.moves.push(MoveEntity {
            game_id,
            player_id: firer,
            x,
            y,
            hit,
        });
        record.game.next_turn = opponent;

        Ok(hit)
    }

    fn list_users(&self) -> Vec<UserEntity> {
        let mut users: Vec<UserEntity> = self
            .users
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        users
    }
}

impl GameStore for MemoryGameStore {
    fn create_game(
        &self,
        player1: Uuid,
        player2: Uuid,
    ) -> BoxFuture<'static, StorageResult<GameEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.create_game(player1, player2)) })
    }

    fn add_piece(&self, piece: PieceEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.add_piece(piece) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.games.get(&id).map(|record| record.game.clone())) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.list_games()) })
    }

    fn list_pieces(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PieceEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.list_pieces(game_id, player_id)) })
    }

    fn list_moves(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MoveEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.list_moves(game_id, player_id)) })
    }

    fn coordinate_already_fired(
        &self,
        game_id: Uuid,
        player_id: Uuid,
        x: u8,
        y: u8,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.coordinate_already_fired(game_id, player_id, x, y)) })
    }

    fn resolve_move(
        &self,
        game_id: Uuid,
        firer: Uuid,
        x: u8,
        y: u8,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.resolve_move(game_id, firer, x, y) })
    }

    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.users.insert(user.id, user);
            Ok(())
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.users.get(&id).map(|user| user.value().clone())) })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.list_users()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
