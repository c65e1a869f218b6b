#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{GameEntity, MoveEntity, PieceEntity, UserEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for games, pieces, moves and users.
///
/// Every method is a single atomic write or a read; nothing is cached between calls.
pub trait GameStore: Send + Sync {
    /// Persist a new game between two players, `player1` holding the first turn.
    fn create_game(
        &self,
        player1: Uuid,
        player2: Uuid,
    ) -> BoxFuture<'static, StorageResult<GameEntity>>;
    /// Record a piece; inserting the same piece twice is a no-op.
    fn add_piece(&self, piece: PieceEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Game by id, `None` when unknown.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Every game, oldest first.
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Pieces owned by `player_id`; empty for an unknown game.
    fn list_pieces(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PieceEntity>>>;
    /// Moves fired by `player_id`, in the order they were recorded.
    fn list_moves(
        &self,
        game_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MoveEntity>>>;
    /// Whether `player_id` already has a recorded move at `(x, y)` in the game.
    fn coordinate_already_fired(
        &self,
        game_id: Uuid,
        player_id: Uuid,
        x: u8,
        y: u8,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Atomically compute the hit flag, append the move and hand the turn to the
    /// firer's opponent. Returns whether the shot hit.
    ///
    /// Fails with [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict)
    /// when the move is already recorded, leaving the game untouched.
    fn resolve_move(
        &self,
        game_id: Uuid,
        firer: Uuid,
        x: u8,
        y: u8,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Register a user.
    fn create_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// User by id, `None` when unknown.
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Every registered user, ordered by name.
    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;
    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
