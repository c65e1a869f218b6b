pub mod board;
pub mod registry;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dao::game_store::GameStore;

pub use self::registry::{SessionRegistry, StreamId, StreamSender};

pub type SharedState = Arc<AppState>;

/// Central application state: the storage backend, attached move streams and the
/// per-game gates that serialize fire resolution.
pub struct AppState {
    game_store: Arc<dyn GameStore>,
    sessions: SessionRegistry,
    game_gates: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(game_store: Arc<dyn GameStore>) -> SharedState {
        Arc::new(Self {
            game_store,
            sessions: SessionRegistry::new(),
            game_gates: DashMap::new(),
        })
    }

    /// Storage backend shared by every service.
    pub fn game_store(&self) -> Arc<dyn GameStore> {
        self.game_store.clone()
    }

    /// Streams receiving move events.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Lock shared by every fire resolved in `game_id`.
    ///
    /// Hand it back through [`AppState::release_game_gate`] once unlocked.
    pub fn game_gate(&self, game_id: Uuid) -> Arc<Mutex<()>> {
        self.game_gates.entry(game_id).or_default().clone()
    }

    /// Return a gate taken with [`AppState::game_gate`]; the entry is evicted when
    /// no other fire holds or awaits it.
    pub fn release_game_gate(&self, game_id: Uuid, gate: Arc<Mutex<()>>) {
        drop(gate);
        // The shard lock held by `remove_if` keeps `game_gate` from cloning meanwhile.
        self.game_gates
            .remove_if(&game_id, |_, gate| Arc::strong_count(gate) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::game_store::memory::MemoryGameStore;

    #[test]
    fn game_gate_is_shared_per_game() {
        let state = AppState::new(Arc::new(MemoryGameStore::new()));
        let game = Uuid::new_v4();

        assert!(Arc::ptr_eq(&state.game_gate(game), &state.game_gate(game)));
        assert!(!Arc::ptr_eq(
            &state.game_gate(game),
            &state.game_gate(Uuid::new_v4())
        ));
    }

    #[test]
    fn released_gate_is_evicted_only_when_unused() {
        let state = AppState::new(Arc::new(MemoryGameStore::new()));
        let game = Uuid::new_v4();

        let first = state.game_gate(game);
        let second = state.game_gate(game);
        state.release_game_gate(game, first);
        assert!(state.game_gates.contains_key(&game));

        state.release_game_gate(game, second);
        assert!(state.game_gates.is_empty());
    }
}
