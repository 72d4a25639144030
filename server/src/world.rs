//! The single lock around all mutable server state.
//!
//! Connection handlers and the tick loop only reach the world through the
//! methods below. Each one takes the lock once, so a tick's movement pass is
//! never observed half-done and a heading change lands either before or
//! after a tick, never inside it.

use crate::broadcast::{Broadcast, Frame, Outbox};
use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::error::JoinError;
use crate::game::{Arena, GameState, SessionId};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use snake_shared::{Direction, Snapshot};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

struct Inner {
    game: GameState,
    clients: ClientManager,
    rng: StdRng,
}

pub struct SharedWorld {
    inner: Mutex<Inner>,
}

impl SharedWorld {
    /// Builds the world and lays out the initial food.
    pub fn new(config: &ServerConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut game = GameState::new(Arena::new(config.width, config.height), config.max_foods);
        game.refill_food(&mut rng);

        Self {
            inner: Mutex::new(Inner {
                game,
                clients: ClientManager::new(config.max_players),
                rng,
            }),
        }
    }

    /// Registers a session, spawns its snake and queues its first snapshot.
    ///
    /// The first frame is queued under the same lock as the registration, so
    /// it always precedes the first tick frame the session receives.
    pub async fn join(
        &self,
        name: &str,
        addr: SocketAddr,
        outbox: Outbox,
    ) -> Result<SessionId, JoinError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let Some(id) = inner.clients.add_client(addr, outbox.clone()) else {
            warn!("Rejecting '{}' from {}: server full", name, addr);
            return Err(JoinError::ServerFull);
        };

        if let Err(e) = inner.game.add_player(id, name, &mut inner.rng) {
            warn!("Rejecting '{}' from {}: {}", name, addr, e);
            inner.clients.remove_client(&id);
            return Err(e);
        }

        match inner.game.snapshot().encode() {
            Ok(line) => {
                if outbox.try_send(Frame::from(line)).is_err() {
                    debug!("Client {} outbox rejected the initial snapshot", id);
                }
            }
            Err(e) => warn!("Failed to encode initial snapshot for {}: {}", id, e),
        }

        info!("Player {} '{}' joined from {}", id, name, addr);
        Ok(id)
    }

    /// Removes the session from the world and the registry.
    pub async fn leave(&self, id: SessionId) -> Option<String> {
        let mut inner = self.inner.lock().await;
        inner.clients.remove_client(&id);
        inner.game.remove_player(&id).map(|snake| snake.name)
    }

    /// Queues a heading change for the next tick. Returns whether it was accepted.
    pub async fn steer(&self, id: SessionId, direction: Direction) -> bool {
        self.inner.lock().await.game.steer(id, direction)
    }

    /// Runs one simulation step and encodes the result for broadcasting.
    pub async fn tick(&self) -> Result<Broadcast, serde_json::Error> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let report = inner.game.tick(&mut inner.rng);
        if !report.deaths.is_empty() || report.food_eaten > 0 {
            debug!(
                "Tick {}: {} died, {} food eaten, {} of {} alive",
                inner.game.tick,
                report.deaths.len(),
                report.food_eaten,
                inner.game.alive_count(),
                inner.game.player_count()
            );
        }
        let line = inner.game.snapshot().encode()?;

        Ok(Broadcast::new(
            inner.game.tick,
            Arc::from(line),
            inner.clients.outboxes(),
        ))
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.lock().await.game.snapshot()
    }

    pub async fn player_count(&self) -> usize {
        self.inner.lock().await.game.player_count()
    }

    pub async fn current_tick(&self) -> u64 {
        self.inner.lock().await.game.tick
    }
}
