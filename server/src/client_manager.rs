//! Connection bookkeeping for joined sessions
//!
//! The world state only knows about snakes. This module tracks the
//! connection side of each session:
//! - Session id allocation in registration order
//! - Peer address and connect time for logging
//! - The outbox the broadcaster pushes snapshot frames into
//! - The `max_players` capacity limit

use crate::broadcast::Outbox;
use crate::game::SessionId;
use log::info;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Connection record of one joined session
#[derive(Debug)]
pub struct Client {
    /// Session id, shared with the snake in the world state
    pub id: SessionId,
    /// Peer address, for logs only
    pub addr: SocketAddr,
    pub connected_at: Instant,
    /// Queue drained into the socket by the session's writer task
    pub outbox: Outbox,
}

impl Client {
    pub fn new(id: SessionId, addr: SocketAddr, outbox: Outbox) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            outbox,
        }
    }

    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Registry of every joined session's connection
///
/// Ids come from a counter that never goes backwards, so iterating the
/// registry (and the world state keyed by the same ids) follows
/// registration order.
pub struct ClientManager {
    clients: BTreeMap<SessionId, Client>,
    next_client_id: SessionId,
    max_clients: usize,
}

impl ClientManager {
    /// Creates an empty registry. Ids start from 1.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: BTreeMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a connection and hands out its session id
    ///
    /// Returns None if the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr, outbox: Outbox) -> Option<SessionId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        self.clients
            .insert(client_id, Client::new(client_id, addr, outbox));
        Some(client_id)
    }

    /// Drops a connection record. Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: &SessionId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!(
                "Client {} from {} disconnected after {:.1}s",
                client.id,
                client.addr,
                client.connected_for().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    pub fn get(&self, client_id: SessionId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Outboxes of every registered session, in registration order
    pub fn outboxes(&self) -> Vec<(SessionId, Outbox)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.outbox.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
