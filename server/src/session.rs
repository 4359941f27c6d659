//! Session registry for connected players.
//!
//! Each connection gets a session holding its outbound line channel and a
//! single-slot staged direction. The slot is overwritten freely between
//! ticks (newest write wins, older writes are discarded) and read once per
//! tick by the orchestrator. Player ids are assigned monotonically and
//! never reused, so a reconnecting player is a new identity.

use log::info;
use shared::{Direction, PlayerId};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// One connected client and its staged input.
#[derive(Debug)]
pub struct Session {
    pub id: PlayerId,
    /// Lines queued for the connection's writer task. Unbounded so a slow
    /// peer cannot stall the tick; a dead channel tears down this session.
    outbound: mpsc::UnboundedSender<String>,
    staged_direction: Direction,
    /// Set once the player has JOINed; broadcasts go out regardless.
    pub joined: bool,
}

impl Session {
    fn new(id: PlayerId, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id,
            outbound,
            staged_direction: Direction::Right,
            joined: false,
        }
    }

    /// Overwrites the staged direction slot. Not queued: only the latest
    /// write before the next tick is honored.
    pub fn stage_direction(&mut self, direction: Direction) {
        self.staged_direction = direction;
    }

    pub fn staged_direction(&self) -> Direction {
        self.staged_direction
    }

    /// Queues a wire line for this session. Returns false if the writer
    /// task is gone and the session should be torn down.
    pub fn send_line(&self, line: &str) -> bool {
        self.outbound.send(format!("{}\n", line)).is_ok()
    }
}

/// All live sessions, keyed by player id.
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,
    next_player_id: PlayerId,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_player_id: 1,
        }
    }

    /// Registers a new connection and assigns it the next player id.
    pub fn register(&mut self, outbound: mpsc::UnboundedSender<String>) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        self.sessions.insert(id, Session::new(id, outbound));
        info!("Session {} registered", id);
        id
    }

    /// Removes a session. Returns true only on the first removal, so the
    /// caller can deregister the player exactly once.
    pub fn remove(&mut self, id: PlayerId) -> bool {
        if self.sessions.remove(&id).is_some() {
            info!("Session {} removed", id);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: PlayerId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn mark_joined(&mut self, id: PlayerId) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.joined = true;
        }
    }

    /// Staged directions of all joined sessions, read once per tick.
    pub fn staged_directions(&self) -> Vec<(PlayerId, Direction)> {
        self.sessions
            .values()
            .filter(|s| s.joined)
            .map(|s| (s.id, s.staged_direction()))
            .collect()
    }

    /// Queues a line for every connected session. A failed send only marks
    /// that session; the ids of dead sessions are returned for teardown.
    pub fn broadcast(&self, line: &str) -> Vec<PlayerId> {
        self.sessions
            .values()
            .filter(|s| !s.send_line(line))
            .map(|s| s.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
