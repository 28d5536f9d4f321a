//! Match Session Management
//!
//! Manages the lifecycle of match sessions from creation to completion.
//! Coordinates between connected clients and the authoritative match state:
//! every accepted mutation fans out a per-viewer redacted snapshot to all
//! subscribers.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use crate::game::resolve::{self, MoveIntent, RuleViolation};
use crate::game::state::{MatchState, MatchStatus};
use crate::network::protocol::ServerMessage;

/// Match identifier: the short human-typable match code.
pub type MatchId = String;

/// Session errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// No match with that code.
    #[error("match not found")]
    MatchNotFound,

    /// Match already has two players.
    #[error("match is full")]
    MatchFull,

    /// Name already taken in that match.
    #[error("name already taken")]
    NameTaken,

    /// The named player is not part of this match.
    #[error("not in match")]
    NotInMatch,
}

/// One subscribed client.
#[derive(Debug)]
struct Subscriber {
    /// Player name this connection is seated as.
    name: String,
    /// Message channel to this client.
    sender: mpsc::Sender<ServerMessage>,
}

/// A match session: the authoritative state plus its subscribers.
pub struct MatchSession {
    /// The authoritative match state.
    pub state: MatchState,
    /// Connected clients, at most one per seated player.
    subscribers: Vec<Subscriber>,
}

impl MatchSession {
    /// Create a session with its first player subscribed.
    pub fn new(match_id: MatchId, creator: &str, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            state: MatchState::new(match_id, creator),
            subscribers: vec![Subscriber { name: creator.to_string(), sender }],
        }
    }

    /// Seat the second player and subscribe their connection.
    ///
    /// Rejected when the match is full or the name is already taken;
    /// rejection leaves the match state untouched.
    pub fn join(
        &mut self,
        name: &str,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(), SessionError> {
        if self.state.is_full() {
            return Err(SessionError::MatchFull);
        }
        if self.state.player(name).is_some() {
            return Err(SessionError::NameTaken);
        }

        self.state.seat_opponent(name);
        self.subscribers.push(Subscriber { name: name.to_string(), sender });
        Ok(())
    }

    /// Replace a seated player's connection after a reconnect.
    pub fn resubscribe(
        &mut self,
        name: &str,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(), SessionError> {
        if self.state.player(name).is_none() {
            return Err(SessionError::NotInMatch);
        }
        self.subscribers.retain(|s| s.name != name);
        self.subscribers.push(Subscriber { name: name.to_string(), sender });
        Ok(())
    }

    /// Drop a player's connection without unseating them.
    ///
    /// The match keeps running; a reconnecting client resubscribes and
    /// syncs from the next snapshot.
    pub fn unsubscribe(&mut self, name: &str) {
        self.subscribers.retain(|s| s.name != name);
    }

    /// Whether any client is still connected.
    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.is_empty()
    }

    /// Resolve one move against the match state.
    ///
    /// On acceptance the mutated state is broadcast to every subscriber.
    /// On rejection the state is untouched and nothing is broadcast; the
    /// caller relays the violation to the originating client only.
    pub async fn apply_move(
        &mut self,
        actor: &str,
        intent: &MoveIntent,
    ) -> Result<(), RuleViolation> {
        resolve::apply(&mut self.state, actor, intent)?;
        self.broadcast_state().await;
        Ok(())
    }

    /// Send each subscriber its own redacted snapshot.
    pub async fn broadcast_state(&self) {
        for sub in &self.subscribers {
            let view = self.state.view_for(&sub.name);
            let _ = sub.sender.send(ServerMessage::State(view)).await;
        }
    }

    /// Send one subscriber its current redacted snapshot.
    pub async fn send_state_to(&self, name: &str) {
        if let Some(sub) = self.subscribers.iter().find(|s| s.name == name) {
            let view = self.state.view_for(name);
            let _ = sub.sender.send(ServerMessage::State(view)).await;
        }
    }

    /// Broadcast an arbitrary message to every subscriber.
    pub async fn broadcast(&self, message: ServerMessage) {
        for sub in &self.subscribers {
            let _ = sub.sender.send(message.clone()).await;
        }
    }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Manages all active match sessions, keyed by match code.
pub struct SessionManager {
    sessions: RwLock<BTreeMap<MatchId, Arc<RwLock<MatchSession>>>>,
}

impl SessionManager {
    /// Create an empty session manager.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a match for `creator` and return its code.
    ///
    /// Codes are regenerated until unused among live sessions.
    pub async fn create_match(
        &self,
        creator: &str,
        sender: mpsc::Sender<ServerMessage>,
    ) -> MatchId {
        let mut sessions = self.sessions.write().await;

        let mut code = MatchState::generate_code();
        while sessions.contains_key(&code) {
            code = MatchState::generate_code();
        }

        let session = MatchSession::new(code.clone(), creator, sender);
        sessions.insert(code.clone(), Arc::new(RwLock::new(session)));
        info!(match_id = %code, player = %creator, "match created");

        code
    }

    /// Get a session by match code.
    pub async fn get(&self, match_id: &str) -> Option<Arc<RwLock<MatchSession>>> {
        let sessions = self.sessions.read().await;
        sessions.get(match_id).cloned()
    }

    /// Seat `name` in the match with code `match_id`.
    pub async fn join_match(
        &self,
        match_id: &str,
        name: &str,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<Arc<RwLock<MatchSession>>, SessionError> {
        let session = self.get(match_id).await.ok_or(SessionError::MatchNotFound)?;
        {
            let mut guard = session.write().await;
            guard.join(name, sender)?;
        }
        info!(match_id = %match_id, player = %name, "player joined");
        Ok(session)
    }

    /// Remove a session.
    pub async fn remove(&self, match_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(match_id);
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Drop finished matches and matches every client has abandoned.
    pub async fn cleanup(&self) {
        let mut sessions = self.sessions.write().await;
        let mut to_remove = Vec::new();

        for (id, session) in sessions.iter() {
            let s = session.read().await;
            if s.state.status == MatchStatus::Finished || !s.has_subscribers() {
                to_remove.push(id.clone());
            }
        }

        for id in to_remove {
            debug!(match_id = %id, "session cleaned up");
            sessions.remove(&id);
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
