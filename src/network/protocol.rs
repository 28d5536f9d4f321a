//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are serialized as JSON for debugging ease.

use serde::{Serialize, Deserialize};

use crate::game::resolve::MoveIntent;
use crate::game::state::MatchView;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a new match as its first player.
    CreateMatch {
        /// Name to play under.
        player_name: String,
    },

    /// Join an existing match by code.
    JoinMatch {
        /// Match code to join.
        match_id: String,
        /// Name to play under.
        player_name: String,
    },

    /// Submit a move for resolution.
    Move(MoveRequest),

    /// Request the current match snapshot (for reconnection).
    SyncRequest,

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp echoed back in the pong.
        timestamp: u64,
    },

    /// Player is leaving the match.
    Leave,
}

/// One move submission: who, in which match, doing what.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Match the move addresses.
    pub match_id: String,
    /// Acting player. Must match the connection's registered name.
    pub actor: String,
    /// The intent itself.
    #[serde(flatten)]
    pub intent: MoveIntent,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirmation that this connection is seated in a match.
    MatchJoined {
        /// Match code.
        match_id: String,
        /// Name the connection is seated as.
        player_name: String,
    },

    /// Authoritative match snapshot, redacted for this viewer.
    ///
    /// Delivered to every subscriber after each accepted mutation;
    /// clients replace their local view wholesale.
    State(MatchView),

    /// A rejected request. Sent only to the originating connection.
    Error(ErrorReply),

    /// Pong response.
    Pong {
        /// Echo of the ping's timestamp.
        timestamp: u64,
        /// Server wall-clock millis.
        server_time: u64,
    },

    /// Server is shutting down.
    Shutdown {
        /// Reason shown to the player.
        reason: String,
    },
}

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Message could not be understood.
    InvalidInput,
    /// The move broke a game rule; `message` names the unmet condition.
    RuleViolation,
    /// No match with that code.
    MatchNotFound,
    /// Match already has two players.
    MatchFull,
    /// Name already taken in that match.
    NameTaken,
    /// Connection is not seated in a match.
    NotInMatch,
    /// Server-side failure.
    Internal,
}

/// Error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    /// Machine-readable category.
    pub code: ErrorCode,
    /// Human-readable reason, suitable for display.
    pub message: String,
}

impl ClientMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// =============================================================================
// TESTS
// =============================================================================
