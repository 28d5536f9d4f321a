//! Network Layer
//!
//! WebSocket server for real-time duel communication.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod protocol;
pub mod session;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage, MoveRequest, ErrorCode, ErrorReply};
pub use session::{MatchSession, MatchId, SessionManager, SessionError};
pub use server::{GameServer, ServerConfig, GameServerError};
