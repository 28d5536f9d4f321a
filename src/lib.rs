//! # Brightcast Game Server
//!
//! Authoritative server for Brightcast, a two-player card duel. Clients
//! submit move intents; the server validates them against the match
//! state, mutates on acceptance, and fans a redacted snapshot out to
//! each player.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    BRIGHTCAST SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  └── rng.rs       - Deterministic Xorshift128+ PRNG          │
//! │                                                              │
//! │  game/            - Game logic (deterministic)               │
//! │  ├── card.rs      - Card types, target rules, the deck       │
//! │  ├── state.rs     - Match and player state, snapshot views   │
//! │  ├── resolve.rs   - Move validation and resolution           │
//! │  └── targeting.rs - Client-side targeting state machine      │
//! │                                                              │
//! │  network/         - Networking (non-deterministic)           │
//! │  ├── server.rs    - WebSocket server                         │
//! │  ├── protocol.rs  - Message types                            │
//! │  └── session.rs   - Match session management                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No HashMap (uses BTreeMap and Vec for stable ordering)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+, seeded by match code
//!
//! Given the same match code and move sequence, a match replays to an
//! **identical state** on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::rng::DeterministicRng;
pub use crate::game::card::{CardType, Category, CardInstance, Deck, TargetDomain, TargetRule};
pub use crate::game::state::{MatchState, PlayerState, MatchStatus, MatchView};
pub use crate::game::resolve::{MoveIntent, RuleViolation};
pub use crate::game::targeting::TargetingCoordinator;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum hand size at end of turn; excess forces discards
pub const HAND_LIMIT: usize = 8;

/// Cards dealt to each player before the first turn
pub const OPENING_HAND_SIZE: usize = 4;

/// Spellcasters in play needed to win
pub const WIN_THRESHOLD: usize = 5;

/// Upper bound on targets for an up-to-N burn
pub const DRAGON_MAX_TARGETS: usize = 3;

/// Event log entries retained per match
pub const LOG_CAP: usize = 50;
