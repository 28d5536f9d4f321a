//! Game Logic Module
//!
//! All duel rules and state. 100% deterministic; the network layer never
//! mutates state except through [`resolve`].
//!
//! ## Module Structure
//!
//! - `card`: Card identities, the deck, and the targeting rules table
//! - `state`: Match state, player state, snapshot views
//! - `resolve`: Move intents, validation gates, and effect application
//! - `targeting`: Client-side targeting session state machine

pub mod card;
pub mod state;
pub mod resolve;
pub mod targeting;

// Re-export key types
pub use card::{CardType, Category, CardInstance, Deck, TargetDomain, TargetRule};
pub use state::{MatchState, PlayerState, MatchStatus, TurnPhase, PendingAction, MatchView};
pub use resolve::{MoveIntent, RuleViolation, PreconditionNotMet};
pub use targeting::{TargetingCoordinator, TargetingSession, TargetingError};
