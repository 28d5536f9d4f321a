//! Game State Definitions
//!
//! The authoritative per-match record: two player states, turn owner,
//! turn phase, status, pending-action context, and the event log.
//! All mutation goes through `game::resolve`; this module owns the data,
//! the invariant helpers, and the per-viewer snapshot redaction.

use serde::{Serialize, Deserialize};

use crate::{HAND_LIMIT, LOG_CAP, OPENING_HAND_SIZE, WIN_THRESHOLD};
use crate::core::rng::{DeterministicRng, derive_match_seed};
use crate::game::card::{CardType, CardInstance, Category, Deck, TargetDomain};

// =============================================================================
// PLAYER STATE
// =============================================================================

/// State of a single player in the match.
///
/// Hand, board, and discard pile are all order-significant: the index is
/// the addressing key for every targeting operation, and the last element
/// of the discard pile is its top.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Player name. Unique per match; used as the stable player identity.
    pub name: String,

    /// Ordered hand.
    pub hand: Vec<CardType>,

    /// Ordered board. Instances keep original + current identity.
    pub board: Vec<CardInstance>,

    /// Discard pile, append-only. Last element is the top.
    pub discard_pile: Vec<CardType>,

    /// Draw pile.
    pub deck: Deck,
}

impl PlayerState {
    /// Create a player with a fresh shuffled deck.
    pub fn new(name: impl Into<String>, rng: &mut DeterministicRng) -> Self {
        Self {
            name: name.into(),
            hand: Vec::new(),
            board: Vec::new(),
            discard_pile: Vec::new(),
            deck: Deck::fresh(rng),
        }
    }

    /// Draw one card into the hand.
    ///
    /// An empty deck is refilled from the discard pile first; if both are
    /// empty the draw is a no-op.
    pub fn draw_card(&mut self, rng: &mut DeterministicRng) {
        if self.deck.is_empty() {
            self.deck.refill(&mut self.discard_pile, rng);
        }
        if let Some(card) = self.deck.draw() {
            self.hand.push(card);
        }
    }

    /// Move the hand card at `slot` onto the board as itself.
    ///
    /// Caller must have validated the slot.
    pub fn play_to_board(&mut self, slot: usize) -> CardType {
        let card = self.hand.remove(slot);
        self.board.push(CardInstance::new(card));
        card
    }

    /// Move the hand card at `slot` to the discard pile.
    ///
    /// Caller must have validated the slot.
    pub fn discard_from_hand(&mut self, slot: usize) -> CardType {
        let card = self.hand.remove(slot);
        self.discard_pile.push(card);
        card
    }

    /// Discard the first copy of `card` from the hand, if present.
    pub fn discard_first_from_hand(&mut self, card: CardType) -> bool {
        if let Some(slot) = self.hand.iter().position(|&c| c == card) {
            self.discard_from_hand(slot);
            true
        } else {
            false
        }
    }

    /// Move the board instance at `index` to the discard pile.
    ///
    /// The instance is discarded as its original identity.
    /// Caller must have validated the index.
    pub fn discard_from_board(&mut self, index: usize) -> CardInstance {
        let instance = self.board.remove(index);
        self.discard_pile.push(instance.original);
        instance
    }

    /// Number of cards in hand.
    pub fn hand_size(&self) -> usize {
        self.hand.len()
    }

    /// Whether the hand exceeds the hand cap.
    pub fn over_hand_limit(&self) -> bool {
        self.hand.len() > HAND_LIMIT
    }

    /// Whether the board satisfies the win condition: at least
    /// [`WIN_THRESHOLD`] Spellcasters in play that are either all-distinct
    /// kinds or all one kind.
    pub fn has_winning_board(&self) -> bool {
        let spellcasters: Vec<CardType> = self
            .board
            .iter()
            .map(|inst| inst.current)
            .filter(|c| c.category() == Category::Spellcaster)
            .collect();

        if spellcasters.len() < WIN_THRESHOLD {
            return false;
        }

        let mut distinct = spellcasters.clone();
        distinct.sort();
        distinct.dedup();
        if distinct.len() >= WIN_THRESHOLD {
            return true;
        }

        distinct.iter().any(|&kind| {
            spellcasters.iter().filter(|&&c| c == kind).count() >= WIN_THRESHOLD
        })
    }
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// Match lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Created; waiting for the second player to join.
    WaitingForPlayer,
    /// Normal play.
    Playing,
    /// Acting player's hand is over the cap; only a discard is accepted.
    WaitingForDiscard,
    /// A play is frozen; only the non-acting player's interrupt response
    /// is accepted.
    WaitingForInterrupt,
    /// Terminal. No further mutators accepted.
    Finished,
}

/// Phase within one turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnPhase {
    /// Must draw before any hand action.
    Draw,
    /// May play a card or skip.
    Main,
}

/// Match-wide pending action context.
///
/// At most one exists at a time: a match never has two concurrent
/// unresolved targeting sequences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingAction {
    /// A card is mid-resolution and its targets are being collected.
    /// Recorded when a play arrives without the targets its rule requires.
    Targeting {
        /// Acting player.
        player: String,
        /// Hand slot that initiated targeting.
        slot: usize,
        /// The card awaiting targets.
        card: CardType,
        /// Zone the targets will come from.
        domain: TargetDomain,
    },

    /// A play is on the board awaiting the opponent's interrupt choice.
    Interrupt {
        /// Effective card identity of the frozen play.
        card: CardType,
        /// Targets the play was submitted with.
        targets: Vec<usize>,
    },
}

/// The authoritative state of one match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    /// Short human-typable match code.
    pub match_id: String,

    /// The players, in join order. One entry until the match fills.
    pub players: Vec<PlayerState>,

    /// Turn owner, by name. Resolved by identity, never by index.
    pub turn_owner: String,

    /// Lifecycle status.
    pub status: MatchStatus,

    /// Phase within the current turn.
    pub phase: TurnPhase,

    /// Match-wide pending action, if any.
    pub pending: Option<PendingAction>,

    /// Winner name once `status == Finished`.
    pub winner: Option<String>,

    /// Human-readable event log, newest last, capped at [`LOG_CAP`].
    pub log: Vec<String>,

    /// Seed this match's RNG was created from (for replay).
    pub seed: u64,

    /// Whether resolving the current forced discard hands the turn over.
    /// False when the overflow came from the turn draw and the player
    /// still has their main action.
    pub(crate) end_turn_after_discard: bool,

    /// Deterministic RNG for shuffles and the opening coin flip.
    pub(crate) rng: DeterministicRng,
}

impl MatchState {
    /// Create a match with its first player. Status starts at
    /// [`MatchStatus::WaitingForPlayer`] until the opponent joins.
    pub fn new(match_id: impl Into<String>, creator: impl Into<String>) -> Self {
        let match_id = match_id.into();
        let creator = creator.into();
        let seed = derive_match_seed(match_id.as_bytes());
        let mut rng = DeterministicRng::new(seed);
        let player = PlayerState::new(creator.clone(), &mut rng);

        Self {
            match_id,
            players: vec![player],
            turn_owner: creator,
            status: MatchStatus::WaitingForPlayer,
            phase: TurnPhase::Draw,
            pending: None,
            winner: None,
            log: Vec::new(),
            seed,
            end_turn_after_discard: true,
            rng,
        }
    }

    /// Generate a short uppercase match code from a fresh UUID.
    pub fn generate_code() -> String {
        uuid::Uuid::new_v4()
            .simple()
            .to_string()[..4]
            .to_uppercase()
    }

    /// Whether the match has both players.
    pub fn is_full(&self) -> bool {
        self.players.len() == 2
    }

    /// Look up a player by name.
    pub fn player(&self, name: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.name == name)
    }

    /// Look up a player by name, mutably.
    pub fn player_mut(&mut self, name: &str) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    /// The player whose turn it is.
    pub fn current_player(&self) -> &PlayerState {
        self.players
            .iter()
            .find(|p| p.name == self.turn_owner)
            .unwrap_or(&self.players[0])
    }

    /// The other player. Only meaningful once the match is full.
    pub fn opponent(&self) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.name != self.turn_owner)
    }

    /// The opponent of a given player.
    pub fn opponent_of(&self, name: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.name != name)
    }

    /// Indices of (current player, opponent) in `players`.
    ///
    /// Used by the resolver to borrow both sides mutably.
    pub fn side_indices(&self) -> (usize, usize) {
        if self.players[0].name == self.turn_owner {
            (0, 1)
        } else {
            (1, 0)
        }
    }

    /// Seat the second player and deal the opening position: coin flip
    /// for first turn, four cards to each hand, one card from each deck
    /// milled to its discard pile.
    ///
    /// Caller must have validated that the match is not full and the
    /// name is free.
    pub fn seat_opponent(&mut self, name: impl Into<String>) {
        let name = name.into();
        let player = PlayerState::new(name.clone(), &mut self.rng);
        self.players.push(player);
        self.push_log(format!("{} joined the game!", name));

        if self.rng.coin_flip() {
            self.turn_owner = name;
        }
        let first = self.turn_owner.clone();
        self.push_log(format!("{} goes first!", first));

        for player in &mut self.players {
            for _ in 0..OPENING_HAND_SIZE {
                player.draw_card(&mut self.rng);
            }
            if let Some(card) = player.deck.draw() {
                player.discard_pile.push(card);
            }
        }

        self.status = MatchStatus::Playing;
        self.phase = TurnPhase::Draw;
    }

    /// Pass the turn to the other player and reset the phase.
    pub fn switch_turn(&mut self) {
        if let Some(other) = self.opponent().map(|p| p.name.clone()) {
            self.turn_owner = other;
        }
        self.phase = TurnPhase::Draw;
        // A turn change invalidates any targeting left pending
        if matches!(self.pending, Some(PendingAction::Targeting { .. })) {
            self.pending = None;
        }
    }

    /// Record the winner and stop accepting mutations.
    pub fn finish(&mut self, winner: String) {
        self.push_log(format!("GAME OVER! {} wins!", winner));
        self.winner = Some(winner);
        self.status = MatchStatus::Finished;
        self.pending = None;
    }

    /// Append an event-log entry, trimming the oldest past the cap.
    pub fn push_log(&mut self, message: String) {
        self.log.push(message);
        if self.log.len() > LOG_CAP {
            self.log.remove(0);
        }
    }

    /// Build the redacted snapshot delivered to `viewer`.
    pub fn view_for(&self, viewer: &str) -> MatchView {
        let reveal_enemy_hand = matches!(
            &self.pending,
            Some(PendingAction::Targeting { player, domain: TargetDomain::EnemyHand, .. })
                if player == viewer
        );

        let players = self
            .players
            .iter()
            .map(|p| {
                let own = p.name == viewer;
                let hand = if own || reveal_enemy_hand {
                    p.hand.iter().map(|&c| Some(c)).collect()
                } else {
                    vec![None; p.hand.len()]
                };
                PlayerView {
                    name: p.name.clone(),
                    hand,
                    board: p.board.clone(),
                    discard_pile: p.discard_pile.clone(),
                    deck_size: p.deck.len(),
                }
            })
            .collect();

        MatchView {
            match_id: self.match_id.clone(),
            status: self.status,
            phase: self.phase,
            turn_owner: self.turn_owner.clone(),
            winner: self.winner.clone(),
            pending_card: match &self.pending {
                Some(PendingAction::Targeting { card, .. }) => Some(*card),
                Some(PendingAction::Interrupt { card, .. }) => Some(*card),
                None => None,
            },
            players,
            log: self.log.clone(),
        }
    }
}

// =============================================================================
// SNAPSHOT VIEWS
// =============================================================================

/// One player as seen in a snapshot. Hidden hand cards are `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Player name.
    pub name: String,
    /// Hand contents; `None` entries are hidden but still sized.
    pub hand: Vec<Option<CardType>>,
    /// Board, always public.
    pub board: Vec<CardInstance>,
    /// Discard pile, always public.
    pub discard_pile: Vec<CardType>,
    /// Cards left in the deck.
    pub deck_size: usize,
}

/// The full match snapshot broadcast after every accepted mutation.
///
/// Clients replace their local view wholesale with each snapshot; there
/// is no incremental patching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchView {
    /// Match code.
    pub match_id: String,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Turn phase.
    pub phase: TurnPhase,
    /// Whose turn it is.
    pub turn_owner: String,
    /// Winner, once finished.
    pub winner: Option<String>,
    /// Card mid-resolution, if any.
    pub pending_card: Option<CardType>,
    /// Both players, redacted for this viewer.
    pub players: Vec<PlayerView>,
    /// Event log, newest last.
    pub log: Vec<String>,
}

// =============================================================================
// TESTS
// =============================================================================
