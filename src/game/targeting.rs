//! Targeting Coordinator
//!
//! Client-side state machine tracking "a move is in progress, awaiting N
//! more targets of kind K". It is advisory bookkeeping, never the source
//! of truth: every authoritative snapshot is reconciled against it and a
//! stale session is force-cancelled. It owns no game data; where target
//! legality depends on identity (graveyard revival) the caller passes the
//! identity of the prospective target.

use thiserror::Error;

use crate::game::card::{CardType, TargetDomain, TargetRule};
use crate::game::state::{MatchStatus, MatchView};

/// Result of selecting a hand card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// The card needs no targets; submit the move now.
    Immediate,
    /// Targets are being collected from this domain.
    Collecting(TargetDomain),
}

/// Result of accepting a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// Cardinality satisfied; submit the move with these targets.
    MoveReady(Vec<usize>),
    /// Still collecting; `selected` targets queued so far.
    Collecting {
        /// Number of targets queued.
        selected: usize,
    },
}

/// A rejected coordinator operation. Never destroys the session.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TargetingError {
    /// No targeting sequence is active.
    #[error("no targeting in progress")]
    NoSession,

    /// Another card's targeting sequence is active.
    #[error("finish your current action or cancel it first")]
    SelectionInProgress,

    /// The up-to-N multiset is full.
    #[error("max {0} targets")]
    LimitReached(usize),

    /// Graveyard target is a Monster or Wildcard.
    #[error("only Spellcasters can be revived")]
    NotReviveable,

    /// Graveyard targeting needs the target's identity to judge legality.
    #[error("target identity required")]
    IdentityRequired,

    /// Confirmed with an empty selection.
    #[error("no targets selected")]
    NothingSelected,
}

/// One in-progress targeting sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetingSession {
    /// Hand slot that initiated targeting.
    pub slot: usize,
    /// The card being played.
    pub card: CardType,
    /// Active target domain.
    pub domain: TargetDomain,
    /// Targets collected so far, in selection order. Duplicates are
    /// permitted and counted separately.
    pub targets: Vec<usize>,
}

/// Per-player targeting state machine.
///
/// One coordinator exists per participant; it is not shared and needs no
/// locking.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetingCoordinator {
    session: Option<TargetingSession>,
}

impl TargetingCoordinator {
    /// Create an idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// The active session, if any.
    pub fn session(&self) -> Option<&TargetingSession> {
        self.session.as_ref()
    }

    /// Whether selecting the hand card at `hand_index` is blocked.
    ///
    /// True while a sequence is active and the index is not the
    /// originating card (which stays clickable so it can be cancelled).
    pub fn is_locked(&self, hand_index: usize) -> bool {
        match &self.session {
            Some(session) => session.slot != hand_index,
            None => false,
        }
    }

    /// Select the hand card at `slot` for play.
    ///
    /// Cards with no targeting requirement signal immediate resolution
    /// and leave the coordinator idle.
    pub fn start(&mut self, slot: usize, card: CardType) -> Result<StartOutcome, TargetingError> {
        if self.session.is_some() {
            return Err(TargetingError::SelectionInProgress);
        }
        let rule = TargetRule::for_card(card);
        if !rule.requires_targets() {
            return Ok(StartOutcome::Immediate);
        }
        self.session = Some(TargetingSession {
            slot,
            card,
            domain: rule.domain,
            targets: Vec::new(),
        });
        Ok(StartOutcome::Collecting(rule.domain))
    }

    /// Accept the target at `index` in the active domain.
    ///
    /// `identity` is the card at that index, required for domains whose
    /// legality depends on it (graveyard revival). A rejected target
    /// leaves the session intact so a different one can be picked.
    pub fn add_target(
        &mut self,
        index: usize,
        identity: Option<CardType>,
    ) -> Result<AddOutcome, TargetingError> {
        let session = self.session.as_mut().ok_or(TargetingError::NoSession)?;
        let rule = TargetRule::for_card(session.card);

        if session.domain == TargetDomain::OwnGraveyard {
            let identity = identity.ok_or(TargetingError::IdentityRequired)?;
            if !identity.reviveable() {
                return Err(TargetingError::NotReviveable);
            }
        }

        if rule.up_to {
            if session.targets.len() >= rule.max_targets {
                return Err(TargetingError::LimitReached(rule.max_targets));
            }
            session.targets.push(index);
            // Move-ready only on explicit confirm, even at the cap
            return Ok(AddOutcome::Collecting { selected: session.targets.len() });
        }

        // Fixed cardinality 1: first accepted target completes the move
        let targets = vec![index];
        self.session = None;
        Ok(AddOutcome::MoveReady(targets))
    }

    /// Confirm an up-to-N selection, yielding the collected multiset.
    pub fn confirm(&mut self) -> Result<Vec<usize>, TargetingError> {
        let session = self.session.as_ref().ok_or(TargetingError::NoSession)?;
        if session.targets.is_empty() {
            return Err(TargetingError::NothingSelected);
        }
        let targets = self.session.take().map(|s| s.targets).unwrap_or_default();
        Ok(targets)
    }

    /// Abandon the active sequence, if any.
    pub fn cancel(&mut self) {
        self.session = None;
    }

    /// Reconcile against the latest authoritative snapshot.
    ///
    /// The snapshot wins wholesale: the session is force-cancelled when
    /// the turn has moved away from `me`, when the match is no longer in
    /// normal play (a forced discard or interrupt supersedes targeting),
    /// or when the match-wide pending action is some other card's.
    pub fn reconcile(&mut self, view: &MatchView, me: &str) {
        let Some(session) = &self.session else {
            return;
        };
        let superseded = view.turn_owner != me
            || view.status != MatchStatus::Playing
            || matches!(view.pending_card, Some(card) if card != session.card);
        if superseded {
            self.session = None;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
