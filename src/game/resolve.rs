//! Move Resolution
//!
//! Turns a participant's raw intent into a validated, applied mutation of
//! [`MatchState`]. Every handler is a sequence of hard gates followed by
//! the mutation: any gate failure returns a [`RuleViolation`] and leaves
//! the state untouched, so rejection is idempotent. There is no retry at
//! this layer; the caller re-prompts the human.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::game::card::{CardType, TargetDomain, TargetRule};
use crate::game::state::{MatchState, MatchStatus, PendingAction, TurnPhase};

// =============================================================================
// INTENTS
// =============================================================================

/// A participant's intent, one closed variant per move kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveIntent {
    /// Draw the turn's card (DRAW phase only).
    Draw,

    /// Play the hand card at `slot`.
    ///
    /// `targets: None` on a card that requires targets records a pending
    /// targeting context and broadcasts (this is what reveals the enemy
    /// hand for a Druid). `targets: Some(..)` must satisfy the card's
    /// rule exactly.
    Play {
        /// Hand slot of the card being played.
        slot: usize,
        /// Collected targets, domain-relative indices.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        targets: Option<Vec<usize>>,
    },

    /// Discard the hand card at `slot` (forced-discard status only).
    Discard {
        /// Hand slot to discard.
        slot: usize,
    },

    /// Draw a card and end the turn.
    Skip,

    /// The non-acting player's answer to an interrupt window.
    InterruptResponse {
        /// True to interrupt the pending play.
        choice: bool,
    },
}

// =============================================================================
// ERRORS
// =============================================================================

/// A domain precondition that failed before the move could even start.
///
/// Reported exactly like a [`RuleViolation`], to the originating actor only.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PreconditionNotMet {
    /// Alchemist requires a card already in play to copy.
    #[error("you need a card in play to copy")]
    EmptyBoard,
}

/// A rejected move. Never mutates state; always names the unmet condition.
/// The wire carries `Display` output only; the enum itself stays internal.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuleViolation {
    /// Actor is not a participant of this match.
    #[error("unknown player")]
    UnknownPlayer,

    /// Actor is not the turn owner.
    #[error("not your turn")]
    NotYourTurn,

    /// Match has not started yet.
    #[error("waiting for an opponent to join")]
    MatchNotStarted,

    /// Match is over.
    #[error("the match is finished")]
    MatchFinished,

    /// A discard or interrupt must be completed first.
    #[error("finish your current action first")]
    ActionPending,

    /// Acting in MAIN-phase before drawing.
    #[error("must draw before acting")]
    MustDrawFirst,

    /// Drawing twice in one turn.
    #[error("already drawn this turn")]
    AlreadyDrawn,

    /// `slot` does not index a hand entry.
    #[error("hand does not contain card at slot")]
    NoSuchHandSlot,

    /// Supplied target count does not satisfy the card's rule.
    #[error("card requires {required} target(s) (up to {max}), got {got}")]
    WrongTargetCount {
        /// Minimum accepted count.
        required: usize,
        /// Maximum accepted count.
        max: usize,
        /// Count supplied.
        got: usize,
    },

    /// A target index does not address the required zone.
    #[error("target out of range")]
    TargetOutOfRange,

    /// Warlock aimed at a Monster or Wildcard.
    #[error("only Spellcasters can be revived")]
    NotReviveable,

    /// Discard intent outside forced-discard status.
    #[error("not discarding right now")]
    NotDiscarding,

    /// Interrupt response without an open interrupt window.
    #[error("no interrupt to resolve")]
    NoInterruptPending,

    /// Interrupt response from the acting player.
    #[error("only your opponent may resolve the interrupt")]
    NotYourInterrupt,

    /// A domain precondition failed.
    #[error(transparent)]
    Precondition(#[from] PreconditionNotMet),
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Validate and apply one move.
///
/// On `Ok` the state has advanced and is ready to broadcast; on `Err`
/// the state is byte-identical to before the call.
pub fn apply(
    state: &mut MatchState,
    actor: &str,
    intent: &MoveIntent,
) -> Result<(), RuleViolation> {
    if state.player(actor).is_none() {
        return Err(RuleViolation::UnknownPlayer);
    }
    if state.status == MatchStatus::Finished {
        return Err(RuleViolation::MatchFinished);
    }

    let result = match intent {
        MoveIntent::Draw => draw(state, actor),
        MoveIntent::Play { slot, targets } => play(state, actor, *slot, targets.as_deref()),
        MoveIntent::Discard { slot } => discard(state, actor, *slot),
        MoveIntent::Skip => skip(state, actor),
        MoveIntent::InterruptResponse { choice } => interrupt_response(state, actor, *choice),
    };

    if let Err(violation) = &result {
        debug!(match_id = %state.match_id, actor, %violation, "rejected move");
    }
    result
}

// =============================================================================
// GATES SHARED BY TURN ACTIONS
// =============================================================================

/// Status must be PLAYING and the actor must own the turn.
fn require_turn(state: &MatchState, actor: &str) -> Result<(), RuleViolation> {
    match state.status {
        MatchStatus::WaitingForPlayer => return Err(RuleViolation::MatchNotStarted),
        MatchStatus::WaitingForDiscard | MatchStatus::WaitingForInterrupt => {
            return Err(RuleViolation::ActionPending)
        }
        MatchStatus::Playing => {}
        // Finished is rejected in `apply`
        MatchStatus::Finished => return Err(RuleViolation::MatchFinished),
    }
    if state.turn_owner != actor {
        return Err(RuleViolation::NotYourTurn);
    }
    Ok(())
}

// =============================================================================
// DRAW / SKIP
// =============================================================================

fn draw(state: &mut MatchState, actor: &str) -> Result<(), RuleViolation> {
    require_turn(state, actor)?;
    if state.phase != TurnPhase::Draw {
        return Err(RuleViolation::AlreadyDrawn);
    }

    let (ci, _) = state.side_indices();
    state.players[ci].draw_card(&mut state.rng);
    state.push_log(format!("{} drew a card.", actor));
    state.phase = TurnPhase::Main;
    // The hand cap applies to every hand-growing event, the turn draw
    // included. The turn is not over: the discard resumes MAIN.
    if state.players[ci].over_hand_limit() {
        enter_forced_discard(state, false);
    }
    Ok(())
}

fn skip(state: &mut MatchState, actor: &str) -> Result<(), RuleViolation> {
    require_turn(state, actor)?;
    if state.phase != TurnPhase::Main {
        return Err(RuleViolation::MustDrawFirst);
    }

    let (ci, _) = state.side_indices();
    state.players[ci].draw_card(&mut state.rng);
    state.push_log(format!("{} skipped and drew.", actor));
    end_turn_or_force_discard(state);
    Ok(())
}

// =============================================================================
// PLAY
// =============================================================================

fn play(
    state: &mut MatchState,
    actor: &str,
    slot: usize,
    targets: Option<&[usize]>,
) -> Result<(), RuleViolation> {
    require_turn(state, actor)?;
    if state.phase != TurnPhase::Main {
        return Err(RuleViolation::MustDrawFirst);
    }

    let (ci, oi) = state.side_indices();
    let card = *state.players[ci]
        .hand
        .get(slot)
        .ok_or(RuleViolation::NoSuchHandSlot)?;
    let rule = TargetRule::for_card(card);

    // Domain preconditions hold before targeting even starts
    if rule.domain == TargetDomain::OwnBoard && state.players[ci].board.is_empty() {
        return Err(PreconditionNotMet::EmptyBoard.into());
    }

    let targets = match targets {
        None if rule.requires_targets() => {
            // Begin collecting targets: record the pending context so the
            // next snapshot carries it (and reveals the enemy hand for a
            // Druid). Restarting with another slot replaces the context.
            state.pending = Some(PendingAction::Targeting {
                player: actor.to_string(),
                slot,
                card,
                domain: rule.domain,
            });
            return Ok(());
        }
        None => &[][..],
        Some(ts) => ts,
    };

    if !rule.accepts_count(targets.len()) {
        return Err(RuleViolation::WrongTargetCount {
            required: if rule.up_to { 1 } else { rule.max_targets },
            max: rule.max_targets,
            got: targets.len(),
        });
    }

    // Re-validate domain membership at resolution time (defends races)
    validate_domain(state, ci, oi, rule.domain, targets)?;

    // All gates passed; mutate from here on
    state.pending = None;
    let actor_name = actor.to_string();
    let opponent_name = state.players[oi].name.clone();

    if card == CardType::Alchemist {
        let copied = state.players[ci].board[targets[0]].current;
        state.players[ci].hand.remove(slot);
        state.players[ci]
            .board
            .push(crate::game::card::CardInstance::morphed(CardType::Alchemist, copied));
        state.push_log(format!("{} played Alchemist (copying {}).", actor_name, copied));
    } else {
        state.players[ci].play_to_board(slot);
        state.push_log(format!("{} played {}.", actor_name, card));
    }

    if can_interrupt(&state.players[oi].hand, card) {
        state.pending = Some(PendingAction::Interrupt {
            card,
            targets: targets.to_vec(),
        });
        state.status = MatchStatus::WaitingForInterrupt;
        state.push_log(format!("Waiting for {} to interrupt...", opponent_name));
        return Ok(());
    }

    apply_effect(state, card, targets);
    finish_or_end_turn(state);
    Ok(())
}

/// Check every target index against the zone it must address.
fn validate_domain(
    state: &MatchState,
    ci: usize,
    oi: usize,
    domain: TargetDomain,
    targets: &[usize],
) -> Result<(), RuleViolation> {
    for &t in targets {
        let in_range = match domain {
            TargetDomain::None => targets.is_empty(),
            TargetDomain::EnemyBoard => t < state.players[oi].board.len(),
            TargetDomain::EnemyHand => t < state.players[oi].hand.len(),
            TargetDomain::OwnBoard => t < state.players[ci].board.len(),
            TargetDomain::OwnHand => t < state.players[ci].hand.len(),
            TargetDomain::OwnGraveyard => t < state.players[ci].discard_pile.len(),
        };
        if !in_range {
            return Err(RuleViolation::TargetOutOfRange);
        }
        if domain == TargetDomain::OwnGraveyard
            && !state.players[ci].discard_pile[t].reviveable()
        {
            return Err(RuleViolation::NotReviveable);
        }
    }
    Ok(())
}

/// Apply a card's effect. All targets were validated against the state
/// as it stood at the gate; zone-shrinking effects re-check range as
/// they go.
fn apply_effect(state: &mut MatchState, card: CardType, targets: &[usize]) {
    let (ci, oi) = state.side_indices();
    let actor = state.players[ci].name.clone();

    match card {
        CardType::Wizard => {
            state.players[ci].draw_card(&mut state.rng);
            state.push_log(format!("{} drew 1 card (Wizard).", actor));
        }
        CardType::Sage => {
            state.players[ci].draw_card(&mut state.rng);
            state.players[ci].draw_card(&mut state.rng);
            state.push_log(format!("{} drew 2 cards (Sage).", actor));
        }
        CardType::Sorcerer => {
            let destroyed = state.players[oi].discard_from_board(targets[0]);
            state.push_log(format!("{} destroyed {}!", actor, destroyed.current));
        }
        CardType::Dragon => {
            // The dragon spends itself: off the board, into the graveyard
            if let Some(last) = state.players[ci].board.len().checked_sub(1) {
                state.players[ci].discard_from_board(last);
            }
            // Left-to-right over the supplied sequence; duplicates hit
            // whatever occupies the index after earlier removals
            let mut burned = 0;
            for &t in targets {
                if t < state.players[oi].board.len() {
                    state.players[oi].discard_from_board(t);
                    burned += 1;
                }
            }
            state.push_log(format!("{} Dragon burned {} card(s)!", actor, burned));
        }
        CardType::Druid => {
            state.players[oi].discard_from_hand(targets[0]);
            state.push_log(format!("{} forced {} to discard a card.", actor, state.players[oi].name));
        }
        CardType::Warlock => {
            let revived = state.players[ci].discard_pile.remove(targets[0]);
            state.players[ci].hand.push(revived);
            state.push_log(format!("{} returned {} from the graveyard.", actor, revived));
        }
        // The copy applied when the card entered the board
        CardType::Alchemist => {}
    }
}

/// Terminal-win check, then hand-cap check, then turn handoff.
fn finish_or_end_turn(state: &mut MatchState) {
    let (ci, _) = state.side_indices();
    if state.players[ci].has_winning_board() {
        let winner = state.players[ci].name.clone();
        state.finish(winner);
    } else {
        end_turn_or_force_discard(state);
    }
}

fn end_turn_or_force_discard(state: &mut MatchState) {
    let (ci, _) = state.side_indices();
    if state.players[ci].over_hand_limit() {
        enter_forced_discard(state, true);
    } else {
        state.status = MatchStatus::Playing;
        state.switch_turn();
    }
}

/// Put the turn owner into forced-discard status. `end_turn` records
/// whether the turn hands over once the hand is back at the cap.
fn enter_forced_discard(state: &mut MatchState, end_turn: bool) {
    let (ci, _) = state.side_indices();
    if state.status != MatchStatus::WaitingForDiscard {
        let name = state.players[ci].name.clone();
        state.push_log(format!("{} must discard down to {}.", name, crate::HAND_LIMIT));
    }
    state.status = MatchStatus::WaitingForDiscard;
    state.end_turn_after_discard = end_turn;
    // A forced discard supersedes any targeting in progress
    if matches!(state.pending, Some(PendingAction::Targeting { .. })) {
        state.pending = None;
    }
}

// =============================================================================
// FORCED DISCARD
// =============================================================================

fn discard(state: &mut MatchState, actor: &str, slot: usize) -> Result<(), RuleViolation> {
    if state.status != MatchStatus::WaitingForDiscard {
        return Err(RuleViolation::NotDiscarding);
    }
    if state.turn_owner != actor {
        return Err(RuleViolation::NotYourTurn);
    }
    let (ci, _) = state.side_indices();
    if slot >= state.players[ci].hand.len() {
        return Err(RuleViolation::NoSuchHandSlot);
    }

    let card = state.players[ci].discard_from_hand(slot);
    state.push_log(format!("{} discarded {}.", actor, card));
    if state.players[ci].over_hand_limit() {
        // Still over the cap; keep discarding
        return Ok(());
    }
    state.status = MatchStatus::Playing;
    if state.end_turn_after_discard {
        finish_or_end_turn(state);
    }
    // Otherwise the overflow came from the turn draw: same player,
    // MAIN phase, turn continues
    Ok(())
}

// =============================================================================
// INTERRUPT
// =============================================================================

/// Whether a hand can interrupt `played`.
///
/// Interrupting costs a Wizard plus a matching copy of the played card
/// (Alchemist counts as any match). A played Wizard therefore needs two
/// Wizards; a played Alchemist can only be matched by another Alchemist.
pub fn can_interrupt(hand: &[CardType], played: CardType) -> bool {
    let wizards = hand.iter().filter(|&&c| c == CardType::Wizard).count();
    if wizards == 0 {
        return false;
    }
    if played == CardType::Alchemist {
        return hand.contains(&CardType::Alchemist);
    }
    let required_wizards = if played == CardType::Wizard { 2 } else { 1 };
    if wizards < required_wizards {
        return false;
    }
    hand.contains(&played) || hand.contains(&CardType::Alchemist)
}

fn interrupt_response(
    state: &mut MatchState,
    actor: &str,
    choice: bool,
) -> Result<(), RuleViolation> {
    if state.status != MatchStatus::WaitingForInterrupt {
        return Err(RuleViolation::NoInterruptPending);
    }
    let Some(PendingAction::Interrupt { card, targets }) = state.pending.clone() else {
        return Err(RuleViolation::NoInterruptPending);
    };
    // Only the non-acting player holds the interrupt window
    if state.turn_owner == actor {
        return Err(RuleViolation::NotYourInterrupt);
    }

    state.pending = None;
    state.status = MatchStatus::Playing;
    let (ci, oi) = state.side_indices();

    if !choice {
        let name = state.players[oi].name.clone();
        state.push_log(format!("{} did not interrupt.", name));
        apply_effect(state, card, &targets);
        finish_or_end_turn(state);
        return Ok(());
    }

    // Interrupter pays the cost: a Wizard plus the matching copy
    state.players[oi].discard_first_from_hand(CardType::Wizard);
    if card == CardType::Alchemist || !state.players[oi].discard_first_from_hand(card) {
        state.players[oi].discard_first_from_hand(CardType::Alchemist);
    }

    // The frozen play fizzles off the board with no effect
    if let Some(last) = state.players[ci].board.len().checked_sub(1) {
        state.players[ci].discard_from_board(last);
    }

    let interrupter = state.players[oi].name.clone();
    state.push_log(format!("{} INTERRUPTED {}!", interrupter, card));
    state.switch_turn();
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::CardInstance;

    /// A full match forced into a known position: Alice to act in MAIN
    /// phase with an empty hand, Bob with an empty hand, both boards and
    /// graveyards empty.
    fn duel() -> MatchState {
        let mut state = MatchState::new("TEST", "Alice");
        state.seat_opponent("Bob");
        state.turn_owner = "Alice".to_string();
        state.phase = TurnPhase::Main;
        state.status = MatchStatus::Playing;
        for p in &mut state.players {
            p.hand.clear();
            p.board.clear();
            p.discard_pile.clear();
        }
        state
    }

    fn hand_of(state: &MatchState, name: &str) -> Vec<CardType> {
        state.player(name).unwrap().hand.clone()
    }

    fn play(slot: usize, targets: Vec<usize>) -> MoveIntent {
        MoveIntent::Play { slot, targets: Some(targets) }
    }

    #[test]
    fn test_must_draw_before_acting() {
        let mut state = duel();
        state.phase = TurnPhase::Draw;
        state.player_mut("Alice").unwrap().hand.push(CardType::Sage);

        let err = apply(&mut state, "Alice", &play(0, vec![])).unwrap_err();
        assert_eq!(err, RuleViolation::MustDrawFirst);

        apply(&mut state, "Alice", &MoveIntent::Draw).unwrap();
        assert_eq!(state.phase, TurnPhase::Main);

        let err = apply(&mut state, "Alice", &MoveIntent::Draw).unwrap_err();
        assert_eq!(err, RuleViolation::AlreadyDrawn);
    }

    #[test]
    fn test_not_your_turn() {
        let mut state = duel();
        state.player_mut("Bob").unwrap().hand.push(CardType::Sage);

        let err = apply(&mut state, "Bob", &play(0, vec![])).unwrap_err();
        assert_eq!(err, RuleViolation::NotYourTurn);
    }

    #[test]
    fn test_unknown_player() {
        let mut state = duel();
        let err = apply(&mut state, "Mallory", &MoveIntent::Skip).unwrap_err();
        assert_eq!(err, RuleViolation::UnknownPlayer);
    }

    #[test]
    fn test_no_such_hand_slot() {
        let mut state = duel();
        let err = apply(&mut state, "Alice", &play(3, vec![])).unwrap_err();
        assert_eq!(err, RuleViolation::NoSuchHandSlot);
    }

    #[test]
    fn test_sorcerer_end_to_end() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Sage, CardType::Sorcerer];
        state.player_mut("Bob").unwrap().board = vec![CardInstance::new(CardType::Druid)];

        apply(&mut state, "Alice", &play(1, vec![0])).unwrap();

        assert_eq!(hand_of(&state, "Alice"), vec![CardType::Sage]);
        assert!(state.player("Bob").unwrap().board.is_empty());
        assert_eq!(state.player("Bob").unwrap().discard_pile, vec![CardType::Druid]);
        assert_eq!(state.turn_owner, "Bob");
        assert_eq!(state.phase, TurnPhase::Draw);
        assert_eq!(state.status, MatchStatus::Playing);
    }

    #[test]
    fn test_fixed_cardinality_rejects_zero_and_two() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Sorcerer];
        state.player_mut("Bob").unwrap().board = vec![
            CardInstance::new(CardType::Druid),
            CardInstance::new(CardType::Sage),
        ];
        let before = state.clone();

        let err = apply(&mut state, "Alice", &play(0, vec![])).unwrap_err();
        assert!(matches!(err, RuleViolation::WrongTargetCount { got: 0, .. }));
        assert_eq!(state, before);

        let err = apply(&mut state, "Alice", &play(0, vec![0, 1])).unwrap_err();
        assert!(matches!(err, RuleViolation::WrongTargetCount { got: 2, .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn test_rejection_is_idempotent() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Sorcerer];
        let before = state.clone();

        let bad = play(0, vec![5]);
        let err1 = apply(&mut state, "Alice", &bad).unwrap_err();
        let err2 = apply(&mut state, "Alice", &bad).unwrap_err();
        assert_eq!(err1, err2);
        assert_eq!(err1.to_string(), err2.to_string());
        assert_eq!(state, before);
    }

    #[test]
    fn test_dragon_multiset_left_to_right() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Dragon];
        state.player_mut("Bob").unwrap().board = vec![
            CardInstance::new(CardType::Druid),
            CardInstance::new(CardType::Sage),
            CardInstance::new(CardType::Warlock),
            CardInstance::new(CardType::Wizard),
        ];

        // [0, 0, 1]: index 0 twice (Druid, then Sage slides into 0),
        // then index 1 (Wizard, after Warlock slid to 0)
        apply(&mut state, "Alice", &play(0, vec![0, 0, 1])).unwrap();

        let bob = state.player("Bob").unwrap();
        assert_eq!(bob.board.len(), 1);
        assert_eq!(bob.board[0].current, CardType::Warlock);
        assert_eq!(
            bob.discard_pile,
            vec![CardType::Druid, CardType::Sage, CardType::Wizard]
        );

        // The dragon spent itself into Alice's graveyard
        let alice = state.player("Alice").unwrap();
        assert!(alice.board.is_empty());
        assert_eq!(alice.discard_pile, vec![CardType::Dragon]);
    }

    #[test]
    fn test_dragon_rejects_four_targets() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Dragon];
        state.player_mut("Bob").unwrap().board =
            vec![CardInstance::new(CardType::Druid); 4];
        let before = state.clone();

        let err = apply(&mut state, "Alice", &play(0, vec![0, 1, 2, 3])).unwrap_err();
        assert!(matches!(err, RuleViolation::WrongTargetCount { got: 4, .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn test_warlock_rejects_non_reviveable() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Warlock];
        state.player_mut("Alice").unwrap().discard_pile =
            vec![CardType::Dragon, CardType::Alchemist, CardType::Sage];
        let before = state.clone();

        for bad_slot in [0, 1] {
            let err = apply(&mut state, "Alice", &play(0, vec![bad_slot])).unwrap_err();
            assert_eq!(err, RuleViolation::NotReviveable);
            assert_eq!(state, before);
        }

        apply(&mut state, "Alice", &play(0, vec![2])).unwrap();
        let alice = state.player("Alice").unwrap();
        assert_eq!(alice.hand, vec![CardType::Sage]);
        assert_eq!(alice.discard_pile, vec![CardType::Dragon, CardType::Alchemist]);
        // Warlock itself stays in play
        assert_eq!(alice.board.len(), 1);
        assert_eq!(alice.board[0].current, CardType::Warlock);
    }

    #[test]
    fn test_alchemist_requires_board() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Alchemist];
        let before = state.clone();

        let err = apply(&mut state, "Alice", &play(0, vec![0])).unwrap_err();
        assert_eq!(err, RuleViolation::Precondition(PreconditionNotMet::EmptyBoard));
        assert_eq!(state, before);
        assert_eq!(hand_of(&state, "Alice"), vec![CardType::Alchemist]);
    }

    #[test]
    fn test_alchemist_copies_current_identity() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Alchemist];
        state.player_mut("Alice").unwrap().board = vec![
            CardInstance::morphed(CardType::Alchemist, CardType::Sorcerer),
        ];

        apply(&mut state, "Alice", &play(0, vec![0])).unwrap();

        let alice = state.player("Alice").unwrap();
        assert_eq!(alice.board.len(), 2);
        assert_eq!(alice.board[1].current, CardType::Sorcerer);
        assert_eq!(alice.board[1].original, CardType::Alchemist);
    }

    #[test]
    fn test_sage_draws_two_and_may_overflow() {
        let mut state = duel();
        // 9 cards: playing Sage leaves 8, draws 2 => 10, over the cap
        state.player_mut("Alice").unwrap().hand = vec![CardType::Sage; 9];
        // Ensure the deck can serve the draws
        assert!(state.player("Alice").unwrap().deck.len() >= 2);

        apply(&mut state, "Alice", &play(0, vec![])).unwrap();
        assert_eq!(state.player("Alice").unwrap().hand_size(), 10);
        assert_eq!(state.status, MatchStatus::WaitingForDiscard);
        assert_eq!(state.turn_owner, "Alice");

        // Only a discard is accepted now
        let err = apply(&mut state, "Alice", &MoveIntent::Skip).unwrap_err();
        assert_eq!(err, RuleViolation::ActionPending);
        let err = apply(&mut state, "Alice", &MoveIntent::Draw).unwrap_err();
        assert_eq!(err, RuleViolation::ActionPending);

        // First discard: 9 cards, still over the cap
        apply(&mut state, "Alice", &MoveIntent::Discard { slot: 0 }).unwrap();
        assert_eq!(state.status, MatchStatus::WaitingForDiscard);
        assert_eq!(state.turn_owner, "Alice");

        // Second discard: 8 cards, turn passes
        apply(&mut state, "Alice", &MoveIntent::Discard { slot: 0 }).unwrap();
        assert_eq!(state.status, MatchStatus::Playing);
        assert_eq!(state.turn_owner, "Bob");
        assert_eq!(state.phase, TurnPhase::Draw);
    }

    #[test]
    fn test_draw_past_cap_forces_discard_then_turn_continues() {
        let mut state = duel();
        state.phase = TurnPhase::Draw;
        state.player_mut("Alice").unwrap().hand = vec![CardType::Wizard; crate::HAND_LIMIT];

        // The turn draw is a hand-growing event like any other
        apply(&mut state, "Alice", &MoveIntent::Draw).unwrap();
        assert_eq!(state.player("Alice").unwrap().hand_size(), crate::HAND_LIMIT + 1);
        assert_eq!(state.status, MatchStatus::WaitingForDiscard);
        assert_eq!(state.turn_owner, "Alice");

        // Only a discard is accepted while over the cap
        let err = apply(&mut state, "Alice", &MoveIntent::Skip).unwrap_err();
        assert_eq!(err, RuleViolation::ActionPending);
        let err = apply(&mut state, "Alice", &play(0, vec![])).unwrap_err();
        assert_eq!(err, RuleViolation::ActionPending);

        // Discarding back to the cap resumes the same turn in MAIN,
        // it does not hand the turn over
        apply(&mut state, "Alice", &MoveIntent::Discard { slot: 0 }).unwrap();
        assert_eq!(state.status, MatchStatus::Playing);
        assert_eq!(state.phase, TurnPhase::Main);
        assert_eq!(state.turn_owner, "Alice");
        assert_eq!(state.player("Alice").unwrap().hand_size(), crate::HAND_LIMIT);

        // Alice still has her main action: Wizard draws back to the cap
        // and the turn ends normally
        apply(&mut state, "Alice", &play(0, vec![])).unwrap();
        assert_eq!(state.player("Alice").unwrap().hand_size(), crate::HAND_LIMIT);
        assert_eq!(state.turn_owner, "Bob");
        assert_eq!(state.status, MatchStatus::Playing);
    }

    #[test]
    fn test_draw_to_cap_exactly_stays_playing() {
        let mut state = duel();
        state.phase = TurnPhase::Draw;
        state.player_mut("Alice").unwrap().hand = vec![CardType::Wizard; crate::HAND_LIMIT - 1];

        apply(&mut state, "Alice", &MoveIntent::Draw).unwrap();
        assert_eq!(state.player("Alice").unwrap().hand_size(), crate::HAND_LIMIT);
        assert_eq!(state.status, MatchStatus::Playing);
        assert_eq!(state.phase, TurnPhase::Main);
    }

    #[test]
    fn test_discard_outside_forced_status() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Sage];

        let err = apply(&mut state, "Alice", &MoveIntent::Discard { slot: 0 }).unwrap_err();
        assert_eq!(err, RuleViolation::NotDiscarding);
    }

    #[test]
    fn test_skip_draws_and_passes_turn() {
        let mut state = duel();
        apply(&mut state, "Alice", &MoveIntent::Skip).unwrap();

        assert_eq!(state.player("Alice").unwrap().hand_size(), 1);
        assert_eq!(state.turn_owner, "Bob");
        assert_eq!(state.phase, TurnPhase::Draw);
    }

    #[test]
    fn test_wizard_played_normally_draws_one() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Wizard];

        apply(&mut state, "Alice", &play(0, vec![])).unwrap();

        let alice = state.player("Alice").unwrap();
        assert_eq!(alice.hand_size(), 1);
        assert_eq!(alice.board.len(), 1);
        assert_eq!(state.turn_owner, "Bob");
    }

    #[test]
    fn test_begin_targeting_records_pending_and_resolves() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Druid];
        state.player_mut("Bob").unwrap().hand = vec![CardType::Sage, CardType::Warlock];

        // First submission without targets: pending context, no mutation
        apply(&mut state, "Alice", &MoveIntent::Play { slot: 0, targets: None }).unwrap();
        assert_eq!(
            state.pending,
            Some(PendingAction::Targeting {
                player: "Alice".to_string(),
                slot: 0,
                card: CardType::Druid,
                domain: TargetDomain::EnemyHand,
            })
        );
        assert_eq!(hand_of(&state, "Alice"), vec![CardType::Druid]);

        // Resolution clears the pending context
        apply(&mut state, "Alice", &play(0, vec![1])).unwrap();
        assert_eq!(state.pending, None);
        assert_eq!(hand_of(&state, "Bob"), vec![CardType::Sage]);
        assert_eq!(state.player("Bob").unwrap().discard_pile, vec![CardType::Warlock]);
        assert_eq!(state.turn_owner, "Bob");
    }

    #[test]
    fn test_interrupt_window_opens_and_decline_resolves() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Sorcerer];
        state.player_mut("Bob").unwrap().hand = vec![CardType::Wizard, CardType::Sorcerer];
        state.player_mut("Bob").unwrap().board = vec![CardInstance::new(CardType::Druid)];

        apply(&mut state, "Alice", &play(0, vec![0])).unwrap();
        assert_eq!(state.status, MatchStatus::WaitingForInterrupt);
        // Effect is frozen: Bob's board untouched
        assert_eq!(state.player("Bob").unwrap().board.len(), 1);

        // The acting player may not answer their own interrupt window
        let err =
            apply(&mut state, "Alice", &MoveIntent::InterruptResponse { choice: false })
                .unwrap_err();
        assert_eq!(err, RuleViolation::NotYourInterrupt);

        apply(&mut state, "Bob", &MoveIntent::InterruptResponse { choice: false }).unwrap();
        assert_eq!(state.status, MatchStatus::Playing);
        assert!(state.player("Bob").unwrap().board.is_empty());
        assert_eq!(state.turn_owner, "Bob");
        // Bob kept his interrupt cards
        assert_eq!(hand_of(&state, "Bob"), vec![CardType::Wizard, CardType::Sorcerer]);
    }

    #[test]
    fn test_interrupt_accepted_cancels_play() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Sorcerer];
        state.player_mut("Bob").unwrap().hand = vec![CardType::Wizard, CardType::Sorcerer];
        state.player_mut("Bob").unwrap().board = vec![CardInstance::new(CardType::Druid)];

        apply(&mut state, "Alice", &play(0, vec![0])).unwrap();
        apply(&mut state, "Bob", &MoveIntent::InterruptResponse { choice: true }).unwrap();

        // Bob paid Wizard + matching Sorcerer
        assert!(hand_of(&state, "Bob").is_empty());
        assert_eq!(
            state.player("Bob").unwrap().discard_pile,
            vec![CardType::Wizard, CardType::Sorcerer]
        );
        // Alice's play fizzled with no effect
        assert!(state.player("Alice").unwrap().board.is_empty());
        assert_eq!(state.player("Alice").unwrap().discard_pile, vec![CardType::Sorcerer]);
        assert_eq!(state.player("Bob").unwrap().board.len(), 1);
        // Turn passes to the interrupter
        assert_eq!(state.turn_owner, "Bob");
        assert_eq!(state.phase, TurnPhase::Draw);
        assert_eq!(state.status, MatchStatus::Playing);
    }

    #[test]
    fn test_can_interrupt_matrix() {
        use CardType::*;
        // Wizard + exact copy
        assert!(can_interrupt(&[Wizard, Sorcerer], Sorcerer));
        // Wizard + Alchemist as wildcard copy
        assert!(can_interrupt(&[Wizard, Alchemist], Sorcerer));
        // No wizard
        assert!(!can_interrupt(&[Sorcerer, Sorcerer], Sorcerer));
        // Wizard but no copy
        assert!(!can_interrupt(&[Wizard, Sage], Sorcerer));
        // Interrupting a Wizard needs two
        assert!(!can_interrupt(&[Wizard], Wizard));
        assert!(can_interrupt(&[Wizard, Wizard], Wizard));
        // Interrupting an Alchemist needs Wizard + Alchemist
        assert!(!can_interrupt(&[Wizard, Sorcerer], Alchemist));
        assert!(can_interrupt(&[Wizard, Alchemist], Alchemist));
    }

    #[test]
    fn test_win_condition_finishes_match() {
        let mut state = duel();
        state.player_mut("Alice").unwrap().hand = vec![CardType::Wizard];
        state.player_mut("Alice").unwrap().board = vec![
            CardInstance::new(CardType::Druid),
            CardInstance::new(CardType::Sage),
            CardInstance::new(CardType::Warlock),
            CardInstance::new(CardType::Sorcerer),
        ];

        apply(&mut state, "Alice", &play(0, vec![])).unwrap();

        assert_eq!(state.status, MatchStatus::Finished);
        assert_eq!(state.winner.as_deref(), Some("Alice"));

        // No further mutators accepted
        let err = apply(&mut state, "Bob", &MoveIntent::Draw).unwrap_err();
        assert_eq!(err, RuleViolation::MatchFinished);
    }

    #[test]
    fn test_actions_rejected_before_join() {
        let mut state = MatchState::new("TEST", "Alice");
        let err = apply(&mut state, "Alice", &MoveIntent::Draw).unwrap_err();
        assert_eq!(err, RuleViolation::MatchNotStarted);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // A Warlock aimed anywhere at a graveyard holding only
            // Monsters and Wildcards is rejected without mutation.
            #[test]
            fn warlock_rejection_never_mutates(target in 0usize..16) {
                let mut state = duel();
                state.player_mut("Alice").unwrap().hand = vec![CardType::Warlock];
                state.player_mut("Alice").unwrap().discard_pile =
                    vec![CardType::Dragon, CardType::Alchemist];
                let before = state.clone();

                let result = apply(&mut state, "Alice", &play(0, vec![target]));
                prop_assert!(result.is_err());
                prop_assert_eq!(&state, &before);
            }

            // However far over the cap a hand is, forced discards bring
            // it back to the cap and only then hand the turn over.
            #[test]
            fn forced_discards_restore_hand_cap(overshoot in 1usize..6) {
                let mut state = duel();
                state.player_mut("Alice").unwrap().hand =
                    vec![CardType::Druid; crate::HAND_LIMIT + overshoot];
                state.status = MatchStatus::WaitingForDiscard;
                state.end_turn_after_discard = true;

                let mut discards = 0;
                while state.status == MatchStatus::WaitingForDiscard {
                    prop_assert_eq!(state.turn_owner.as_str(), "Alice");
                    apply(&mut state, "Alice", &MoveIntent::Discard { slot: 0 }).unwrap();
                    discards += 1;
                }

                prop_assert_eq!(discards, overshoot);
                prop_assert_eq!(state.player("Alice").unwrap().hand_size(), crate::HAND_LIMIT);
                prop_assert_eq!(state.turn_owner.as_str(), "Bob");
                prop_assert_eq!(state.status, MatchStatus::Playing);
            }
        }
    }
}
