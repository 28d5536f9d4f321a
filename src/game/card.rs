//! Card Identities and Targeting Rules
//!
//! The closed set of card identities, the per-player deck, and the static
//! rules table mapping each identity to its targeting requirement.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;

// =============================================================================
// CARD TYPE
// =============================================================================

/// The closed set of card identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum CardType {
    /// Look at the opponent's hand and force a discard of your choice.
    Druid = 0,
    /// Draw 2 cards.
    Sage = 1,
    /// Return one Spellcaster from your discard pile to your hand.
    Warlock = 2,
    /// Send one of the opponent's board cards to their discard pile.
    Sorcerer = 3,
    /// Draw 1 card, or interrupt an opponent's play from your hand.
    Wizard = 4,
    /// Copy a Spellcaster you have in play; stays in play as that copy.
    Alchemist = 5,
    /// Send up to 3 of the opponent's board cards to their discard pile.
    Dragon = 6,
}

/// Card category. Only Spellcasters count toward the win condition
/// and only Spellcasters can be revived from the discard pile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// The five core casters.
    Spellcaster,
    /// Dragon.
    Monster,
    /// Alchemist.
    Wildcard,
}

impl CardType {
    /// Every card identity, in deck-building order.
    pub const ALL: [CardType; 7] = [
        CardType::Druid,
        CardType::Sage,
        CardType::Warlock,
        CardType::Sorcerer,
        CardType::Wizard,
        CardType::Alchemist,
        CardType::Dragon,
    ];

    /// Human-readable name, as shown in the event log.
    pub fn display_name(self) -> &'static str {
        match self {
            CardType::Druid => "Druid",
            CardType::Sage => "Sage",
            CardType::Warlock => "Warlock",
            CardType::Sorcerer => "Sorcerer",
            CardType::Wizard => "Wizard",
            CardType::Alchemist => "Alchemist",
            CardType::Dragon => "Dragon",
        }
    }

    /// Card category.
    pub fn category(self) -> Category {
        match self {
            CardType::Alchemist => Category::Wildcard,
            CardType::Dragon => Category::Monster,
            _ => Category::Spellcaster,
        }
    }

    /// Copies of this card in a fresh deck.
    pub fn deck_count(self) -> usize {
        match self.category() {
            Category::Spellcaster => 6,
            Category::Monster | Category::Wildcard => 2,
        }
    }

    /// Whether a Warlock may return this card from the discard pile.
    /// Monsters and Wildcards are non-reviveable.
    pub fn reviveable(self) -> bool {
        self.category() == Category::Spellcaster
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// =============================================================================
// CARD INSTANCE
// =============================================================================

/// A card in play on a board.
///
/// Retains its original identity even when its current identity has been
/// changed by a copy effect. `original` never changes after creation;
/// `current` diverges at most once, at creation time, via [`CardInstance::morphed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInstance {
    /// Identity the card currently acts as.
    pub current: CardType,
    /// Identity printed on the card. Returns to the discard pile as this.
    pub original: CardType,
}

impl CardInstance {
    /// Play a card to the board as itself.
    pub fn new(card: CardType) -> Self {
        Self { current: card, original: card }
    }

    /// Play a card to the board already transformed into another identity.
    pub fn morphed(original: CardType, current: CardType) -> Self {
        Self { current, original }
    }

    /// Whether this instance has been transformed.
    pub fn is_morphed(&self) -> bool {
        self.current != self.original
    }
}

// =============================================================================
// TARGETING RULES TABLE
// =============================================================================

/// The zone a card's effect may address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetDomain {
    /// No targets; the card resolves immediately.
    None,
    /// The opponent's board.
    EnemyBoard,
    /// The acting player's own hand.
    OwnHand,
    /// The acting player's own discard pile.
    OwnGraveyard,
    /// The opponent's hand (reveal-and-select).
    EnemyHand,
    /// The acting player's own board.
    OwnBoard,
}

/// Targeting requirement for one card identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRule {
    /// Zone the targets come from.
    pub domain: TargetDomain,
    /// Maximum number of targets.
    pub max_targets: usize,
    /// When false, exactly `max_targets` are required. When true the
    /// count is 1..=max and the player confirms explicitly (Dragon).
    pub up_to: bool,
}

impl TargetRule {
    const NONE: TargetRule = TargetRule {
        domain: TargetDomain::None,
        max_targets: 0,
        up_to: false,
    };

    /// Look up the targeting requirement for a card.
    ///
    /// Pure and total over the closed identity set; there is no error path.
    pub fn for_card(card: CardType) -> TargetRule {
        match card {
            CardType::Sorcerer => TargetRule {
                domain: TargetDomain::EnemyBoard,
                max_targets: 1,
                up_to: false,
            },
            CardType::Dragon => TargetRule {
                domain: TargetDomain::EnemyBoard,
                max_targets: crate::DRAGON_MAX_TARGETS,
                up_to: true,
            },
            CardType::Warlock => TargetRule {
                domain: TargetDomain::OwnGraveyard,
                max_targets: 1,
                up_to: false,
            },
            CardType::Druid => TargetRule {
                domain: TargetDomain::EnemyHand,
                max_targets: 1,
                up_to: false,
            },
            CardType::Alchemist => TargetRule {
                domain: TargetDomain::OwnBoard,
                max_targets: 1,
                up_to: false,
            },
            // Sage and Wizard resolve immediately
            CardType::Sage | CardType::Wizard => TargetRule::NONE,
        }
    }

    /// Whether this rule needs any targets at all.
    pub fn requires_targets(&self) -> bool {
        self.max_targets > 0
    }

    /// Whether `count` supplied targets satisfy this rule.
    pub fn accepts_count(&self, count: usize) -> bool {
        if self.up_to {
            count >= 1 && count <= self.max_targets
        } else {
            count == self.max_targets
        }
    }
}

// =============================================================================
// DECK
// =============================================================================

/// A player's draw pile. Last element is the top.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<CardType>,
}

impl Deck {
    /// Build and shuffle a fresh deck: 6 copies of each Spellcaster,
    /// 2 Alchemists, 2 Dragons.
    pub fn fresh(rng: &mut DeterministicRng) -> Self {
        let mut cards = Vec::with_capacity(34);
        for card in CardType::ALL {
            for _ in 0..card.deck_count() {
                cards.push(card);
            }
        }
        rng.shuffle(&mut cards);
        Self { cards }
    }

    /// Draw the top card, if any.
    pub fn draw(&mut self) -> Option<CardType> {
        self.cards.pop()
    }

    /// Number of cards remaining.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the deck is out of cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Move an entire pile into the deck and shuffle.
    pub fn refill(&mut self, pile: &mut Vec<CardType>, rng: &mut DeterministicRng) {
        self.cards.append(pile);
        rng.shuffle(&mut self.cards);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_composition() {
        let mut rng = DeterministicRng::new(1);
        let deck = Deck::fresh(&mut rng);
        assert_eq!(deck.len(), 34);

        let mut counts = std::collections::BTreeMap::new();
        let mut deck = deck;
        while let Some(c) = deck.draw() {
            *counts.entry(c).or_insert(0usize) += 1;
        }
        assert_eq!(counts[&CardType::Druid], 6);
        assert_eq!(counts[&CardType::Wizard], 6);
        assert_eq!(counts[&CardType::Alchemist], 2);
        assert_eq!(counts[&CardType::Dragon], 2);
    }

    #[test]
    fn test_rules_table_is_total() {
        for card in CardType::ALL {
            let rule = TargetRule::for_card(card);
            if rule.domain == TargetDomain::None {
                assert_eq!(rule.max_targets, 0);
            } else {
                assert!(rule.max_targets >= 1);
            }
        }
    }

    #[test]
    fn test_rules_table_entries() {
        assert_eq!(
            TargetRule::for_card(CardType::Sorcerer),
            TargetRule { domain: TargetDomain::EnemyBoard, max_targets: 1, up_to: false }
        );
        assert_eq!(
            TargetRule::for_card(CardType::Dragon),
            TargetRule { domain: TargetDomain::EnemyBoard, max_targets: 3, up_to: true }
        );
        assert_eq!(
            TargetRule::for_card(CardType::Warlock).domain,
            TargetDomain::OwnGraveyard
        );
        assert_eq!(
            TargetRule::for_card(CardType::Druid).domain,
            TargetDomain::EnemyHand
        );
        assert_eq!(
            TargetRule::for_card(CardType::Alchemist).domain,
            TargetDomain::OwnBoard
        );
        assert!(!TargetRule::for_card(CardType::Sage).requires_targets());
        assert!(!TargetRule::for_card(CardType::Wizard).requires_targets());
    }

    #[test]
    fn test_cardinality_acceptance() {
        let sorcerer = TargetRule::for_card(CardType::Sorcerer);
        assert!(!sorcerer.accepts_count(0));
        assert!(sorcerer.accepts_count(1));
        assert!(!sorcerer.accepts_count(2));

        let dragon = TargetRule::for_card(CardType::Dragon);
        assert!(!dragon.accepts_count(0));
        assert!(dragon.accepts_count(1));
        assert!(dragon.accepts_count(3));
        assert!(!dragon.accepts_count(4));
    }

    #[test]
    fn test_reviveable_set() {
        assert!(CardType::Druid.reviveable());
        assert!(CardType::Sage.reviveable());
        assert!(CardType::Warlock.reviveable());
        assert!(CardType::Sorcerer.reviveable());
        assert!(CardType::Wizard.reviveable());
        assert!(!CardType::Dragon.reviveable());
        assert!(!CardType::Alchemist.reviveable());
    }

    #[test]
    fn test_morphed_instance_keeps_original() {
        let alchemist = CardInstance::morphed(CardType::Alchemist, CardType::Sorcerer);
        assert_eq!(alchemist.current, CardType::Sorcerer);
        assert_eq!(alchemist.original, CardType::Alchemist);
        assert!(alchemist.is_morphed());

        let plain = CardInstance::new(CardType::Sage);
        assert!(!plain.is_morphed());
    }
}
