use ingest::{Card, TargetType};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::knowledge::KnowledgeBase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Archetype {
    Beatdown,
    Cycle,
    Control,
    Siege,
    Bait,
    BridgeSpam,
}

impl Archetype {
    pub const ALL: [Archetype; 6] = [
        Archetype::Beatdown,
        Archetype::Cycle,
        Archetype::Control,
        Archetype::Siege,
        Archetype::Bait,
        Archetype::BridgeSpam,
    ];

    /// Name used for the Archetype node in the graph.
    pub fn name(&self) -> &'static str {
        match self {
            Archetype::Beatdown => "Beatdown",
            Archetype::Cycle => "Cycle",
            Archetype::Control => "Control",
            Archetype::Siege => "Siege",
            Archetype::Bait => "Bait",
            Archetype::BridgeSpam => "Bridge Spam",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ArchetypeFit {
    pub card: String,
    pub role: String,
}

pub type ArchetypeAssignments = BTreeMap<Archetype, Vec<ArchetypeFit>>;

fn hp(card: &Card) -> Option<i64> {
    card.hitpoints.filter(|n| *n != 0)
}

/// Role of a card within one archetype, if it has one.
pub fn role_in(archetype: Archetype, card: &Card, kb: &KnowledgeBase) -> Option<&'static str> {
    match archetype {
        Archetype::Beatdown => {
            if hp(card).is_some_and(|h| h > 3000) {
                Some("tank")
            } else if card.elixir >= 5 && hp(card).is_some_and(|h| h > 1500) {
                Some("support")
            } else {
                None
            }
        }
        Archetype::Cycle => {
            if card.elixir <= 2 {
                Some("cycle")
            } else if card.elixir <= 4 && card.can_hit(TargetType::Buildings) {
                Some("win-condition")
            } else {
                None
            }
        }
        Archetype::Control => {
            if card.is_building() {
                Some("defense")
            } else if card.is_spell() && card.elixir >= 4 {
                Some("spell")
            } else {
                None
            }
        }
        Archetype::Siege => {
            if kb.roles.siege.contains(&card.name) {
                Some("win-condition")
            } else if card.is_building() {
                Some("defense")
            } else {
                None
            }
        }
        Archetype::Bait => {
            (hp(card).is_some_and(|h| h < 500) && card.elixir <= 4).then_some("bait-unit")
        }
        Archetype::BridgeSpam => {
            let pressure = card.can_hit(TargetType::Buildings)
                || card.damage.is_some_and(|d| d > 200);
            (card.elixir <= 5 && pressure).then_some("pressure")
        }
    }
}

/// A card may land in several archetypes, each with its own role.
pub fn assign_archetypes(cards: &[Card], kb: &KnowledgeBase) -> ArchetypeAssignments {
    let mut assignments: ArchetypeAssignments =
        Archetype::ALL.iter().map(|a| (*a, Vec::new())).collect();

    for card in cards {
        for archetype in Archetype::ALL {
            if let Some(role) = role_in(archetype, card, kb) {
                if let Some(members) = assignments.get_mut(&archetype) {
                    members.push(ArchetypeFit {
                        card: card.name.clone(),
                        role: role.to_string(),
                    });
                }
            }
        }
    }

    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::CardType;

    fn roles_of(card: &Card) -> Vec<(Archetype, &'static str)> {
        let kb = KnowledgeBase::global();
        Archetype::ALL
            .iter()
            .filter_map(|a| role_in(*a, card, kb).map(|r| (*a, r)))
            .collect()
    }

    #[test]
    fn test_heavy_tank_roles() {
        let golem = Card::new("Golem", 8, CardType::Troop)
            .with_stats(Some(5120), Some(312), None)
            .with_targets(&[TargetType::Buildings]);
        assert_eq!(roles_of(&golem), vec![(Archetype::Beatdown, "tank")]);
    }

    #[test]
    fn test_xbow_is_siege_win_condition_and_control_defense() {
        let xbow = Card::new("X-Bow", 6, CardType::Building).with_stats(Some(1600), Some(26), None);
        assert_eq!(
            roles_of(&xbow),
            vec![
                (Archetype::Beatdown, "support"),
                (Archetype::Control, "defense"),
                (Archetype::Siege, "win-condition"),
            ]
        );
    }

    #[test]
    fn test_cheap_fragile_card_fits_many() {
        let skeletons = Card::new("Skeletons", 1, CardType::Troop).with_stats(Some(81), Some(81), None);
        assert_eq!(
            roles_of(&skeletons),
            vec![(Archetype::Cycle, "cycle"), (Archetype::Bait, "bait-unit")]
        );
    }

    #[test]
    fn test_assignments_keep_every_archetype() {
        let assignments = assign_archetypes(&[], KnowledgeBase::global());
        assert_eq!(assignments.len(), 6);
        assert!(assignments.values().all(|v| v.is_empty()));
        assert_eq!(Archetype::BridgeSpam.name(), "Bridge Spam");
    }
}
