pub mod archetypes;
pub mod knowledge;
pub mod rules;

pub use archetypes::{assign_archetypes, Archetype, ArchetypeAssignments, ArchetypeFit};
pub use knowledge::{canonical_key, KnowledgeBase, NameList};
pub use rules::{
    evaluate_counter, evaluate_synergy, infer_counters, infer_synergies, CounterEdge, Strength,
    SynergyEdge, COUNTER_RULES, SYNERGY_RULES,
};

use ingest::Card;
use serde::Serialize;

/// Everything derived from a card collection in one pass.
#[derive(Debug, Clone, Serialize)]
pub struct Inference {
    pub counters: Vec<CounterEdge>,
    pub synergies: Vec<SynergyEdge>,
    pub archetypes: ArchetypeAssignments,
}

/// Deterministic: the same cards in the same order give the same edges.
pub fn infer(cards: &[Card], kb: &KnowledgeBase) -> Inference {
    let inference = Inference {
        counters: infer_counters(cards),
        synergies: infer_synergies(cards),
        archetypes: assign_archetypes(cards, kb),
    };

    tracing::debug!(
        cards = cards.len(),
        counters = inference.counters.len(),
        synergies = inference.synergies.len(),
        "relationship inference finished"
    );

    inference
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::{CardType, TargetType, Transport};

    fn sample() -> Vec<Card> {
        vec![
            Card::new("Giant", 5, CardType::Troop)
                .with_stats(Some(4091), Some(254), None)
                .with_targets(&[TargetType::Buildings])
                .with_transport(Transport::Ground),
            Card::new("Minions", 3, CardType::Troop)
                .with_stats(Some(230), Some(84), Some(84))
                .with_targets(&[TargetType::Ground, TargetType::Air])
                .with_transport(Transport::Air),
            Card::new("Arrows", 3, CardType::Spell).with_stats(None, Some(366), None),
        ]
    }

    #[test]
    fn test_infer_is_repeatable() {
        let kb = KnowledgeBase::global();
        let first = infer(&sample(), kb);
        let second = infer(&sample(), kb);

        assert_eq!(first.counters, second.counters);
        assert_eq!(first.synergies, second.synergies);
        assert_eq!(first.archetypes, second.archetypes);
    }

    #[test]
    fn test_every_synergy_has_its_mirror() {
        let inference = infer(&sample(), KnowledgeBase::global());
        assert!(!inference.synergies.is_empty());
        for edge in &inference.synergies {
            assert!(inference.synergies.contains(&edge.reversed()));
        }
    }
}
