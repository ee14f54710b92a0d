use relations::SynergyEdge;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::analyzer::{DeckAnalysis, DeckWarning};

/// A COUNTERS edge recorded in the graph for one of the deck's cards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeckCounter {
    pub from: String,
    pub to: String,
    pub reason: Option<String>,
}

const MAX_COUNTERS_SHOWN: usize = 5;

fn rule() -> String {
    "-".repeat(50)
}

fn push_warnings(out: &mut String, warnings: &[DeckWarning]) {
    if warnings.is_empty() {
        out.push_str("  None\n");
        return;
    }
    for warning in warnings {
        out.push_str(&format!("  [{}] {}\n", warning.severity.label(), warning.message));
    }
}

/// Plain-text deck report.
pub fn format_report(
    analysis: &DeckAnalysis,
    synergies: &[SynergyEdge],
    counters: &[DeckCounter],
) -> String {
    let mut out = String::new();

    out.push_str("Deck Analysis\n");
    out.push_str(&"=".repeat(50));
    out.push_str("\n\n");
    out.push_str(&format!("Cards: {}\n", analysis.deck.join(", ")));
    out.push_str(&format!("Archetype: {}\n", analysis.archetype.label()));
    out.push_str(&format!("Average Elixir: {}\n\n", analysis.avg_elixir));

    out.push_str("Card Synergies:\n");
    out.push_str(&rule());
    out.push('\n');
    let mut any_synergy = false;
    for card in &analysis.deck {
        let partners: Vec<&SynergyEdge> = synergies.iter().filter(|s| &s.from == card).collect();
        if partners.is_empty() {
            continue;
        }
        any_synergy = true;
        out.push_str(&format!("  {}:\n", card));
        for syn in partners {
            out.push_str(&format!(
                "    - {} ({}, strength: {})\n",
                syn.to,
                syn.synergy_type,
                syn.strength.as_str()
            ));
        }
    }
    if !any_synergy {
        out.push_str("  No synergies found between these cards\n");
    }
    out.push('\n');

    out.push_str("What Your Deck Counters:\n");
    out.push_str(&rule());
    out.push('\n');
    if counters.is_empty() {
        out.push_str("  No counter data found in knowledge graph\n");
    }
    let mut shown = HashSet::new();
    for counter in counters.iter().take(MAX_COUNTERS_SHOWN) {
        if !shown.insert((counter.from.as_str(), counter.to.as_str())) {
            continue;
        }
        out.push_str(&format!("  {} counters {}", counter.from, counter.to));
        if let Some(reason) = counter.reason.as_deref().filter(|r| !r.is_empty()) {
            out.push_str(&format!(" ({})", reason));
        }
        out.push('\n');
    }
    out.push('\n');

    out.push_str("General Warnings:\n");
    out.push_str(&rule());
    out.push('\n');
    push_warnings(&mut out, &analysis.general_warnings);
    out.push('\n');

    out.push_str(&format!("{} Archetype Warnings:\n", analysis.archetype.title()));
    out.push_str(&rule());
    out.push('\n');
    push_warnings(&mut out, &analysis.archetype_warnings);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{DeckArchetype, Severity};
    use relations::Strength;

    fn analysis() -> DeckAnalysis {
        DeckAnalysis {
            deck: vec!["Giant".to_string(), "Musketeer".to_string()],
            archetype: DeckArchetype::BridgeSpam,
            avg_elixir: 3.88,
            general_warnings: vec![DeckWarning {
                severity: Severity::Weak,
                message: "No building - Harder to defend and control tempo.".to_string(),
                category: "general".to_string(),
            }],
            archetype_warnings: Vec::new(),
        }
    }

    #[test]
    fn test_report_sections() {
        let synergy = SynergyEdge {
            from: "Giant".to_string(),
            to: "Musketeer".to_string(),
            synergy_type: "tank-support".to_string(),
            strength: Strength::Strong,
        };
        let counter = DeckCounter {
            from: "Musketeer".to_string(),
            to: "Minions".to_string(),
            reason: Some("High DPS anti-air unit".to_string()),
        };

        let report = format_report(&analysis(), &[synergy], &[counter.clone(), counter]);

        assert!(report.contains("Archetype: bridge_spam\n"));
        assert!(report.contains("Average Elixir: 3.88\n"));
        assert!(report.contains("  Giant:\n    - Musketeer (tank-support, strength: strong)\n"));
        assert_eq!(report.matches("Musketeer counters Minions").count(), 1);
        assert!(report.contains("  [Weak Warning] No building"));
        assert!(report.contains("Bridge Spam Archetype Warnings:\n"));
        assert!(report.ends_with("  None\n"));
    }

    #[test]
    fn test_report_without_relations() {
        let report = format_report(&analysis(), &[], &[]);
        assert!(report.contains("No synergies found between these cards"));
        assert!(report.contains("No counter data found in knowledge graph"));
    }
}
