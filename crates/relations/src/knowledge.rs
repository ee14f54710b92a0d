use serde::Deserialize;
use std::sync::OnceLock;

use crate::rules::{CounterEdge, Strength, SynergyEdge};

const EMBEDDED: &str = include_str!("../data/knowledge.json");

static GLOBAL: OnceLock<KnowledgeBase> = OnceLock::new();

/// Hand-curated meta knowledge: counters and synergies that the numeric
/// rules cannot see, plus the card-name lists the deck rules key on.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeBase {
    pub known_counters: Vec<KnownCounter>,
    pub known_synergies: Vec<KnownSynergy>,
    pub roles: RoleLists,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnownCounter {
    pub counter: String,
    pub target: String,
    pub effectiveness: Strength,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnownSynergy {
    pub first: String,
    pub second: String,
    pub synergy_type: String,
    pub strength: Strength,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleLists {
    pub win_conditions: NameList,
    pub anti_tank: NameList,
    pub reset: NameList,
    pub building_killers: NameList,
    pub splash: NameList,
    pub siege: NameList,
    pub bridge_spam: NameList,
}

/// Card names compared case-insensitively, ignoring a trailing '.'
/// ("P.E.K.K.A." and "P.E.K.K.A" are the same card).
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct NameList {
    names: Vec<String>,
}

impl From<Vec<String>> for NameList {
    fn from(names: Vec<String>) -> Self {
        Self {
            names: names.iter().map(|n| canonical_key(n)).collect(),
        }
    }
}

impl NameList {
    pub fn contains(&self, name: &str) -> bool {
        let key = canonical_key(name);
        self.names.iter().any(|n| *n == key)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub fn canonical_key(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}

impl KnowledgeBase {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Process-wide instance parsed from the embedded data file, which a unit test parses.
    pub fn global() -> &'static KnowledgeBase {
        GLOBAL.get_or_init(|| {
            Self::from_json(EMBEDDED).expect("embedded knowledge base is valid")
        })
    }

    pub fn known_counter_edges(&self) -> Vec<CounterEdge> {
        self.known_counters
            .iter()
            .map(|k| CounterEdge {
                from: k.counter.clone(),
                to: k.target.clone(),
                effectiveness: k.effectiveness,
                reason: k.reason.clone(),
            })
            .collect()
    }

    /// Both directions of every curated pairing.
    pub fn known_synergy_edges(&self) -> Vec<SynergyEdge> {
        self.known_synergies
            .iter()
            .flat_map(|k| {
                let forward = SynergyEdge {
                    from: k.first.clone(),
                    to: k.second.clone(),
                    synergy_type: k.synergy_type.clone(),
                    strength: k.strength,
                };
                let backward = forward.reversed();
                [forward, backward]
            })
            .collect()
    }
}
