use ingest::{Card, TargetType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Moderate,
}

impl Strength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strength::Strong => "strong",
            Strength::Moderate => "moderate",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CounterEdge {
    pub from: String,
    pub to: String,
    pub effectiveness: Strength,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynergyEdge {
    pub from: String,
    pub to: String,
    pub synergy_type: String,
    pub strength: Strength,
}

impl SynergyEdge {
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
            synergy_type: self.synergy_type.clone(),
            strength: self.strength,
        }
    }
}

/// One "A counters B" predicate with the tags it emits.
pub struct CounterRule {
    pub applies: fn(&Card, &Card) -> bool,
    pub effectiveness: Strength,
    pub reason: &'static str,
}

pub struct SynergyRule {
    pub applies: fn(&Card, &Card) -> bool,
    pub synergy_type: &'static str,
    pub strength: Strength,
}

// Zero counts as missing for every numeric stat.
fn stat(value: Option<i64>) -> Option<i64> {
    value.filter(|n| *n != 0)
}

fn above(value: Option<i64>, threshold: i64) -> bool {
    stat(value).is_some_and(|n| n > threshold)
}

fn below(value: Option<i64>, threshold: i64) -> bool {
    stat(value).is_some_and(|n| n < threshold)
}

fn spell_vs_fragile(a: &Card, b: &Card) -> bool {
    a.is_spell() && stat(a.damage).is_some() && below(b.hitpoints, 500)
}

fn anti_air_high_dps(a: &Card, b: &Card) -> bool {
    b.is_air() && a.can_hit(TargetType::Air) && above(a.dps, 150)
}

fn anti_air(a: &Card, b: &Card) -> bool {
    b.is_air() && a.can_hit(TargetType::Air) && stat(a.dps).is_some()
}

fn building_distraction(a: &Card, b: &Card) -> bool {
    a.is_building() && b.can_hit(TargetType::Buildings)
}

fn tank_killer(a: &Card, b: &Card) -> bool {
    above(a.damage, 500) && above(b.hitpoints, 2000)
}

/// Evaluated in order; the first match decides.
pub const COUNTER_RULES: &[CounterRule] = &[
    CounterRule {
        applies: spell_vs_fragile,
        effectiveness: Strength::Strong,
        reason: "Spell damage effective against low HP units",
    },
    CounterRule {
        applies: anti_air_high_dps,
        effectiveness: Strength::Strong,
        reason: "High DPS anti-air unit",
    },
    CounterRule {
        applies: anti_air,
        effectiveness: Strength::Moderate,
        reason: "Can target air units",
    },
    CounterRule {
        applies: building_distraction,
        effectiveness: Strength::Moderate,
        reason: "Distracts building-targeting units",
    },
    CounterRule {
        applies: tank_killer,
        effectiveness: Strength::Strong,
        reason: "High damage effective against tanks",
    },
];

fn tank_support(tank: &Card, support: &Card) -> bool {
    above(tank.hitpoints, 2000)
        && stat(support.damage).is_some()
        && below(support.hitpoints, 1000)
        && (support.is_ground() || support.is_troop())
}

fn spell_bait(spell: &Card, bait: &Card) -> bool {
    spell.is_spell() && below(bait.hitpoints, 500)
}

fn push_combo(pusher: &Card, tank: &Card) -> bool {
    pusher.can_hit(TargetType::Buildings) && above(tank.hitpoints, 2000)
}

pub const SYNERGY_RULES: &[SynergyRule] = &[
    SynergyRule {
        applies: tank_support,
        synergy_type: "tank-support",
        strength: Strength::Strong,
    },
    SynergyRule {
        applies: spell_bait,
        synergy_type: "spell-bait",
        strength: Strength::Moderate,
    },
    SynergyRule {
        applies: push_combo,
        synergy_type: "push-combo",
        strength: Strength::Strong,
    },
];

pub fn evaluate_counter(a: &Card, b: &Card) -> Option<CounterEdge> {
    COUNTER_RULES
        .iter()
        .find(|rule| (rule.applies)(a, b))
        .map(|rule| CounterEdge {
            from: a.name.clone(),
            to: b.name.clone(),
            effectiveness: rule.effectiveness,
            reason: rule.reason.to_string(),
        })
}

pub fn evaluate_synergy(first: &Card, second: &Card) -> Option<SynergyEdge> {
    SYNERGY_RULES
        .iter()
        .find(|rule| (rule.applies)(first, second))
        .map(|rule| SynergyEdge {
            from: first.name.clone(),
            to: second.name.clone(),
            synergy_type: rule.synergy_type.to_string(),
            strength: rule.strength,
        })
}

/// Every ordered pair of distinct cards. Not symmetric.
pub fn infer_counters(cards: &[Card]) -> Vec<CounterEdge> {
    let mut edges = Vec::new();
    for a in cards {
        for b in cards {
            if a.name == b.name {
                continue;
            }
            if let Some(edge) = evaluate_counter(a, b) {
                edges.push(edge);
            }
        }
    }
    edges
}

/// Every unordered pair in input order; a match yields both directions.
pub fn infer_synergies(cards: &[Card]) -> Vec<SynergyEdge> {
    let mut edges = Vec::new();
    for (i, first) in cards.iter().enumerate() {
        for second in &cards[i + 1..] {
            if let Some(edge) = evaluate_synergy(first, second) {
                let back = edge.reversed();
                edges.push(edge);
                edges.push(back);
            }
        }
    }
    edges
}
