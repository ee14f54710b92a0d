use ingest::{Card, TargetType};
use relations::KnowledgeBase;
use serde::Serialize;
use thiserror::Error;

pub const DECK_SIZE: usize = 8;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeckError {
    #[error("Deck must contain exactly {DECK_SIZE} cards (got {0})")]
    WrongSize(usize),
    #[error("Card '{0}' not found in database")]
    UnknownCard(String),
    #[error("Card lookup failed: {0}")]
    Lookup(String),
}

/// Eight card names, in the order the player listed them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deck {
    cards: Vec<String>,
}

impl Deck {
    pub fn new(cards: Vec<String>) -> Result<Self, DeckError> {
        if cards.len() != DECK_SIZE {
            return Err(DeckError::WrongSize(cards.len()));
        }
        Ok(Self { cards })
    }

    pub fn cards(&self) -> &[String] {
        &self.cards
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckArchetype {
    Siege,
    Cycle,
    Beatdown,
    BridgeSpam,
    #[serde(rename = "No Archetype")]
    NoArchetype,
}

impl DeckArchetype {
    pub fn label(&self) -> &'static str {
        match self {
            DeckArchetype::Siege => "siege",
            DeckArchetype::Cycle => "cycle",
            DeckArchetype::Beatdown => "beatdown",
            DeckArchetype::BridgeSpam => "bridge_spam",
            DeckArchetype::NoArchetype => "No Archetype",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DeckArchetype::Siege => "Siege",
            DeckArchetype::Cycle => "Cycle",
            DeckArchetype::Beatdown => "Beatdown",
            DeckArchetype::BridgeSpam => "Bridge Spam",
            DeckArchetype::NoArchetype => "No Archetype",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    #[serde(rename = "Strong Warning")]
    Strong,
    #[serde(rename = "Weak Warning")]
    Weak,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Strong => "Strong Warning",
            Severity::Weak => "Weak Warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckWarning {
    pub severity: Severity,
    pub message: String,
    /// "general" or the archetype label.
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckAnalysis {
    pub deck: Vec<String>,
    pub archetype: DeckArchetype,
    pub avg_elixir: f64,
    pub general_warnings: Vec<DeckWarning>,
    pub archetype_warnings: Vec<DeckWarning>,
}

/// Sum of costs over the fixed deck size.
pub fn average_elixir(members: &[Card]) -> f64 {
    let total: i64 = members.iter().map(|c| c.elixir).sum();
    total as f64 / DECK_SIZE as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rule-based deck checks. Stateless apart from the curated name lists.
pub struct DeckAnalyzer {
    kb: &'static KnowledgeBase,
}

impl Default for DeckAnalyzer {
    fn default() -> Self {
        Self::new(KnowledgeBase::global())
    }
}

impl DeckAnalyzer {
    pub fn new(kb: &'static KnowledgeBase) -> Self {
        Self { kb }
    }

    /// Resolve every member, stopping at the first unknown card.
    pub fn resolve<F>(&self, deck: &Deck, mut lookup: F) -> Result<Vec<Card>, DeckError>
    where
        F: FnMut(&str) -> Option<Card>,
    {
        deck.cards()
            .iter()
            .map(|name| lookup(name).ok_or_else(|| DeckError::UnknownCard(name.clone())))
            .collect()
    }

    pub fn analyze<F>(&self, deck: &Deck, lookup: F) -> Result<DeckAnalysis, DeckError>
    where
        F: FnMut(&str) -> Option<Card>,
    {
        let members = self.resolve(deck, lookup)?;
        self.analyze_members(&members)
    }

    pub fn analyze_members(&self, members: &[Card]) -> Result<DeckAnalysis, DeckError> {
        if members.len() != DECK_SIZE {
            return Err(DeckError::WrongSize(members.len()));
        }

        let archetype = self.classify(members);
        let avg = average_elixir(members);

        Ok(DeckAnalysis {
            deck: members.iter().map(|c| c.name.clone()).collect(),
            archetype,
            avg_elixir: round2(avg),
            general_warnings: self.general_warnings(members),
            archetype_warnings: self.archetype_warnings(members, archetype),
        })
    }

    /// Siege, then cycle, then beatdown, then bridge spam.
    pub fn classify(&self, members: &[Card]) -> DeckArchetype {
        if members.iter().any(|c| self.is_siege(c)) {
            return DeckArchetype::Siege;
        }

        let avg = average_elixir(members);
        if avg > 0.0 && avg <= 3.0 {
            return DeckArchetype::Cycle;
        }

        if members.iter().any(is_heavy_tank) {
            return DeckArchetype::Beatdown;
        }

        let bridge = members.iter().filter(|c| self.kb.roles.bridge_spam.contains(&c.name)).count();
        if bridge >= 3 {
            return DeckArchetype::BridgeSpam;
        }

        DeckArchetype::NoArchetype
    }

    fn is_win_condition(&self, card: &Card) -> bool {
        card.can_hit(TargetType::Buildings) || self.kb.roles.win_conditions.contains(&card.name)
    }

    fn is_anti_tank(&self, card: &Card) -> bool {
        self.kb.roles.anti_tank.contains(&card.name)
    }

    fn is_reset(&self, card: &Card) -> bool {
        self.kb.roles.reset.contains(&card.name)
    }

    fn is_building_killer(&self, card: &Card) -> bool {
        self.kb.roles.building_killers.contains(&card.name)
    }

    fn has_splash(&self, card: &Card) -> bool {
        self.kb.roles.splash.contains(&card.name)
    }

    fn is_siege(&self, card: &Card) -> bool {
        self.kb.roles.siege.contains(&card.name)
    }

    pub fn general_warnings(&self, members: &[Card]) -> Vec<DeckWarning> {
        let avg = average_elixir(members);
        let count = |f: &dyn Fn(&Card) -> bool| members.iter().filter(|c| f(*c)).count();
        let any = |f: &dyn Fn(&Card) -> bool| members.iter().any(|c| f(c));

        let win_conditions = count(&|c: &Card| self.is_win_condition(c));
        let air_defense = count(&|c: &Card| c.can_hit(TargetType::Air));
        let spells = count(&|c: &Card| c.is_spell());

        let checks: Vec<(bool, Severity, String)> = vec![
            (
                win_conditions == 0,
                Severity::Strong,
                "No win condition - Deck has no clear path to tower damage.".to_string(),
            ),
            (
                air_defense == 0,
                Severity::Strong,
                "No air defense - Vulnerable to air-heavy decks (Lava Hound, Balloon, etc.).".to_string(),
            ),
            (
                spells == 0,
                Severity::Strong,
                "No spell - Cannot deal spell damage or respond to swarms effectively.".to_string(),
            ),
            (
                !any(&|c: &Card| c.is_ground()),
                Severity::Strong,
                "No ground units - Deck contains only spells and cannot defend.".to_string(),
            ),
            (
                win_conditions > 2,
                Severity::Strong,
                "> 2 win conditions - Deck lacks support/defense due to too many win cons.".to_string(),
            ),
            (
                spells > 4,
                Severity::Strong,
                "> 4 spells - Not enough troops to defend or push.".to_string(),
            ),
            (
                avg >= 4.8,
                Severity::Strong,
                format!("Elixir average {:.1} >= 4.8 - Too slow to cycle, vulnerable to fast decks.", avg),
            ),
            (
                !any(&|c: &Card| self.is_anti_tank(c)),
                Severity::Strong,
                "No anti-tank option - Cannot defend against heavy tanks (e.g., P.E.K.K.A, Golem).".to_string(),
            ),
            (
                !any(&is_small_spell),
                Severity::Weak,
                "No small spell (<= 3 Elixir) - Struggles with swarms and chip.".to_string(),
            ),
            (
                !any(&is_big_spell),
                Severity::Weak,
                "No big spell (> 3 Elixir) - Limited high spell damage and tower pressure.".to_string(),
            ),
            (
                !any(&|c: &Card| c.is_building()),
                Severity::Weak,
                "No building - Harder to defend and control tempo.".to_string(),
            ),
            (
                air_defense == 1,
                Severity::Weak,
                "Only 1 air defense card - Risky against air-heavy decks.".to_string(),
            ),
            (
                !any(&|c: &Card| self.is_reset(c)),
                Severity::Weak,
                "No reset card (e.g., Zap, E-Wiz) - Vulnerable to Inferno Tower/Dragon, Sparky.".to_string(),
            ),
            (
                !any(&is_tank),
                Severity::Weak,
                "No tank or mini-tank - Difficulty absorbing damage for support troops.".to_string(),
            ),
            (
                !any(&|c: &Card| self.has_splash(c)),
                Severity::Weak,
                "No splash damage - Struggles against swarm-heavy decks.".to_string(),
            ),
            (
                avg > 0.0 && avg <= 2.6,
                Severity::Weak,
                format!("Elixir average {:.1} <= 2.6 - May lack defensive power against heavy pushes.", avg),
            ),
            (
                !any(&is_cycle_card),
                Severity::Weak,
                "No cheap cycle cards (1-2 elixir) - Slower cycle to win condition.".to_string(),
            ),
        ];

        collect(checks, "general")
    }

    pub fn archetype_warnings(&self, members: &[Card], archetype: DeckArchetype) -> Vec<DeckWarning> {
        let avg = average_elixir(members);
        let count = |f: &dyn Fn(&Card) -> bool| members.iter().filter(|c| f(*c)).count();
        let any = |f: &dyn Fn(&Card) -> bool| members.iter().any(|c| f(c));

        let cycle_cards = count(&is_cycle_card);
        let spells = count(&|c: &Card| c.is_spell());
        let buildings = count(&|c: &Card| c.is_building());

        let checks: Vec<(bool, Severity, String)> = match archetype {
            DeckArchetype::Siege => vec![
                (
                    !any(&|c: &Card| self.is_building_killer(c)),
                    Severity::Strong,
                    "No building killer spell - No heavy spell (Rocket, Lightning, Fireball, Poison) or Earthquake to damage defensive buildings.".to_string(),
                ),
                (
                    buildings < 2,
                    Severity::Strong,
                    "No secondary defensive building - Siege decks need a second building for defense.".to_string(),
                ),
                (
                    !any(&|c: &Card| self.is_anti_tank(c)),
                    Severity::Strong,
                    "No anti-tank option - Vulnerable to P.E.K.K.A, Giant, etc.".to_string(),
                ),
                (
                    avg > 3.8,
                    Severity::Weak,
                    format!("Average elixir {:.1} > 3.8 - Too slow to defend and cycle your siege building.", avg),
                ),
                (
                    cycle_cards < 2,
                    Severity::Weak,
                    "< 2 cycle cards (<= 2 Elixir) - Can't cycle back to your siege building fast enough.".to_string(),
                ),
            ],
            DeckArchetype::Cycle => vec![
                (
                    buildings == 0,
                    Severity::Strong,
                    "No defensive building - Cycle decks rely on a building for solid defense.".to_string(),
                ),
                (
                    count(&|c: &Card| c.elixir >= 4) > 3,
                    Severity::Strong,
                    "> 3 cards cost 4+ elixir - Deck may be too heavy for a cycle archetype.".to_string(),
                ),
                (
                    cycle_cards < 2,
                    Severity::Weak,
                    "< 2 cycle cards (<= 2 Elixir) - Not fast enough for a true cycle deck.".to_string(),
                ),
            ],
            DeckArchetype::Beatdown => vec![
                (
                    avg > 0.0 && avg < 3.5,
                    Severity::Strong,
                    format!("Average elixir {:.1} < 3.5 - Insufficient elixir for a proper beatdown push.", avg),
                ),
                (
                    !any(&|c: &Card| self.is_reset(c)),
                    Severity::Strong,
                    "No reset units - Vulnerable to Inferno Tower/Dragon and Sparky.".to_string(),
                ),
                (
                    spells > 2,
                    Severity::Weak,
                    "More than 2 spells - Reduces push potential and defensive troops.".to_string(),
                ),
            ],
            DeckArchetype::BridgeSpam => vec![
                (
                    avg > 4.3,
                    Severity::Strong,
                    format!("Average elixir {:.1} > 4.3 - Too slow for consistent bridge spam pressure.", avg),
                ),
                (
                    cycle_cards < 2,
                    Severity::Strong,
                    "< 2 cycle cards (<= 2 Elixir) - Cannot cycle pressure cards fast enough.".to_string(),
                ),
                (
                    spells >= 3,
                    Severity::Weak,
                    ">= 3 spells - Not enough units to apply constant pressure.".to_string(),
                ),
            ],
            DeckArchetype::NoArchetype => Vec::new(),
        };

        collect(checks, archetype.label())
    }
}

fn collect(checks: Vec<(bool, Severity, String)>, category: &str) -> Vec<DeckWarning> {
    checks
        .into_iter()
        .filter(|(fired, _, _)| *fired)
        .map(|(_, severity, message)| DeckWarning {
            severity,
            message,
            category: category.to_string(),
        })
        .collect()
}

fn hp(card: &Card) -> i64 {
    card.hitpoints.unwrap_or(0)
}

fn is_tank(card: &Card) -> bool {
    hp(card) > 1000
}

fn is_heavy_tank(card: &Card) -> bool {
    hp(card) > 3000
}

fn is_small_spell(card: &Card) -> bool {
    card.is_spell() && card.elixir <= 3
}

fn is_big_spell(card: &Card) -> bool {
    card.is_spell() && card.elixir > 3
}

fn is_cycle_card(card: &Card) -> bool {
    card.elixir <= 2
}
