use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Troop,
    Spell,
    Building,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
    Champion,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Ground,
    Air,
    Buildings,
}

/// Movement class of a unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Ground,
    Air,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Troop => "troop",
            CardType::Spell => "spell",
            CardType::Building => "building",
        }
    }

    /// Unknown spellings fall back to troop.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "spell" => CardType::Spell,
            "building" => CardType::Building,
            _ => CardType::Troop,
        }
    }
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Champion => "champion",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "rare" => Rarity::Rare,
            "epic" => Rarity::Epic,
            "legendary" => Rarity::Legendary,
            "champion" => Rarity::Champion,
            _ => Rarity::Common,
        }
    }
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Ground => "ground",
            TargetType::Air => "air",
            TargetType::Buildings => "buildings",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "ground" => Some(TargetType::Ground),
            "air" => Some(TargetType::Air),
            "buildings" | "building" => Some(TargetType::Buildings),
            _ => None,
        }
    }
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Ground => "ground",
            Transport::Air => "air",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "ground" => Some(Transport::Ground),
            "air" => Some(Transport::Air),
            _ => None,
        }
    }
}

/// A card as stored in the graph. Read-only once ingested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub name: String,
    pub elixir: i64,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub rarity: Rarity,
    pub arena: String,
    pub transport: Option<Transport>,
    pub targets: Vec<TargetType>,
    pub hitpoints: Option<i64>,
    pub damage: Option<i64>,
    pub dps: Option<i64>,
    pub description: String,
    /// Raw per-level stat table, kept for presentation only.
    pub level11_stats: Map<String, Value>,
}

impl Card {
    pub fn new(name: impl Into<String>, elixir: i64, card_type: CardType) -> Self {
        Self {
            name: name.into(),
            elixir,
            card_type,
            rarity: Rarity::Common,
            arena: String::new(),
            transport: None,
            targets: Vec::new(),
            hitpoints: None,
            damage: None,
            dps: None,
            description: String::new(),
            level11_stats: Map::new(),
        }
    }

    pub fn with_stats(mut self, hitpoints: Option<i64>, damage: Option<i64>, dps: Option<i64>) -> Self {
        self.hitpoints = hitpoints;
        self.damage = damage;
        self.dps = dps;
        self
    }

    pub fn with_targets(mut self, targets: &[TargetType]) -> Self {
        self.targets = targets.to_vec();
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Cost must lie in [0, 10].
    pub fn validate(&self) -> Result<()> {
        if !(0..=10).contains(&self.elixir) {
            anyhow::bail!("Invalid elixir cost for {}: {}", self.name, self.elixir);
        }
        Ok(())
    }

    pub fn is_spell(&self) -> bool {
        self.card_type == CardType::Spell
    }

    pub fn is_building(&self) -> bool {
        self.card_type == CardType::Building
    }

    pub fn is_troop(&self) -> bool {
        self.card_type == CardType::Troop
    }

    pub fn can_hit(&self, target: TargetType) -> bool {
        self.targets.contains(&target)
    }

    pub fn is_air(&self) -> bool {
        self.transport == Some(Transport::Air)
    }

    pub fn is_ground(&self) -> bool {
        self.transport == Some(Transport::Ground)
    }
}
