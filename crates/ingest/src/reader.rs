use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use tokio::fs;

use crate::card::{Card, CardType, Rarity, TargetType, Transport};
use crate::stats::{extract_combat_stats, to_number};

/// Arena-grouped scrape: `{ "<arena key>": { "arena_name": ..., "cards": [...] } }`.
/// Arenas keep their file order, which fixes the pair order seen by relationship inference.
pub type Dataset = Vec<(String, RawArena)>;

#[derive(Debug, Clone, Deserialize)]
pub struct RawArena {
    #[serde(default)]
    pub arena_name: Option<String>,
    #[serde(default)]
    pub cards: Vec<RawCard>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCard {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub elixir: Option<Value>,
    #[serde(default, rename = "type")]
    pub card_type: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub transport: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub level_11_stats: Map<String, Value>,
    #[serde(default)]
    pub unit_attributes: Map<String, Value>,
}

pub struct DatasetReader;

impl DatasetReader {
    pub async fn read_file(path: &Path) -> Result<Dataset> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match extension {
            "json" => {
                let content = fs::read_to_string(path)
                    .await
                    .context(format!("Failed to read dataset: {:?}", path))?;
                Self::parse(&content)
            }
            _ => anyhow::bail!("Unsupported dataset format: {}", extension),
        }
    }

    pub fn parse(content: &str) -> Result<Dataset> {
        let arenas: Map<String, Value> =
            serde_json::from_str(content).context("Failed to parse dataset JSON")?;

        arenas
            .into_iter()
            .map(|(key, value)| {
                let arena = serde_json::from_value(value)
                    .with_context(|| format!("Invalid arena entry: {}", key))?;
                Ok((key, arena))
            })
            .collect()
    }
}

impl RawCard {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    /// Targets come from the `Targets`/`Target` unit attribute. Nothing listed means ground.
    pub fn targets(&self) -> Vec<TargetType> {
        let raw = ["Targets", "Target"]
            .iter()
            .find_map(|key| {
                self.unit_attributes
                    .get(*key)
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or("")
            .to_lowercase();

        let mut targets = Vec::new();
        if raw.contains("ground") {
            targets.push(TargetType::Ground);
        }
        if raw.contains("air") {
            targets.push(TargetType::Air);
        }
        if raw.contains("building") {
            targets.push(TargetType::Buildings);
        }
        if targets.is_empty() {
            targets.push(TargetType::Ground);
        }
        targets
    }

    pub fn into_card(self, arena_name: &str) -> Result<Card> {
        let name = self.display_name().to_string();
        let targets = self.targets();
        let combat = extract_combat_stats(&name, &self.level_11_stats);

        let elixir = match &self.elixir {
            None | Some(Value::Null) => 0,
            Some(value) => to_number(Some(value))
                .with_context(|| format!("Non-numeric elixir cost for {}", name))?,
        };

        let card = Card {
            name,
            elixir,
            card_type: CardType::parse(self.card_type.as_deref().unwrap_or("troop")),
            rarity: Rarity::parse(self.rarity.as_deref().unwrap_or("common")),
            arena: arena_name.to_string(),
            transport: self.transport.as_deref().and_then(Transport::parse),
            targets,
            hitpoints: combat.hitpoints,
            damage: combat.damage,
            dps: combat.dps,
            description: self.description.unwrap_or_default(),
            level11_stats: self.level_11_stats,
        };

        card.validate()?;
        Ok(card)
    }
}
