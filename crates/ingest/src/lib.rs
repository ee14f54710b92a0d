pub mod card;
pub mod reader;
pub mod stats;

pub use card::{Card, CardType, Rarity, TargetType, Transport};
pub use reader::{Dataset, DatasetReader, RawArena, RawCard};
pub use stats::{extract_combat_stats, extract_stat, to_number, CombatStats, StatKind};

use anyhow::Result;
use std::path::Path;

/// Cards converted from a dataset plus the names that could not be converted.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub cards: Vec<Card>,
    pub skipped: Vec<String>,
}

/// Convert every card of a parsed dataset, arena by arena.
pub fn convert_dataset(dataset: Dataset) -> IngestReport {
    let mut report = IngestReport::default();

    for (arena_key, arena) in dataset {
        let arena_name = arena.arena_name.clone().unwrap_or(arena_key);
        tracing::debug!(arena = %arena_name, cards = arena.cards.len(), "converting arena");

        for raw in arena.cards {
            let name = raw.display_name().to_string();
            match raw.into_card(&arena_name) {
                Ok(card) => report.cards.push(card),
                Err(e) => {
                    tracing::warn!(card = %name, error = %e, "skipping card");
                    report.skipped.push(name);
                }
            }
        }
    }

    report
}

/// Main ingestion entry point
pub async fn ingest_dataset(path: &Path) -> Result<IngestReport> {
    let dataset = DatasetReader::read_file(path).await?;
    Ok(convert_dataset(dataset))
}
