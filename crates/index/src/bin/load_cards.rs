use anyhow::Result;
use clap::Parser;
use index::{EdgeLimits, Neo4jConfig, Neo4jIndexer};
use relations::KnowledgeBase;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_DATASET: &str = "data/raw/fandom_arenas_cards.json";

/// Load the card dataset into Neo4j with inferred and curated relationships.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Arena-grouped card dataset (JSON)
    #[arg(default_value = DEFAULT_DATASET)]
    path: PathBuf,

    /// Delete every node and relationship before loading
    #[arg(long)]
    clear: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args { path, clear } = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(path = %path.display(), "Loading dataset");
    let report = ingest::ingest_dataset(&path).await?;
    if !report.skipped.is_empty() {
        tracing::warn!(skipped = ?report.skipped, "some cards could not be converted");
    }

    let graph = Neo4jConfig::from_env().connect().await?;
    let indexer = Neo4jIndexer::new(graph);

    if clear {
        indexer.clear().await?;
    }

    let summary = index::load_cards(
        &indexer,
        &report.cards,
        KnowledgeBase::global(),
        EdgeLimits::default(),
    )
    .await?;

    let stats = indexer.get_stats().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_dataset() {
        let args = Args::try_parse_from(["load_cards"]).unwrap();
        assert_eq!(args.path, PathBuf::from(DEFAULT_DATASET));
        assert!(!args.clear);
    }

    #[test]
    fn test_args_path_and_clear() {
        let args = Args::try_parse_from(["load_cards", "--clear", "cards.json"]).unwrap();
        assert_eq!(args.path, PathBuf::from("cards.json"));
        assert!(args.clear);
    }

    #[test]
    fn test_args_reject_unknown_flag() {
        assert!(Args::try_parse_from(["load_cards", "--clera", "cards.json"]).is_err());
    }
}
