pub mod analyzer;
pub mod report;

pub use analyzer::{
    average_elixir, Deck, DeckAnalysis, DeckAnalyzer, DeckArchetype, DeckError, DeckWarning,
    Severity, DECK_SIZE,
};
pub use report::{format_report, DeckCounter};
