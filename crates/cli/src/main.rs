mod commands;
mod render;

use commands::{Command, Input, EXAMPLES, HELP};
use futures::StreamExt;
use query::{AppConfig, Pipeline};
use render::Renderer;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const BANNER: &str = "Clash Royale Knowledge Graph RAG System";

fn prompt() {
    print!("\nYou: ");
    let _ = std::io::stdout().flush();
}

fn header() {
    println!("{}\n{}", BANNER, "=".repeat(BANNER.len()));
}

async fn ask(pipeline: &Arc<Pipeline>, renderer: &mut Renderer, question: String) {
    renderer.reset();
    let mut events = std::pin::pin!(pipeline.clone().stream(question));

    while let Some(event) = events.next().await {
        print!("{}", renderer.render(&event));
        let _ = std::io::stdout().flush();
    }
}

async fn show_stats(pipeline: &Pipeline) {
    println!("Fetching knowledge graph statistics...");
    match pipeline.get_stats().await {
        Ok(stats) => match serde_json::to_string_pretty(&stats) {
            Ok(text) => println!("{}", text),
            Err(e) => println!("[error] {}", e),
        },
        Err(e) => {
            tracing::warn!(error = %e, "stats query failed");
            println!("[error] Could not retrieve statistics");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    query::telemetry::init_tracing();

    let config = AppConfig::from_env();
    header();
    println!("Loading language model ({})...", config.llm.model);

    let pipeline = Arc::new(query::connect(&config).await?);
    if !pipeline.test_connection().await {
        println!("[error] Failed to connect to Neo4j at {}", config.neo4j.uri);
        println!("Please ensure Neo4j is running and NEO4J_URI / NEO4J_USER / NEO4J_PASSWORD are set");
        return Ok(());
    }
    println!("Connected to knowledge graph. Type a question, /help for commands, /quit to exit.");

    let mut renderer = Renderer::new(config.verbose);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Input::parse(&line) {
            Input::Empty => continue,
            Input::Question(question) => ask(&pipeline, &mut renderer, question).await,
            Input::Command(Command::Quit) => break,
            Input::Command(Command::Help) => println!("{}", HELP),
            Input::Command(Command::Examples) => {
                for example in EXAMPLES {
                    println!("  - {}", example);
                }
            }
            Input::Command(Command::Stats) => show_stats(&pipeline).await,
            Input::Command(Command::Verbose) => {
                renderer.verbose = !renderer.verbose;
                println!("Verbose mode: {}", if renderer.verbose { "ON" } else { "OFF" });
            }
            Input::Command(Command::Clear) => {
                print!("\x1B[2J\x1B[1;1H");
                header();
            }
            Input::Command(Command::Unknown(command)) => {
                println!("[error] Unknown command: {}", command);
                println!("Type /help for available commands");
            }
        }
    }

    println!("\nGoodbye!");
    Ok(())
}
