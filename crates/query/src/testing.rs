//! Deterministic stand-ins for the language model and the graph store.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::llm::LanguageModel;
use crate::store::{GraphStore, Params, Record};

/// Replies with queued responses in order; an exhausted queue is an error.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(anyhow::anyhow!(e)),
            None => Err(anyhow::anyhow!("no scripted reply left")),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

enum Outcome {
    Rows(Vec<Record>),
    Fail(String),
}

struct Rule {
    needle: String,
    param: Option<(String, Value)>,
    outcome: Outcome,
}

impl Rule {
    fn matches(&self, cypher: &str, params: &Params) -> bool {
        cypher.contains(self.needle.as_str())
            && match &self.param {
                Some((key, value)) => params.get(key) == Some(value),
                None => true,
            }
    }
}

fn objects(rows: Vec<Value>) -> Vec<Record> {
    rows.into_iter()
        .filter_map(|row| match row {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// Answers a query with the rows of the first rule whose needle occurs in it
/// (and whose parameter, if any, is bound to the given value).
/// Unmatched queries return no rows.
pub struct ScriptedStore {
    rules: Vec<Rule>,
    seen: Mutex<Vec<(String, Params)>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, needle: &str, rows: Vec<Value>) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            param: None,
            outcome: Outcome::Rows(objects(rows)),
        });
        self
    }

    pub fn on_param(mut self, needle: &str, key: &str, value: &str, rows: Vec<Value>) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            param: Some((key.to_string(), Value::from(value))),
            outcome: Outcome::Rows(objects(rows)),
        });
        self
    }

    pub fn failing(mut self, needle: &str, message: &str) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            param: None,
            outcome: Outcome::Fail(message.to_string()),
        });
        self
    }

    pub fn queries(&self) -> Vec<(String, Params)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphStore for ScriptedStore {
    async fn run(&self, cypher: &str, params: Params) -> Result<Vec<Record>> {
        let outcome = self
            .rules
            .iter()
            .find(|rule| rule.matches(cypher, &params))
            .map(|rule| &rule.outcome);
        self.seen.lock().unwrap().push((cypher.to_string(), params.clone()));

        match outcome {
            Some(Outcome::Rows(rows)) => Ok(rows.clone()),
            Some(Outcome::Fail(message)) => Err(anyhow::anyhow!(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}

/// Card rows for a Hog Rider cycle deck, answered per `$name`.
pub fn cycle_store() -> ScriptedStore {
    let rows = [
        ("Hog Rider", 4, "troop", 1696, 318, 212, vec!["buildings"]),
        ("Musketeer", 4, "troop", 720, 217, 181, vec!["ground", "air"]),
        ("Ice Spirit", 1, "troop", 230, 110, 0, vec!["ground", "air"]),
        ("Skeletons", 1, "troop", 81, 81, 81, vec!["ground"]),
        ("Cannon", 3, "building", 824, 212, 236, vec!["ground"]),
        ("Fireball", 4, "spell", 0, 689, 0, vec![]),
        ("The Log", 2, "spell", 0, 290, 0, vec![]),
        ("Ice Golem", 2, "troop", 1197, 84, 33, vec!["buildings"]),
    ];

    rows.into_iter().fold(ScriptedStore::new(), |store, (name, elixir, kind, hp, dmg, dps, targets)| {
        store.on_param(
            "OPTIONAL MATCH (c)-[:CAN_HIT]",
            "name",
            name,
            vec![json!({
                "name": name, "elixir": elixir, "type": kind, "rarity": "common",
                "hitpoints": hp, "damage": dmg, "dps": dps, "transport": "ground",
                "targets": targets,
            })],
        )
    })
}

pub fn cycle_deck() -> Vec<String> {
    ["Hog Rider", "Musketeer", "Ice Spirit", "Skeletons", "Cannon", "Fireball", "The Log", "Ice Golem"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
