use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Read `key` through `lookup`, falling back to `default` when unset or unparseable.
pub fn read_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, value = %raw, error = %e, "invalid config value, using default");
                default
            }
        },
    }
}

pub fn read_string<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "12345678".to_string(),
        }
    }
}

impl Neo4jConfig {
    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            uri: read_string(lookup, "NEO4J_URI", &defaults.uri),
            user: read_string(lookup, "NEO4J_USER", &defaults.user),
            password: read_string(lookup, "NEO4J_PASSWORD", &defaults.password),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(&process_env)
    }

    pub async fn connect(&self) -> anyhow::Result<neo4rs::Graph> {
        use anyhow::Context;

        neo4rs::Graph::new(&self.uri, &self.user, &self.password)
            .await
            .context(format!("Failed to connect to Neo4j at {}", self.uri))
    }
}
