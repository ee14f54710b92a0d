use anyhow::{Context, Result};
use async_trait::async_trait;
use neo4rs::{BoltType, Graph, Query};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// One flat result row keyed by the query's RETURN aliases.
pub type Record = serde_json::Map<String, Value>;

/// Named query parameters (`$name` in the query text).
pub type Params = BTreeMap<String, Value>;

/// Pattern-matching query capability over the card graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn run(&self, cypher: &str, params: Params) -> Result<Vec<Record>>;
}

pub struct Neo4jStore {
    graph: Graph,
    timeout: Duration,
}

impl Neo4jStore {
    pub fn new(graph: Graph, timeout: Duration) -> Self {
        Self { graph, timeout }
    }

    async fn collect(&self, query: Query) -> Result<Vec<Record>> {
        let mut result = self.graph.execute(query).await?;
        let mut records = Vec::new();

        while let Some(row) = result.next().await? {
            let record: Record = row
                .to()
                .context("Failed to convert result row")?;
            records.push(record);
        }

        Ok(records)
    }
}

fn to_bolt(key: &str, value: &Value) -> Result<BoltType> {
    let bolt = match value {
        Value::String(s) => BoltType::from(s.clone()),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::from(i),
            None => BoltType::from(n.as_f64().unwrap_or_default()),
        },
        Value::Array(items) => {
            let converted = items
                .iter()
                .map(|item| to_bolt(key, item))
                .collect::<Result<Vec<BoltType>>>()?;
            BoltType::from(converted)
        }
        Value::Null | Value::Object(_) => {
            anyhow::bail!("Unsupported value for query parameter '{}'", key)
        }
    };
    Ok(bolt)
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn run(&self, cypher: &str, params: Params) -> Result<Vec<Record>> {
        let mut query = Query::new(cypher.to_string());
        for (key, value) in &params {
            query = query.param(key, to_bolt(key, value)?);
        }

        match tokio::time::timeout(self.timeout, self.collect(query)).await {
            Ok(records) => records,
            Err(_) => anyhow::bail!("Query timed out after {}s", self.timeout.as_secs()),
        }
    }
}

/// Build a parameter map from `(name, value)` pairs.
pub fn params<I, K, V>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_builder() {
        let p = params([("name", Value::from("Giant")), ("cost", Value::from(5))]);
        assert_eq!(p["name"], "Giant");
        assert_eq!(p["cost"], 5);
    }

    #[test]
    fn test_object_params_rejected() {
        let err = to_bolt("bad", &serde_json::json!({"a": 1})).unwrap_err();
        assert!(err.to_string().contains("'bad'"));
        assert!(to_bolt("ok", &serde_json::json!(["a", "b"])).is_ok());
    }
}
