use anyhow::Result;
use std::sync::Arc;

use crate::llm::LanguageModel;

const RULES: &str = r#"## Query Rules:
1. Use MATCH for querying nodes and relationships
2. Use WHERE for filtering (prefer WHERE over inline maps for clarity)
3. Use RETURN to specify what data to return
4. For name matching, use "c.name = 'ExactName'" or "c.name CONTAINS 'PartialName'" for partial matches
5. Always return meaningful column names with AS keyword
6. For aggregations, use COUNT(), SUM(), AVG(), etc.
7. For multi-hop queries, chain multiple MATCH patterns
8. Order results when relevant using ORDER BY
9. Limit results if asking for "top" or "best" using LIMIT
10. For Champion cards, include c.level11_stats and c.rarity in the RETURN clause"#;

/// Question to Cypher through the language model.
pub struct QueryTranslator {
    llm: Arc<dyn LanguageModel>,
    preamble: String,
}

impl QueryTranslator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        let preamble = format!(
            "You are an expert Cypher query translator for a Clash Royale Knowledge Graph.\n\n{}\n\n{}\n\n## Examples:\n{}\n\n",
            index::schema_description(),
            RULES,
            index::examples_text(),
        );
        Self { llm, preamble }
    }

    pub fn build_prompt(&self, question: &str) -> String {
        format!(
            "{}## Your Task:\nTranslate the following question into a valid Cypher query.\n\
             Output ONLY the Cypher query, no explanations or markdown formatting.\n\n\
             Question: {}\n\nCypher:",
            self.preamble, question
        )
    }

    /// Model failures propagate; whatever text comes back is sanitized, never rejected.
    pub async fn translate(&self, question: &str) -> Result<String> {
        let raw = self.llm.complete(&self.build_prompt(question)).await?;
        let cypher = sanitize(&raw);
        tracing::debug!(stage = "translate", %cypher, "question translated");
        Ok(cypher)
    }
}

/// Strip fences, any explanation up to the last `Cypher:` marker, and comment lines,
/// then join what remains into one line.
pub fn sanitize(raw: &str) -> String {
    let text = raw.replace("```cypher", "").replace("```", "");
    let text = text.trim();
    let text = match text.rfind("Cypher:") {
        Some(pos) => text[pos + "Cypher:".len()..].trim(),
        None => text,
    };

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("//") && !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    #[test]
    fn test_sanitize_fenced_multiline() {
        let raw = "```cypher\n// find the giant\nMATCH (c:Card {name: 'Giant'})\n\nRETURN c.elixir AS cost\n```";
        assert_eq!(sanitize(raw), "MATCH (c:Card {name: 'Giant'}) RETURN c.elixir AS cost");
    }

    #[test]
    fn test_sanitize_drops_explanation_before_marker() {
        let raw = "Sure! Here is the query.\nCypher: MATCH (c:Card) RETURN c.name AS card\n# done";
        assert_eq!(sanitize(raw), "MATCH (c:Card) RETURN c.name AS card");
    }

    #[test]
    fn test_sanitize_degrades_gracefully() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("I don't know"), "I don't know");
        assert_eq!(sanitize("// only a comment"), "");
    }

    #[tokio::test]
    async fn test_prompt_carries_schema_examples_and_question() {
        let model = Arc::new(ScriptedModel::replying(&["MATCH (c:Card) RETURN c"]));
        let translator = QueryTranslator::new(model.clone());

        let cypher = translator.translate("Which cards cost 2?").await.unwrap();
        assert_eq!(cypher, "MATCH (c:Card) RETURN c");

        let prompt = &model.prompts()[0];
        assert!(prompt.contains("COUNTERS"));
        assert!(prompt.contains("Question: What is the elixir cost of the Giant?"));
        assert!(prompt.ends_with("Question: Which cards cost 2?\n\nCypher:"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![Err("timeout".to_string())]));
        let translator = QueryTranslator::new(model);
        assert!(translator.translate("anything").await.is_err());
    }
}
