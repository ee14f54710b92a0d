//! Fixed graph schema: node labels, relationship types and a set of worked
//! question-to-Cypher examples. Rendered into the translator prompt.

pub struct NodeSchema {
    pub label: &'static str,
    pub properties: &'static [(&'static str, &'static str)],
    pub description: &'static str,
}

pub struct RelationshipSchema {
    pub rel_type: &'static str,
    pub from_label: &'static str,
    pub to_label: &'static str,
    pub properties: &'static [(&'static str, &'static str)],
    pub description: &'static str,
}

pub struct CypherExample {
    pub question: &'static str,
    pub cypher: &'static str,
}

pub const NODES: &[NodeSchema] = &[
    NodeSchema {
        label: "Card",
        properties: &[
            ("name", "string"),
            ("elixir", "integer"),
            ("type", "string"),
            ("rarity", "string"),
            ("arena", "string"),
            ("transport", "string"),
            ("hitpoints", "integer"),
            ("damage", "integer"),
            ("dps", "integer"),
            ("description", "string"),
            ("level11_stats", "string"),
        ],
        description: "Individual Clash Royale cards with stats. Champions (rarity='champion') have special abilities that enhance their stats when activated.",
    },
    NodeSchema {
        label: "Rarity",
        properties: &[("name", "string")],
        description: "Card rarity levels (common, rare, epic, legendary, champion)",
    },
    NodeSchema {
        label: "Arena",
        properties: &[("name", "string")],
        description: "Arena where the card unlocks",
    },
    NodeSchema {
        label: "Target",
        properties: &[("name", "string")],
        description: "Valid targets for cards (ground, air, buildings)",
    },
    NodeSchema {
        label: "Archetype",
        properties: &[("name", "string")],
        description: "Deck archetypes (Beatdown, Cycle, Control, Siege, Bait, Bridge Spam)",
    },
    NodeSchema {
        label: "Type",
        properties: &[("name", "string")],
        description: "Card type categories (troop, spell, building)",
    },
];

pub const RELATIONSHIPS: &[RelationshipSchema] = &[
    RelationshipSchema {
        rel_type: "HAS_RARITY",
        from_label: "Card",
        to_label: "Rarity",
        properties: &[],
        description: "Card belongs to a rarity tier",
    },
    RelationshipSchema {
        rel_type: "UNLOCKS_IN",
        from_label: "Card",
        to_label: "Arena",
        properties: &[],
        description: "Card unlocks in specific arena",
    },
    RelationshipSchema {
        rel_type: "CAN_HIT",
        from_label: "Card",
        to_label: "Target",
        properties: &[],
        description: "Card can target specific unit types",
    },
    RelationshipSchema {
        rel_type: "HAS_TYPE",
        from_label: "Card",
        to_label: "Type",
        properties: &[],
        description: "Card belongs to a type",
    },
    RelationshipSchema {
        rel_type: "COUNTERS",
        from_label: "Card",
        to_label: "Card",
        properties: &[("effectiveness", "string"), ("reason", "string")],
        description: "Card A is effective against Card B",
    },
    RelationshipSchema {
        rel_type: "SYNERGIZES_WITH",
        from_label: "Card",
        to_label: "Card",
        properties: &[("synergy_type", "string"), ("strength", "string")],
        description: "Card A works well with Card B",
    },
    RelationshipSchema {
        rel_type: "FITS_ARCHETYPE",
        from_label: "Card",
        to_label: "Archetype",
        properties: &[("role", "string")],
        description: "Card fits into deck archetype",
    },
];

pub const CYPHER_EXAMPLES: &[CypherExample] = &[
    CypherExample {
        question: "What is the elixir cost of the Giant?",
        cypher: "MATCH (c:Card {name: 'Giant'}) RETURN c.name AS card, c.elixir AS cost",
    },
    CypherExample {
        question: "Which cards can hit air units?",
        cypher: "MATCH (c:Card)-[:CAN_HIT]->(:Target {name: 'air'}) RETURN c.name AS card ORDER BY c.name",
    },
    CypherExample {
        question: "What are all Legendary cards?",
        cypher: "MATCH (c:Card)-[:HAS_RARITY]->(:Rarity {name: 'legendary'}) RETURN c.name AS card ORDER BY c.elixir",
    },
    CypherExample {
        question: "Which cards counter P.E.K.K.A?",
        cypher: "MATCH (c:Card)-[r:COUNTERS]->(target:Card {name: 'P.E.K.K.A'}) RETURN c.name AS card, r.effectiveness AS effectiveness, r.reason AS reason",
    },
    CypherExample {
        question: "What cards synergize well with Giant?",
        cypher: "MATCH (giant:Card {name: 'Giant'})-[s:SYNERGIZES_WITH]->(c:Card) RETURN c.name AS card, s.synergy_type AS synergy, s.strength AS strength",
    },
    CypherExample {
        question: "Which cards fit the Beatdown archetype?",
        cypher: "MATCH (c:Card)-[f:FITS_ARCHETYPE]->(:Archetype {name: 'Beatdown'}) RETURN c.name AS card, f.role AS role ORDER BY c.elixir DESC",
    },
    CypherExample {
        question: "Compare the stats of Musketeer and Wizard",
        cypher: "MATCH (c:Card) WHERE c.name IN ['Musketeer', 'Wizard'] RETURN c.name AS card, c.elixir AS cost, c.hitpoints AS hp, c.damage AS damage, c.dps AS dps",
    },
    CypherExample {
        question: "What are the cheapest spell cards?",
        cypher: "MATCH (c:Card)-[:HAS_TYPE]->(:Type {name: 'spell'}) RETURN c.name AS card, c.elixir AS cost ORDER BY c.elixir LIMIT 5",
    },
    CypherExample {
        question: "Tell me about the Archer Queen and her ability",
        cypher: "MATCH (c:Card {name: 'Archer Queen'}) RETURN c.name AS card, c.elixir AS cost, c.hitpoints AS hp, c.damage AS damage, c.dps AS dps, c.level11_stats AS stats, c.rarity AS rarity",
    },
    CypherExample {
        question: "What are all the champion cards?",
        cypher: "MATCH (c:Card)-[:HAS_RARITY]->(:Rarity {name: 'champion'}) RETURN c.name AS card, c.elixir AS cost, c.level11_stats AS stats ORDER BY c.elixir",
    },
];

fn push_properties(out: &mut String, properties: &[(&str, &str)]) {
    if properties.is_empty() {
        return;
    }
    out.push_str("Properties:\n");
    for (name, kind) in properties {
        out.push_str(&format!("  - {}: {}\n", name, kind));
    }
}

pub fn schema_description() -> String {
    let mut out = String::from("# Clash Royale Knowledge Graph Schema\n\n## Node Types\n");

    for node in NODES {
        out.push_str(&format!("\n### {}\n{}\n", node.label, node.description));
        push_properties(&mut out, node.properties);
    }

    out.push_str("\n## Relationship Types\n");
    for rel in RELATIONSHIPS {
        out.push_str(&format!(
            "\n### :{}\n{}\nPattern: (:{})-[:{}]->(:{})\n",
            rel.rel_type, rel.description, rel.from_label, rel.rel_type, rel.to_label
        ));
        push_properties(&mut out, rel.properties);
    }

    out
}

pub fn examples_text() -> String {
    CYPHER_EXAMPLES
        .iter()
        .map(|ex| format!("Question: {}\nCypher: {}", ex.question, ex.cypher))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_lists_every_label() {
        let description = schema_description();
        for label in ["Card", "Rarity", "Arena", "Target", "Archetype", "Type"] {
            assert!(description.contains(&format!("### {}\n", label)), "missing {}", label);
        }
        assert!(description.contains("Pattern: (:Card)-[:COUNTERS]->(:Card)"));
        assert!(description.contains("  - synergy_type: string"));
    }

    #[test]
    fn test_examples_render() {
        let text = examples_text();
        assert_eq!(text.matches("Question: ").count(), CYPHER_EXAMPLES.len());
        assert!(text.starts_with("Question: What is the elixir cost of the Giant?\nCypher: MATCH"));
    }
}
