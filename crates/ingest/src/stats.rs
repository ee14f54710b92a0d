use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static NUMERIC_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\d,\.]+)").expect("numeric prefix pattern"));

/// Cards whose damage ramps up; their stage 3 numbers are the useful ones.
pub const STAGED_DAMAGE_CARDS: [&str; 3] = ["Inferno Dragon", "Inferno Tower", "Mighty Miner"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Hitpoints,
    Damage,
    DamagePerSecond,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    pub hitpoints: Option<i64>,
    pub damage: Option<i64>,
    pub dps: Option<i64>,
}

/// Parse the leading numeric run of a scraped value.
///
/// Thousands separators are dropped and any fraction is truncated. A value
/// without a numeric prefix is absent, not zero.
pub fn to_number(value: Option<&Value>) -> Option<i64> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let captures = NUMERIC_PREFIX.captures(&text)?;
    let digits = captures.get(1)?.as_str().replace(',', "");
    digits.parse::<f64>().ok().map(|n| n.trunc() as i64)
}

/// Accepted key spellings for a stat, most preferred first.
pub fn candidate_keys(card_name: &str, kind: StatKind) -> Vec<String> {
    let staged = STAGED_DAMAGE_CARDS.contains(&card_name);

    match kind {
        StatKind::Hitpoints => vec![
            "Hitpoints".to_string(),
            format!("{} Hitpoints", card_name),
        ],
        StatKind::Damage if staged => vec!["Damage (Stage 3)".to_string()],
        StatKind::Damage => vec![
            "Area Damage".to_string(),
            "Damage".to_string(),
            "Spawn Damage".to_string(),
            "Dash Damage".to_string(),
            format!("{} Damage", card_name),
        ],
        StatKind::DamagePerSecond if staged => vec!["Damage per second (Stage 3)".to_string()],
        StatKind::DamagePerSecond => vec![
            "Damage per second".to_string(),
            format!("{} Damage per second", card_name),
        ],
    }
}

/// Case-insensitive key lookup. Null and empty values count as missing.
fn find_stat<'a>(stats: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let key_lower = key.to_lowercase();
    stats
        .iter()
        .find(|(k, _)| k.to_lowercase() == key_lower)
        .map(|(_, v)| v)
        .filter(|v| !is_blank(v))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// The first matching key decides; its value is parsed even if that yields nothing.
pub fn extract_stat(stats: &Map<String, Value>, card_name: &str, kind: StatKind) -> Option<i64> {
    let value = candidate_keys(card_name, kind)
        .iter()
        .find_map(|key| find_stat(stats, key));
    to_number(value)
}

pub fn extract_combat_stats(card_name: &str, stats: &Map<String, Value>) -> CombatStats {
    CombatStats {
        hitpoints: extract_stat(stats, card_name, StatKind::Hitpoints),
        damage: extract_stat(stats, card_name, StatKind::Damage),
        dps: extract_stat(stats, card_name, StatKind::DamagePerSecond),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(Some(&json!("3,400"))), Some(3400));
        assert_eq!(to_number(Some(&json!("125/sec"))), Some(125));
        assert_eq!(to_number(Some(&json!("N/A"))), None);
        assert_eq!(to_number(None), None);
        assert_eq!(to_number(Some(&Value::Null)), None);
        assert_eq!(to_number(Some(&json!("  98.7 (x2)"))), Some(98));
        assert_eq!(to_number(Some(&json!(640))), Some(640));
        assert_eq!(to_number(Some(&json!("..."))), None);
    }

    #[test]
    fn test_hitpoints_with_name_prefix() {
        let stats = table(json!({ "Golem Hitpoints": "5,120", "Golemite Hitpoints": "1,040" }));
        assert_eq!(extract_stat(&stats, "Golem", StatKind::Hitpoints), Some(5120));
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let stats = table(json!({ "hitpoints": "4,091", "DAMAGE": "254" }));
        let combat = extract_combat_stats("Giant", &stats);
        assert_eq!(combat.hitpoints, Some(4091));
        assert_eq!(combat.damage, Some(254));
        assert_eq!(combat.dps, None);
    }

    #[test]
    fn test_area_damage_preferred_over_damage() {
        let stats = table(json!({ "Damage": "100", "Area Damage": "230" }));
        assert_eq!(extract_stat(&stats, "Valkyrie", StatKind::Damage), Some(230));
    }

    #[test]
    fn test_staged_cards_read_stage_three() {
        let stats = table(json!({
            "Damage": "30",
            "Damage (Stage 3)": "400",
            "Damage per second (Stage 3)": "1,000",
        }));
        let combat = extract_combat_stats("Inferno Dragon", &stats);
        assert_eq!(combat.damage, Some(400));
        assert_eq!(combat.dps, Some(1000));
    }

    #[test]
    fn test_empty_values_skip_to_next_key() {
        let stats = table(json!({ "Area Damage": "", "Damage": null, "Spawn Damage": "150" }));
        assert_eq!(extract_stat(&stats, "Goblin Barrel", StatKind::Damage), Some(150));
    }

    #[test]
    fn test_non_numeric_first_match_is_absent() {
        let stats = table(json!({ "Damage": "varies", "Minion Damage": "84" }));
        assert_eq!(extract_stat(&stats, "Minion", StatKind::Damage), None);
    }
}
