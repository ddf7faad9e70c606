use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::util::{sanitize_label, validate_http_url};

/// Label used for entities whose level is missing or blank.
pub const UNKNOWN_LEVEL: &str = "Unknown";

// ============================================================================
// Entity
// ============================================================================

/// One catalog item.
///
/// `name` is the natural key: the catalog never holds two entities with the
/// same name. Fields are `Arc<str>` so slices of the catalog can be cloned
/// into view state cheaply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity {
    pub name: Arc<str>,
    pub level: Option<Arc<str>>,
    pub image: Option<Arc<str>>,
}

impl Entity {
    pub fn new(name: &str, level: Option<&str>, image: Option<&str>) -> Self {
        Self {
            name: Arc::from(name),
            level: level.map(Arc::from),
            image: image.map(Arc::from),
        }
    }

    /// The level, or [`UNKNOWN_LEVEL`] when absent.
    pub fn level_label(&self) -> &str {
        self.level.as_deref().unwrap_or(UNKNOWN_LEVEL)
    }

    pub fn tier(&self) -> Tier {
        self.level.as_deref().map_or(Tier::Other, Tier::from_label)
    }

    /// Case-insensitive substring match on the name or the level.
    ///
    /// `needle` must already be lowercase. An absent level is not matched
    /// against the placeholder label, so searching "unknown" only finds
    /// entities that literally carry that text.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .level
                .as_deref()
                .is_some_and(|level| level.to_lowercase().contains(needle))
    }
}

/// Evolution stage classification, used for colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Fresh,
    InTraining,
    Rookie,
    Champion,
    Ultimate,
    Mega,
    Armor,
    Other,
}

impl Tier {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "fresh" => Tier::Fresh,
            "in training" | "training" => Tier::InTraining,
            "rookie" => Tier::Rookie,
            "champion" => Tier::Champion,
            "ultimate" => Tier::Ultimate,
            "mega" => Tier::Mega,
            "armor" => Tier::Armor,
            _ => Tier::Other,
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Wire shape of one listing entry. Every field is optional so a single bad
/// entry does not reject the whole response.
#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    img: Option<String>,
}

/// Entities recovered from a listing response.
#[derive(Debug)]
pub struct ParseResult {
    /// Valid entities in response order
    pub entities: Vec<Entity>,
    /// Entries dropped for a missing/duplicate name or a malformed shape
    pub skipped: usize,
}

/// Parse a listing response body.
///
/// The body must be a JSON array. Entries are recovered best-effort:
/// - entries that are not objects, or lack a non-blank name, are skipped
/// - a name already seen earlier in the response is skipped
/// - a blank level becomes `None`
/// - an `img` that is not an http(s) URL becomes `None`
/// - terminal control sequences are stripped from names and levels
///
/// # Errors
///
/// Returns the `serde_json` error when the body is not a JSON array.
pub fn parse_catalog(bytes: &[u8]) -> Result<ParseResult, serde_json::Error> {
    let raw: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;

    let mut seen: HashSet<Arc<str>> = HashSet::with_capacity(raw.len());
    let mut entities = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for value in raw {
        let Ok(entry) = serde_json::from_value::<RawEntity>(value) else {
            skipped += 1;
            continue;
        };
        let Some(name) = entry.name.as_deref().and_then(clean_label) else {
            skipped += 1;
            continue;
        };
        if seen.contains(&name) {
            tracing::debug!(name = %name, "Duplicate catalog entry skipped");
            skipped += 1;
            continue;
        }
        seen.insert(Arc::clone(&name));

        let image = entry
            .img
            .as_deref()
            .map(str::trim)
            .filter(|img| validate_http_url(img).is_ok())
            .map(Arc::from);

        entities.push(Entity {
            name,
            level: entry.level.as_deref().and_then(clean_label),
            image,
        });
    }

    Ok(ParseResult { entities, skipped })
}

fn clean_label(raw: &str) -> Option<Arc<str>> {
    let cleaned = sanitize_label(raw);
    let trimmed = cleaned.trim();
    (!trimmed.is_empty()).then(|| Arc::from(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(|e| &*e.name).collect()
    }

    #[test]
    fn test_parse_listing() {
        let body = br#"[
            {"name":"Koromon","img":"https://digimon.shadowsmith.com/img/koromon.jpg","level":"In Training"},
            {"name":"Tsunomon","img":"https://digimon.shadowsmith.com/img/tsunomon.jpg","level":"In Training"},
            {"name":"Agumon","img":"https://digimon.shadowsmith.com/img/agumon.jpg","level":"Rookie"}
        ]"#;
        let result = parse_catalog(body).unwrap();

        assert_eq!(result.skipped, 0);
        assert_eq!(names(&result.entities), vec!["Koromon", "Tsunomon", "Agumon"]);
        let agumon = &result.entities[2];
        assert_eq!(agumon.level.as_deref(), Some("Rookie"));
        assert_eq!(
            agumon.image.as_deref(),
            Some("https://digimon.shadowsmith.com/img/agumon.jpg")
        );
        assert_eq!(agumon.tier(), Tier::Rookie);
    }

    #[test]
    fn test_parse_empty_array() {
        let result = parse_catalog(b"[]").unwrap();
        assert!(result.entities.is_empty());
        assert_eq!(result.skipped, 0);
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(parse_catalog(br#"{"name":"Agumon"}"#).is_err());
        assert!(parse_catalog(b"<html>").is_err());
    }

    #[test]
    fn test_parse_skips_bad_entries() {
        let body = br#"[
            {"name":"Agumon","level":"Rookie"},
            {"level":"Rookie"},
            {"name":"   "},
            42,
            {"name":"Gabumon","level":7},
            {"name":"Agumon","level":"Champion"},
            {"name":"Patamon"}
        ]"#;
        let result = parse_catalog(body).unwrap();

        assert_eq!(names(&result.entities), vec!["Agumon", "Patamon"]);
        assert_eq!(result.skipped, 5);
        // The first occurrence wins.
        assert_eq!(result.entities[0].level.as_deref(), Some("Rookie"));
    }

    #[test]
    fn test_parse_blank_level_is_absent() {
        let result = parse_catalog(br#"[{"name":"Mystery","level":"  "}]"#).unwrap();
        let entity = &result.entities[0];
        assert_eq!(entity.level, None);
        assert_eq!(entity.level_label(), UNKNOWN_LEVEL);
        assert_eq!(entity.tier(), Tier::Other);
    }

    #[test]
    fn test_parse_rejects_non_http_images() {
        let body = br#"[
            {"name":"A","img":"javascript:alert(1)"},
            {"name":"B","img":"not a url"},
            {"name":"C","img":" https://example.com/c.png "}
        ]"#;
        let result = parse_catalog(body).unwrap();
        assert_eq!(result.entities[0].image, None);
        assert_eq!(result.entities[1].image, None);
        assert_eq!(
            result.entities[2].image.as_deref(),
            Some("https://example.com/c.png")
        );
    }

    #[test]
    fn test_parse_strips_escape_sequences() {
        let body = "[{\"name\":\"\\u001b[31mEvilmon\",\"level\":\"Mega\\u0007\"}]";
        let result = parse_catalog(body.as_bytes()).unwrap();
        assert_eq!(&*result.entities[0].name, "Evilmon");
        assert_eq!(result.entities[0].level.as_deref(), Some("Mega"));
    }

    #[test]
    fn test_tier_from_label() {
        assert_eq!(Tier::from_label("In Training"), Tier::InTraining);
        assert_eq!(Tier::from_label("training"), Tier::InTraining);
        assert_eq!(Tier::from_label("MEGA"), Tier::Mega);
        assert_eq!(Tier::from_label("Armor"), Tier::Armor);
        assert_eq!(Tier::from_label("Jogress"), Tier::Other);
    }

    #[test]
    fn test_matches_name_and_level() {
        let agumon = Entity::new("Agumon", Some("Rookie"), None);
        assert!(agumon.matches("agu"));
        assert!(agumon.matches("rook"));
        assert!(!agumon.matches("mega"));

        let nameless_level = Entity::new("Mystery", None, None);
        assert!(!nameless_level.matches("unknown"));
        assert!(nameless_level.matches("myst"));
    }
}
