// src/matching/identifier.rs

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

// Registry/collections browse URLs ending in an entity UUID, e.g.
// https://www.gbif.org/grscicoll/institution/<uuid>
// The dot in gbif.org is literal.
static GBIF_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^.*(gbif\.org|grscicoll).*/([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})/?$",
    )
    .unwrap_or_else(|e| panic!("invalid GBIF URL pattern: {}", e))
});

/// Extracts an entity key from a free-text identifier.
///
/// Accepts a bare UUID or a GBIF/GRSciColl URL whose last path segment is a
/// UUID. Anything else yields `None`, which callers treat as "no key
/// constraint".
pub fn parse_uuid(value: &str) -> Option<Uuid> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(uuid) = Uuid::parse_str(value) {
        return Some(uuid);
    }

    let captures = GBIF_URL_PATTERN.captures(value)?;
    let parsed = Uuid::parse_str(&captures[2]).ok();
    trace!("Identifier {} resolved from URL to {:?}", value, parsed);
    parsed
}
