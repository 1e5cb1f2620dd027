//! Static rarity table.
//!
//! # Invariants
//! - Ids cover `0..=MAX_RARITY_ID` without gaps and are sorted ascending.
//! - Unknown ids resolve to the id-0 (`onbekend`) level.

use serde::{Deserialize, Serialize};

/// Highest rarity id known to the table.
pub const MAX_RARITY_ID: u8 = 4;

/// Ordinal classification of how unusual a sighting is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RarityLevel {
    pub id: u8,
    pub name: String,
    /// Hex color used by list badges.
    pub color: String,
    /// Optional icon glyph; empty for the built-in levels.
    pub emoji: String,
}

impl RarityLevel {
    /// Name with its first letter upper-cased, as used in notification titles.
    pub fn display_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

const LEVELS: [(u8, &str, &str); 5] = [
    (0, "onbekend", "#95a5a6"),
    (1, "algemeen", "#27ae60"),
    (2, "vrij algemeen", "#f39c12"),
    (3, "zeldzaam", "#e67e22"),
    (4, "zeer zeldzaam", "#e74c3c"),
];

fn build(index: usize) -> RarityLevel {
    let (id, name, color) = LEVELS[index];
    RarityLevel {
        id,
        name: name.to_string(),
        color: color.to_string(),
        emoji: String::new(),
    }
}

/// Returns the level for `id`, or the unknown level when `id` is out of range.
pub fn level_for(id: i64) -> RarityLevel {
    match usize::try_from(id) {
        Ok(index) if index < LEVELS.len() => build(index),
        _ => build(0),
    }
}

/// Returns every level sorted ascending by id.
pub fn all_levels() -> Vec<RarityLevel> {
    (0..LEVELS.len()).map(build).collect()
}
