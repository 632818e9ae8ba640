// crates/dataset_gen/src/classes.rs
//! Fixed character-to-class-id table.
//!
//! Class ids are indices into this list and never assigned dynamically; the
//! detector's label vocabulary depends on the ordering staying put. The set
//! avoids characters that are easy to confuse (0/O, 1/I/l, 6/9, 7/L).

use thiserror::Error;

pub const CAPTCHA_CHARS: [char; 36] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z', '2', '3', '4', '5', '8', '@', '#', '$', '%', '&', '*', '+', '=',
];

/// The session source produced a character the label vocabulary does not
/// know. Always fatal: proceeding would mislabel training data.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("character {0:?} has no class id; session source and label vocabulary are out of sync")]
pub struct UnknownCharacterClass(pub char);

/// Class id for a character, case-insensitive for letters.
pub fn class_id(c: char) -> Result<usize, UnknownCharacterClass> {
    let upper = c.to_ascii_uppercase();
    CAPTCHA_CHARS
        .iter()
        .position(|&k| k == upper)
        .ok_or(UnknownCharacterClass(c))
}

/// Reverse lookup, used by the manifest and label round-trip checks.
pub fn class_char(id: usize) -> Option<char> {
    CAPTCHA_CHARS.get(id).copied()
}
