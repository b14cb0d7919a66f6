//! Button payload codec.
//!
//! Payloads are short strings attached to buttons and echoed back on a tap:
//! `save_<index>`, `save_random`, `remove_<index>` and `delete_favorite`.

use std::fmt;

/// What a button tap asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Save suggestion `index` of the last guided suggestion set.
    Save(usize),
    /// Save the last random suggestion.
    SaveRandom,
    /// Remove favorite `index` of the listing shown with removal buttons.
    Remove(usize),
    /// Show removal buttons for the user's favorites.
    ListRemovals,
}

const SAVE_PREFIX: &str = "save_";
const REMOVE_PREFIX: &str = "remove_";
const SAVE_RANDOM: &str = "save_random";
const LIST_REMOVALS: &str = "delete_favorite";

impl CallbackAction {
    /// Decode a payload. Anything not produced by [`CallbackAction::encode`]
    /// is rejected.
    pub fn parse(payload: &str) -> Option<Self> {
        match payload {
            SAVE_RANDOM => return Some(Self::SaveRandom),
            LIST_REMOVALS => return Some(Self::ListRemovals),
            _ => {}
        }

        if let Some(index) = payload.strip_prefix(SAVE_PREFIX) {
            return parse_index(index).map(Self::Save);
        }
        if let Some(index) = payload.strip_prefix(REMOVE_PREFIX) {
            return parse_index(index).map(Self::Remove);
        }
        None
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Save(index) => write!(f, "{SAVE_PREFIX}{index}"),
            Self::SaveRandom => f.write_str(SAVE_RANDOM),
            Self::Remove(index) => write!(f, "{REMOVE_PREFIX}{index}"),
            Self::ListRemovals => f.write_str(LIST_REMOVALS),
        }
    }
}

/// ASCII digits only; `usize::from_str` alone would also accept a leading `+`.
fn parse_index(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
