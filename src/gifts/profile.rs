//! Recipient profile collected by the guided flow (or sampled by the random flow).

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub const MIN_AGE: u8 = 1;
pub const MAX_AGE: u8 = 120;
pub const MIN_BUDGET: u32 = 10;

/// Interest vocabulary the random flow draws from.
pub const RANDOM_CATEGORIES: &[&str] = &[
    "tech", "books", "art", "sports", "cosmetics", "games", "kitchen",
];

/// Recipient gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Unspecified,
}

/// Accepted normalized inputs and the gender each one maps to.
const GENDER_FORMS: &[(&str, Gender)] = &[
    ("for a man", Gender::Male),
    ("man", Gender::Male),
    ("male", Gender::Male),
    ("him", Gender::Male),
    ("for a woman", Gender::Female),
    ("woman", Gender::Female),
    ("female", Gender::Female),
    ("her", Gender::Female),
    ("doesn't matter", Gender::Unspecified),
    ("doesnt matter", Gender::Unspecified),
    ("any", Gender::Unspecified),
    ("unspecified", Gender::Unspecified),
];

impl Gender {
    /// Keyboard labels offered for the gender question.
    pub const LABELS: [&'static str; 3] = ["For a man", "For a woman", "Doesn't matter"];

    /// Map user input to a gender. Input is trimmed, lowercased and has its
    /// inner whitespace collapsed; anything outside the accepted forms is rejected.
    pub fn from_input(input: &str) -> Option<Self> {
        let normalized = input
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
            .replace('\u{2019}', "'");
        GENDER_FORMS
            .iter()
            .find(|(form, _)| *form == normalized)
            .map(|(_, gender)| *gender)
    }

    /// How the recipient is described in the generation prompt.
    pub fn recipient(&self) -> &'static str {
        match self {
            Self::Male => "a man",
            Self::Female => "a woman",
            Self::Unspecified => "a person",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Unspecified => "unspecified",
        };
        write!(f, "{s}")
    }
}

/// Parse an age answer. Accepts integers in `[MIN_AGE, MAX_AGE]`.
pub fn parse_age(input: &str) -> Option<u8> {
    input
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|age| (MIN_AGE..=MAX_AGE).contains(age))
}

/// Parse a budget answer. Accepts integers `>= MIN_BUDGET`.
pub fn parse_budget(input: &str) -> Option<u32> {
    input
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|budget| *budget >= MIN_BUDGET)
}

/// A complete, validated recipient profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftProfile {
    pub gender: Gender,
    pub age: u8,
    pub budget: u32,
    pub interests: String,
}

impl GiftProfile {
    /// Sample a profile for the random flow: male or female, age 18-65,
    /// budget 500-10000 and two distinct categories.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let gender = if rng.gen_bool(0.5) {
            Gender::Male
        } else {
            Gender::Female
        };
        let interests = RANDOM_CATEGORIES
            .choose_multiple(rng, 2)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            gender,
            age: rng.gen_range(18..=65),
            budget: rng.gen_range(500..=10_000),
            interests,
        }
    }
}

/// Partially collected profile. Fields fill strictly in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub gender: Option<Gender>,
    pub age: Option<u8>,
    pub budget: Option<u32>,
}

impl ProfileDraft {
    /// Complete the draft with the final answer.
    pub fn complete(&self, interests: &str) -> Option<GiftProfile> {
        Some(GiftProfile {
            gender: self.gender?,
            age: self.age?,
            budget: self.budget?,
            interests: interests.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn gender_accepts_keyboard_labels() {
        assert_eq!(Gender::from_input("For a man"), Some(Gender::Male));
        assert_eq!(Gender::from_input("FOR A WOMAN"), Some(Gender::Female));
        assert_eq!(Gender::from_input("  doesn't   matter "), Some(Gender::Unspecified));
        assert_eq!(Gender::from_input("Doesn\u{2019}t matter"), Some(Gender::Unspecified));
        for label in Gender::LABELS {
            assert!(Gender::from_input(label).is_some(), "{label} should parse");
        }
    }

    #[test]
    fn gender_rejects_everything_else() {
        assert_eq!(Gender::from_input(""), None);
        assert_eq!(Gender::from_input("ma"), None);
        assert_eq!(Gender::from_input("manager"), None);
        assert_eq!(Gender::from_input("womanly"), None);
        assert_eq!(Gender::from_input("42"), None);
    }

    #[test]
    fn age_bounds() {
        assert_eq!(parse_age("1"), Some(1));
        assert_eq!(parse_age(" 120 "), Some(120));
        assert_eq!(parse_age("0"), None);
        assert_eq!(parse_age("121"), None);
        assert_eq!(parse_age("-5"), None);
        assert_eq!(parse_age("twenty"), None);
        assert_eq!(parse_age("25.5"), None);
    }

    #[test]
    fn budget_bounds() {
        assert_eq!(parse_budget("10"), Some(10));
        assert_eq!(parse_budget("3000"), Some(3000));
        assert_eq!(parse_budget("9"), None);
        assert_eq!(parse_budget("-100"), None);
        assert_eq!(parse_budget("a lot"), None);
    }

    #[test]
    fn draft_completes_only_when_filled() {
        let mut draft = ProfileDraft::default();
        assert!(draft.complete("books").is_none());
        draft.gender = Some(Gender::Female);
        draft.age = Some(25);
        assert!(draft.complete("books").is_none());
        draft.budget = Some(3000);
        let profile = draft.complete(" books, music ").unwrap();
        assert_eq!(profile.interests, "books, music");
        assert_eq!(profile.age, 25);
    }

    #[test]
    fn random_profile_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let profile = GiftProfile::random(&mut rng);
            assert_ne!(profile.gender, Gender::Unspecified);
            assert!((18..=65).contains(&profile.age));
            assert!((500..=10_000).contains(&profile.budget));

            let interests: Vec<&str> = profile.interests.split(", ").collect();
            assert_eq!(interests.len(), 2);
            assert_ne!(interests[0], interests[1]);
            assert!(interests.iter().all(|i| RANDOM_CATEGORIES.contains(i)));
        }
    }
}
