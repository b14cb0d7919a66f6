//! Prompt text for gift generation and parsing of the model's answer.

use super::profile::GiftProfile;

pub const SYSTEM_PROMPT: &str = "You are a gift selection assistant.";

/// Build the user prompt for one generation call.
pub fn gift_prompt(profile: &GiftProfile, count: usize) -> String {
    format!(
        "Generate {count} creative gift ideas for {recipient}, {age} years old, \
         with a budget of {budget}. Interests: {interests}. \
         The gifts should be practical and suit the recipient's age. \
         Format: 1. Gift name (approximate price) - short description",
        recipient = profile.gender.recipient(),
        age = profile.age,
        budget = profile.budget,
        interests = profile.interests,
    )
}

/// Split a model answer into suggestions: one per non-blank line, at most `max`.
pub fn parse_suggestions(answer: &str, max: usize) -> Vec<String> {
    answer
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(max)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gifts::Gender;

    #[test]
    fn prompt_mentions_every_field() {
        let profile = GiftProfile {
            gender: Gender::Female,
            age: 25,
            budget: 3000,
            interests: "books, music".to_string(),
        };
        let prompt = gift_prompt(&profile, 5);
        assert!(prompt.contains("5 creative gift ideas"));
        assert!(prompt.contains("a woman"));
        assert!(prompt.contains("25 years old"));
        assert!(prompt.contains("budget of 3000"));
        assert!(prompt.contains("Interests: books, music"));
    }

    #[test]
    fn parse_drops_blank_lines() {
        let answer = "1. Kindle (9000) - e-reader\n\n  \n2. Vinyl (2500) - record\n";
        assert_eq!(
            parse_suggestions(answer, 5),
            vec!["1. Kindle (9000) - e-reader", "2. Vinyl (2500) - record"]
        );
    }

    #[test]
    fn parse_caps_at_max() {
        let answer = "a\nb\nc\nd\ne\nf\ng";
        assert_eq!(parse_suggestions(answer, 5).len(), 5);
    }

    #[test]
    fn parse_empty_answer() {
        assert!(parse_suggestions("   \n\n", 5).is_empty());
    }
}
