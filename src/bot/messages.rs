//! Outgoing texts and keyboards.

use crate::channels::{Button, Markup, OutgoingMessage};
use crate::config::Shop;
use crate::conversation::ConversationPhase;
use crate::gifts::Gender;

use super::payload::CallbackAction;

/// Suggestions shown in the guided result message.
pub const MAX_SHOWN: usize = 5;
/// Suggestions that get a save button.
pub const MAX_SAVE_BUTTONS: usize = 3;
/// Removal buttons per keyboard row.
const REMOVE_BUTTONS_PER_ROW: usize = 3;

pub const GENDER_PROMPT: &str = "👤 Who is the gift for?";
pub const GENDER_REPROMPT: &str = "Please pick one of the options on the keyboard.";
pub const AGE_PROMPT: &str = "🔢 How old is the recipient?";
pub const AGE_REPROMPT: &str = "Please enter a valid age (a number from 1 to 120):";
pub const BUDGET_PROMPT: &str = "💰 What is your gift budget?";
pub const BUDGET_REPROMPT: &str = "Please enter a valid amount (a number of at least 10):";
pub const INTERESTS_PROMPT: &str =
    "🎯 What is the recipient interested in?\n(for example: music, sports, books, technology)";
pub const INTERESTS_REPROMPT: &str = "Please tell me at least one interest.";

pub const WORKING_GUIDED: &str = "✨ Generating ideas...";
pub const WORKING_RANDOM: &str = "✨ Generating a random idea...";
pub const GUIDED_FAILED: &str = "Sorry, I couldn't come up with ideas. Please try again.";
pub const RANDOM_FAILED: &str = "Couldn't generate an idea. Please try again.";
pub const BUSY: &str = "⏳ Still working on your ideas, one moment please.";

pub const NO_FAVORITES: &str = "You don't have any saved ideas yet.";
pub const NOTHING_TO_REMOVE: &str = "No saved ideas to remove.";
pub const SAVED: &str = "✅ Idea saved to favorites!";
pub const ALREADY_SAVED: &str = "⚠️ This idea is already in your favorites.";
pub const NOT_FOUND: &str = "Idea not found.";
pub const REMOVED: &str = "✅ Idea removed from favorites!";
pub const REMOVE_FAILED: &str = "Couldn't remove the idea.";
pub const FAILURE: &str = "Something went wrong. Please try again later.";

pub fn welcome(name: Option<&str>) -> OutgoingMessage {
    let greeting = match name {
        Some(name) => format!("🎁 Hi, {name}!"),
        None => "🎁 Hi!".to_string(),
    };
    OutgoingMessage::text(format!(
        "{greeting}\n\
         I'll help you pick the perfect gift for any occasion!\n\n\
         ✨ Just tell me:\n\
         - who it's for\n\
         - their age\n\
         - your budget\n\
         - their interests\n\n\
         Commands:\n\
         /gift - find a gift\n\
         /random - a random gift idea\n\
         /favorites - my saved ideas"
    ))
}

/// The gender question, with the accepted labels as quick replies.
pub fn gender_prompt() -> OutgoingMessage {
    let rows: Vec<Vec<String>> = Gender::LABELS
        .chunks(2)
        .map(|row| row.iter().map(|label| label.to_string()).collect::<Vec<_>>())
        .collect();
    OutgoingMessage::text(GENDER_PROMPT).with_markup(Markup::Choices(rows))
}

/// Prompt for the phase the conversation just entered.
pub fn prompt_for(phase: ConversationPhase) -> Option<OutgoingMessage> {
    match phase {
        ConversationPhase::Idle => None,
        ConversationPhase::AwaitingGender => Some(gender_prompt()),
        ConversationPhase::AwaitingAge => {
            Some(OutgoingMessage::text(AGE_PROMPT).with_markup(Markup::ClearChoices))
        }
        ConversationPhase::AwaitingBudget => Some(OutgoingMessage::text(BUDGET_PROMPT)),
        ConversationPhase::AwaitingInterests => Some(OutgoingMessage::text(INTERESTS_PROMPT)),
    }
}

/// Corrective prompt after a malformed answer.
pub fn reprompt_for(phase: ConversationPhase) -> Option<OutgoingMessage> {
    let text = match phase {
        ConversationPhase::Idle => return None,
        ConversationPhase::AwaitingGender => GENDER_REPROMPT,
        ConversationPhase::AwaitingAge => AGE_REPROMPT,
        ConversationPhase::AwaitingBudget => BUDGET_REPROMPT,
        ConversationPhase::AwaitingInterests => INTERESTS_REPROMPT,
    };
    Some(OutgoingMessage::text(text))
}

/// Guided result: up to five ideas, the first three with a save button each.
pub fn suggestions(ideas: &[String]) -> OutgoingMessage {
    let shown: Vec<&str> = ideas.iter().take(MAX_SHOWN).map(String::as_str).collect();
    let rows: Vec<Vec<Button>> = (0..ideas.len().min(MAX_SAVE_BUTTONS))
        .map(|i| {
            vec![Button::new(
                format!("⭐ Save idea {}", i + 1),
                CallbackAction::Save(i).encode(),
            )]
        })
        .collect();
    OutgoingMessage::text(format!(
        "🎁 Here are a few gift ideas:\n\n{}",
        shown.join("\n\n")
    ))
    .with_markup(Markup::Buttons(rows))
}

pub fn random_suggestion(idea: &str) -> OutgoingMessage {
    OutgoingMessage::text(format!("🎲 Random gift idea:\n\n{idea}")).with_markup(Markup::Buttons(
        vec![vec![Button::new(
            "⭐ Save this idea",
            CallbackAction::SaveRandom.encode(),
        )]],
    ))
}

/// Numbered favorites with a button that opens the removal keyboard.
pub fn favorites(items: &[String]) -> OutgoingMessage {
    if items.is_empty() {
        return OutgoingMessage::text(NO_FAVORITES);
    }
    let listing: String = items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {item}\n\n", i + 1))
        .collect();
    OutgoingMessage::text(format!("⭐ Your saved gift ideas:\n\n{}", listing.trim_end()))
        .with_markup(Markup::Buttons(vec![vec![Button::new(
            "🗑️ Delete an idea",
            CallbackAction::ListRemovals.encode(),
        )]]))
}

/// One removal button per favorite, three per row.
pub fn removal_buttons(count: usize) -> Vec<Vec<Button>> {
    let buttons: Vec<Button> = (0..count)
        .map(|i| Button::new(format!("❌ Delete {}", i + 1), CallbackAction::Remove(i).encode()))
        .collect();
    buttons
        .chunks(REMOVE_BUTTONS_PER_ROW)
        .map(<[Button]>::to_vec)
        .collect()
}

pub fn shops(shops: &[Shop]) -> OutgoingMessage {
    let list: Vec<String> = shops
        .iter()
        .map(|shop| format!("• {}: {}", shop.name, shop.url))
        .collect();
    OutgoingMessage::text(format!(
        "🛒 Want to buy this gift? Here are some trusted shops:\n\n{}\n\nHappy shopping! 😊",
        list.join("\n")
    ))
}

/// Whether free text asks where to buy something.
pub fn mentions_buying(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == "buy")
}
