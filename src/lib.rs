//! Gift Assist: a chat bot that interviews the user about a gift recipient,
//! asks a language model for ideas, and keeps a per-user favorites list.

pub mod bot;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod error;
pub mod favorites;
pub mod gifts;
pub mod llm;
