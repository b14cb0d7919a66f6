//! Bot layer: commands, button payloads, saving and removing favorites,
//! and the event dispatcher that ties them to a channel.

pub mod coordinator;
pub mod dispatcher;
pub mod messages;
pub mod payload;

pub use coordinator::{RemoveOutcome, SaveOutcome, SaveTarget, SelectionCoordinator};
pub use dispatcher::GiftBot;
pub use payload::CallbackAction;
