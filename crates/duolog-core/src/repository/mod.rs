//! Repository trait definitions ("ports") implemented by duolog-infra.

pub mod conversation;
pub mod message;
pub mod profile;

#[cfg(test)]
pub(crate) mod memory;

pub use conversation::ConversationRepository;
pub use message::MessageRepository;
pub use profile::ProfileStore;
