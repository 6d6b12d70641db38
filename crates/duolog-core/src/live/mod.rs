//! Live update propagation: feed topics, client view state, and the
//! subscription sessions that tie them together.

pub mod feed;
pub mod session;
pub mod view;

pub use feed::MessageFeed;
pub use session::{ChatListSession, LiveSession, ResyncPolicy};
pub use view::{ChatView, RemoteOutcome};
