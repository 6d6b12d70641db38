//! Shared domain types for Duolog.
//!
//! This crate contains the core domain types used across the Duolog
//! messaging engine: Conversation, Message, ChatSummary, live events,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod conversation;
pub mod error;
pub mod event;
pub mod message;
pub mod profile;
pub mod summary;
