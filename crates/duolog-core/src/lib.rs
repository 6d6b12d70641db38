//! Synchronization engine and repository trait definitions for Duolog.
//!
//! This crate defines the "ports" (repository traits) that the
//! infrastructure layer implements, and the services built on top of
//! them: conversation resolution, message persistence, read tracking,
//! live update propagation, and chat-list aggregation. It depends only
//! on `duolog-types` -- never on `duolog-infra` or any database crate.

pub mod chat_list;
pub mod live;
pub mod read;
pub mod repository;
pub mod resolver;
pub mod store;
