//! Infrastructure layer for Duolog.
//!
//! Contains implementations of the repository traits defined in
//! `duolog-core`: SQLite storage behind a split reader/writer pool, plus
//! the configuration loader.

pub mod config;
pub mod sqlite;
