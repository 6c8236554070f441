//! Core domain + application logic for the map bot.
//!
//! This crate is intentionally framework-agnostic. Telegram, the geocoding
//! provider and the map renderer live behind ports (traits) implemented in
//! adapter crates; only the SQLite city store is implemented here.

pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod geocode;
pub mod logging;
pub mod messaging;
pub mod render;
pub mod store;

pub use errors::{Error, Result};
