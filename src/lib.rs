//! Thread harvester library.
//!
//! Drives a browser through a social search feed, collects root posts and a
//! bounded number of replies per thread, and assembles them into flat
//! records for CSV export.

// Allow raw string hashes for safety - selectors are full of quotes
#![allow(clippy::needless_raw_string_hashes)]

pub mod browser;
pub mod config;
pub mod constants;
pub mod crawler;
pub mod export;
pub mod extract;
pub mod language;
pub mod record;
