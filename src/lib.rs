//! Forum thread monitor library.
//!
//! Watches forum RSS feeds and individual discussion pages, stores every thread
//! and comment once, and sends a notification for new items that pass the
//! configured filters.

pub mod classifier;
pub mod config;
pub mod constants;
pub mod db;
pub mod fetch;
pub mod filter;
pub mod monitor;
pub mod notify;
pub mod parse;
pub mod settings;
