//! pricebot: single-pair threshold trading bot.
//!
//! Library crate exposing all modules for the binary entry point.

pub mod api;
pub mod bot;
pub mod models;
pub mod trading;
