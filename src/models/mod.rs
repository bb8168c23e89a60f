//! Data models for positions and trades.

mod position;
mod trade;

pub use position::Position;
pub use trade::{Fill, TradeSide};
