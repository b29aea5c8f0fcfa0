//! Trading logic: strategy configuration, risk exits, signals, sizing.

mod config;
mod risk;
mod signal;
mod sizer;

pub use config::StrategyConfig;
pub use risk::evaluate_exits;
pub use signal::{SignalAction, SignalGenerator, TickerContext};
pub use sizer::shares_for_allocation;
