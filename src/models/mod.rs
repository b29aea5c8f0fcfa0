//! Core data model: bars, positions, account, orders, and decision records.

mod account;
mod bar;
mod decision;
mod order;
mod position;

pub use account::Account;
pub use bar::PriceBar;
pub use decision::{Decision, DecisionAction};
pub use order::OrderResult;
pub use position::Position;
