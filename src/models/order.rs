//! Broker order submission result.

use serde::{Deserialize, Serialize};

/// Outcome of a submitted market order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    /// Broker-reported status (e.g. "accepted", "filled").
    pub status: String,

    /// Broker-assigned order id.
    pub order_id: String,
}
