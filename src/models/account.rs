//! Account snapshot.

use serde::{Deserialize, Serialize};

/// Account state as reported by the broker. Read fresh at the start of each
/// cycle and never cached across cycles; stale equity would corrupt sizing
/// and risk decisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Account {
    pub equity: f64,
    pub cash: f64,
    pub buying_power: f64,
}
