//! Whole-share position sizing.

/// Convert an equity allocation fraction and a share price into a whole-share
/// quantity.
///
/// Fails closed: a non-positive price, equity, or allocation sizes to zero.
/// Always floors, never rounds up, never goes negative. Duplicate-buy
/// prevention (not buying a ticker already held) is the caller's invariant.
pub fn shares_for_allocation(equity: f64, price: f64, allocation: f64) -> u64 {
    if price <= 0.0 || equity <= 0.0 || allocation <= 0.0 {
        return 0;
    }
    let shares = (equity * allocation / price).floor();
    if shares.is_finite() && shares > 0.0 {
        shares as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_sizing() {
        assert_eq!(shares_for_allocation(10_000.0, 50.0, 0.2), 40);
    }

    #[test]
    fn fails_closed_on_bad_inputs() {
        assert_eq!(shares_for_allocation(10_000.0, 0.0, 0.2), 0);
        assert_eq!(shares_for_allocation(0.0, 50.0, 0.2), 0);
        assert_eq!(shares_for_allocation(-5.0, 50.0, 0.2), 0);
        assert_eq!(shares_for_allocation(10_000.0, -1.0, 0.2), 0);
        assert_eq!(shares_for_allocation(10_000.0, 50.0, 0.0), 0);
    }

    #[test]
    fn always_floors() {
        // 1000 * 0.1 / 33 = 3.03 shares
        assert_eq!(shares_for_allocation(1_000.0, 33.0, 0.1), 3);
        // Just under one share rounds to zero, not one.
        assert_eq!(shares_for_allocation(100.0, 101.0, 1.0), 0);
    }
}
