use thiserror::Error;

/// Lowest price a driver may submit for any trip, in whole currency units.
pub const MIN_PRICE: i64 = 60;

/// Fixed quick-bid increments offered next to the price field.
pub const QUICK_BIDS: [i64; 3] = [20, 50, 100];

/// Multiplier applied to an order's base price during peak demand.
pub const PEAK_MULTIPLIER: f64 = 1.15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("price {0} is below the minimum of {MIN_PRICE}")]
    BelowMinimum(i64),
}

/// Adds a quick-bid increment to the currently displayed price. Increments
/// outside the fixed set are ignored.
pub fn apply_quick_bid(current: i64, increment: i64) -> i64 {
    if QUICK_BIDS.contains(&increment) {
        current + increment
    } else {
        current
    }
}

/// Peak price is always derived from the order's original base price, not
/// from whatever quick bids have already been stacked on the display.
pub fn peak_price(base_price: i64) -> i64 {
    (base_price as f64 * PEAK_MULTIPLIER).round() as i64
}

/// Validates a bid against the floor before it may be submitted.
pub fn validate_bid(price: i64) -> Result<i64, PriceError> {
    if price < MIN_PRICE {
        return Err(PriceError::BelowMinimum(price));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_bids_stack_on_the_displayed_price() {
        let base = 180;
        assert_eq!(apply_quick_bid(apply_quick_bid(base, 20), 50), 250);
    }

    #[test]
    fn unknown_increments_leave_the_price_alone() {
        assert_eq!(apply_quick_bid(180, 70), 180);
        assert_eq!(apply_quick_bid(180, -20), 180);
    }

    #[test]
    fn peak_price_rounds_from_base() {
        assert_eq!(peak_price(100), 115);
        assert_eq!(peak_price(60), 69);
        // 90 * 1.15 lands just below 103.5 in f64, so it rounds down.
        assert_eq!(peak_price(90), 103);
    }

    #[test]
    fn peak_price_ignores_stacked_quick_bids() {
        let base = 200;
        let displayed = apply_quick_bid(base, 100);
        assert_ne!(peak_price(base), peak_price(displayed));
        assert_eq!(peak_price(base), 230);
    }

    #[test]
    fn floor_rejects_59_accepts_60() {
        assert_eq!(validate_bid(59), Err(PriceError::BelowMinimum(59)));
        assert_eq!(validate_bid(60), Ok(60));
    }
}
