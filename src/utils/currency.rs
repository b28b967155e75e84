/// Currency utility functions.
///
/// All monetary values in the database and in gateway calls are stored
/// in cents (1 USD = 100 cents) to avoid floating-point precision issues.

/// Convert USD to cents (multiply by 100)
pub fn usd_to_cents(usd: f64) -> i64 {
    (usd * 100.0).round() as i64
}

/// Convert cents to USD (divide by 100)
pub fn cents_to_usd(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Apply a percentage to an amount in cents, rounding to the nearest cent.
pub fn percent_of(amount_cents: i64, percent: f64) -> i64 {
    (amount_cents as f64 * percent / 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usd_to_cents() {
        assert_eq!(usd_to_cents(500.0), 50000);
        assert_eq!(usd_to_cents(0.01), 1);
        assert_eq!(usd_to_cents(19.99), 1999);
    }

    #[test]
    fn test_cents_to_usd() {
        assert_eq!(cents_to_usd(50000), 500.0);
        assert_eq!(cents_to_usd(1), 0.01);
    }

    #[test]
    fn test_percent_of() {
        // 6.8% platform fee on a $500 order
        assert_eq!(percent_of(50000, 6.8), 3400);
        // 20% commission on a $50 tip
        assert_eq!(percent_of(5000, 20.0), 1000);
        assert_eq!(percent_of(0, 20.0), 0);
    }
}
