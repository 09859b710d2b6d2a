/// Currency utility functions for monetary amounts
///
/// All monetary values in the database are stored in integer cents
/// to avoid floating-point precision issues.

/// Convert a decimal amount to cents (multiply by 100)
pub fn amount_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Convert cents back to a decimal amount (divide by 100)
pub fn cents_to_amount(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Compute the commission owed on a transaction, in cents.
///
/// `rate` is an integer percentage in [0, 100]. Rounding is half-up to the
/// smallest currency unit, so e.g. a 15% rate on 1.03 (103 cents) yields
/// 15.45 cents -> 15 cents, and on 1.10 (110 cents) yields 16.5 -> 17 cents.
pub fn commission_cents(amount_cents: i64, rate: i32) -> i64 {
    (amount_cents * rate as i64 + 50) / 100
}

/// Validate and parse an amount string to cents
pub fn parse_amount_to_cents(amount_str: &str) -> Result<i64, String> {
    amount_str
        .parse::<f64>()
        .map_err(|_| "Invalid amount format".to_string())
        .and_then(|amount| {
            if amount < 0.0 {
                Err("Amount cannot be negative".to_string())
            } else {
                Ok(amount_to_cents(amount))
            }
        })
}
