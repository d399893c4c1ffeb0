//! Formatting helpers for terminal output.

use rust_decimal::Decimal;

/// Currency symbol prefixed to amounts
pub const CURRENCY: &str = "₹";

/// Format an amount with the currency symbol and two decimals
pub fn format_money(amount: Decimal) -> String {
    format!("{} {:.2}", CURRENCY, amount)
}

/// Format a 10-digit mobile number as `XXXXX XXXXX`
pub fn format_mobile(mobile: &str) -> String {
    let digits: String = mobile.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("{} {}", &digits[0..5], &digits[5..10])
    } else {
        mobile.to_string() // Return original if can't format
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}
