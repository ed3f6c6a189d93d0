//! Philippine mobile number normalization.
//!
//! Canonical form is 12 digits: `63` followed by the 10-digit mobile number
//! (which itself starts with `9`).

/// Normalize a free-form phone number to canonical `639XXXXXXXXX` form.
///
/// Returns `None` for anything that is not a recognisable PH mobile number.
pub fn normalize_phone_number(input: &str) -> Option<String> {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 12 && digits.starts_with("639") {
        Some(digits)
    } else if digits.len() == 11 && digits.starts_with("09") {
        Some(format!("63{}", &digits[1..]))
    } else if digits.len() == 10 && digits.starts_with('9') {
        Some(format!("63{digits}"))
    } else {
        None
    }
}
