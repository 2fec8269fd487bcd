//! Shape checks for sign-in input.
//!
//! These run before any state transition so a rejected input never
//! reaches the flow.

use crate::error::{Result, SessionError};

pub fn validate_phone(phone: &str, min_digits: usize) -> Result<String> {
    let phone = phone.trim();
    if !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(SessionError::validation(
            "Phone number must contain digits only",
        ));
    }
    if phone.len() < min_digits {
        return Err(SessionError::validation(format!(
            "Phone number must be at least {} digits",
            min_digits
        )));
    }
    Ok(phone.to_string())
}

pub fn validate_country_code(country_code: &str) -> Result<String> {
    let country_code = country_code.trim();
    if country_code.is_empty() {
        return Err(SessionError::validation("Country code is required"));
    }
    Ok(country_code.to_string())
}

/// Checks that `candidate` is exactly `length` ASCII digits.
///
/// The candidate is not trimmed; verification is plain string equality.
pub fn validate_otp_shape(candidate: &str, length: usize) -> Result<()> {
    if candidate.len() != length || !candidate.chars().all(|c| c.is_ascii_digit()) {
        return Err(SessionError::validation(format!(
            "Enter {}-digit OTP",
            length
        )));
    }
    Ok(())
}
