use once_cell::sync::Lazy;
use regex::Regex;

/// Input validation utilities for the identity service

// Compile regex patterns once at startup
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid")
});

/// Validate email format (RFC 5322 simplified)
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Minimum username length accepted at registration
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LENGTH: usize = 6;
