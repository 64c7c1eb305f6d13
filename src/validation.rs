//! Validation utilities for challenge requests
//!
//! This module validates the inputs of a challenge request before any
//! provider call is made: the challenge FQDN and the TXT token.

use anyhow::{anyhow, Result};

use crate::constants::{MAX_LABEL_LENGTH, MAX_RECORD_NAME_LENGTH};

/// Maximum length of a single TXT character-string
pub const MAX_TOKEN_LENGTH: usize = 255;

/// Validates that a string is a usable challenge record name
///
/// Rules follow RFC 1035 with the relaxations DNS-01 needs:
///
/// 1. **Length constraints**: at most 253 characters (excluding trailing dot),
///    at most 63 characters per label.
/// 2. **Syntax rules**: no spaces, no empty labels, no leading dot, labels
///    cannot start or end with a hyphen.
/// 3. **Allowed characters**: letters, digits, `-` and `_` (the challenge
///    label itself is `_acme-challenge`).
///
/// A single trailing dot (FQDN notation) is accepted and ignored.
///
/// # Examples
///
/// ```
/// use gcore_dns01::validation::validate_record_name;
///
/// assert!(validate_record_name("_acme-challenge.example.com.").is_ok());
/// assert!(validate_record_name("sub.example.com").is_ok());
///
/// assert!(validate_record_name("").is_err());
/// assert!(validate_record_name("example..com").is_err());
/// assert!(validate_record_name("*.example.com").is_err());
/// ```
pub fn validate_record_name(record_name: &str) -> Result<()> {
    let trimmed = record_name.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Record name cannot be empty"));
    }
    if trimmed.contains(' ') {
        return Err(anyhow!("Record name cannot contain spaces"));
    }

    let name = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if name.is_empty() {
        return Err(anyhow!("Record name cannot be empty"));
    }
    if name.len() > MAX_RECORD_NAME_LENGTH {
        return Err(anyhow!(
            "Record name too long (max {} characters, got {})",
            MAX_RECORD_NAME_LENGTH,
            name.len()
        ));
    }
    if name.starts_with('.') {
        return Err(anyhow!("Record name cannot start with a dot"));
    }
    if name.contains("..") {
        return Err(anyhow!("Record name cannot contain consecutive dots"));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(anyhow!("Record name contains empty label"));
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(anyhow!(
                "Record name label too long (max {} characters, got {})",
                MAX_LABEL_LENGTH,
                label.len()
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(anyhow!("Record name label cannot start or end with hyphen"));
        }
        for ch in label.chars() {
            if !ch.is_ascii_alphanumeric() && ch != '-' && ch != '_' {
                return Err(anyhow!(
                    "Record name contains invalid character: '{}' (allowed: letters, digits, '-', '_')",
                    ch
                ));
            }
        }
    }

    Ok(())
}

/// Validates a challenge token before it is written as a TXT value
///
/// Tokens must be non-empty, fit in one TXT character-string and contain no
/// control characters.
pub fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(anyhow!("Challenge key cannot be empty"));
    }
    if token.len() > MAX_TOKEN_LENGTH {
        return Err(anyhow!(
            "Challenge key too long (max {} bytes, got {})",
            MAX_TOKEN_LENGTH,
            token.len()
        ));
    }
    if token.chars().any(char::is_control) {
        return Err(anyhow!("Challenge key contains control characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_record_name_valid_cases() {
        assert!(validate_record_name("example.com").is_ok());
        assert!(validate_record_name("sub.example.com").is_ok());
        assert!(validate_record_name("_acme-challenge.example.com").is_ok());
        assert!(validate_record_name("_acme-challenge.example.com.").is_ok());
        assert!(validate_record_name("a-b.example.com").is_ok());
        assert!(validate_record_name(&("a".repeat(63) + ".com")).is_ok());
    }

    #[test]
    fn test_validate_record_name_invalid_cases() {
        assert!(validate_record_name("").is_err());
        assert!(validate_record_name(" ").is_err());
        assert!(validate_record_name(".").is_err());
        assert!(validate_record_name("example com").is_err());
        assert!(validate_record_name(".example.com").is_err());
        assert!(validate_record_name("example..com").is_err());
        assert!(validate_record_name("-example.com").is_err());
        assert!(validate_record_name("example-.com").is_err());
        assert!(validate_record_name("ex@mple.com").is_err());
        assert!(validate_record_name("*.example.com").is_err());
        assert!(validate_record_name(&("a".repeat(64) + ".com")).is_err());
        assert!(validate_record_name(&"a.".repeat(254)).is_err());
    }

    #[test]
    fn test_validate_token() {
        assert!(validate_token("LoqXcYV8q5ONbJQxbmR7SCTNo3tiAXDfowyjxAjEuX0").is_ok());
        assert!(validate_token("token-A").is_ok());

        assert!(validate_token("").is_err());
        assert!(validate_token("line\nbreak").is_err());
        assert!(validate_token(&"x".repeat(256)).is_err());
    }
}
