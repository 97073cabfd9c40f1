//! Validation utilities for the certificate issuance workflow

use crate::models::ISSUE_CODE_LENGTH;

// ============================================================================
// Addresses
// ============================================================================

/// Validate e-mail format
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if validator::validate_email(email) {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Split a comma-separated recipient list, keeping only well-formed addresses
pub fn parse_email_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty() && validate_email(addr).is_ok())
        .map(str::to_string)
        .collect()
}

/// Entries of a recipient list that are not valid addresses
pub fn invalid_emails(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty() && validate_email(addr).is_err())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Identifiers
// ============================================================================

/// Validate an issue verification code (10 ASCII alphanumerics)
pub fn validate_issue_code(code: &str) -> Result<(), &'static str> {
    if code.len() != ISSUE_CODE_LENGTH {
        return Err("Issue code must be 10 characters");
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Issue code must be alphanumeric");
    }
    Ok(())
}

/// Validate a stored-file content hash (lowercase hex SHA-256)
pub fn validate_content_hash(hash: &str) -> Result<(), &'static str> {
    if hash.len() != 64 {
        return Err("Content hash must be 64 characters");
    }
    if !hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)) {
        return Err("Content hash must be lowercase hexadecimal");
    }
    Ok(())
}

/// Make a string safe to use as a download file name
pub fn clean_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "certificate".to_string()
    } else {
        trimmed.to_string()
    }
}
