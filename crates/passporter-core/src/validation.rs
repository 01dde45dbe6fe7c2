//! Client-side input checks.
//!
//! Everything here runs before a remote call; failures are
//! [`Error::Validation`] naming the offending field.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::BorderPoint;
use crate::{Error, Result};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 120;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_MESSAGE_LEN: usize = 500;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email regex")
    })
}

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9][0-9 \-]{5,18}[0-9]$").expect("Invalid phone regex"))
}

/// Trimmed email, or a validation error.
pub fn email(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("email", "Email is required"));
    }
    if !email_pattern().is_match(trimmed) {
        return Err(Error::validation("email", "Enter a valid email address"));
    }
    Ok(trimmed.to_string())
}

pub fn password(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation("password", "Password is required"));
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

pub fn display_name(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("display_name", "Name is required"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(
            "display_name",
            format!("Name must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Optional phone number; blank input means none.
pub fn phone_number(value: Option<&str>) -> Result<Option<String>> {
    let Some(trimmed) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if phone_pattern().is_match(trimmed) {
        Ok(Some(trimmed.to_string()))
    } else {
        Err(Error::validation("phone_number", "Enter a valid phone number"))
    }
}

/// Two-letter lowercase language tag such as `en`.
pub fn language(value: &str) -> Result<String> {
    let trimmed = value.trim().to_ascii_lowercase();
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_lowercase()) {
        Ok(trimmed)
    } else {
        Err(Error::validation(
            "preferred_language",
            "Use a two-letter language code",
        ))
    }
}

fn country_code(field: &'static str, value: &str) -> Result<()> {
    if value.len() == 2 && value.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(Error::validation(
            field,
            format!("'{value}' is not a two-letter country code"),
        ))
    }
}

fn max_len(field: &'static str, value: Option<&str>, limit: usize) -> Result<()> {
    match value {
        Some(text) if text.chars().count() > limit => Err(Error::validation(
            field,
            format!("Must be at most {limit} characters"),
        )),
        _ => Ok(()),
    }
}

/// Check a point before it is created or edited.
pub fn border_point(point: &BorderPoint) -> Result<()> {
    let name = point.name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "Name is required"));
    }
    max_len("name", Some(name), MAX_NAME_LEN)?;
    if !point.location().is_valid() {
        return Err(Error::validation(
            "location",
            format!("{} is outside valid coordinates", point.location()),
        ));
    }
    country_code("country_a", &point.country_a)?;
    country_code("country_b", &point.country_b)?;
    if point.country_a == point.country_b {
        return Err(Error::validation(
            "country_b",
            "A border crossing joins two different countries",
        ));
    }
    max_len("description", point.description.as_deref(), MAX_DESCRIPTION_LEN)?;
    max_len("status_comment", point.status_comment.as_deref(), MAX_MESSAGE_LEN)?;
    Ok(())
}

/// Trimmed status report message.
pub fn update_message(value: &str) -> Result<String> {
    let trimmed = value.trim();
    max_len("message", Some(trimmed), MAX_MESSAGE_LEN)?;
    Ok(trimmed.to_string())
}
