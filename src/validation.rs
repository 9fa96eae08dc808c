use chrono::{Datelike, Utc};
use validator::ValidationError;

use crate::error::ApiError;

/// Username reserved for the self-profile route (`/users/me`).
pub const RESERVED_USERNAME: &str = "me";

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// validate_username
///
/// Letters, digits and `@ . + - _` only, and never the literal `me`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username == RESERVED_USERNAME {
        return Err(error(
            "reserved_username",
            "Using \"me\" as a username is not allowed.",
        ));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '_' | '@' | '.' | '+' | '-');
    if !username.chars().all(allowed) {
        return Err(error(
            "invalid_username",
            "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(())
}

/// validate_slug
///
/// ASCII letters, digits, hyphens and underscores.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    if slug.chars().all(allowed) {
        Ok(())
    } else {
        Err(error(
            "invalid_slug",
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
        ))
    }
}

/// ensure_year_not_in_future
///
/// Titles cannot be released after the current (UTC) year. Checked at write time, so the
/// bound moves forward on its own.
pub fn ensure_year_not_in_future(year: Option<i32>) -> Result<(), ApiError> {
    let current_year = Utc::now().year();
    match year {
        Some(y) if y > current_year => Err(ApiError::field(
            "year",
            format!("Invalid year. The value cannot exceed {current_year}."),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("reader_42").is_ok());
        assert!(validate_username("a.b+c@d-e").is_ok());
        assert!(validate_username("me").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
        // "me" is only reserved as a whole name.
        assert!(validate_username("meme").is_ok());
    }

    #[test]
    fn slug_rules() {
        assert!(validate_slug("sci-fi_2").is_ok());
        assert!(validate_slug("no spaces").is_err());
        assert!(validate_slug("кино").is_err());
    }

    #[test]
    fn year_bound_tracks_current_year() {
        let now = Utc::now().year();
        assert!(ensure_year_not_in_future(Some(now)).is_ok());
        assert!(ensure_year_not_in_future(None).is_ok());
        assert!(ensure_year_not_in_future(Some(now + 1)).is_err());
    }
}
