use crate::error::AppError;

const ZERO_WIDTH: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// Normalizes a typed username: zero-width characters and all whitespace are
/// removed, then empty results and leftover control characters are rejected.
/// The login form and the auth adapter both call this, so their verdicts agree.
pub fn sanitize_username(raw: &str) -> Result<String, AppError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !ZERO_WIDTH.contains(c) && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required.".into(),
        ));
    }
    if cleaned.chars().any(|c| (c as u32) < 32) {
        return Err(AppError::Validation(
            "Username contains whitespace or control characters. Remove spaces and try again."
                .into(),
        ));
    }
    Ok(cleaned)
}

pub fn sanitize_password(raw: &str) -> Result<&str, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required.".into(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_zero_width_and_spaces() {
        assert_eq!(sanitize_username("admin\u{200B}").unwrap(), "admin");
        assert_eq!(sanitize_username("\u{FEFF}ad min\u{2060}").unwrap(), "admin");
        assert_eq!(sanitize_username("\tadmin\n").unwrap(), "admin");
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        for raw in ["admin", "ad\u{200C}min ", " photo.admin@example.com"] {
            let once = sanitize_username(raw).unwrap();
            assert_eq!(sanitize_username(&once).unwrap(), once);
        }
    }

    #[test]
    fn whitespace_only_is_rejected() {
        assert!(matches!(
            sanitize_username("\t\n \u{200D}"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn control_characters_are_rejected() {
        assert!(matches!(
            sanitize_username("ad\u{1}min"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn blank_password_is_rejected() {
        assert_eq!(sanitize_password("  secret ").unwrap(), "secret");
        assert!(sanitize_password("   ").is_err());
    }
}
