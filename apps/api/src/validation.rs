//! Input checks shared by handlers. Each returns `AppError::Validation` with a
//! message naming the offending field.

use crate::errors::AppError;

pub fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

pub fn require_max_len(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Shape check only: one `@`, non-empty local part, dotted domain, no spaces.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.len() > 254 || email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub fn require_email(field: &str, email: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        return Err(AppError::Validation(format!(
            "{field} must be a valid email address"
        )));
    }
    Ok(())
}

/// Absolute `http`/`https` URL with a host.
pub fn is_http_url(value: &str) -> bool {
    match reqwest::Url::parse(value.trim()) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

pub fn require_rating(field: &str, value: i16) -> Result<(), AppError> {
    if !(1..=5).contains(&value) {
        return Err(AppError::Validation(format!(
            "{field} must be between 1 and 5"
        )));
    }
    Ok(())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("  first.last+jobs@mail.co.uk "));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada@@example.com"));
        assert!(!is_valid_email("ada lovelace@example.com"));
        assert!(!is_valid_email("ada@.com"));
    }

    #[test]
    fn test_http_urls() {
        assert!(is_http_url("https://linkedin.com/in/ada"));
        assert!(is_http_url("http://example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("javascript:alert(1)"));
    }

    #[test]
    fn test_http_url_rejects_malformed_hosts() {
        assert!(!is_http_url("https://exa mple.com"));
        assert!(!is_http_url("mailto:ada@example.com"));
        assert!(!is_http_url("linkedin.com/in/ada"));
        assert!(is_http_url(" https://github.com/ada "));
    }

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("title", "  ").is_err());
        assert!(require_non_empty("title", "Rust Engineer").is_ok());
    }

    #[test]
    fn test_require_rating_bounds() {
        assert!(require_rating("rating", 0).is_err());
        assert!(require_rating("rating", 1).is_ok());
        assert!(require_rating("rating", 5).is_ok());
        assert!(require_rating("rating", 6).is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
