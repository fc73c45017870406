use subtle::ConstantTimeEq;

/// Constant-time string comparison to prevent timing attacks
/// Use this for comparing admin keys and other sensitive values
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Check a presented admin credential against the configured one.
///
/// With no credential configured every mutating call is refused.
pub fn is_authorized(configured: Option<&str>, presented: Option<&str>) -> bool {
    match (configured, presented) {
        (Some(expected), Some(given)) if !expected.is_empty() => {
            constant_time_compare(expected, given.trim())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret123", "secret123"));
        assert!(!constant_time_compare("secret123", "secret124"));
        assert!(!constant_time_compare("secret123", "secret12"));
        assert!(!constant_time_compare("", "secret"));
    }

    #[test]
    fn test_is_authorized() {
        assert!(is_authorized(Some("k3y"), Some("k3y")));
        assert!(is_authorized(Some("k3y"), Some(" k3y\n")));
        assert!(!is_authorized(Some("k3y"), Some("nope")));
        assert!(!is_authorized(Some("k3y"), None));
        assert!(!is_authorized(None, Some("k3y")));
        assert!(!is_authorized(Some(""), Some("")));
    }
}
