//! Method classification for bare positional arguments

use reqwest::Method;

/// All standard HTTP methods
const STANDARD_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

/// Check if a string is a standard HTTP method
pub fn is_standard(method: &str) -> bool {
    STANDARD_METHODS.iter().any(|&m| m.eq_ignore_ascii_case(method))
}

/// Check if a string looks like an HTTP method (all uppercase, reasonable length)
pub fn looks_like_method(s: &str) -> bool {
    if s.is_empty() || s.len() > 10 {
        return false;
    }
    if !s.chars().all(|c| c.is_ascii_uppercase()) {
        return false;
    }
    // common all-caps hostnames are not methods
    !matches!(s, "LOCALHOST" | "HOST" | "SERVER")
}

/// Method to use when none was given explicitly
pub fn infer(has_body: bool) -> Method {
    if has_body {
        Method::POST
    } else {
        Method::GET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_standard() {
        assert!(is_standard("GET"));
        assert!(is_standard("get"));
        assert!(is_standard("Post"));
        assert!(!is_standard("FETCH"));
    }

    #[test]
    fn test_looks_like_method() {
        assert!(looks_like_method("GET"));
        assert!(looks_like_method("PURGE"));
        assert!(!looks_like_method("get"));
        assert!(!looks_like_method("Get"));
        assert!(!looks_like_method("LOCALHOST"));
        assert!(!looks_like_method(""));
        assert!(!looks_like_method("VERYLONGMETHODNAME"));
    }

    #[test]
    fn test_infer() {
        assert_eq!(infer(false), Method::GET);
        assert_eq!(infer(true), Method::POST);
    }
}
