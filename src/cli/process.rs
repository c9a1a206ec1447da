//! Post-processing argument logic
//!
//! Sorts the positional arguments into an optional method, one or more target
//! URLs and request items, then normalizes every URL. Method inference is
//! deferred to template building, where the body (items, `--body`, piped
//! stdin) is actually known.

use url::Url;

use crate::cli::args::Args;
use crate::errors::{Result, RurlError};
use crate::request::items::InputItem;
use crate::request::method;

/// Check if a string has a valid URL scheme (e.g., "http://", "https://")
/// Per RFC 3986: scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn has_url_scheme(s: &str) -> bool {
    if let Some(pos) = s.find("://") {
        let scheme = &s[..pos];
        !scheme.is_empty()
            && scheme.chars().next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false)
            && scheme.chars().skip(1).all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
    } else {
        false
    }
}

/// Check if a string ends with a port number (e.g., ":8080")
fn ends_with_port(s: &str) -> bool {
    if let Some(colon_pos) = s.rfind(':') {
        let port_part = &s[colon_pos + 1..];
        !port_part.is_empty() && port_part.chars().all(|c| c.is_ascii_digit())
    } else {
        false
    }
}

/// Parse localhost shorthand (:PORT/path or :/path)
/// Returns (port, rest) if it matches the pattern
fn parse_localhost_shorthand(s: &str) -> Option<(&str, &str)> {
    // Must start with : but not :: (IPv6)
    if !s.starts_with(':') || s.starts_with("::") {
        return None;
    }

    let after_colon = &s[1..];

    let (port, rest) = if let Some(slash_pos) = after_colon.find('/') {
        (&after_colon[..slash_pos], &after_colon[slash_pos..])
    } else {
        (after_colon, "")
    };

    if port.chars().all(|c| c.is_ascii_digit()) {
        Some((port, rest))
    } else {
        None
    }
}

/// Separator patterns that mark a token as a request item
const ITEM_SEPARATORS: &[&str] = &["==", ":=", "=", ":", ";"];

/// Check if a trailing positional looks like another target URL rather than
/// a request item.
fn looks_like_url(s: &str) -> bool {
    if has_url_scheme(s) {
        return true;
    }
    if parse_localhost_shorthand(s).is_some() {
        return true;
    }
    let host = s.split('/').next().unwrap_or(s);
    if let Some(first_sep_pos) = ITEM_SEPARATORS.iter().filter_map(|sep| s.find(sep)).min() {
        let before_sep = &s[..first_sep_pos];
        before_sep.contains('.')
            || before_sep.eq_ignore_ascii_case("localhost")
            || ends_with_port(host)
    } else {
        s.contains('.') || s.starts_with("localhost")
    }
}

/// Processed arguments ready for request building
#[derive(Debug, Clone)]
pub struct ProcessedArgs {
    /// Explicit HTTP method, uppercased; `None` leaves inference to the
    /// template once the body is known
    pub method: Option<String>,
    /// Fully qualified target URLs, in the order given
    pub urls: Vec<Url>,
    /// Parsed request items
    pub items: Vec<InputItem>,
}

/// Process raw CLI arguments into a usable form
pub fn process_args(args: &Args) -> Result<ProcessedArgs> {
    let mut raw_urls: Vec<String> = Vec::new();
    let mut raw_items: Vec<String> = Vec::new();

    // The method slot holds the first positional; it is only a method when
    // it reads as one, otherwise it is the first URL.
    match (&args.method, &args.url) {
        (Some(m), Some(u)) => {
            if method::is_standard(m) || method::looks_like_method(m) {
                raw_urls.push(u.clone());
            } else {
                raw_urls.push(m.clone());
                if looks_like_url(u) {
                    raw_urls.push(u.clone());
                } else {
                    raw_items.push(u.clone());
                }
            }
        }
        (Some(u), None) => raw_urls.push(u.clone()),
        // no positionals at all; RURL_URL can still supply the target
        (None, _) => match std::env::var("RURL_URL") {
            Ok(u) if !u.is_empty() => raw_urls.push(u),
            _ => return Err(RurlError::Config("no URL specified".to_string())),
        },
    }

    let explicit_method = match (&args.method, &args.url) {
        (Some(m), Some(_)) if method::is_standard(m) || method::looks_like_method(m) => {
            Some(m.to_uppercase())
        }
        _ => None,
    };

    // Trailing positionals are either more URLs or request items.
    for token in &args.request_items {
        if looks_like_url(token) {
            raw_urls.push(token.clone());
        } else {
            raw_items.push(token.clone());
        }
    }

    let items = raw_items
        .iter()
        .map(|s| InputItem::parse(s))
        .collect::<Result<Vec<_>>>()?;

    let urls = raw_urls
        .iter()
        .map(|s| normalize_url(s))
        .collect::<Result<Vec<_>>>()?;

    Ok(ProcessedArgs { method: explicit_method, urls, items })
}

/// Normalize a URL: add the http scheme, handle localhost shorthand
pub fn normalize_url(raw_url: &str) -> Result<Url> {
    let mut url = raw_url.to_string();

    // Handle :// paste shortcut
    if url.starts_with("://") {
        url = url[3..].to_string();
    }

    if !has_url_scheme(&url) {
        // Localhost shorthand (:3000/path, :/path)
        if let Some((port, rest)) = parse_localhost_shorthand(&url) {
            url = if port.is_empty() {
                format!("localhost{}", rest)
            } else {
                format!("localhost:{}{}", port, rest)
            };
        }

        url = format!("http://{}", url);
    }

    Url::parse(&url).map_err(|e| RurlError::Parse(format!("invalid URL {:?}: {}", url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with(method: Option<&str>, url: Option<&str>, items: &[&str]) -> Args {
        Args {
            method: method.map(str::to_string),
            url: url.map(str::to_string),
            request_items: items.iter().map(|s| s.to_string()).collect(),
            ..Args::default()
        }
    }

    #[test]
    fn test_normalize_url_with_scheme() {
        let url = normalize_url("https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_normalize_url_without_scheme() {
        let url = normalize_url("example.com").unwrap();
        assert_eq!(url.as_str(), "http://example.com/");
    }

    #[test]
    fn test_normalize_url_localhost_shorthand() {
        let url = normalize_url(":3000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api");
    }

    #[test]
    fn test_normalize_url_paste_shortcut() {
        let url = normalize_url("://example.com/path").unwrap();
        assert_eq!(url.as_str(), "http://example.com/path");
    }

    #[test]
    fn test_normalize_url_ipv6_not_localhost() {
        let url = normalize_url("[::1]").unwrap();
        assert_eq!(url.as_str(), "http://[::1]/");

        let url = normalize_url("[::1]:8080").unwrap();
        assert_eq!(url.as_str(), "http://[::1]:8080/");
    }

    #[test]
    fn test_explicit_method_recognized() {
        let processed = process_args(&args_with(Some("delete"), Some("example.com"), &[])).unwrap();
        assert_eq!(processed.method.as_deref(), Some("DELETE"));
        assert_eq!(processed.urls.len(), 1);
        assert_eq!(processed.urls[0].host_str(), Some("example.com"));
    }

    #[test]
    fn test_custom_uppercase_method_recognized() {
        let processed = process_args(&args_with(Some("PURGE"), Some("example.com"), &[])).unwrap();
        assert_eq!(processed.method.as_deref(), Some("PURGE"));
    }

    #[test]
    fn test_lowercase_word_is_not_a_method() {
        let processed = process_args(&args_with(Some("example.com"), Some("name=x"), &[])).unwrap();
        assert_eq!(processed.method, None);
        assert_eq!(processed.urls[0].host_str(), Some("example.com"));
        assert_eq!(processed.items.len(), 1);
        assert!(processed.items[0].is_data());
    }

    #[test]
    fn test_multiple_urls_from_positionals() {
        let processed = process_args(&args_with(
            Some("http://a.example.com"),
            Some("b.example.com/path"),
            &["X-Token:abc"],
        ))
        .unwrap();
        assert_eq!(processed.urls.len(), 2);
        assert_eq!(processed.urls[1].as_str(), "http://b.example.com/path");
        assert_eq!(processed.items.len(), 1);
        assert!(processed.items[0].is_header());
    }

    #[test]
    fn test_host_port_token_is_a_url() {
        let processed =
            process_args(&args_with(Some("example.com"), Some("localhost:8080/x"), &[])).unwrap();
        assert_eq!(processed.urls.len(), 2);
        assert_eq!(processed.urls[1].as_str(), "http://localhost:8080/x");
    }

    #[test]
    fn test_header_token_is_not_a_url() {
        let processed =
            process_args(&args_with(Some("example.com"), Some("Accept:text/plain"), &[])).unwrap();
        assert_eq!(processed.urls.len(), 1);
        assert_eq!(processed.items.len(), 1);
    }

    #[test]
    fn test_missing_url_is_fatal() {
        let err = process_args(&args_with(None, None, &[])).unwrap_err();
        assert!(err.is_fatal());
    }
}
