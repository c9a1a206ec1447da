//! Error types for rurl

use thiserror::Error;

/// Main error type for rurl
#[derive(Error, Debug)]
pub enum RurlError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Timeout after {0:.1} seconds of inactivity")]
    Timeout(f64),

    #[error("File error: {0}")]
    File(String),

    #[error("request body source exhausted")]
    BodyExhausted,
}

impl RurlError {
    /// Errors that must abort the process before (or regardless of) any
    /// request being sent: bad configuration, unusable TLS material, an
    /// output file that cannot be created.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RurlError::Config(_) | RurlError::Tls(_) | RurlError::File(_) | RurlError::Parse(_)
        )
    }

    /// The body source running dry is the normal way a line-fed run ends.
    /// It is never reported to the user.
    pub fn is_benign_eof(&self) -> bool {
        matches!(self, RurlError::BodyExhausted)
    }

    /// A Ctrl+C noticed mid-stream.
    pub fn interrupted() -> Self {
        RurlError::Io(std::io::Error::new(
            std::io::ErrorKind::Interrupted,
            "interrupted by user",
        ))
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, RurlError::Io(e) if e.kind() == std::io::ErrorKind::Interrupted)
    }
}

pub type Result<T> = std::result::Result<T, RurlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(RurlError::Config("bad flag".into()).is_fatal());
        assert!(RurlError::Tls("3 certs".into()).is_fatal());
        assert!(RurlError::File("denied".into()).is_fatal());
        assert!(!RurlError::Timeout(60.0).is_fatal());
        assert!(!RurlError::BodyExhausted.is_fatal());
    }

    #[test]
    fn test_benign_eof() {
        assert!(RurlError::BodyExhausted.is_benign_eof());
        assert!(!RurlError::Timeout(1.0).is_benign_eof());
    }

    #[test]
    fn test_interrupted_classification() {
        let err = RurlError::interrupted();
        assert!(err.is_interrupted());
        assert!(!err.is_fatal());
        assert!(!RurlError::Timeout(1.0).is_interrupted());
    }
}
