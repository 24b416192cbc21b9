//! Log redaction rules.
//!
//! Removes storefront credentials from text before it reaches a log line.
//! Applied even in debug logging.

use regex::Regex;
use std::sync::LazyLock;

/// Patterns that should be redacted
static REDACTION_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // Session cookie values
        (
            Regex::new(r#"(?i)(_session_auth|session[_-]?cookie)["']?\s*[=:]\s*["']?[A-Za-z0-9+/=_\-.%]{16,}"#).unwrap(),
            "[REDACTED: session cookie]",
        ),
        // Bearer tokens
        (
            Regex::new(r"(?i)bearer\s+[a-zA-Z0-9._-]{20,}").unwrap(),
            "[REDACTED: bearer token]",
        ),
        // Signed download URLs (signature query parameters)
        (
            Regex::new(r"(?i)([?&])(signature|sig|token|ttl_auth)=[A-Za-z0-9+/=_\-.%]+").unwrap(),
            "$1$2=[REDACTED]",
        ),
        // Generic API keys
        (
            Regex::new(r"(?i)(api_key|apikey|api-key)\s*[=:]\s*[a-zA-Z0-9_-]{20,}").unwrap(),
            "[REDACTED: API key]",
        ),
        // Revealed product keys (groups of 4-5 alphanumerics joined by dashes)
        (
            Regex::new(r"\b[A-Z0-9]{4,5}(-[A-Z0-9]{4,5}){2,6}\b").unwrap(),
            "[REDACTED: product key]",
        ),
    ]
});

/// Redact sensitive patterns from text
pub fn redact(text: &str) -> String {
    let mut result = text.to_string();

    for (pattern, replacement) in REDACTION_PATTERNS.iter() {
        result = pattern.replace_all(&result, *replacement).to_string();
    }

    result
}

/// Check if text contains sensitive patterns
pub fn contains_sensitive(text: &str) -> bool {
    REDACTION_PATTERNS
        .iter()
        .any(|(pattern, _)| pattern.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_session_cookie() {
        let line = "stored credentials: _session_auth=eyJhbGciOiJIUzI1NiJ9.abcdef012345";
        let out = redact(line);
        assert!(!out.contains("eyJhbGciOiJIUzI1NiJ9"));
        assert!(out.contains("[REDACTED: session cookie]"));
    }

    #[test]
    fn test_redacts_signed_url_but_keeps_host() {
        let line = "opening https://dl.harborlane.com/g1.zip?ttl=86400&signature=AbC123xyz";
        let out = redact(line);
        assert!(out.contains("dl.harborlane.com/g1.zip"));
        assert!(!out.contains("AbC123xyz"));
    }

    #[test]
    fn test_redacts_product_key() {
        let out = redact("revealed key ABCDE-12345-FGHIJ for user");
        assert!(!out.contains("ABCDE-12345-FGHIJ"));
        assert!(out.contains("[REDACTED: product key]"));
    }

    #[test]
    fn test_plain_text_untouched() {
        let line = "Checking installed games in 2 directories";
        assert_eq!(redact(line), line);
        assert!(!contains_sensitive(line));
    }
}
