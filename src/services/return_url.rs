//! Return URLs carried through processor redirects.
//!
//! The application URL a user goes back to is embedded in the callback URL
//! as the last path segment: base64 of the raw URL, then percent-encoded so
//! `/`, `+` and `=` survive as part of a single segment.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use url::Url;

/// Status token in a callback URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    Complete,
    Cancel,
}

impl CallbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackStatus::Complete => "complete",
            CallbackStatus::Cancel => "cancel",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "complete" => Some(CallbackStatus::Complete),
            "cancel" => Some(CallbackStatus::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("return URL is not valid percent-encoded UTF-8")]
    Percent,
    #[error("return URL is not valid base64")]
    Base64,
    #[error("decoded return URL is not UTF-8")]
    Utf8,
}

pub fn encode(return_url: &str) -> String {
    urlencoding::encode(&STANDARD.encode(return_url)).into_owned()
}

pub fn decode(encoded: &str) -> Result<String, DecodeError> {
    let base64 = urlencoding::decode(encoded).map_err(|_| DecodeError::Percent)?;
    let bytes = STANDARD
        .decode(base64.as_bytes())
        .map_err(|_| DecodeError::Base64)?;
    String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)
}

/// Absolute URL the processor should send the user (or its server) back to.
///
/// `{base}/{prefix}/{identifier}/{status}[/{encoded return url}]`
pub fn callback_url(
    base_url: &str,
    prefix: &str,
    identifier: &str,
    status: CallbackStatus,
    return_url: Option<&str>,
) -> String {
    let mut url = format!(
        "{}/{}/{}/{}",
        base_url.trim_end_matches('/'),
        prefix.trim_matches('/'),
        urlencoding::encode(identifier),
        status.as_str()
    );
    if let Some(return_url) = return_url {
        url.push('/');
        url.push_str(&encode(return_url));
    }
    url
}

/// Whether a decoded return URL may be used as a redirect target.
///
/// Accepts site-relative paths and absolute http(s) URLs. Protocol-relative
/// (`//host`, and `/\host` which browsers read the same way), other schemes
/// and anything with control characters are refused.
pub fn is_redirectable(url: &str) -> bool {
    if url.chars().any(|c| c.is_ascii_control()) {
        return false;
    }
    if let Some(rest) = url.strip_prefix('/') {
        return !rest.starts_with(['/', '\\']);
    }
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let samples = [
            "",
            "/",
            "https://shop.example.com/checkout/complete?order=42&ref=a+b",
            "/account/cards?tab=saved#new",
            "https://example.com/ümlaut/пример?q=日本",
            "https://example.com/%2F already-encoded%20bits",
            "??>>",
        ];
        for sample in samples {
            assert_eq!(decode(&encode(sample)).unwrap(), sample);
        }
    }

    #[test]
    fn encoded_form_is_a_single_path_segment() {
        // "??>>" base64-encodes to "Pz8+Pg==", exercising '+' and '='
        let encoded = encode("??>>");
        assert_eq!(encoded, "Pz8%2BPg%3D%3D");

        let encoded = encode("https://example.com/a/b/c?x=y");
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('='));
    }

    #[test]
    fn decode_accepts_already_percent_decoded_segments() {
        // Routers hand path segments over percent-decoded
        assert_eq!(decode("Pz8+Pg==").unwrap(), "??>>");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode("not base64!"), Err(DecodeError::Base64));
        assert_eq!(decode(&STANDARD.encode([0xff, 0xfe])), Err(DecodeError::Utf8));
    }

    #[test]
    fn callback_url_layout() {
        let url = callback_url(
            "https://pay.example.com/",
            "paymentendpoint",
            "abc123",
            CallbackStatus::Complete,
            Some("/done"),
        );
        assert_eq!(
            url,
            format!("https://pay.example.com/paymentendpoint/abc123/complete/{}", encode("/done"))
        );

        let url = callback_url(
            "https://pay.example.com",
            "paymentendpoint",
            "abc123",
            CallbackStatus::Cancel,
            None,
        );
        assert_eq!(url, "https://pay.example.com/paymentendpoint/abc123/cancel");
    }

    #[test]
    fn status_tokens() {
        assert_eq!(CallbackStatus::parse("complete"), Some(CallbackStatus::Complete));
        assert_eq!(CallbackStatus::parse("cancel"), Some(CallbackStatus::Cancel));
        assert_eq!(CallbackStatus::parse("refund"), None);
    }

    #[test]
    fn redirect_targets() {
        assert!(is_redirectable("/orders/42"));
        assert!(is_redirectable("https://shop.example.com/done"));
        assert!(!is_redirectable("//evil.example.com"));
        assert!(!is_redirectable("/\\evil.example.com"));
        assert!(!is_redirectable("/\t/evil.example.com"));
        assert!(!is_redirectable("/orders/42\r\nSet-Cookie: x=1"));
        assert!(!is_redirectable("https://shop.example.com/\u{7f}"));
        assert!(is_redirectable("/orders\\42"));
        assert!(!is_redirectable("javascript:alert(1)"));
        assert!(!is_redirectable("ftp://example.com/file"));
        assert!(!is_redirectable("relative/path"));
    }
}
