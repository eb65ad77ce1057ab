//! Opening handshake (RFC 6455 Section 4.2).
//!
//! Turns the headers of an HTTP Upgrade request into the exact
//! `101 Switching Protocols` response bytes.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};

use crate::config::Limits;
use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Protocol version announced in the handshake response.
pub const WS_VERSION: &str = "13";

/// Headers that must not appear twice in an upgrade request.
const SECURITY_HEADERS: [&str; 4] = [
    "host",
    "upgrade",
    "connection",
    "sec-websocket-key",
];

/// Validate that a header value does not contain CR or LF characters.
fn validate_header_value(header_name: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::InvalidHandshake(format!(
            "{header_name} value contains CR or LF characters"
        )));
    }
    Ok(())
}

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID)). The key is
/// used as received, without decoding or validation.
///
/// # Example
///
/// ```
/// use wsdispatch::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let hash = hasher.finalize();
    BASE64.encode(hash)
}

/// Read-only view of an upgrade request's headers.
///
/// Header names are matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandshakeRequest {
    /// The request path (e.g., "/chat"); `"/"` when built from headers only.
    pub path: String,
    headers: HashMap<String, String>,
}

impl HandshakeRequest {
    /// Build a request view from headers the HTTP layer already extracted.
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            path: "/".to_string(),
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.as_ref().trim().to_ascii_lowercase(), value.into()))
                .collect(),
        }
    }

    /// Set the request path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Parse the request line and headers of a raw HTTP request.
    ///
    /// Only what the handshake needs is checked: a `GET` request line and
    /// well-formed, non-duplicated security headers. Header presence is
    /// checked later, when the response is computed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if:
    /// - The data is not valid UTF-8.
    /// - The request line is malformed or missing, or the method is not `GET`.
    /// - A security-critical header appears twice.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))?;

        let mut lines = text.lines();

        // Parse request line: "GET /path HTTP/1.1"
        let request_line = lines
            .next()
            .ok_or_else(|| Error::InvalidHandshake("Empty request".into()))?;

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(Error::InvalidHandshake("Invalid request line".into()));
        }

        if parts[0] != "GET" {
            return Err(Error::InvalidHandshake(format!(
                "Expected GET method, got {}",
                parts[0]
            )));
        }

        let mut headers: HashMap<String, String> = HashMap::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                let name_lower = name.trim().to_ascii_lowercase();
                if SECURITY_HEADERS.contains(&name_lower.as_str())
                    && headers.contains_key(&name_lower)
                {
                    return Err(Error::InvalidHandshake(format!(
                        "Duplicate header: {}",
                        name.trim()
                    )));
                }
                headers.insert(name_lower, value.trim().to_string());
            }
        }

        Ok(Self {
            path: parts[1].to_string(),
            headers,
        })
    }

    /// Parse a handshake request with size limit.
    ///
    /// # Errors
    ///
    /// - `Error::HandshakeTooLarge` if data exceeds `limits.max_handshake_size`
    /// - Other handshake errors as per `parse()`
    pub fn parse_with_limit(data: &[u8], limits: &Limits) -> Result<Self> {
        limits.check_handshake_size(data.len())?;
        Self::parse(data)
    }

    /// Look up a header value, ignoring name case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `Sec-WebSocket-Key` value, if present.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.header("sec-websocket-key")
    }

    /// Whether the request asks for a websocket upgrade.
    #[must_use]
    pub fn is_upgrade(&self) -> bool {
        self.header("upgrade")
            .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
    }
}

/// WebSocket handshake response from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The Sec-WebSocket-Accept value.
    pub accept: String,
    /// Value of the `Server:` header.
    pub server_name: String,
}

impl HandshakeResponse {
    /// Create a handshake response for a request.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingHandshakeKey` if the request has no
    /// `Sec-WebSocket-Key` header.
    pub fn from_request(req: &HandshakeRequest, server_name: &str) -> Result<Self> {
        let key = req.key().ok_or(Error::MissingHandshakeKey)?;
        Ok(Self {
            accept: compute_accept_key(key),
            server_name: server_name.to_string(),
        })
    }

    /// Write the HTTP response to a buffer.
    ///
    /// # Errors
    /// Returns `Error::InvalidHandshake` if the server name contains CR/LF.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        validate_header_value("Server", &self.server_name)?;

        buf.extend_from_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Accept: {}\r\n", self.accept).as_bytes());
        buf.extend_from_slice(format!("Sec-WebSocket-Version: {WS_VERSION}\r\n").as_bytes());
        buf.extend_from_slice(format!("Server: {}\r\n", self.server_name).as_bytes());
        buf.extend_from_slice(b"\r\n");
        Ok(())
    }

    /// Serialize to a fresh buffer.
    ///
    /// # Errors
    /// See [`HandshakeResponse::write`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(160 + self.server_name.len());
        self.write(&mut buf)?;
        Ok(buf)
    }
}

/// Compute the full `101 Switching Protocols` response for a request.
///
/// # Errors
///
/// - `Error::MissingHandshakeKey` if the key header is absent
/// - `Error::InvalidHandshake` if `server_name` contains CR/LF
pub fn accept_response(req: &HandshakeRequest, server_name: &str) -> Result<Vec<u8>> {
    HandshakeResponse::from_request(req, server_name)?.to_bytes()
}

/// `400 Bad Request` answer for plain HTTP requests reaching a
/// websocket-only server.
#[must_use]
pub fn bad_request_response(server_name: &str) -> Vec<u8> {
    let content = format!(
        "<html><body><h2>HTTP ERROR 400</h2><hr><i>Powered by {server_name}</i></body></html>"
    );
    format!(
        "HTTP/1.1 400 Bad Request\r\n\
         Content-Type: text/html; charset=UTF-8\r\n\
         Cache-Control: must-revalidate,no-cache,no-store\r\n\
         Content-Length: {}\r\n\
         Server: {server_name}\r\n\r\n{content}",
        content.len()
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_accept_key_rfc_example() {
        // RFC 6455 Section 1.3 example
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let expected = "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=";
        assert_eq!(compute_accept_key(key), expected);
    }

    #[test]
    fn test_compute_accept_key_second_vector() {
        assert_eq!(
            compute_accept_key("x3JJHMbDL1EzLkh9GBhXDw=="),
            "HSmrc0sMlYUkAGmm5OPpG2HaGWk="
        );
    }

    #[test]
    fn test_key_is_not_decoded() {
        // Not base64 and not 16 bytes; still hashed as-is.
        let req = HandshakeRequest::from_headers([("Sec-WebSocket-Key", "not a nonce")]);
        let resp = HandshakeResponse::from_request(&req, "srv").unwrap();
        assert_eq!(resp.accept, compute_accept_key("not a nonce"));
    }

    #[test]
    fn test_parse_valid_request() {
        let request = b"GET /chat HTTP/1.1\r\n\
            Host: server.example.com\r\n\
            Upgrade: websocket\r\n\
            Connection: Upgrade\r\n\
            Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
            Sec-WebSocket-Version: 13\r\n\
            Origin: http://example.com\r\n\
            \r\n";

        let req = HandshakeRequest::parse(request).unwrap();
        assert_eq!(req.path, "/chat");
        assert_eq!(req.header("Host"), Some("server.example.com"));
        assert_eq!(req.key(), Some("dGhlIHNhbXBsZSBub25jZQ=="));
        assert_eq!(req.header("origin"), Some("http://example.com"));
        assert!(req.is_upgrade());
    }

    #[test]
    fn test_case_insensitive_headers() {
        let request = b"GET /chat HTTP/1.1\r\n\
            HOST: server.example.com\r\n\
            UPGRADE: WebSocket\r\n\
            SEC-WEBSOCKET-KEY: dGhlIHNhbXBsZSBub25jZQ==\r\n\
            \r\n";

        let req = HandshakeRequest::parse(request).unwrap();
        assert_eq!(req.key(), Some("dGhlIHNhbXBsZSBub25jZQ=="));
        assert_eq!(req.header("sec-websocket-KEY"), Some("dGhlIHNhbXBsZSBub25jZQ=="));
        assert!(req.is_upgrade());

        let req = HandshakeRequest::from_headers([("sEc-WeBsOcKeT-kEy", "abc")]);
        assert_eq!(req.key(), Some("abc"));
    }

    #[test]
    fn test_missing_key_fails() {
        let request = b"GET /chat HTTP/1.1\r\n\
            Host: server.example.com\r\n\
            Upgrade: websocket\r\n\
            \r\n";

        let req = HandshakeRequest::parse(request).unwrap();
        assert_eq!(req.key(), None);
        assert_eq!(
            accept_response(&req, "srv"),
            Err(Error::MissingHandshakeKey)
        );
    }

    #[test]
    fn test_plain_request_is_not_upgrade() {
        let req = HandshakeRequest::parse(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert!(!req.is_upgrade());
    }

    #[test]
    fn test_invalid_http_method() {
        let result = HandshakeRequest::parse(b"POST /chat HTTP/1.1\r\nHost: x\r\n\r\n");
        assert!(matches!(result, Err(Error::InvalidHandshake(msg)) if msg.contains("GET")));
    }

    #[test]
    fn test_invalid_request_line() {
        let result = HandshakeRequest::parse(b"GET\r\n\r\n");
        assert!(matches!(result, Err(Error::InvalidHandshake(_))));
        let result = HandshakeRequest::parse(b"");
        assert!(matches!(result, Err(Error::InvalidHandshake(_))));
    }

    #[test]
    fn test_duplicate_key_header_rejected() {
        let request = b"GET / HTTP/1.1\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
Sec-WebSocket-Key: x3JJHMbDL1EzLkh9GBhXDw==\r\n\r\n";

        let result = HandshakeRequest::parse(request);
        assert!(matches!(
            result,
            Err(Error::InvalidHandshake(msg)) if msg.contains("Duplicate")
        ));
    }

    #[test]
    fn test_handshake_too_large() {
        let large_data = vec![b'A'; 10000];
        let result = HandshakeRequest::parse_with_limit(&large_data, &Limits::default());
        assert!(matches!(result, Err(Error::HandshakeTooLarge { .. })));
    }

    #[test]
    fn test_response_exact_bytes() {
        let req = HandshakeRequest::from_headers([("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")]);
        let bytes = accept_response(&req, "wsdispatch").unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\
             Sec-WebSocket-Version: 13\r\n\
             Server: wsdispatch\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_crlf_in_server_name_rejected() {
        let response = HandshakeResponse {
            accept: "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=".to_string(),
            server_name: "srv\r\nX-Injected: evil".to_string(),
        };
        assert!(matches!(
            response.to_bytes(),
            Err(Error::InvalidHandshake(_))
        ));
    }

    #[test]
    fn test_bad_request_response() {
        let text = String::from_utf8(bad_request_response("wsdispatch")).unwrap();
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(text.contains("Server: wsdispatch\r\n"));

        let (head, body) = text.split_once("\r\n\r\n").unwrap();
        assert!(head.contains(&format!("Content-Length: {}", body.len())));
        assert!(body.contains("HTTP ERROR 400"));
    }
}
