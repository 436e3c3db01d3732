//! Client-side view of the handshake response.

use cookie::Cookie;
use http::{HeaderMap, StatusCode};
use tokio_tungstenite::tungstenite::handshake::client::Response;

/// Metadata of the server's `101 Switching Protocols` answer.
#[derive(Debug)]
pub struct HandshakeResponse {
    inner: Response,
}

impl HandshakeResponse {
    pub(crate) fn new(inner: Response) -> Self {
        Self { inner }
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Negotiated subprotocol, if the server picked one.
    pub fn subprotocol(&self) -> Option<&str> {
        self.headers()
            .get(http::header::SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok())
    }

    /// All cookies set by the response. Malformed `Set-Cookie` lines are
    /// skipped.
    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        self.headers()
            .get_all(http::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|line| Cookie::parse(line.to_owned()).ok())
            .collect()
    }

    /// Value of the cookie called `name`.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies()
            .into_iter()
            .find(|c| c.name() == name)
            .map(|c| c.value().to_string())
    }

    pub fn into_inner(self) -> Response {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(cookies: &[&str]) -> HandshakeResponse {
        let mut builder = http::Response::builder().status(StatusCode::SWITCHING_PROTOCOLS);
        for c in cookies {
            builder = builder.header(http::header::SET_COOKIE, *c);
        }
        HandshakeResponse::new(builder.body(None).unwrap())
    }

    #[test]
    fn test_cookie_lookup() {
        let resp = response(&["sessionId=1234; Path=/", "theme=dark"]);
        assert_eq!(resp.status(), StatusCode::SWITCHING_PROTOCOLS);
        assert_eq!(resp.cookie("sessionId").as_deref(), Some("1234"));
        assert_eq!(resp.cookie("theme").as_deref(), Some("dark"));
        assert_eq!(resp.cookie("missing"), None);
        assert_eq!(resp.cookies().len(), 2);
    }

    #[test]
    fn test_malformed_cookie_skipped() {
        let resp = response(&["=novalue", "ok=1"]);
        let cookies = resp.cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name(), "ok");
    }

    #[test]
    fn test_no_subprotocol() {
        assert_eq!(response(&[]).subprotocol(), None);
    }
}
