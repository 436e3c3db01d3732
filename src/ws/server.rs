//! Server-side construction: upgrade an accepted connection.

use super::config::WsConfig;
use super::connection::{buffered_transport, WsStream};
use crate::base::context::HandshakeResultExt;
use crate::base::neterror::NetError;
use crate::socket::stream::StreamSocket;
use http::header::{HeaderName, HeaderValue, HOST, ORIGIN};
use http::{HeaderMap, StatusCode};
use std::sync::Mutex;
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use url::Url;

/// Which `Origin` values an [`Acceptor`] lets through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OriginPolicy {
    /// No check.
    Any,
    /// `Origin` must be absent or name the same `host[:port]` as the `Host`
    /// header.
    #[default]
    SameHost,
    /// `Origin` must equal one of these serialized origins.
    AllowList(Vec<String>),
}

impl OriginPolicy {
    pub fn allows(&self, origin: Option<&str>, host: Option<&str>) -> bool {
        match self {
            OriginPolicy::Any => true,
            OriginPolicy::SameHost => match origin {
                None => true,
                Some(origin) => {
                    let Some(host) = host else {
                        return false;
                    };
                    origin_authority(origin).is_some_and(|a| a.eq_ignore_ascii_case(host))
                }
            },
            OriginPolicy::AllowList(allowed) => {
                origin.is_some_and(|o| allowed.iter().any(|a| a == o))
            }
        }
    }
}

/// `host[:port]` of a serialized origin, as it would appear in `Host`.
fn origin_authority(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Upgrades accepted connections to WebSocket streams.
///
/// # Example
/// ```ignore
/// let acceptor = Acceptor::new().response_header("Set-Cookie", "sessionId=1234");
/// let (tcp, _) = listener.accept().await?;
/// let stream = acceptor.accept(tcp).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Acceptor {
    response_headers: HeaderMap,
    origin_policy: OriginPolicy,
    config: WsConfig,
}

impl Acceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header to every handshake response.
    pub fn response_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            self.response_headers.append(name, value);
        }
        self
    }

    pub fn origin_policy(mut self, policy: OriginPolicy) -> Self {
        self.origin_policy = policy;
        self
    }

    /// Set buffer sizes and limits.
    pub fn config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn get_response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Perform the server handshake on `socket`.
    ///
    /// Fails with [`NetError::WsHandshake`] when the request is not a valid
    /// upgrade or its origin is refused; the socket is dropped in that case.
    pub async fn accept<S: StreamSocket>(&self, socket: S) -> Result<WsStream<S>, NetError> {
        let transport = buffered_transport(socket, &self.config);
        let refused: Mutex<Option<String>> = Mutex::new(None);

        let callback = |req: &Request, mut resp: Response| -> Result<Response, ErrorResponse> {
            let header = |name: HeaderName| req.headers().get(name).and_then(|v| v.to_str().ok());
            let origin = header(ORIGIN);
            if !self.origin_policy.allows(origin, header(HOST)) {
                let origin = origin.unwrap_or_default().to_string();
                tracing::debug!(origin = %origin, "WebSocket origin not allowed");
                if let Ok(mut slot) = refused.lock() {
                    *slot = Some(origin);
                }
                let mut reject = ErrorResponse::new(Some("Origin not allowed".to_string()));
                *reject.status_mut() = StatusCode::FORBIDDEN;
                return Err(reject);
            }

            let headers = resp.headers_mut();
            for (name, value) in self.response_headers.iter() {
                headers.append(name.clone(), value.clone());
            }
            Ok(resp)
        };

        let result =
            accept_hdr_async_with_config(transport, callback, Some(self.config.to_engine()))
                .await
                .handshake_context();
        let engine = match result {
            Ok(engine) => engine,
            Err(e) => {
                let origin = refused.lock().ok().and_then(|mut slot| slot.take());
                let err = match origin {
                    Some(origin) => NetError::WsHandshake {
                        status: Some(StatusCode::FORBIDDEN),
                        reason: format!("origin not allowed: {:?}", origin),
                    },
                    None => e,
                };
                tracing::debug!(error = %err, "WebSocket upgrade failed");
                return Err(err);
            }
        };

        let stream = WsStream::new(engine);
        tracing::debug!(peer = ?stream.peer_addr().ok(), "WebSocket accepted");
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_host_policy() {
        let policy = OriginPolicy::SameHost;
        assert!(policy.allows(None, Some("127.0.0.1:8080")));
        assert!(policy.allows(Some("http://127.0.0.1:8080"), Some("127.0.0.1:8080")));
        assert!(policy.allows(Some("http://Example.com"), Some("example.com")));
        assert!(!policy.allows(Some("http://evil.example"), Some("127.0.0.1:8080")));
        assert!(!policy.allows(Some("http://127.0.0.1:9090"), Some("127.0.0.1:8080")));
        assert!(!policy.allows(Some("http://127.0.0.1:8080"), None));
        assert!(!policy.allows(Some("null"), Some("127.0.0.1:8080")));
    }

    #[test]
    fn test_allow_list_policy() {
        let policy = OriginPolicy::AllowList(vec!["https://app.example".to_string()]);
        assert!(policy.allows(Some("https://app.example"), Some("api.example")));
        assert!(!policy.allows(Some("https://other.example"), Some("api.example")));
        assert!(!policy.allows(None, Some("api.example")));
    }

    #[test]
    fn test_any_policy() {
        assert!(OriginPolicy::Any.allows(Some("http://anything"), None));
    }

    #[test]
    fn test_response_headers() {
        let acceptor = Acceptor::new()
            .response_header("Set-Cookie", "sessionId=1234")
            .response_header("Set-Cookie", "theme=dark")
            .response_header("bad header", "x");
        assert_eq!(
            acceptor
                .get_response_headers()
                .get_all(http::header::SET_COOKIE)
                .iter()
                .count(),
            2
        );
        assert_eq!(acceptor.get_response_headers().len(), 2);
    }

    #[tokio::test]
    async fn test_plain_http_request_is_rejected() {
        use tokio::io::AsyncWriteExt;

        let (server_side, mut client_side) = tokio::io::duplex(4096);
        client_side
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        let err = match Acceptor::new().accept(server_side).await {
            Err(e) => e,
            Ok(_) => panic!("plain request must not upgrade"),
        };
        assert!(err.is_handshake());
    }
}
