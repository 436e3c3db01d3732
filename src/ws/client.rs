//! Client-side construction: resolve, dial, upgrade.

use super::config::WsConfig;
use super::connection::{buffered_transport, WsStream};
use super::handshake::HandshakeResponse;
use crate::base::context::{HandshakeResultExt, IoResultExt};
use crate::base::neterror::NetError;
use http::header::{HeaderName, HeaderValue, ORIGIN, SEC_WEBSOCKET_PROTOCOL};
use tokio::net::TcpStream;
use tokio_tungstenite::client_async_with_config;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use url::Url;

/// Connect to a WebSocket server and wrap the connection as a byte stream.
///
/// `http://` URLs are dialed as `ws://`. The `Origin` header is derived from
/// the URL.
///
/// # Example
/// ```ignore
/// let (stream, resp) = connect("http://127.0.0.1:8081/websocket", &WsConfig::new(1024, 1024)).await?;
/// let session = resp.cookie("sessionId");
/// ```
pub async fn connect(
    url: &str,
    config: &WsConfig,
) -> Result<(WsStream<TcpStream>, HandshakeResponse), NetError> {
    WsStreamBuilder::new()
        .url(url)?
        .config(config.clone())
        .connect()
        .await
}

/// WebSocket stream builder.
#[derive(Debug, Clone)]
pub struct WsStreamBuilder {
    url: Option<Url>,
    origin: Option<String>,
    headers: http::HeaderMap,
    subprotocols: Vec<String>,
    config: WsConfig,
}

impl Default for WsStreamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WsStreamBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            url: None,
            origin: None,
            headers: http::HeaderMap::new(),
            subprotocols: Vec::new(),
            config: WsConfig::default(),
        }
    }

    /// Set the URL to connect to. Accepts `ws`, `wss`, `http` and `https`.
    pub fn url(mut self, url: &str) -> Result<Self, NetError> {
        let mut url = Url::parse(url).map_err(|_| NetError::InvalidUrl)?;

        // Normalize scheme
        let scheme = match url.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            _ => return Err(NetError::DisallowedUrlScheme),
        };
        if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
            return Err(NetError::InvalidUrl);
        }
        if url.host_str().is_none() {
            return Err(NetError::InvalidUrl);
        }

        self.url = Some(url);
        Ok(self)
    }

    /// Override the `Origin` header sent with the upgrade request.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Add a header to the WebSocket handshake.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Add a subprotocol.
    pub fn subprotocol(mut self, protocol: impl Into<String>) -> Self {
        self.subprotocols.push(protocol.into());
        self
    }

    /// Set buffer sizes and limits.
    pub fn config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the URL if set.
    pub fn get_url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Get the headers.
    pub fn get_headers(&self) -> &http::HeaderMap {
        &self.headers
    }

    /// Check if secure (wss://).
    pub fn is_secure(&self) -> bool {
        self.url.as_ref().is_some_and(|u| u.scheme() == "wss")
    }

    /// `Origin` sent with the request: the override, or the URL's own origin
    /// in its http form.
    pub fn effective_origin(&self) -> Option<String> {
        if let Some(origin) = &self.origin {
            return Some(origin.clone());
        }
        let url = self.url.as_ref()?;
        let scheme = if url.scheme() == "wss" { "https" } else { "http" };
        let host = url.host_str()?;
        Some(match url.port() {
            Some(port) => format!("{}://{}:{}", scheme, host, port),
            None => format!("{}://{}", scheme, host),
        })
    }

    /// Connect to the server.
    pub async fn connect(self) -> Result<(WsStream<TcpStream>, HandshakeResponse), NetError> {
        let url = self.url.as_ref().ok_or(NetError::InvalidUrl)?;
        if self.is_secure() {
            // TLS is not wired into the transport.
            return Err(NetError::DisallowedUrlScheme);
        }

        let host = url.host_str().ok_or(NetError::InvalidUrl)?;
        let port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;
        let tcp = dial(host, port).await?;

        let mut request = url.as_str().into_client_request().map_err(|e| {
            tracing::debug!(url = %url, error = %e, "invalid WebSocket request");
            NetError::InvalidUrl
        })?;
        let headers = request.headers_mut();
        for (name, value) in self.headers.iter() {
            headers.append(name.clone(), value.clone());
        }
        if let Some(origin) = self.effective_origin() {
            let value = HeaderValue::try_from(origin).map_err(|_| NetError::InvalidUrl)?;
            headers.insert(ORIGIN, value);
        }
        if !self.subprotocols.is_empty() {
            let value = HeaderValue::try_from(self.subprotocols.join(", "))
                .map_err(|_| NetError::InvalidUrl)?;
            headers.insert(SEC_WEBSOCKET_PROTOCOL, value);
        }

        let transport = buffered_transport(tcp, &self.config);
        // On failure the transport is dropped, which closes the TCP connection.
        let (engine, response) =
            client_async_with_config(request, transport, Some(self.config.to_engine()))
                .await
                .handshake_context()
                .inspect_err(|e| {
                    tracing::debug!(url = %url, error = %e, "WebSocket handshake failed");
                })?;

        let stream = WsStream::new(engine);
        tracing::debug!(
            url = %url,
            local = ?stream.local_addr().ok(),
            status = %response.status(),
            "WebSocket connected"
        );
        Ok((stream, HandshakeResponse::new(response)))
    }
}

/// Resolve `host` and connect to the first address that accepts.
async fn dial(host: &str, port: u16) -> Result<TcpStream, NetError> {
    let addrs: Vec<_> = tokio::net::lookup_host((host, port))
        .await
        .dns_context(host)?
        .collect();
    tracing::debug!(host = %host, count = addrs.len(), "resolved WebSocket host");

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                stream.set_nodelay(true).connection_context(host, port)?;
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(addr = %addr, error = %e, "TCP connect failed");
                last_err = Some(e);
            }
        }
    }

    let err = last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved")
    });
    Err(err).connection_context(host, port)
}
