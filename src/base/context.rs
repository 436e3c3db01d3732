//! Error context helpers.
//!
//! Extension traits that turn transport and engine errors into
//! context-rich `NetError` variants at the call site.

use crate::base::neterror::NetError;
use std::io;
use tokio_tungstenite::tungstenite;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use wsstream::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await
    ///     .connection_context("example.com", 80)?;
    /// // Error: "Connection to example.com:80 failed: connection refused"
    /// ```
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError>;

    /// Add DNS resolution context to an IO error.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| NetError::ConnectionFailedTo {
            host: host.to_string(),
            port,
            source: e,
        })
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::NameNotResolvedFor {
            domain: domain.to_string(),
            source: e,
        })
    }
}

/// Extension trait for engine Results produced during the upgrade.
pub trait HandshakeResultExt<T> {
    /// Report any engine failure as [`NetError::WsHandshake`].
    fn handshake_context(self) -> Result<T, NetError>;
}

impl<T> HandshakeResultExt<T> for Result<T, tungstenite::Error> {
    fn handshake_context(self) -> Result<T, NetError> {
        self.map_err(NetError::from_handshake)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_connection_context() {
        let result: Result<(), io::Error> =
            Err(Error::new(ErrorKind::ConnectionRefused, "refused"));
        let err = result.connection_context("example.com", 80).unwrap_err();

        match err {
            NetError::ConnectionFailedTo { host, port, .. } => {
                assert_eq!(host, "example.com");
                assert_eq!(port, 80);
            }
            _ => panic!("Expected ConnectionFailedTo"),
        }
    }

    #[test]
    fn test_dns_context() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::NotFound, "no such host"));
        let err = result.dns_context("unknown.example.com").unwrap_err();

        match err {
            NetError::NameNotResolvedFor { domain, .. } => {
                assert_eq!(domain, "unknown.example.com");
            }
            _ => panic!("Expected NameNotResolvedFor"),
        }
    }

    #[test]
    fn test_handshake_context() {
        let result: Result<(), tungstenite::Error> = Err(tungstenite::Error::ConnectionClosed);
        let err = result.handshake_context().unwrap_err();
        assert!(err.is_handshake());
        assert_eq!(err.handshake_status(), None);
    }
}
