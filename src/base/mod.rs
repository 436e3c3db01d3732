//! Base types and error handling.
//!
//! - [`neterror::NetError`]: error list with Chromium-style net error codes
//! - [`context`]: extension traits attaching host, DNS and handshake context

pub mod context;
pub mod neterror;

#[cfg(test)]
mod tests;
