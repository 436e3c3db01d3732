//! Transports.
//!
//! - [`stream`]: the `StreamSocket` trait and endpoint addresses
//! - `shared`: a transport the close path can shut down under the engine

pub(crate) mod shared;
pub mod stream;
