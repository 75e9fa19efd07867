//! Utilities shared across driver processors.
//!
//! - [`tls`]: `SslMode` and the rustls connector for PostgreSQL

pub mod tls;

pub use tls::SslMode;
