//! # remote-docs
//!
//! HTTP bindings for a remote document service that exposes exclusive write
//! locks and plain-text document content.
//!
//! ## Endpoints
//!
//! | Operation | Request                                                     |
//! |-----------|-------------------------------------------------------------|
//! | acquire   | `POST {base}lock?path=..&owner=..&timeout_seconds=..`       |
//! | release   | `POST {base}unlock?path=..` `{"token"}`                     |
//! | query     | `GET {base}lockinfo?path=..`                                |
//! | fetch     | `GET {base}content?path=..`                                 |
//! | store     | `PUT {base}content?path=..` + lock header                   |
//!
//! The service mounts these under `/api/files/`. Lock tokens are
//! `opaquelocktoken:` URIs; the server strips and re-adds angle brackets and
//! the scheme prefix, so a normalized token is always accepted back. Besides
//! the JSON body used here, `unlock` also takes the token as a `token` query
//! parameter or a plain-text body.
//!
//! The unlock beacon reuses the release request but is fire-and-forget: the
//! caller never sees its outcome.
//!
//! Documents that are not valid UTF-8 are served as
//! [`BINARY_CONTENT_PLACEHOLDER`] and must never be stored back.
//!
//! ## Example
//!
//! ```rust,ignore
//! use remote_docs::Client;
//!
//! let client = Client::new("http://localhost:8080/api/files/")?;
//! let info = client.query("/docs/intro.xml").await?;
//! if !info.locked {
//!     let grant = client.acquire("/docs/intro.xml", "alice").await?;
//!     println!("holding {}", grant.token);
//! }
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::{
    Client, BINARY_CONTENT_PLACEHOLDER, DEFAULT_LOCK_TIMEOUT, DEFAULT_LOCK_TOKEN_HEADER,
};
pub use error::RemoteError;
pub use types::{LockGrant, LockInfo, LockTimeout};
