//! Courier HTTP layer
//!
//! Issues requests through a [`Session`] and hands back a [`RawResponse`]
//! whose body is consumed exactly once: as text, bytes, JSON, a file, a
//! writer, or through a handler. Bodies are decompressed transparently and
//! the connection is released on every exit path.

mod body;
pub mod charset;
mod cookie;
pub mod decompress;
mod error;
pub mod headers;
mod raw_response;
mod request;
mod response;
mod session;

pub use body::{BodyReader, Connection};
pub use cookie::Cookie;
pub use error::{Error, Result};
pub use headers::{Header, Headers};
pub use raw_response::{RawResponse, ResponseInfo, ResponseParts};
pub use request::RequestBuilder;
pub use response::Response;
pub use session::{Session, SessionConfig};

pub use encoding_rs::Encoding;
pub use reqwest::Method;
pub use url::Url;
