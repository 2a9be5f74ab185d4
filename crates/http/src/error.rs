//! Error types

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while dispatching a request or consuming its response
#[derive(Debug, Error)]
pub enum Error {
    /// Reading, decoding, or writing a body failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The content decoder could not be set up for the body
    #[error("Cannot decode {encoding} body: {source}")]
    Decompress {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The body is not valid JSON for the requested type
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The body was already consumed or the response closed
    #[error("Response body already consumed or closed")]
    AlreadyClosed,

    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout")]
    Timeout,

    #[error("Too many redirects")]
    TooManyRedirects,
}

impl Error {
    /// Whether this error reports a second consumption of the same body
    pub fn is_already_closed(&self) -> bool {
        matches!(self, Error::AlreadyClosed)
    }

    pub(crate) fn decompress(encoding: &'static str, source: std::io::Error) -> Self {
        Error::Decompress { encoding, source }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_connect() {
            Error::Connection(err.to_string())
        } else if err.is_redirect() {
            Error::TooManyRedirects
        } else if err.is_builder() && is_url_error(&err) {
            Error::InvalidUrl(err.to_string())
        } else {
            Error::RequestFailed(err.to_string())
        }
    }
}

fn is_url_error(err: &reqwest::Error) -> bool {
    std::error::Error::source(err).is_some_and(|source| source.is::<url::ParseError>())
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}
