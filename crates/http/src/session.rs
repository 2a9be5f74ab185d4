//! Request session
//!
//! A [`Session`] shares cookies and configuration between requests. It is
//! cheap to clone and may be used from several threads at once; each request
//! yields its own independent [`RawResponse`](crate::RawResponse).

use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, USER_AGENT};
use reqwest::{IntoUrl, Method};

use crate::body::Connection;
use crate::error::{Error, Result};
use crate::request::RequestBuilder;

/// Default user agent string
const DEFAULT_USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

/// Default timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of redirects to follow
const MAX_REDIRECTS: usize = 10;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Redirects followed before giving up; 0 disables following
    pub max_redirects: usize,
    /// Keep a cookie store shared by every request of the session
    pub cookies: bool,
    /// Advertise `Accept-Encoding: gzip, deflate`
    pub accept_compressed: bool,
    /// Honor the proxy environment variables
    pub system_proxy: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: MAX_REDIRECTS,
            cookies: true,
            accept_compressed: true,
            system_proxy: true,
        }
    }
}

/// HTTP session sharing cookies and settings across requests
#[derive(Debug, Clone)]
pub struct Session {
    client: reqwest::blocking::Client,
}

impl Session {
    /// Create a new session with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(SessionConfig::default())
    }

    /// Create a new session with custom configuration
    pub fn with_config(config: SessionConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| Error::InvalidHeader(e.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        if config.accept_compressed {
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
        }

        let redirect = if config.max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(config.max_redirects)
        };

        let mut builder = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect)
            .cookie_store(config.cookies);
        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(|e| Error::RequestFailed(e.to_string()))?;

        debug!("Created session: {:?}", config);
        Ok(Self { client })
    }

    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn put<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    pub fn head<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    pub fn delete<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    pub fn patch<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Start a request with any method
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        RequestBuilder::new(self.client.clone(), method, url)
    }
}

/// Connection behind a pooled transport response.
///
/// `disconnect` only logs. The release itself is dropping the transport
/// body, which puts the connection back in the pool (or closes it when the
/// body was not read to the end); the lifecycle drops the body right before
/// calling `disconnect`.
#[derive(Debug)]
pub(crate) struct PooledConnection {
    host: String,
}

impl PooledConnection {
    pub(crate) fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl Connection for PooledConnection {
    fn disconnect(&mut self) {
        debug!("Connection to {} released", self.host);
    }
}
