//! Request builder

use std::time::Duration;

use log::info;
use reqwest::header::CONTENT_TYPE;
use reqwest::{IntoUrl, Method};
use serde::Serialize;

use crate::cookie::Cookie;
use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::raw_response::{RawResponse, ResponseParts};
use crate::session::PooledConnection;

/// A request being prepared on a [`Session`](crate::Session)
#[must_use = "a request does nothing until it is sent"]
pub struct RequestBuilder {
    client: reqwest::blocking::Client,
    method: Method,
    inner: reqwest::blocking::RequestBuilder,
    /// First error hit while building, reported by `send`
    error: Option<Error>,
}

impl RequestBuilder {
    pub(crate) fn new<U: IntoUrl>(client: reqwest::blocking::Client, method: Method, url: U) -> Self {
        let inner = client.request(method.clone(), url);
        Self {
            client,
            method,
            inner,
            error: None,
        }
    }

    fn map(mut self, f: impl FnOnce(reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder) -> Self {
        self.inner = f(self.inner);
        self
    }

    /// Add a request header
    pub fn header(self, name: &str, value: &str) -> Self {
        let (name, value) = (name.to_string(), value.to_string());
        self.map(|r| r.header(name, value))
    }

    /// Add several request headers
    pub fn headers<'a, I>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        headers
            .into_iter()
            .fold(self, |builder, (name, value)| builder.header(name, value))
    }

    /// Append URL query parameters
    pub fn query<T: Serialize + ?Sized>(self, params: &T) -> Self {
        self.map(|r| r.query(params))
    }

    /// Send request cookies, in addition to the session's stored ones
    pub fn cookies(self, cookies: &[Cookie]) -> Self {
        if cookies.is_empty() {
            return self;
        }
        let value = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        self.header("Cookie", &value)
    }

    /// Raw request body
    pub fn body(self, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        self.map(|r| r.body(body))
    }

    /// Plain text body, sent as UTF-8
    pub fn text(self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.map(|r| r.header(CONTENT_TYPE, "text/plain; charset=utf-8").body(text))
    }

    /// URL-encoded form body
    pub fn form<T: Serialize + ?Sized>(self, form: &T) -> Self {
        self.map(|r| r.form(form))
    }

    /// JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => self.map(|r| r.header(CONTENT_TYPE, "application/json").body(body)),
            Err(e) => {
                self.error.get_or_insert(Error::Json(e));
                self
            }
        }
    }

    pub fn basic_auth(self, user: &str, password: Option<&str>) -> Self {
        let (user, password) = (user.to_string(), password.map(str::to_string));
        self.map(|r| r.basic_auth(user, password))
    }

    /// Per-request timeout, overriding the session's
    pub fn timeout(self, timeout: Duration) -> Self {
        self.map(|r| r.timeout(timeout))
    }

    /// Dispatch the request and return the response with its body unread
    pub fn send(self) -> Result<RawResponse> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let request = self.inner.build()?;
        info!("{} {}", request.method(), request.url());

        let response = self.client.execute(request)?;
        let status = response.status();
        let url = response.url().clone();
        let status_line = format!("{:?} {}", response.version(), status);

        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.as_str(), val)))
            .collect();
        let cookies: Vec<Cookie> = response.cookies().map(Cookie::from).collect();

        info!("{} {} -> {}", self.method, url, status.as_u16());

        let conn = PooledConnection::new(url.host_str().unwrap_or_default());
        let parts = ResponseParts {
            method: self.method,
            url,
            status: status.as_u16(),
            status_line,
            cookies,
            headers,
        };
        Ok(RawResponse::new(parts, response, conn))
    }
}
