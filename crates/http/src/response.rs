//! Materialized HTTP response

use url::Url;

use crate::cookie::Cookie;
use crate::headers::Headers;

/// HTTP response with its body already read into `T`.
///
/// Detached from the connection it came from.
#[derive(Debug, Clone)]
pub struct Response<T> {
    url: Url,
    status: u16,
    cookies: Vec<Cookie>,
    headers: Headers,
    body: T,
}

impl<T> Response<T> {
    /// Create a new response
    pub fn new(url: Url, status: u16, cookies: Vec<Cookie>, headers: Headers, body: T) -> Self {
        Self {
            url,
            status,
            cookies,
            headers,
            body,
        }
    }

    /// Final URL after redirects
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// First cookie named `name`
    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// First value of header `name`
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &T {
        &self.body
    }

    pub fn into_body(self) -> T {
        self.body
    }

    /// Check if the response was successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let url = Url::parse("https://example.com/a").unwrap();
        let headers = Headers::new().with("Content-Type", "text/plain");
        let response = Response::new(url, 201, vec![Cookie::new("k", "v")], headers, "ok".to_string());

        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.cookie("k").map(|c| c.value.as_str()), Some("v"));
        assert_eq!(response.url().path(), "/a");
        assert_eq!(response.into_body(), "ok");
    }

    #[test]
    fn test_not_success() {
        let url = Url::parse("https://example.com").unwrap();
        let response = Response::new(url, 404, vec![], Headers::new(), ());
        assert!(!response.is_success());
    }
}
