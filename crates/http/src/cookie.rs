//! Response cookies

use std::time::SystemTime;

/// A cookie set by the server on a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain attribute, if any
    pub domain: Option<String>,
    /// Path attribute, if any
    pub path: Option<String>,
    /// Absolute expiry, from Expires or Max-Age
    pub expires: Option<SystemTime>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    /// Create a session cookie with no attributes
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            secure: false,
            http_only: false,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Whether the cookie lives only for the browsing session
    pub fn is_session(&self) -> bool {
        self.expires.is_none()
    }

    /// Whether the cookie expired before `now`
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

impl From<reqwest::cookie::Cookie<'_>> for Cookie {
    fn from(c: reqwest::cookie::Cookie<'_>) -> Self {
        let expires = c
            .max_age()
            .map(|age| SystemTime::now() + age)
            .or_else(|| c.expires());
        Self {
            name: c.name().to_string(),
            value: c.value().to_string(),
            domain: c.domain().map(str::to_string),
            path: c.path().map(str::to_string),
            expires,
            secure: c.secure(),
            http_only: c.http_only(),
        }
    }
}
