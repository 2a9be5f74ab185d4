//! Response header collection

use std::fmt;

use encoding_rs::Encoding;
use mime::Mime;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_ENCODING: &str = "Content-Encoding";
pub const CONTENT_LENGTH: &str = "Content-Length";

/// A single header line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    name: String,
    value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Header name as received
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Ordered multi-map of response headers.
///
/// Names keep the case they arrived with; every lookup compares names
/// ASCII case-insensitively. Values are never rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Header>,
}

impl Headers {
    /// Create an empty header collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, keeping any earlier values for the same name
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(Header::new(name, value));
    }

    /// Builder-style [`Headers::push`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// First value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// All values for `name`, in arrival order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the Content-Type header
    pub fn content_type(&self) -> Option<&str> {
        self.get(CONTENT_TYPE)
    }

    /// Get the Content-Encoding header
    pub fn content_encoding(&self) -> Option<&str> {
        self.get(CONTENT_ENCODING)
    }

    /// Declared body length, if present and numeric
    pub fn content_length(&self) -> Option<u64> {
        self.get(CONTENT_LENGTH).and_then(|v| v.trim().parse().ok())
    }

    /// Charset declared by the `charset=` parameter of Content-Type.
    ///
    /// Returns `None` when the header is missing, does not parse as a media
    /// type, has no charset parameter, or names an unknown encoding.
    pub fn charset(&self) -> Option<&'static Encoding> {
        let mime: Mime = self.content_type()?.trim().parse().ok()?;
        let label = mime.get_param(mime::CHARSET)?;
        Encoding::for_label(label.as_str().as_bytes())
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, v)| Header::new(n, v)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let headers = Headers::new().with("content-encoding", "gzip");
        assert_eq!(headers.get("Content-Encoding"), Some("gzip"));
        assert_eq!(headers.content_encoding(), Some("gzip"));
        assert!(headers.contains("CONTENT-ENCODING"));
    }

    #[test]
    fn test_multiple_values_keep_order() {
        let headers: Headers = vec![
            ("Set-Cookie", "a=1"),
            ("Vary", "Accept"),
            ("set-cookie", "b=2"),
        ]
        .into_iter()
        .collect();

        assert_eq!(headers.get("Set-Cookie"), Some("a=1"));
        assert_eq!(headers.get_all("set-cookie").collect::<Vec<_>>(), vec!["a=1", "b=2"]);
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_charset_from_content_type() {
        let headers = Headers::new().with("Content-Type", "text/html; charset=ISO-8859-1");
        assert_eq!(headers.charset(), Some(encoding_rs::WINDOWS_1252));

        let sjis = Headers::new().with("content-type", "text/plain;charset=Shift_JIS");
        assert_eq!(sjis.charset(), Some(encoding_rs::SHIFT_JIS));
    }

    #[test]
    fn test_charset_absent_or_unparsable() {
        assert_eq!(Headers::new().charset(), None);
        assert_eq!(Headers::new().with("Content-Type", "text/html").charset(), None);
        assert_eq!(
            Headers::new().with("Content-Type", "text/html; charset=no-such-thing").charset(),
            None
        );
        assert_eq!(Headers::new().with("Content-Type", ";;;").charset(), None);
    }

    #[test]
    fn test_content_length() {
        assert_eq!(Headers::new().with("Content-Length", " 42 ").content_length(), Some(42));
        assert_eq!(Headers::new().with("Content-Length", "x").content_length(), None);
    }
}
