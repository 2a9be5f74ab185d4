//! Text charset resolution

use encoding_rs::{Encoding, UTF_8};

use crate::error::{Error, Result};

/// Charset used when neither the caller nor the server names one
pub const DEFAULT_CHARSET: &Encoding = UTF_8;

/// Pick the charset for decoding a body.
///
/// An explicit override always wins, then the charset declared by the
/// response, then UTF-8.
pub fn resolve(
    explicit: Option<&'static Encoding>,
    declared: Option<&'static Encoding>,
) -> &'static Encoding {
    explicit.or(declared).unwrap_or(DEFAULT_CHARSET)
}

/// Look up an encoding by its WHATWG label (`"utf-8"`, `"latin1"`, `"gbk"`...)
pub fn for_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| Error::UnknownCharset(label.to_string()))
}

/// Decode a complete body in `encoding`.
///
/// Malformed sequences become U+FFFD. A byte order mark is kept as text,
/// so the resolved charset is never overridden by sniffing.
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    if encoding == UTF_8 {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    encoding.decode_without_bom_handling(bytes).0.into_owned()
}
