//! Open HTTP response awaiting consumption
//!
//! A [`RawResponse`] owns the body stream and connection of one exchange
//! until a consuming method drains the body. Every consuming method releases
//! the stream and connection before it returns, whether it succeeds or not.
//! Responses never consumed are released when the last view is dropped.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use encoding_rs::{CoderResult, Encoding, UTF_8};
use log::debug;
use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use crate::body::{BodyReader, BodySlot, Connection, Lease};
use crate::charset;
use crate::cookie::Cookie;
use crate::decompress::{self, BodyStream};
use crate::error::Result;
use crate::headers::Headers;
use crate::response::Response;

const TEXT_CHUNK: usize = 8 * 1024;

/// Metadata of a received response, as produced by the dispatcher
#[derive(Debug, Clone)]
pub struct ResponseParts {
    /// Method of the request that produced this response
    pub method: Method,
    /// Final URL after redirects
    pub url: Url,
    pub status: u16,
    /// e.g. `HTTP/1.1 200 OK`
    pub status_line: String,
    pub cookies: Vec<Cookie>,
    pub headers: Headers,
}

/// What a [`RawResponse::to_response`] handler gets to see.
///
/// Borrowed for the duration of the handler call only.
pub struct ResponseInfo<'a> {
    pub url: &'a Url,
    pub status: u16,
    pub headers: &'a Headers,
    /// The body, decompressed unless disabled
    pub body: &'a mut dyn Read,
}

/// Raw HTTP response with an unread body.
///
/// [`charset`](Self::charset) and [`decompress`](Self::decompress) return new
/// views sharing the same body: only the first view to consume gets it, and
/// any other view then fails with [`Error::AlreadyClosed`](crate::Error::AlreadyClosed).
///
/// Responses are single-threaded; issue requests from several threads with
/// one [`Session`](crate::Session) instead.
pub struct RawResponse {
    parts: Rc<ResponseParts>,
    body: Rc<BodySlot>,
    charset: Option<&'static Encoding>,
    decompress: bool,
}

impl RawResponse {
    /// Wrap an open body stream and the connection it arrives on
    pub fn new(
        parts: ResponseParts,
        body: impl Read + 'static,
        conn: impl Connection + 'static,
    ) -> Self {
        Self {
            parts: Rc::new(parts),
            body: Rc::new(BodySlot::new(Box::new(body), Box::new(conn))),
            charset: None,
            decompress: true,
        }
    }

    fn view(&self, charset: Option<&'static Encoding>, decompress: bool) -> Self {
        Self {
            parts: Rc::clone(&self.parts),
            body: Rc::clone(&self.body),
            charset,
            decompress,
        }
    }

    /// View that decodes text in `charset` instead of the declared one
    pub fn charset(&self, charset: &'static Encoding) -> Self {
        self.view(Some(charset), self.decompress)
    }

    /// [`charset`](Self::charset) by label, e.g. `"gbk"`
    pub fn charset_label(&self, label: &str) -> Result<Self> {
        Ok(self.charset(charset::for_label(label)?))
    }

    /// View with transparent decompression switched on or off (default on)
    pub fn decompress(&self, decompress: bool) -> Self {
        self.view(self.charset, decompress)
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn url(&self) -> &Url {
        &self.parts.url
    }

    /// The response status code
    pub fn status(&self) -> u16 {
        self.parts.status
    }

    pub fn status_line(&self) -> &str {
        &self.parts.status_line
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.parts.cookies
    }

    pub fn headers(&self) -> &Headers {
        &self.parts.headers
    }

    /// Whether some view already consumed or closed the body
    pub fn is_closed(&self) -> bool {
        self.body.is_closed()
    }

    /// Release the body and connection without reading. Safe to call at any
    /// time, including after the body was consumed.
    pub fn close(&self) {
        self.body.close();
    }

    /// Charset text is decoded with: override, then declared, then UTF-8
    fn text_charset(&self) -> &'static Encoding {
        charset::resolve(self.charset, self.parts.headers.charset())
    }

    fn lease(&self) -> Result<Lease> {
        let parts = &self.parts;
        self.body.take()?.map_body(|raw: BodyStream| {
            decompress::select(
                &parts.method,
                parts.status,
                parts.headers.content_encoding(),
                raw,
                self.decompress,
            )
        })
    }

    /// Take the body, run `f` over it and release it, on every path
    fn drain<T>(&self, f: impl FnOnce(&mut dyn Read) -> Result<T>) -> Result<T> {
        let mut lease = self.lease()?;
        f(lease.body())
    }

    /// Read the body as text. Empty body gives an empty string.
    pub fn read_to_text(self) -> Result<String> {
        let mut text = String::new();
        self.write_to_text(&mut text)?;
        Ok(text)
    }

    /// Read the body into memory. Empty body gives an empty buffer.
    pub fn read_to_bytes(self) -> Result<Vec<u8>> {
        let capacity = self.parts.headers.content_length().unwrap_or(0).min(1 << 20) as usize;
        self.drain(|body| {
            let mut buf = Vec::with_capacity(capacity);
            body.read_to_end(&mut buf)?;
            Ok(buf)
        })
    }

    /// Deserialize the body as JSON.
    ///
    /// Returns `None` for an empty (or whitespace only) body and for a JSON
    /// `null`.
    pub fn read_to_json<T: DeserializeOwned>(self) -> Result<Option<T>> {
        let encoding = self.text_charset();
        self.drain(|body| {
            let mut buf = Vec::new();
            body.read_to_end(&mut buf)?;
            if buf.iter().all(u8::is_ascii_whitespace) {
                return Ok(None);
            }
            let value = if encoding == UTF_8 {
                serde_json::from_slice(&buf)?
            } else {
                serde_json::from_str(&charset::decode(&buf, encoding))?
            };
            Ok(value)
        })
    }

    /// Hand the body to `handler` and wrap whatever it returns.
    ///
    /// Handler I/O errors become [`Error::Io`](crate::Error::Io). A panicking
    /// handler unwinds through this call; the body is still released.
    pub fn to_response<T, F>(self, handler: F) -> Result<Response<T>>
    where
        F: FnOnce(ResponseInfo<'_>) -> io::Result<T>,
    {
        let result = self.drain(|body| {
            let info = ResponseInfo {
                url: &self.parts.url,
                status: self.parts.status,
                headers: &self.parts.headers,
                body,
            };
            Ok(handler(info)?)
        })?;
        Ok(detached(&self.parts, result))
    }

    /// Write the body to a new or truncated file
    pub fn write_to_file(self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.drain(|body| {
            let mut file = File::create(path)?;
            let written = io::copy(body, &mut file)?;
            file.flush()?;
            debug!("Wrote {} bytes to {}", written, path.display());
            Ok(())
        })
    }

    /// Copy the body into `out`. `out` is flushed but stays open.
    pub fn write_to<W: Write + ?Sized>(self, out: &mut W) -> Result<u64> {
        self.drain(|body| {
            let written = io::copy(body, &mut *out)?;
            out.flush()?;
            Ok(written)
        })
    }

    /// Decode the body as text into `out`, chunk by chunk
    pub fn write_to_text<W: fmt::Write + ?Sized>(self, out: &mut W) -> Result<()> {
        let encoding = self.text_charset();
        debug!("Decoding body as {}", encoding.name());
        self.drain(|body| decode_into(body, encoding, out))
    }

    /// Read and throw away the body, without decompressing it
    pub fn discard_body(self) -> Result<()> {
        let mut lease = self.body.take()?;
        io::copy(lease.body(), &mut io::sink())?;
        Ok(())
    }

    /// Take the body as an owned reader, released when it is dropped
    pub fn into_reader(self) -> Result<BodyReader> {
        Ok(BodyReader::new(self.lease()?))
    }

    /// Read the body as text and wrap it with the response metadata
    pub fn to_text_response(self) -> Result<Response<String>> {
        let parts = Rc::clone(&self.parts);
        let text = self.read_to_text()?;
        Ok(detached(&parts, text))
    }

    pub fn to_bytes_response(self) -> Result<Response<Vec<u8>>> {
        let parts = Rc::clone(&self.parts);
        let bytes = self.read_to_bytes()?;
        Ok(detached(&parts, bytes))
    }

    pub fn to_json_response<T: DeserializeOwned>(self) -> Result<Response<Option<T>>> {
        let parts = Rc::clone(&self.parts);
        let value = self.read_to_json()?;
        Ok(detached(&parts, value))
    }

    /// Write the body to `path` and return a response holding that path
    pub fn to_file_response(self, path: impl Into<PathBuf>) -> Result<Response<PathBuf>> {
        let path = path.into();
        let parts = Rc::clone(&self.parts);
        self.write_to_file(&path)?;
        Ok(detached(&parts, path))
    }
}

fn detached<T>(parts: &ResponseParts, body: T) -> Response<T> {
    Response::new(
        parts.url.clone(),
        parts.status,
        parts.cookies.clone(),
        parts.headers.clone(),
        body,
    )
}

fn decode_into<W: fmt::Write + ?Sized>(
    body: &mut dyn Read,
    encoding: &'static Encoding,
    out: &mut W,
) -> Result<()> {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut buf = [0u8; TEXT_CHUNK];
    let mut text = String::new();
    loop {
        let n = match body.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        let last = n == 0;

        text.clear();
        let needed = decoder
            .max_utf8_buffer_length(n)
            .ok_or_else(|| io::Error::new(io::ErrorKind::OutOfMemory, "text chunk too large"))?;
        text.reserve(needed);
        // Capacity covers the worst case, so the whole chunk is consumed
        let (result, _, _) = decoder.decode_to_string(&buf[..n], &mut text, last);
        debug_assert_eq!(result, CoderResult::InputEmpty);

        out.write_str(&text)
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "text sink refused write"))?;
        if last {
            return Ok(());
        }
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("method", &self.parts.method)
            .field("url", &self.parts.url.as_str())
            .field("status", &self.parts.status)
            .field("charset", &self.charset.map(Encoding::name))
            .field("decompress", &self.decompress)
            .field("closed", &self.is_closed())
            .finish()
    }
}
