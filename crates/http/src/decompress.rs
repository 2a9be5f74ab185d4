//! Transparent body decompression
//!
//! Chooses, from the request method, the response status and the
//! `Content-Encoding` header, whether a body stream is wrapped in a decoder.

use std::io::{self, BufRead, BufReader, Cursor, Read};

use flate2::bufread::GzDecoder;
use flate2::read::DeflateDecoder;
use log::{debug, warn};
use reqwest::Method;

use crate::error::{Error, Result};

/// A boxed body stream
pub type BodyStream = Box<dyn Read>;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const GZIP_METHOD_DEFLATE: u8 = 8;
const GZIP_HEADER_LEN: usize = 10;

// Header flag bits
const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;

/// Content-Encoding tokens this crate knows about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    /// Raw deflate, without a zlib wrapper
    Deflate,
    /// Historic LZW encoding, passed through undecoded
    Compress,
    /// Anything else, passed through undecoded
    Other(String),
}

impl ContentEncoding {
    /// Parse a header value. Matching is an exact, case-sensitive comparison.
    pub fn parse(token: &str) -> Self {
        match token {
            "identity" => Self::Identity,
            "gzip" => Self::Gzip,
            "deflate" => Self::Deflate,
            "compress" => Self::Compress,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Whether a response to `method` with `status` may carry a body.
///
/// HEAD responses, 1xx, 204 and 304 never do, whatever their headers say.
pub fn carries_body(method: &Method, status: u16) -> bool {
    !(*method == Method::HEAD || (100..200).contains(&status) || status == 204 || status == 304)
}

/// Wrap `raw` in the decoder its response calls for, or hand it back as is.
///
/// A gzip body has its first member header, optional fields included,
/// checked before this returns; on a bad or missing header `raw` is dropped
/// and a [`Error::Decompress`] is raised. Bytes after the last member that
/// do not start another member are ignored.
/// Deflate errors surface lazily from `read`.
pub fn select(
    method: &Method,
    status: u16,
    content_encoding: Option<&str>,
    raw: BodyStream,
    enabled: bool,
) -> Result<BodyStream> {
    if !enabled || !carries_body(method, status) {
        return Ok(raw);
    }
    let Some(token) = content_encoding else {
        return Ok(raw);
    };

    match ContentEncoding::parse(token) {
        ContentEncoding::Gzip => {
            debug!("Decoding gzip body");
            gzip(raw)
        }
        ContentEncoding::Deflate => {
            debug!("Decoding raw deflate body");
            Ok(Box::new(DeflateDecoder::new(raw)))
        }
        ContentEncoding::Identity | ContentEncoding::Compress => Ok(raw),
        ContentEncoding::Other(other) => {
            warn!("Unsupported content encoding {:?}, passing body through", other);
            Ok(raw)
        }
    }
}

fn gzip(mut raw: BodyStream) -> Result<BodyStream> {
    let header = match read_header(&mut raw) {
        Ok(header) => header,
        Err(e) => {
            drop(raw);
            return Err(Error::decompress("gzip", e));
        }
    };
    let replay: BodyStream = Box::new(Cursor::new(header).chain(raw));
    Ok(Box::new(GzipMembers {
        member: Some(GzDecoder::new(BufReader::new(replay))),
    }))
}

/// Gzip body decoded one member at a time.
///
/// After each member's trailer the next bytes must start another member
/// (`1f 8b`); anything else ends the body and is left unread.
struct GzipMembers {
    member: Option<GzDecoder<BufReader<BodyStream>>>,
}

impl Read for GzipMembers {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while let Some(member) = self.member.as_mut() {
            let n = member.read(buf)?;
            if n > 0 || buf.is_empty() {
                return Ok(n);
            }
            self.member = match self.member.take() {
                Some(done) => next_member(done.into_inner())?.map(GzDecoder::new),
                None => None,
            };
        }
        Ok(0)
    }
}

/// Hand `reader` back if it is positioned on another gzip member
fn next_member(mut reader: BufReader<BodyStream>) -> io::Result<Option<BufReader<BodyStream>>> {
    let peeked = reader.fill_buf()?;
    let (first, second) = (peeked.first().copied(), peeked.get(1).copied());
    match (first, second) {
        (None, _) => Ok(None),
        (Some(a), Some(b)) => Ok(([a, b] == GZIP_MAGIC).then_some(reader)),
        (Some(a), None) => {
            if a != GZIP_MAGIC[0] {
                return Ok(None);
            }
            // Magic split across buffer fills
            reader.consume(1);
            let mut rest = [0u8; 1];
            if reader.read(&mut rest)? == 0 || rest[0] != GZIP_MAGIC[1] {
                return Ok(None);
            }
            let replay: BodyStream = Box::new(Cursor::new(GZIP_MAGIC).chain(reader));
            Ok(Some(BufReader::new(replay)))
        }
    }
}

/// Read and check a complete member header, optional fields included.
/// Returns the bytes read so they can be replayed to the decoder.
fn read_header(raw: &mut BodyStream) -> io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(GZIP_HEADER_LEN);
    take(raw, &mut header, GZIP_HEADER_LEN)?;
    if header[..2] != GZIP_MAGIC {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "not in gzip format"));
    }
    if header[2] != GZIP_METHOD_DEFLATE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unsupported gzip compression method",
        ));
    }

    let flags = header[3];
    if flags & FEXTRA != 0 {
        take(raw, &mut header, 2)?;
        let len = u16::from_le_bytes([header[header.len() - 2], header[header.len() - 1]]);
        take(raw, &mut header, usize::from(len))?;
    }
    if flags & FNAME != 0 {
        take_until_nul(raw, &mut header)?;
    }
    if flags & FCOMMENT != 0 {
        take_until_nul(raw, &mut header)?;
    }
    if flags & FHCRC != 0 {
        take(raw, &mut header, 2)?;
    }
    Ok(header)
}

fn take(raw: &mut BodyStream, header: &mut Vec<u8>, n: usize) -> io::Result<()> {
    let start = header.len();
    header.resize(start + n, 0);
    raw.read_exact(&mut header[start..]).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => truncated(),
        _ => e,
    })
}

fn take_until_nul(raw: &mut BodyStream, header: &mut Vec<u8>) -> io::Result<()> {
    loop {
        take(raw, header, 1)?;
        if header.last() == Some(&0) {
            return Ok(());
        }
    }
}

fn truncated() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "truncated gzip header")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, GzEncoder};
    use flate2::{Compression, GzBuilder};
    use std::io::Write;

    fn stream(bytes: &[u8]) -> BodyStream {
        Box::new(Cursor::new(bytes.to_vec()))
    }

    fn drain(mut s: BodyStream) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        s.read_to_end(&mut out)?;
        Ok(out)
    }

    fn gzipped(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(ContentEncoding::parse("gzip"), ContentEncoding::Gzip);
        assert_eq!(ContentEncoding::parse("GZIP"), ContentEncoding::Other("GZIP".into()));
        assert_eq!(ContentEncoding::parse("compress"), ContentEncoding::Compress);
    }

    #[test]
    fn test_bodyless_responses_pass_through() {
        for (method, status) in [
            (Method::GET, 204),
            (Method::GET, 304),
            (Method::GET, 101),
            (Method::HEAD, 200),
        ] {
            let s = select(&method, status, Some("gzip"), stream(b""), true).unwrap();
            assert!(drain(s).unwrap().is_empty());
        }
    }

    #[test]
    fn test_gzip_round_trip() {
        let body = gzipped(b"hello gzip");
        let s = select(&Method::GET, 200, Some("gzip"), stream(&body), true).unwrap();
        assert_eq!(drain(s).unwrap(), b"hello gzip");
    }

    #[test]
    fn test_gzip_multiple_members() {
        let mut body = gzipped(b"first ");
        body.extend(gzipped(b"second"));
        let s = select(&Method::GET, 200, Some("gzip"), stream(&body), true).unwrap();
        assert_eq!(drain(s).unwrap(), b"first second");
    }

    #[test]
    fn test_gzip_trailing_garbage_ignored() {
        let mut body = gzipped(b"payload");
        body.extend_from_slice(b"\r\n\r\n");
        let s = select(&Method::GET, 200, Some("gzip"), stream(&body), true).unwrap();
        assert_eq!(drain(s).unwrap(), b"payload");

        // A lone first magic byte is not a member either
        let mut body = gzipped(b"first ");
        body.extend(gzipped(b"second"));
        body.push(0x1f);
        let s = select(&Method::GET, 200, Some("gzip"), stream(&body), true).unwrap();
        assert_eq!(drain(s).unwrap(), b"first second");
    }

    #[test]
    fn test_gzip_optional_header_fields() {
        let mut enc = GzBuilder::new()
            .filename("body.txt")
            .comment("served by tests")
            .extra(vec![1, 2, 3, 4])
            .write(Vec::new(), Compression::default());
        enc.write_all(b"with fields").unwrap();
        let body = enc.finish().unwrap();

        let s = select(&Method::GET, 200, Some("gzip"), stream(&body), true).unwrap();
        assert_eq!(drain(s).unwrap(), b"with fields");
    }

    #[test]
    fn test_gzip_truncated_name_fails_eagerly() {
        let mut body = vec![0x1f, 0x8b, 8, FNAME, 0, 0, 0, 0, 0, 0xff];
        body.extend_from_slice(b"body.t");
        let err = select(&Method::GET, 200, Some("gzip"), stream(&body), true)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Decompress { encoding: "gzip", .. }));

        let body = [0x1f, 0x8b, 8, FEXTRA, 0, 0, 0, 0, 0, 0xff, 9, 0, 1, 2];
        let err = select(&Method::GET, 200, Some("gzip"), stream(&body), true)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Decompress { .. }));
    }

    #[test]
    fn test_raw_deflate_round_trip() {
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"hello deflate").unwrap();
        let body = enc.finish().unwrap();

        let s = select(&Method::POST, 200, Some("deflate"), stream(&body), true).unwrap();
        assert_eq!(drain(s).unwrap(), b"hello deflate");
    }

    #[test]
    fn test_gzip_bad_header_fails_eagerly() {
        let err = select(&Method::GET, 200, Some("gzip"), stream(b"plain text body"), true)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Decompress { encoding: "gzip", .. }));
    }

    #[test]
    fn test_gzip_empty_body_fails_eagerly() {
        let err = select(&Method::GET, 200, Some("gzip"), stream(b""), true).err().unwrap();
        assert!(matches!(err, Error::Decompress { .. }));
    }

    #[test]
    fn test_identity_like_tokens_pass_through() {
        for token in [None, Some("identity"), Some("compress"), Some("br"), Some("Gzip")] {
            let s = select(&Method::GET, 200, token, stream(b"\x1f\x8braw"), true).unwrap();
            assert_eq!(drain(s).unwrap(), b"\x1f\x8braw");
        }
    }

    #[test]
    fn test_disabled_passes_through() {
        let body = gzipped(b"kept compressed");
        let s = select(&Method::GET, 200, Some("gzip"), stream(&body), false).unwrap();
        assert_eq!(drain(s).unwrap(), body);
    }
}
