//! Shared ownership of an open response body
//!
//! One [`BodySlot`] exists per HTTP exchange. Every view of a response points
//! at it; the first consumer takes the stream out and every later consumer
//! observes the slot as closed.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Read};

use log::debug;

use crate::decompress::BodyStream;
use crate::error::{Error, Result};

/// Handle to the transport connection behind a response
pub trait Connection {
    /// Tear the connection down (or hand it back to a pool)
    fn disconnect(&mut self);
}

impl<F: FnMut()> Connection for F {
    fn disconnect(&mut self) {
        self()
    }
}

struct Open {
    body: BodyStream,
    conn: Box<dyn Connection>,
}

/// Open/closed cell holding a body stream and its connection.
///
/// Not `Sync`: a single response is never shared across threads.
pub(crate) struct BodySlot {
    open: RefCell<Option<Open>>,
}

impl BodySlot {
    pub(crate) fn new(body: BodyStream, conn: Box<dyn Connection>) -> Self {
        Self {
            open: RefCell::new(Some(Open { body, conn })),
        }
    }

    /// Take the body out, leaving the slot closed
    pub(crate) fn take(&self) -> Result<Lease> {
        match self.open.borrow_mut().take() {
            Some(Open { body, conn }) => Ok(Lease { body, conn }),
            None => Err(Error::AlreadyClosed),
        }
    }

    /// Release the body if nobody took it yet. Never fails.
    pub(crate) fn close(&self) {
        // Taking ends the borrow before the lease is dropped
        let open = self.open.borrow_mut().take();
        if let Some(Open { body, conn }) = open {
            drop(Lease { body, conn });
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.open.borrow().is_none()
    }
}

impl Drop for BodySlot {
    fn drop(&mut self) {
        if let Some(Open { body, conn }) = self.open.get_mut().take() {
            debug!("Response dropped without consuming its body");
            drop(Lease { body, conn });
        }
    }
}

/// Exclusive hold on a taken body.
///
/// Dropping the lease closes the stream and then disconnects, exactly once,
/// on every exit path including unwinding.
pub(crate) struct Lease {
    body: BodyStream,
    conn: Box<dyn Connection>,
}

impl Lease {
    /// Replace the stream with a transformed one. If `f` fails the lease is
    /// released before the error is returned.
    pub(crate) fn map_body<F>(mut self, f: F) -> Result<Self>
    where
        F: FnOnce(BodyStream) -> Result<BodyStream>,
    {
        let raw = std::mem::replace(&mut self.body, Box::new(io::empty()));
        self.body = f(raw)?;
        Ok(self)
    }

    pub(crate) fn body(&mut self) -> &mut dyn Read {
        &mut *self.body
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.body = Box::new(io::empty());
        self.conn.disconnect();
        debug!("Released response body and connection");
    }
}

/// Owning reader over a response body.
///
/// Reads the (possibly decompressed) body; the stream and connection are
/// released when the reader is dropped.
pub struct BodyReader {
    lease: Lease,
}

impl BodyReader {
    pub(crate) fn new(lease: Lease) -> Self {
        Self { lease }
    }

    /// Release the body now
    pub fn close(self) {
        drop(self)
    }
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.lease.body().read(buf)
    }
}

impl fmt::Debug for BodyReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyReader").finish_non_exhaustive()
    }
}
