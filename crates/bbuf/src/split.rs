//! Producer and consumer halves of a [`Buffer`].
//!
//! Both handles share the buffer through `&Buffer`, and the buffer is not
//! `Sync`, so neither handle can leave the thread that split it. A view
//! returned by [`Reader::read`] borrows the reader, so it stays valid across
//! any number of [`Writer`] calls and is retired by the borrow checker the
//! moment the reader releases.

use crate::{Buffer, Result};

/// Producer half returned by [`Buffer::split`].
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a Buffer,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(buf: &'a Buffer) -> Self {
        Self { buf }
    }

    /// See [`Buffer::reserve`].
    pub fn reserve(&mut self, n: usize) -> Result<&mut [u8]> {
        let span = self.buf.reserve_span(n)?;
        // SAFETY: the pending window is disjoint from both regions, so it
        // cannot alias any reader view. This is the only writer, and the
        // slice borrows it mutably until the next call.
        Ok(unsafe { self.buf.view_mut(span) })
    }

    /// See [`Buffer::commit`].
    pub fn commit(&mut self, n: usize) -> Result<()> {
        self.buf.commit_pending(n)
    }

    /// See [`Buffer::push`].
    pub fn push(&mut self, data: &[u8]) -> Result<()> {
        self.buf.push_bytes(data)
    }

    /// Free bytes, not necessarily contiguous.
    #[inline]
    pub fn available(&self) -> usize {
        self.buf.available()
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        self.buf.has_pending()
    }
}

/// Consumer half returned by [`Buffer::split`].
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a Buffer,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a Buffer) -> Self {
        Self { buf }
    }

    /// See [`Buffer::read`].
    pub fn read(&self) -> Option<&[u8]> {
        let span = self.buf.readable_span()?;
        // SAFETY: region A only shrinks through `release`, which needs
        // `&mut self` and so outlives every view handed out here; the writer
        // only ever writes outside A.
        Some(unsafe { self.buf.view(span) })
    }

    /// See [`Buffer::release`].
    pub fn release(&mut self, k: usize) -> Result<()> {
        self.buf.release_front(k)
    }

    /// See [`Buffer::recv`].
    pub fn recv(&mut self, out: &mut [u8]) -> usize {
        self.buf.recv_into(out)
    }

    /// See [`Buffer::drain`].
    pub fn drain<F>(&mut self, handler: F) -> usize
    where
        F: FnMut(&[u8]),
    {
        self.buf.drain_with(handler)
    }

    /// Committed bytes not yet released.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
