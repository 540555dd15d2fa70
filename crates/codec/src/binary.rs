//! Byte cursors for LOD blobs.
//!
//! A blob is a flat sequence of `(color, run)` byte pairs, so only single-byte
//! access is needed; the reader tracks its offset for error reporting.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A reader for walking an RLE byte stream.
#[derive(Debug)]
pub struct BinaryReader {
    buf: Bytes,
    offset: usize,
}

impl BinaryReader {
    /// Create a new reader from raw bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            buf: data.into(),
            offset: 0,
        }
    }

    /// Returns remaining bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Byte offset of the next read, counted from the start of the stream.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Safe version that returns None if not enough data
    #[inline]
    pub fn try_get_u8(&mut self) -> Option<u8> {
        if self.buf.remaining() >= 1 {
            self.offset += 1;
            Some(self.buf.get_u8())
        } else {
            None
        }
    }

    /// Read one `(color, run)` pair.
    #[inline]
    pub fn try_get_pair(&mut self) -> Option<(u8, u8)> {
        if self.buf.remaining() >= 2 {
            self.offset += 2;
            let color = self.buf.get_u8();
            let run = self.buf.get_u8();
            Some((color, run))
        } else {
            None
        }
    }
}

/// A writer for building RLE byte streams.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
}

impl BinaryWriter {
    /// Create a new writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the current length.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    /// Write one `(color, run)` pair.
    #[inline]
    pub fn put_pair(&mut self, color: u8, run: u8) {
        self.buf.put_u8(color);
        self.buf.put_u8(run);
    }

    /// Consume the writer and return the built buffer.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    /// Get current buffer as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}
