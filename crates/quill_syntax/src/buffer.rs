//! Buffer ownership layer.
//!
//! A [`SourceBuffer`] is a read-only, non-owning view of host-managed source bytes. The host keeps the bytes alive
//! for at least as long as anything borrowing the view; the `'buf` lifetime makes that a compile-time guarantee.
//!
//! Hosts refer to positions with opaque [`SourceLoc`] values: raw addresses into their own copy of the buffer. A
//! location maps back to a byte offset only if it points at one of this buffer's bytes. Anything else,
//! including [`SourceLoc::INVALID`], maps to "no position", which is a valid outcome rather than an error.

use std::borrow::Cow;

use thiserror::Error;

/// Half-open byte range `[start, end)` into a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub const fn len(self) -> u32 {
        self.end - self.start
    }

    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn contains(self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("source buffer of {0} bytes exceeds the 4 GiB addressing limit")]
    TooLarge(usize),
}

/// Opaque source location handed across the host boundary.
///
/// The payload is a raw address. Zero is reserved for synthesized/invalid locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLoc(usize);

impl SourceLoc {
    pub const INVALID: SourceLoc = SourceLoc(0);

    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Read-only view over host-owned source bytes.
#[derive(Debug, Clone, Copy)]
pub struct SourceBuffer<'buf> {
    bytes: &'buf [u8],
}

impl<'buf> SourceBuffer<'buf> {
    /// Wrap host bytes.
    ///
    /// ## Errors
    /// Returns [`BufferError::TooLarge`] if offsets would not fit in `u32`.
    pub fn new(bytes: &'buf [u8]) -> Result<Self, BufferError> {
        if u32::try_from(bytes.len()).is_err() {
            return Err(BufferError::TooLarge(bytes.len()));
        }
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &'buf [u8] {
        self.bytes
    }

    pub fn len(&self) -> u32 {
        // Checked in `new`.
        self.bytes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes covered by `span`, clamped to the buffer.
    pub fn slice(&self, span: Span) -> &'buf [u8] {
        let end = (span.end as usize).min(self.bytes.len());
        let start = (span.start as usize).min(end);
        &self.bytes[start..end]
    }

    /// Text covered by `span`; invalid UTF-8 is replaced, never rejected.
    pub fn text(&self, span: Span) -> Cow<'buf, str> {
        String::from_utf8_lossy(self.slice(span))
    }

    pub fn base_address(&self) -> usize {
        self.bytes.as_ptr() as usize
    }

    /// Location of the byte at `offset`; offsets at or past the end yield [`SourceLoc::INVALID`].
    ///
    /// A one-past-the-end address may be the first byte of a neighbouring buffer, so it is never handed out.
    pub fn loc_at(&self, offset: u32) -> SourceLoc {
        if offset >= self.len() {
            return SourceLoc::INVALID;
        }
        SourceLoc(self.base_address() + offset as usize)
    }

    /// Byte offset of `loc`, if it points at one of this buffer's bytes.
    pub fn position_of(&self, loc: SourceLoc) -> Option<u32> {
        if !loc.is_valid() {
            return None;
        }
        let base = self.base_address();
        let offset = loc.raw().checked_sub(base)?;
        if offset >= self.bytes.len() {
            return None;
        }
        u32::try_from(offset).ok()
    }
}

/// 1-based line and byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineColumn {
    pub line: u32,
    pub column: u32,
}

/// Position converter: byte offsets to line/column pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTable {
    line_starts: Vec<u32>,
    len: u32,
}

impl LineTable {
    #[tracing::instrument(level = "trace", skip_all, fields(len = bytes.len()))]
    pub fn new(bytes: &[u8]) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in bytes.iter().enumerate() {
            if *b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self {
            line_starts,
            len: bytes.len() as u32,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Line/column of `offset`, clamped to the end of the buffer.
    pub fn line_col(&self, offset: u32) -> LineColumn {
        let offset = offset.min(self.len);
        let line = self.line_starts.partition_point(|start| *start <= offset);
        let line_start = self.line_starts[line - 1];
        LineColumn {
            line: line as u32,
            column: offset - line_start + 1,
        }
    }

    /// Byte offset of the start of 1-based `line`.
    pub fn line_start(&self, line: u32) -> Option<u32> {
        let idx = (line as usize).checked_sub(1)?;
        self.line_starts.get(idx).copied()
    }
}
