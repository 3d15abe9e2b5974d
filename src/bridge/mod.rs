//! Host boundary of the parser.
//!
//! The host hands over a source buffer it owns; [`parse_source_file`] parses it exactly once into an
//! [`ExportedSourceFile`] that borrows the buffer for its whole life. The file is released by
//! [`destroy_source_file`], which takes it by value, so a file can be torn down only once. Hosts that need integer
//! handles can park files in a [`SourceFileRegistry`].
//!
//! ## Modules
//!
//! - `diagnostics` - Projection of parser diagnostics onto a host sink

pub mod diagnostics;

use std::sync::OnceLock;

use quill_core::lang::features::{ExperimentalFeatures, FeatureContext};
use quill_syntax::buffer::BufferError;
use quill_syntax::diagnostics::Diagnostic;
use quill_syntax::parser;
use quill_syntax::tree::SyntaxTree;
use quill_syntax::{LineColumn, LineTable, SourceBuffer, SourceLoc, Span};

pub use diagnostics::{DiagnosticPolicy, DiagnosticSink, ProjectedDiagnostic, emit_parser_diagnostics};

/// A parsed source file handed to the host.
///
/// Immutable after construction apart from the line table, which is built on first use and then kept.
#[derive(Debug)]
pub struct ExportedSourceFile<'buf> {
    buffer: SourceBuffer<'buf>,
    module_name: String,
    file_name: String,
    features: ExperimentalFeatures,
    tree: SyntaxTree,
    diagnostics: Vec<Diagnostic>,
    line_table: OnceLock<LineTable>,
}

/// Start and end of a span as line/column pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceRange {
    pub span: Span,
    pub start: LineColumn,
    pub end: LineColumn,
}

impl<'buf> ExportedSourceFile<'buf> {
    pub fn buffer(&self) -> SourceBuffer<'buf> {
        self.buffer
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Experimental features the file was parsed with.
    pub fn features(&self) -> ExperimentalFeatures {
        self.features
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Raw parser diagnostics, before projection.
    pub fn syntax_diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Byte offset of a host location, or `None` if it does not point into this file's buffer.
    pub fn position(&self, loc: SourceLoc) -> Option<u32> {
        self.buffer.position_of(loc)
    }

    pub fn line_table(&self) -> &LineTable {
        self.line_table.get_or_init(|| LineTable::new(self.buffer.bytes()))
    }

    pub fn source_range(&self, span: Span) -> SourceRange {
        let table = self.line_table();
        SourceRange {
            span,
            start: table.line_col(span.start),
            end: table.line_col(span.end),
        }
    }
}

/// Parse `buffer` with the experimental features `context` enables. Without a context no experimental grammar is
/// accepted.
///
/// ## Errors
/// [`BufferError::TooLarge`] if the buffer cannot be addressed with 32-bit offsets.
#[tracing::instrument(skip_all, fields(module = module_name, file = file_name, len = buffer.len()))]
pub fn parse_source_file<'buf>(
    buffer: &'buf [u8],
    module_name: &str,
    file_name: &str,
    context: Option<&dyn FeatureContext>,
) -> Result<ExportedSourceFile<'buf>, BufferError> {
    let buffer = SourceBuffer::new(buffer)?;
    let features = ExperimentalFeatures::from_context(context);
    let (tree, diagnostics) = parser::parse(buffer.bytes(), features).into_parts();
    tracing::debug!(nodes = tree.node_count(), diagnostics = diagnostics.len(), "parsed source file");
    Ok(ExportedSourceFile {
        buffer,
        module_name: module_name.to_string(),
        file_name: file_name.to_string(),
        features,
        tree,
        diagnostics,
        line_table: OnceLock::new(),
    })
}

/// Release a parsed file. The host's buffer is not touched.
pub fn destroy_source_file(file: ExportedSourceFile<'_>) {
    tracing::trace!(file = %file.file_name, "destroying source file");
    drop(file);
}

/// Result of [`round_trip_check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundTrip {
    Identical,
    /// The re-serialized text first differs from the buffer at this byte offset.
    Mismatch { first_difference: usize },
}

impl RoundTrip {
    /// `0` when identical, `1` on mismatch.
    pub fn code(self) -> i32 {
        match self {
            RoundTrip::Identical => 0,
            RoundTrip::Mismatch { .. } => 1,
        }
    }
}

/// Re-serialize the tree and compare it byte for byte with the buffer.
pub fn round_trip_check(file: &ExportedSourceFile<'_>) -> RoundTrip {
    let source = file.buffer.bytes();
    let text = file.tree.text(source);
    if text == source {
        return RoundTrip::Identical;
    }
    let first_difference = text
        .iter()
        .zip(source)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| text.len().min(source.len()));
    tracing::warn!(file = %file.file_name, first_difference, "source file does not round-trip");
    RoundTrip::Mismatch { first_difference }
}

// ============================================================================
// Registry
// ============================================================================

/// Stable handle to a file in a [`SourceFileRegistry`]. A handle is never valid again once its file is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Packed form for hosts that pass handles as plain integers.
    pub fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

#[derive(Debug)]
struct Slot<'buf> {
    generation: u32,
    file: Option<ExportedSourceFile<'buf>>,
}

/// Arena of parsed files addressed by [`Handle`].
#[derive(Debug, Default)]
pub struct SourceFileRegistry<'buf> {
    slots: Vec<Slot<'buf>>,
    free: Vec<u32>,
    len: usize,
}

impl<'buf> SourceFileRegistry<'buf> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, file: ExportedSourceFile<'buf>) -> Handle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.file = Some(file);
            return Handle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            file: Some(file),
        });
        Handle { index, generation: 0 }
    }

    pub fn get(&self, handle: Handle) -> Option<&ExportedSourceFile<'buf>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.file.as_ref())
    }

    /// Take the file out of the registry. Later lookups with `handle` fail.
    pub fn remove(&mut self, handle: Handle) -> Option<ExportedSourceFile<'buf>> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let file = slot.file.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(file)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_table_is_built_once() {
        let source = b"let a = 1\nlet b = 2\n";
        let file = parse_source_file(source, "M", "m.qd", None).unwrap();
        let first: *const LineTable = file.line_table();
        let second: *const LineTable = file.line_table();
        assert_eq!(first, second);
        let range = file.source_range(Span::new(14, 15));
        assert_eq!(range.start, LineColumn { line: 2, column: 5 });
    }

    #[test]
    fn test_position_requires_this_buffer() {
        let source = b"let a = 1\n";
        let other = b"let b = 2\n";
        let file = parse_source_file(source, "M", "m.qd", None).unwrap();
        let loc = file.buffer().loc_at(4);
        assert_eq!(file.position(loc), Some(4));
        assert_eq!(file.position(SourceLoc::INVALID), None);
        let foreign = SourceBuffer::new(other).unwrap().loc_at(4);
        assert_eq!(file.position(foreign), None);
    }

    #[test]
    fn test_registry_handles_go_stale() {
        let source = b"let a = 1\n";
        let mut registry = SourceFileRegistry::new();
        let h1 = registry.insert(parse_source_file(source, "M", "a.qd", None).unwrap());
        assert_eq!(registry.get(h1).map(|f| f.file_name()), Some("a.qd"));

        let file = registry.remove(h1).unwrap();
        destroy_source_file(file);
        assert!(registry.remove(h1).is_none());
        assert!(registry.get(h1).is_none());

        let h2 = registry.insert(parse_source_file(source, "M", "b.qd", None).unwrap());
        assert_ne!(h1, h2);
        assert!(registry.get(h1).is_none());
        assert_eq!(registry.get(Handle::from_raw(h2.to_raw())).map(|f| f.file_name()), Some("b.qd"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_round_trip_codes() {
        assert_eq!(RoundTrip::Identical.code(), 0);
        assert_eq!(RoundTrip::Mismatch { first_difference: 3 }.code(), 1);
    }
}
