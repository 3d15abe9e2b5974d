//! Shareable metadata for `quill_core::lang` registries.
//!
//! The `quill_core::lang` module is a set of **registry-first** vocabularies. This submodule provides the small,
//! dependency-free metadata types reused across all of them.
//!
//! ## Notes
//! - These types are intentionally lightweight and `Copy`-friendly so registries can live in `const` tables.
//! - Metadata is meant for tooling/diagnostics; enforcement of syntax rules still lives in the lexer/parser.

/// Identify the toolchain version a vocabulary item is available since, as `(major, minor)`.
///
/// ## Examples
/// ```rust
/// use quill_core::lang::registry::Since;
///
/// let since = Since(0, 1);
/// assert_eq!(since.to_string(), "0.1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Since(pub u16, pub u16);

impl std::fmt::Display for Since {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.0, self.1)
    }
}

/// Describe the lifecycle status of a language vocabulary item.
///
/// ## Notes
/// - `Experimental` items are only accepted by the parser when the matching feature flag is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stability {
    Stable,
    Experimental,
    Deprecated,
}

/// Represent a small example snippet for documentation and CLI help.
#[derive(Debug, Clone, Copy)]
pub struct Example {
    pub code: &'static str,
    pub note: Option<&'static str>,
}
