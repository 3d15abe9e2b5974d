//! Define the reserved keyword vocabulary for the Quill language.
//!
//! This module is the single source of truth for reserved words: a stable identifier ([`KeywordId`]) plus a const
//! metadata table ([`KEYWORDS`]) that records canonical spellings, categories, provenance, and the experimental
//! feature (if any) that gates the construct the keyword introduces.
//!
//! ## Notes
//! - Lookup via [`from_str`] is **case-sensitive**.
//! - Gated keywords are always *lexed* as keywords; the parser decides whether the construct is accepted.
//!
//! ## Examples
//! ```rust
//! use quill_core::lang::keywords::{self, KeywordId};
//! use quill_core::lang::features::FeatureId;
//!
//! assert_eq!(keywords::from_str("import"), Some(KeywordId::Import));
//! assert_eq!(keywords::gating_feature(KeywordId::Macro), Some(FeatureId::Macros));
//! ```

use super::features::FeatureId;
use super::registry::{Since, Stability};

/// Stable identifier for every reserved keyword.
///
/// ## Notes
/// - The discriminant order matches [`KEYWORDS`]; lookups index the table directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordId {
    // Declarations
    Import,
    Func,
    Let,
    Var,
    Macro,

    // Control flow / statements
    Return,
    If,
    Else,
    Do,
    Then,
    Yield,

    // Literals
    True,
    False,
}

/// High-level grouping for documentation and tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    Declaration,
    ControlFlow,
    Literal,
}

/// Metadata for a keyword.
#[derive(Debug, Clone, Copy)]
pub struct KeywordInfo {
    pub id: KeywordId,
    pub canonical: &'static str,
    pub category: KeywordCategory,
    pub since: Since,
    pub stability: Stability,
    /// Experimental feature that must be enabled for the construct introduced by this keyword.
    pub gated_by: Option<FeatureId>,
}

/// Registry of all keywords.
pub const KEYWORDS: &[KeywordInfo] = &[
    // Declarations
    info(KeywordId::Import, "import", KeywordCategory::Declaration, Since(0, 1)),
    info(KeywordId::Func, "func", KeywordCategory::Declaration, Since(0, 1)),
    info(KeywordId::Let, "let", KeywordCategory::Declaration, Since(0, 1)),
    info(KeywordId::Var, "var", KeywordCategory::Declaration, Since(0, 1)),
    gated(KeywordId::Macro, "macro", KeywordCategory::Declaration, FeatureId::Macros),
    // Control flow / statements
    info(KeywordId::Return, "return", KeywordCategory::ControlFlow, Since(0, 1)),
    info(KeywordId::If, "if", KeywordCategory::ControlFlow, Since(0, 1)),
    info(KeywordId::Else, "else", KeywordCategory::ControlFlow, Since(0, 1)),
    gated(KeywordId::Do, "do", KeywordCategory::ControlFlow, FeatureId::DoExpressions),
    gated(KeywordId::Then, "then", KeywordCategory::ControlFlow, FeatureId::ThenStatements),
    gated(KeywordId::Yield, "yield", KeywordCategory::ControlFlow, FeatureId::CoroutineAccessors),
    // Literals
    info(KeywordId::True, "true", KeywordCategory::Literal, Since(0, 1)),
    info(KeywordId::False, "false", KeywordCategory::Literal, Since(0, 1)),
];

/// Canonical spelling.
pub fn as_str(id: KeywordId) -> &'static str {
    info_for(id).canonical
}

/// Category.
pub fn category(id: KeywordId) -> KeywordCategory {
    info_for(id).category
}

/// Experimental feature gating the construct this keyword introduces, if any.
pub fn gating_feature(id: KeywordId) -> Option<FeatureId> {
    info_for(id).gated_by
}

/// Full metadata.
pub fn info_for(id: KeywordId) -> &'static KeywordInfo {
    &KEYWORDS[id as usize]
}

/// Lookup by spelling.
///
/// ## Returns
/// - `Some(KeywordId)` if the spelling is reserved.
/// - `None` otherwise.
pub fn from_str(s: &str) -> Option<KeywordId> {
    KEYWORDS.iter().find(|k| k.canonical == s).map(|k| k.id)
}

// --- helpers -----------------------------------------------------------------

const fn info(id: KeywordId, canonical: &'static str, category: KeywordCategory, since: Since) -> KeywordInfo {
    KeywordInfo {
        id,
        canonical,
        category,
        since,
        stability: Stability::Stable,
        gated_by: None,
    }
}

const fn gated(id: KeywordId, canonical: &'static str, category: KeywordCategory, feature: FeatureId) -> KeywordInfo {
    KeywordInfo {
        id,
        canonical,
        category,
        since: Since(0, 2),
        stability: Stability::Experimental,
        gated_by: Some(feature),
    }
}
