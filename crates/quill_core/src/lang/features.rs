//! Experimental language features.
//!
//! A host compiler decides, per parse, which experimental grammar productions are accepted. It does so by answering
//! a fixed set of named yes/no queries, one per entry of [`FEATURES`]. Each query is independent: enabling one
//! feature never implies another.
//!
//! ## Notes
//! - The set of features is closed. Adding a feature means adding a [`FeatureId`] variant, a registry entry, and a
//!   [`ExperimentalFeatures`] flag.
//! - Absence of a host context yields [`ExperimentalFeatures::empty`]: no experimental grammar.
//!
//! ## Examples
//! ```rust
//! use quill_core::lang::features::{ExperimentalFeatures, FeatureContext, FeatureId};
//!
//! struct OnlyMacros;
//! impl FeatureContext for OnlyMacros {
//!     fn has_feature(&self, name: &str) -> bool {
//!         name == "Macros"
//!     }
//! }
//!
//! let features = ExperimentalFeatures::from_context(Some(&OnlyMacros));
//! assert!(features.is_enabled(FeatureId::Macros));
//! assert!(!features.is_enabled(FeatureId::DoExpressions));
//! assert!(ExperimentalFeatures::from_context(None).is_empty());
//! ```

use bitflags::bitflags;

use super::registry::{Example, Since};

/// Stable identifier for each experimental feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureId {
    Macros,
    DoExpressions,
    ThenStatements,
    PipelineOperator,
    CoroutineAccessors,
}

/// Metadata for an experimental feature.
#[derive(Debug, Clone, Copy)]
pub struct FeatureInfo {
    pub id: FeatureId,
    /// Name the host context is queried with.
    pub name: &'static str,
    pub description: &'static str,
    pub since: Since,
    pub example: Example,
}

/// Registry of all experimental features, in query order.
pub const FEATURES: &[FeatureInfo] = &[
    FeatureInfo {
        id: FeatureId::Macros,
        name: "Macros",
        description: "`macro` declarations",
        since: Since(0, 2),
        example: Example {
            code: "macro stringify(value: Int) -> String = external",
            note: None,
        },
    },
    FeatureInfo {
        id: FeatureId::DoExpressions,
        name: "DoExpressions",
        description: "`do { ... }` block expressions",
        since: Since(0, 2),
        example: Example {
            code: "let x = do { compute() }",
            note: None,
        },
    },
    FeatureInfo {
        id: FeatureId::ThenStatements,
        name: "ThenStatements",
        description: "`then` statements yielding a value from a branch",
        since: Since(0, 2),
        example: Example {
            code: "let x = if ok { then 1 } else { then 2 }",
            note: None,
        },
    },
    FeatureInfo {
        id: FeatureId::PipelineOperator,
        name: "PipelineOperator",
        description: "the `|>` pipeline operator",
        since: Since(0, 2),
        example: Example {
            code: "value |> normalize |> print",
            note: Some("Binds looser than every other binary operator."),
        },
    },
    FeatureInfo {
        id: FeatureId::CoroutineAccessors,
        name: "CoroutineAccessors",
        description: "`yield` statements in coroutine accessors",
        since: Since(0, 2),
        example: Example {
            code: "func read() { yield storage }",
            note: None,
        },
    },
];

bitflags! {
    /// A set of enabled experimental features.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExperimentalFeatures: u8 {
        const MACROS = 1 << 0;
        const DO_EXPRESSIONS = 1 << 1;
        const THEN_STATEMENTS = 1 << 2;
        const PIPELINE_OPERATOR = 1 << 3;
        const COROUTINE_ACCESSORS = 1 << 4;
    }
}

/// Host-owned context answering named feature queries.
pub trait FeatureContext {
    fn has_feature(&self, name: &str) -> bool;
}

impl<F> FeatureContext for F
where
    F: Fn(&str) -> bool,
{
    fn has_feature(&self, name: &str) -> bool {
        self(name)
    }
}

impl ExperimentalFeatures {
    /// Build a feature set by querying `context` once per registry entry.
    pub fn from_context(context: Option<&dyn FeatureContext>) -> Self {
        let Some(context) = context else {
            return Self::empty();
        };
        FEATURES
            .iter()
            .filter(|f| context.has_feature(f.name))
            .fold(Self::empty(), |set, f| set | Self::flag(f.id))
    }

    /// Flag corresponding to a single feature.
    pub const fn flag(id: FeatureId) -> Self {
        match id {
            FeatureId::Macros => Self::MACROS,
            FeatureId::DoExpressions => Self::DO_EXPRESSIONS,
            FeatureId::ThenStatements => Self::THEN_STATEMENTS,
            FeatureId::PipelineOperator => Self::PIPELINE_OPERATOR,
            FeatureId::CoroutineAccessors => Self::COROUTINE_ACCESSORS,
        }
    }

    pub fn is_enabled(self, id: FeatureId) -> bool {
        self.contains(Self::flag(id))
    }

    /// Enable features by name, ignoring unknown names. Returns the names that were not recognized.
    pub fn enable_named<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        let mut unknown = Vec::new();
        for name in names {
            match from_name(name) {
                Some(id) => self.insert(Self::flag(id)),
                None => unknown.push(name),
            }
        }
        unknown
    }
}

/// Registry entry for a feature.
pub fn info_for(id: FeatureId) -> &'static FeatureInfo {
    &FEATURES[id as usize]
}

/// Name the host is queried with.
pub fn name(id: FeatureId) -> &'static str {
    info_for(id).name
}

/// Resolve a feature name.
pub fn from_name(name: &str) -> Option<FeatureId> {
    FEATURES.iter().find(|f| f.name == name).map(|f| f.id)
}
