//! Provide canonical language vocabulary for the Quill toolchain.
//!
//! This crate is intentionally small and dependency-light. It contains the registries that both the syntax crate
//! and the compiler driver consult: reserved keywords, punctuation/operators, and the fixed list of experimental
//! language features a host may enable.
//!
//! ## Notes
//!
//! - This is a "vocabulary" crate: **no IO**, no global state, and no syntax-tree types.
//! - Feature gating is *declared* here ([`lang::features`]) and *enforced* by the parser in `quill_syntax`.

pub mod lang;
