#![forbid(unsafe_code)]
//! Quill compiler toolchain
//!
//! This crate hosts the two services the compiler driver builds on: the parse bridge, which exposes the lossless
//! syntax frontend to a host compiler, and the foreign module dependency scanner, which turns the C-family module
//! graph reachable from an import (or a bridging header) into host dependency records.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `dependencies`
//!   modules enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Recoverable scan failures**: Never panics and never `Err`. They are reported to a diagnostic sink and the scan
//!   yields an empty result.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod dependencies;

pub use bridge::{ExportedSourceFile, parse_source_file, round_trip_check};
pub use config::ScanConfig;
pub use dependencies::{ForeignModuleScanner, ModuleDependenciesCache};
