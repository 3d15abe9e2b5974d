//! Module dependency model, scanning and resolution.
//!
//! ## Modules
//!
//! - `command_line` - Scan command lines built from the importer template
//! - `invocation` - Canonical round trip of foreign compiler arguments
//! - `service` - The scanning service seam and a filesystem-backed implementation
//! - `bridge` - Translation of scanned foreign modules into dependency records
//! - `scanner` - Module and bridging-header scans against a cache
//! - `cache` - The per-session dependency cache
//! - `graph` - Ordering, closure and cycle queries over cached records
//! - `output` - JSON dependency graph
//!
//! ## Design
//!
//! Recoverable scan failures (service errors, a malformed working directory) are reported to a
//! [`ScanDiagnosticSink`] and degrade to an empty result. [`DependencyScanError`] is reserved for internal
//! consistency failures that callers must not ignore.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod bridge;
pub mod cache;
pub mod command_line;
pub mod graph;
pub mod invocation;
pub mod output;
pub mod scanner;
pub mod service;

use std::collections::BTreeSet;
use std::fmt;

use quill_syntax::diagnostics::{DiagnosticId, Severity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bridge::bridge_foreign_module_dependencies;
pub use cache::ModuleDependenciesCache;
pub use scanner::{BridgingHeaderScan, ForeignModuleScanner};
pub use service::{DependencyScanningTool, FilesystemScanningService};

// ============================================================================
// Identifiers
// ============================================================================

/// Kind of a module dependency record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleDependencyKind {
    /// A C-family module found by the foreign scanner.
    Foreign,
    /// A prebuilt module described by a textual interface.
    TextualInterface,
    /// The module being compiled from source.
    Source,
}

impl ModuleDependencyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleDependencyKind::Foreign => "foreign",
            ModuleDependencyKind::TextualInterface => "textual",
            ModuleDependencyKind::Source => "source",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "foreign" => Some(ModuleDependencyKind::Foreign),
            "textual" => Some(ModuleDependencyKind::TextualInterface),
            "source" => Some(ModuleDependencyKind::Source),
            _ => None,
        }
    }
}

impl fmt::Display for ModuleDependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a record in the dependency cache.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleDependencyId {
    pub name: String,
    pub kind: ModuleDependencyKind,
}

impl ModuleDependencyId {
    pub fn new(name: impl Into<String>, kind: ModuleDependencyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn foreign(name: impl Into<String>) -> Self {
        Self::new(name, ModuleDependencyKind::Foreign)
    }

    pub fn textual(name: impl Into<String>) -> Self {
        Self::new(name, ModuleDependencyKind::TextualInterface)
    }

    pub fn source(name: impl Into<String>) -> Self {
        Self::new(name, ModuleDependencyKind::Source)
    }
}

impl fmt::Display for ModuleDependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// A foreign module as identified by the scanning service: the same name under different flags gets a different
/// context hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignModuleId {
    pub module_name: String,
    pub context_hash: String,
}

impl ForeignModuleId {
    pub fn new(module_name: impl Into<String>, context_hash: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            context_hash: context_hash.into(),
        }
    }
}

/// Artifact kinds the scanning service asks output paths for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleOutputKind {
    ModuleFile,
    DependencyFile,
    DependencyTargets,
    DiagnosticSerializationFile,
}

impl ModuleOutputKind {
    /// File extension, or `None` for the bare target name.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            ModuleOutputKind::ModuleFile => Some("pcm"),
            ModuleOutputKind::DependencyFile => Some("d"),
            ModuleOutputKind::DependencyTargets => None,
            ModuleOutputKind::DiagnosticSerializationFile => Some("dia"),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// Details of a foreign module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignModuleDetails {
    /// Where the built module will be written.
    pub pcm_output_path: String,
    pub module_map_file: String,
    pub context_hash: String,
    /// Host frontend invocation that builds the module.
    pub command_line: Vec<String>,
    pub file_dependencies: Vec<String>,
    pub captured_pcm_args: Vec<String>,
    pub cas_fs_root_id: String,
    pub include_tree_id: String,
}

/// A bridging header and what scanning it found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgingHeader {
    pub path: String,
    pub source_files: Vec<String>,
    pub module_dependencies: Vec<String>,
    pub include_tree_id: String,
    /// Host frontend invocation that precompiles the header.
    pub command_line: Vec<String>,
}

/// Details of a prebuilt module with a textual interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextualModuleDetails {
    pub interface_file: String,
    pub context_hash: String,
    pub command_line: Vec<String>,
    pub bridging_header: Option<BridgingHeader>,
}

/// Details of the module compiled from source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceModuleDetails {
    pub source_files: Vec<String>,
    pub bridging_header: Option<BridgingHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleDetails {
    Foreign(ForeignModuleDetails),
    TextualInterface(TextualModuleDetails),
    Source(SourceModuleDetails),
}

/// Everything known about one module's dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDependencyInfo {
    pub details: ModuleDetails,
    /// Imported module names, in first-seen order.
    pub module_imports: Vec<String>,
    pub module_dependencies: BTreeSet<ModuleDependencyId>,
    /// Once set, `module_dependencies` is final for this scan.
    pub resolved: bool,
}

impl ModuleDependencyInfo {
    pub fn new(details: ModuleDetails) -> Self {
        Self {
            details,
            module_imports: Vec::new(),
            module_dependencies: BTreeSet::new(),
            resolved: false,
        }
    }

    pub fn for_foreign_module(details: ForeignModuleDetails) -> Self {
        Self::new(ModuleDetails::Foreign(details))
    }

    pub fn for_textual_module(details: TextualModuleDetails) -> Self {
        Self::new(ModuleDetails::TextualInterface(details))
    }

    pub fn for_source_module(details: SourceModuleDetails) -> Self {
        Self::new(ModuleDetails::Source(details))
    }

    pub fn kind(&self) -> ModuleDependencyKind {
        match self.details {
            ModuleDetails::Foreign(_) => ModuleDependencyKind::Foreign,
            ModuleDetails::TextualInterface(_) => ModuleDependencyKind::TextualInterface,
            ModuleDetails::Source(_) => ModuleDependencyKind::Source,
        }
    }

    pub fn as_foreign(&self) -> Option<&ForeignModuleDetails> {
        match &self.details {
            ModuleDetails::Foreign(details) => Some(details),
            _ => None,
        }
    }

    /// Record an import of `name` unless `already_added` has it.
    pub fn add_module_import(&mut self, name: &str, already_added: &mut BTreeSet<String>) {
        if already_added.insert(name.to_string()) {
            self.module_imports.push(name.to_string());
        }
    }

    pub fn add_module_dependency(&mut self, id: ModuleDependencyId) {
        self.module_dependencies.insert(id);
    }

    pub fn set_resolved(&mut self, resolved: bool) {
        self.resolved = resolved;
    }

    pub fn bridging_header(&self) -> Option<&BridgingHeader> {
        match &self.details {
            ModuleDetails::Foreign(_) => None,
            ModuleDetails::TextualInterface(details) => details.bridging_header.as_ref(),
            ModuleDetails::Source(details) => details.bridging_header.as_ref(),
        }
    }

    fn bridging_header_mut(&mut self) -> Option<&mut BridgingHeader> {
        match &mut self.details {
            ModuleDetails::Foreign(_) => None,
            ModuleDetails::TextualInterface(details) => details.bridging_header.as_mut(),
            ModuleDetails::Source(details) => details.bridging_header.as_mut(),
        }
    }

    /// Whether a bridging header scan has already stored its results here.
    pub fn has_recorded_bridging_dependencies(&self) -> bool {
        self.bridging_header()
            .is_some_and(|h| !h.source_files.is_empty() || !h.module_dependencies.is_empty())
    }

    pub fn add_bridging_source_file(&mut self, path: &str) {
        if let Some(header) = self.bridging_header_mut() {
            header.source_files.push(path.to_string());
        }
    }

    pub fn add_bridging_module_dependency(&mut self, name: &str, already_added: &mut BTreeSet<String>) {
        if let Some(header) = self.bridging_header_mut() {
            if already_added.insert(name.to_string()) {
                header.module_dependencies.push(name.to_string());
            }
        }
    }

    pub fn add_bridging_header_include_tree(&mut self, id: &str) {
        if let Some(header) = self.bridging_header_mut() {
            header.include_tree_id = id.to_string();
        }
    }

    pub fn update_bridging_header_command_line(&mut self, args: Vec<String>) {
        if let Some(header) = self.bridging_header_mut() {
            header.command_line = args;
        }
    }

    /// Direct dependencies including the foreign modules the bridging header pulls in.
    pub fn all_dependencies(&self) -> BTreeSet<ModuleDependencyId> {
        let mut all = self.module_dependencies.clone();
        if let Some(header) = self.bridging_header() {
            all.extend(header.module_dependencies.iter().map(ModuleDependencyId::foreign));
        }
        all
    }
}

/// The scanner's unit of output.
pub type ModuleDependencyVector = Vec<(ModuleDependencyId, ModuleDependencyInfo)>;

// ============================================================================
// Errors and diagnostics
// ============================================================================

/// Internal consistency failure during a scan.
#[derive(Debug, Error)]
pub enum DependencyScanError {
    #[error("foreign arguments for '{module}' do not round-trip: {source}")]
    InvocationRoundTrip {
        module: String,
        #[source]
        source: invocation::InvocationError,
    },
    #[error(transparent)]
    Template(#[from] command_line::TemplateError),
    #[error("no dependency record for '{0}'")]
    MissingRecord(ModuleDependencyId),
    #[error("'{0}' has no bridging header")]
    MissingBridgingHeader(ModuleDependencyId),
}

/// A diagnostic produced while scanning. Scan diagnostics have no source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanDiagnostic {
    pub id: DiagnosticId,
    pub severity: Severity,
    pub message: String,
}

impl ScanDiagnostic {
    pub fn new(id: DiagnosticId, message: impl Into<String>) -> Self {
        Self {
            id,
            severity: id.default_severity(),
            message: message.into(),
        }
    }

    pub fn scan_error(message: impl Into<String>) -> Self {
        Self::new(DiagnosticId::ForeignDependencyScanError, message)
    }
}

/// Host-owned receiver of scan diagnostics.
pub trait ScanDiagnosticSink {
    fn report(&mut self, diagnostic: ScanDiagnostic);
}

impl ScanDiagnosticSink for Vec<ScanDiagnostic> {
    fn report(&mut self, diagnostic: ScanDiagnostic) {
        self.push(diagnostic);
    }
}
