//! CLI module for the Quill toolchain
//!
//! This module provides the command-line interface for the parse bridge and the dependency scanner.
//!
//! ## Commands
//!
//! - `parse <file>` - Parse a source file, report diagnostics and check the round trip
//! - `scan-module <name>` - Scan a foreign module and print its dependency graph
//! - `scan-bridging-header <header> --module <name>` - Scan a module's bridging header
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `render` - Human-readable diagnostics (miette)
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod render;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::config::{ConfigError, FrameworkPath, ScanConfig};
use crate::dependencies::DependencyScanError;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Internal consistency failure (sysexits `EX_SOFTWARE`).
    pub const INTERNAL: ExitCode = ExitCode(70);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::failure(format!("error: {err}"))
    }
}

impl From<DependencyScanError> for CliError {
    fn from(err: DependencyScanError) -> Self {
        CliError::new(format!("internal error: {err}"), ExitCode::INTERNAL)
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// The Quill compiler toolchain
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(version = VERSION)]
#[command(about = "The Quill parse bridge and foreign module dependency scanner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a source file, report diagnostics and verify the round trip
    Parse {
        /// Source file to parse
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Enable an experimental feature by name (repeatable)
        #[arg(long = "enable-experimental-feature", value_name = "NAME")]
        features: Vec<String>,
        /// Report errors only
        #[arg(long)]
        errors_only: bool,
        /// Report editor placeholders as warnings
        #[arg(long)]
        downgrade_placeholders: bool,
        /// Print the syntax tree
        #[arg(long)]
        dump_tree: bool,
    },

    /// Scan a foreign module and print its dependency graph as JSON
    ScanModule {
        /// Module name
        #[arg(value_name = "NAME")]
        name: String,
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Scan the bridging header of a module and print its dependency graph as JSON
    ScanBridgingHeader {
        /// Bridging header path
        #[arg(value_name = "HEADER")]
        header: PathBuf,
        /// Module the header belongs to
        #[arg(long, value_name = "NAME")]
        module: String,
        #[command(flatten)]
        scan: ScanArgs,
    },
}

/// Options shared by the scanning commands. Flags are layered over `--config`.
#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// JSON scan configuration
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Import search path (repeatable)
    #[arg(short = 'I', value_name = "DIR")]
    pub import_paths: Vec<String>,
    /// Framework search path (repeatable)
    #[arg(short = 'F', value_name = "DIR")]
    pub framework_paths: Vec<String>,
    /// System framework search path (repeatable)
    #[arg(long = "Fsystem", value_name = "DIR")]
    pub system_framework_paths: Vec<String>,
    /// Virtual filesystem overlay (repeatable)
    #[arg(long = "vfsoverlay", value_name = "FILE")]
    pub vfs_overlays: Vec<String>,
    /// Scanner path prefix mapping `old=new` (repeatable)
    #[arg(long = "prefix-map", value_name = "OLD=NEW")]
    pub prefix_maps: Vec<String>,
    /// Root directory for built module artifacts
    #[arg(long, value_name = "DIR")]
    pub module_cache_path: Option<String>,
    /// Working directory for the scan
    #[arg(long, value_name = "DIR")]
    pub working_directory: Option<String>,
    /// Host language version recorded in captured module arguments
    #[arg(long, value_name = "VERSION")]
    pub language_version: Option<String>,
    /// Write the graph here instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Save the dependency cache after scanning
    #[arg(long, value_name = "FILE")]
    pub serialize_cache: Option<PathBuf>,
    /// Start from a previously saved dependency cache
    #[arg(long, value_name = "FILE")]
    pub reuse_cache: Option<PathBuf>,
}

impl ScanArgs {
    /// Effective configuration: the config file (or defaults) with flags applied on top.
    pub fn to_config(&self) -> CliResult<ScanConfig> {
        let mut config = match &self.config {
            Some(path) => ScanConfig::load(path)?,
            None => ScanConfig::default(),
        };
        for path in &self.import_paths {
            config = config.with_import_path(path.as_str());
        }
        for path in &self.framework_paths {
            config = config.with_framework_path(FrameworkPath::new(path.as_str(), false));
        }
        for path in &self.system_framework_paths {
            config = config.with_framework_path(FrameworkPath::new(path.as_str(), true));
        }
        for overlay in &self.vfs_overlays {
            config = config.with_vfs_overlay(overlay.as_str());
        }
        for mapping in &self.prefix_maps {
            config = config.with_scanner_prefix_map(mapping.as_str());
        }
        if let Some(path) = &self.module_cache_path {
            config = config.with_module_output_path(path.as_str());
        }
        if let Some(dir) = &self.working_directory {
            config = config.with_working_directory(dir.as_str());
        }
        if let Some(version) = &self.language_version {
            config = config.with_language_version(version.as_str());
        }
        Ok(config)
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Parse {
            file,
            features,
            errors_only,
            downgrade_placeholders,
            dump_tree,
        } => commands::parse_file(
            &file,
            &features,
            commands::ParseOptions {
                errors_only,
                downgrade_placeholders,
                dump_tree,
            },
        ),
        Command::ScanModule { name, scan } => commands::scan_module(&name, &scan),
        Command::ScanBridgingHeader { header, module, scan } => {
            commands::scan_bridging_header(&header.to_string_lossy(), &module, &scan)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
