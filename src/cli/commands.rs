//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs;
use std::path::Path;

use quill_core::lang::features::{self, ExperimentalFeatures};
use quill_syntax::diagnostics::{DiagnosticId, Severity};

use crate::bridge::{
    DiagnosticPolicy, ProjectedDiagnostic, RoundTrip, destroy_source_file, emit_parser_diagnostics, parse_source_file,
    round_trip_check,
};
use crate::config::ScanConfig;
use crate::dependencies::cache::prefix_map_remapper;
use crate::dependencies::graph::diagnose_cycle;
use crate::dependencies::output::build_dependency_graph;
use crate::dependencies::{
    BridgingHeader, BridgingHeaderScan, FilesystemScanningService, ForeignModuleScanner, ModuleDependenciesCache,
    ModuleDependencyId, ModuleDependencyInfo, ScanDiagnostic, SourceModuleDetails,
};

use super::render::{render_projected, render_scan};
use super::{CliError, CliResult, ExitCode, ScanArgs};

// ============================================================================
// Parsing
// ============================================================================

/// Switches of the `parse` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub errors_only: bool,
    pub downgrade_placeholders: bool,
    pub dump_tree: bool,
}

/// Parse a file, print its diagnostics and verify the round trip.
///
/// Fails when an error survives projection or the tree does not reproduce the file.
pub fn parse_file(path: &Path, feature_names: &[String], options: ParseOptions) -> CliResult<ExitCode> {
    let source = fs::read(path).map_err(|e| CliError::failure(format!("Error reading file '{}': {e}", path.display())))?;

    let mut enabled = ExperimentalFeatures::empty();
    let unknown = enabled.enable_named(feature_names.iter().map(String::as_str));
    if let Some(name) = unknown.first() {
        return Err(CliError::failure(format!("error: unknown experimental feature '{name}'")));
    }
    let context = move |name: &str| features::from_name(name).is_some_and(|id| enabled.is_enabled(id));

    let module_name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let file_name = path.display().to_string();
    let file = parse_source_file(&source, &module_name, &file_name, Some(&context))
        .map_err(|e| CliError::failure(format!("error: {e}")))?;

    if options.dump_tree {
        println!("{}", file.tree().debug_dump(&source));
    }

    let policy = DiagnosticPolicy::new()
        .with_emit_only_errors(options.errors_only)
        .with_downgrade_placeholder_errors(options.downgrade_placeholders);
    let mut projected: Vec<ProjectedDiagnostic> = Vec::new();
    emit_parser_diagnostics(&file, &mut projected, policy);
    for diagnostic in &projected {
        eprintln!("{}", render_projected(&file, diagnostic));
    }

    let round_trip = round_trip_check(&file);
    destroy_source_file(file);
    if let RoundTrip::Mismatch { first_difference } = round_trip {
        return Err(CliError::failure(format!(
            "error: '{file_name}' does not round-trip (first difference at byte {first_difference})"
        )));
    }

    if projected.iter().any(|d| d.severity == Severity::Error) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Dependency scanning
// ============================================================================

/// The starting cache: a reused one when it loads, otherwise an empty one (with a warning).
fn open_cache(args: &ScanArgs, config: &ScanConfig, diagnostics: &mut Vec<ScanDiagnostic>) -> ModuleDependenciesCache {
    let cache = match &args.reuse_cache {
        Some(path) => match ModuleDependenciesCache::deserialize_from(path) {
            Ok(cache) => Some(cache),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unusable dependency cache");
                diagnostics.push(ScanDiagnostic::new(
                    DiagnosticId::DependencyCacheLoadFailed,
                    format!("cannot reuse dependency cache: {err}"),
                ));
                None
            }
        },
        None => None,
    };
    let cache = cache.unwrap_or_else(|| ModuleDependenciesCache::new(config.module_output_path.as_str()));
    if config.search_paths.scanner_prefix_map.is_empty() {
        cache
    } else {
        cache.with_remapper(prefix_map_remapper(&config.search_paths.scanner_prefix_map))
    }
}

/// Print diagnostics, write the graph of `main` and save the cache if asked.
fn finish_scan(
    main: &ModuleDependencyId,
    cache: &ModuleDependenciesCache,
    args: &ScanArgs,
    mut diagnostics: Vec<ScanDiagnostic>,
) -> CliResult<ExitCode> {
    if let Some(cycle) = diagnose_cycle(cache, main) {
        diagnostics.push(cycle);
    }
    for diagnostic in &diagnostics {
        eprintln!("{}", render_scan(diagnostic));
    }

    let graph = build_dependency_graph(cache, main)?;
    let json = graph
        .to_json()
        .map_err(|e| CliError::failure(format!("error: cannot serialize dependency graph: {e}")))?;
    match &args.output {
        Some(path) => fs::write(path, json)
            .map_err(|e| CliError::failure(format!("Error writing '{}': {e}", path.display())))?,
        None => println!("{json}"),
    }

    if let Some(path) = &args.serialize_cache {
        cache
            .serialize_to(path)
            .map_err(|e| CliError::failure(format!("error: {e}")))?;
    }

    if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Scan a foreign module with the filesystem scanning service.
pub fn scan_module(name: &str, args: &ScanArgs) -> CliResult<ExitCode> {
    let config = args.to_config()?;
    let mut diagnostics = Vec::new();
    let cache = open_cache(args, &config, &mut diagnostics);

    let service = FilesystemScanningService::new();
    let scanner = ForeignModuleScanner::new(&config, &service);
    if scanner.scan_module(name, &cache, &mut diagnostics)?.is_none() {
        for diagnostic in &diagnostics {
            eprintln!("{}", render_scan(diagnostic));
        }
        return Err(CliError::failure(format!("error: no such module '{name}'")));
    }
    finish_scan(&ModuleDependencyId::foreign(name), &cache, args, diagnostics)
}

/// Scan the bridging header of `module`, recorded as a source module.
pub fn scan_bridging_header(header: &str, module: &str, args: &ScanArgs) -> CliResult<ExitCode> {
    let config = args.to_config()?;
    let mut diagnostics = Vec::new();
    let cache = open_cache(args, &config, &mut diagnostics);

    let id = ModuleDependencyId::source(module);
    if !cache.contains(&id) {
        let info = ModuleDependencyInfo::for_source_module(SourceModuleDetails {
            source_files: Vec::new(),
            bridging_header: Some(BridgingHeader {
                path: header.to_string(),
                ..BridgingHeader::default()
            }),
        });
        cache.record_dependencies([(id.clone(), info)]);
    }

    let service = FilesystemScanningService::new();
    let scanner = ForeignModuleScanner::new(&config, &service);
    match scanner.add_bridging_header_dependencies(&id, &cache, &mut diagnostics)? {
        BridgingHeaderScan::AlreadyRecorded => tracing::info!(module, "bridging header dependencies reused from cache"),
        BridgingHeaderScan::Recorded => tracing::debug!(module, "bridging header scanned"),
        BridgingHeaderScan::Failed => {}
    }
    finish_scan(&id, &cache, args, diagnostics)
}
