//! Module and bridging-header scans.
//!
//! [`ForeignModuleScanner`] builds the scan command line from a [`ScanConfig`], resolves the working directory,
//! calls the [`DependencyScanningTool`] and bridges what it returns. Service failures are reported to a
//! [`ScanDiagnosticSink`] and produce an empty result.

use std::collections::BTreeSet;

use super::bridge::{
    CAS_FS_FLAG, DIRECT_FRONTEND_FLAG, FOREIGN_ARG_FLAG, INCLUDE_TREE_ROOT_FLAG, NO_INCLUDE_TREE_FLAG,
    bridge_foreign_module_dependencies,
};
use super::cache::ModuleDependenciesCache;
use super::command_line::{ScanInput, compute_working_directory, dependency_scanning_arguments, lookup_module_output};
use super::invocation::{ActionKind, ForeignInvocation};
use super::service::{DependencyScanningTool, ScanFailure, TranslationUnitDeps};
use super::{
    DependencyScanError, ForeignModuleId, ModuleDependencyId, ModuleDependencyInfo, ModuleDependencyVector,
    ModuleOutputKind, ScanDiagnostic, ScanDiagnosticSink,
};
use crate::config::ScanConfig;

/// Outcome of [`ForeignModuleScanner::add_bridging_header_dependencies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgingHeaderScan {
    /// The record already had bridging dependencies; nothing was scanned.
    AlreadyRecorded,
    /// The header was scanned and the record updated.
    Recorded,
    /// The scan failed and was diagnosed. The cache is unchanged.
    Failed,
}

pub struct ForeignModuleScanner<'a> {
    config: &'a ScanConfig,
    tool: &'a dyn DependencyScanningTool,
}

impl<'a> ForeignModuleScanner<'a> {
    pub fn new(config: &'a ScanConfig, tool: &'a dyn DependencyScanningTool) -> Self {
        Self { config, tool }
    }

    pub fn config(&self) -> &ScanConfig {
        self.config
    }

    /// Working directory of a scan, or `None` after reporting a diagnostic.
    fn working_directory(&self, args: &[String], diagnostics: &mut dyn ScanDiagnosticSink) -> Option<String> {
        let ambient = match &self.config.working_directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .map(|dir| dir.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let dir = compute_working_directory(args, &ambient);
        if dir.is_none() {
            tracing::warn!("scan command line has '-working-directory' without a value");
            diagnostics.report(ScanDiagnostic::scan_error("Missing '-working-directory' argument"));
        }
        dir
    }

    /// Scan `module_name` and bridge the result.
    ///
    /// The returned vector holds the requested module and every transitive dependency the service had not already
    /// described for `cache`. It is not recorded; see [`scan_module`](Self::scan_module).
    ///
    /// A service failure yields an empty vector. It is diagnosed unless it is the service's "module not found" error
    /// for `module_name` itself, which other module loaders may still resolve.
    #[tracing::instrument(skip_all, fields(module = module_name))]
    pub fn get_module_dependencies(
        &self,
        module_name: &str,
        cache: &ModuleDependenciesCache,
        diagnostics: &mut dyn ScanDiagnosticSink,
    ) -> Result<ModuleDependencyVector, DependencyScanError> {
        let args = dependency_scanning_arguments(self.config, &ScanInput::Module(module_name.to_string()));
        let Some(working_directory) = self.working_directory(&args, diagnostics) else {
            return Ok(Vec::new());
        };

        let already_seen = cache.already_seen_foreign_modules();
        let output_root = cache.module_output_path();
        let lookup = |id: &ForeignModuleId, kind: ModuleOutputKind| lookup_module_output(id, kind, output_root);

        let graph = match self
            .tool
            .module_dependencies(module_name, &args, &working_directory, &already_seen, &lookup)
        {
            Ok(graph) => graph,
            Err(failure) => {
                if failure.message.contains(&ScanFailure::module_not_found(module_name).message) {
                    tracing::debug!(module = module_name, "foreign module not found");
                } else {
                    tracing::warn!(module = module_name, error = %failure, "dependency scan failed");
                    diagnostics.report(ScanDiagnostic::scan_error(failure.message));
                }
                return Ok(Vec::new());
            }
        };

        bridge_foreign_module_dependencies(&graph, self.config, output_root, &|path: &str| {
            cache.remap_path(path)
        })
    }

    /// Cached scan of a foreign module: returns the recorded entry, scanning and recording on a miss.
    ///
    /// Concurrent calls for the same module are serialized, so each module is scanned at most once per cache.
    pub fn scan_module(
        &self,
        module_name: &str,
        cache: &ModuleDependenciesCache,
        diagnostics: &mut dyn ScanDiagnosticSink,
    ) -> Result<Option<ModuleDependencyInfo>, DependencyScanError> {
        let id = ModuleDependencyId::foreign(module_name);
        let lock = cache.scan_lock(&id);
        let _guard = lock.lock();

        if let Some(info) = cache.find_dependency(&id) {
            tracing::debug!(module = module_name, "dependency cache hit");
            return Ok(Some(info));
        }
        let dependencies = self.get_module_dependencies(module_name, cache, diagnostics)?;
        cache.record_dependencies(dependencies);
        Ok(cache.find_dependency(&id))
    }

    /// Scan the bridging header of the module recorded under `id` and store what it depends on.
    ///
    /// Foreign modules the header pulls in are recorded in the cache as well.
    ///
    /// ## Errors
    /// - [`DependencyScanError::MissingRecord`] if `id` is not cached.
    /// - [`DependencyScanError::MissingBridgingHeader`] if the record has no bridging header.
    /// - [`DependencyScanError::InvocationRoundTrip`] if scanned arguments cannot be parsed back.
    #[tracing::instrument(skip_all, fields(module = %id))]
    pub fn add_bridging_header_dependencies(
        &self,
        id: &ModuleDependencyId,
        cache: &ModuleDependenciesCache,
        diagnostics: &mut dyn ScanDiagnosticSink,
    ) -> Result<BridgingHeaderScan, DependencyScanError> {
        let lock = cache.scan_lock(id);
        let _guard = lock.lock();

        let mut info = cache
            .find_dependency(id)
            .ok_or_else(|| DependencyScanError::MissingRecord(id.clone()))?;
        let header_path = match info.bridging_header() {
            Some(header) => header.path.clone(),
            None => return Err(DependencyScanError::MissingBridgingHeader(id.clone())),
        };
        if info.has_recorded_bridging_dependencies() {
            tracing::debug!("bridging header dependencies already recorded");
            return Ok(BridgingHeaderScan::AlreadyRecorded);
        }

        let args = dependency_scanning_arguments(self.config, &ScanInput::TranslationUnit(header_path.clone()));
        let Some(working_directory) = self.working_directory(&args, diagnostics) else {
            return Ok(BridgingHeaderScan::Failed);
        };

        let already_seen = cache.already_seen_foreign_modules();
        let output_root = cache.module_output_path();
        let lookup = |id: &ForeignModuleId, kind: ModuleOutputKind| lookup_module_output(id, kind, output_root);

        let unit = match self
            .tool
            .translation_unit_dependencies(&args, &working_directory, &already_seen, &lookup)
        {
            Ok(unit) => unit,
            Err(failure) => {
                tracing::warn!(header = %header_path, error = %failure, "bridging header scan failed");
                diagnostics.report(ScanDiagnostic::scan_error(failure.message));
                return Ok(BridgingHeaderScan::Failed);
            }
        };

        let bridged = bridge_foreign_module_dependencies(&unit.module_graph, self.config, output_root, &|path: &str| {
            cache.remap_path(path)
        })?;
        let command_line = self.record_bridging_header_options(&header_path, &unit)?;

        for file in &unit.file_deps {
            info.add_bridging_source_file(file);
        }
        let mut already_added = BTreeSet::new();
        for module in &unit.module_deps {
            info.add_bridging_module_dependency(&module.module_name, &mut already_added);
        }
        if let Some(tree) = unit.include_tree_id.as_deref().filter(|t| !t.is_empty()) {
            info.add_bridging_header_include_tree(tree);
        }
        info.update_bridging_header_command_line(command_line);

        cache.record_dependencies(bridged);
        cache.update_dependency(id, info)?;
        Ok(BridgingHeaderScan::Recorded)
    }

    /// Host frontend invocation that precompiles the bridging header.
    ///
    /// The precompiled header is scanned for dependencies only, so the foreign output file is cleared.
    fn record_bridging_header_options(
        &self,
        header_path: &str,
        unit: &TranslationUnitDeps,
    ) -> Result<Vec<String>, DependencyScanError> {
        let mut args: Vec<String> = vec!["-frontend".into(), "-emit-pch".into(), DIRECT_FRONTEND_FLAG.into()];

        let mut invocation =
            ForeignInvocation::from_args(&unit.command).map_err(|source| DependencyScanError::InvocationRoundTrip {
                module: header_path.to_string(),
                source,
            })?;
        invocation.action = ActionKind::GeneratePch;
        invocation.clear_cache_state();
        invocation.output_file.clear();
        for arg in invocation.to_args() {
            args.push(FOREIGN_ARG_FLAG.into());
            args.push(arg);
        }

        args.extend(self.config.cas.configuration_flags());
        if let Some(tree) = unit.include_tree_id.as_deref().filter(|t| !t.is_empty()) {
            args.push(INCLUDE_TREE_ROOT_FLAG.into());
            args.push(tree.to_string());
        }
        if let Some(root) = unit.cas_fs_root_id.as_deref().filter(|r| !r.is_empty()) {
            args.push(NO_INCLUDE_TREE_FLAG.into());
            args.push(CAS_FS_FLAG.into());
            args.push(root.to_string());
        }
        Ok(args)
    }
}
