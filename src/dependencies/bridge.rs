//! Translation of scanned foreign modules into dependency records.
//!
//! Each [`ForeignModuleDeps`] becomes a resolved foreign [`ModuleDependencyInfo`] whose command line is a host
//! frontend invocation: host flags first, then the foreign frontend arguments (canonicalized through
//! [`ForeignInvocation`]) each behind `-Xcc`, then CAS flags.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use super::command_line::lookup_module_output;
use super::invocation::ForeignInvocation;
use super::service::ForeignModuleDeps;
use super::{
    DependencyScanError, ForeignModuleDetails, ModuleDependencyId, ModuleDependencyInfo, ModuleDependencyVector,
    ModuleOutputKind,
};
use crate::config::ScanConfig;

pub(crate) const FOREIGN_ARG_FLAG: &str = "-Xcc";
pub(crate) const DIRECT_FRONTEND_FLAG: &str = "-direct-clang-cc1-module-build";
pub(crate) const CAS_FS_FLAG: &str = "-cas-fs";
pub(crate) const NO_INCLUDE_TREE_FLAG: &str = "-no-clang-include-tree";
pub(crate) const INCLUDE_TREE_ROOT_FLAG: &str = "-clang-include-tree-root";
const VFS_OVERLAY_FLAG: &str = "-vfsoverlay";

/// Bridge every module in `graph` into a host dependency record.
///
/// Edges are always tagged foreign: a foreign module can only depend on other foreign modules, even when the target
/// has not been scanned yet. A module listed more than once in `graph` is bridged once.
///
/// ## Errors
/// [`DependencyScanError::InvocationRoundTrip`] when a module's build arguments cannot be parsed back.
#[tracing::instrument(skip_all, fields(modules = graph.len()))]
pub fn bridge_foreign_module_dependencies(
    graph: &[ForeignModuleDeps],
    config: &ScanConfig,
    module_output_path: &str,
    remap: &dyn Fn(&str) -> String,
) -> Result<ModuleDependencyVector, DependencyScanError> {
    let mut result = ModuleDependencyVector::with_capacity(graph.len());
    // The cache is keyed by module name, so only the first context hash of a name is recorded.
    let mut bridged: FxHashMap<&str, &str> = FxHashMap::default();

    for module in graph {
        let name = module.id.module_name.as_str();
        if let Some(kept) = bridged.get(name) {
            if *kept != module.id.context_hash {
                tracing::debug!(
                    module = name,
                    kept = *kept,
                    dropped = %module.id.context_hash,
                    "module reported under a second context hash"
                );
            }
            continue;
        }
        bridged.insert(name, module.id.context_hash.as_str());
        let pcm_output_path = lookup_module_output(&module.id, ModuleOutputKind::ModuleFile, module_output_path);

        let mut args: Vec<String> = vec![
            "-frontend".into(),
            "-emit-pcm".into(),
            "-module-name".into(),
            name.to_string(),
            "-o".into(),
            pcm_output_path.clone(),
            DIRECT_FRONTEND_FLAG.into(),
            remap(&module.module_map_file),
        ];
        let ambient_overlays = &config.search_paths.vfs_overlay_files;
        for overlay in ambient_overlays {
            args.push(VFS_OVERLAY_FLAG.into());
            args.push(remap(overlay));
        }

        let mut invocation = ForeignInvocation::from_args(&module.build_arguments).map_err(|source| {
            DependencyScanError::InvocationRoundTrip {
                module: name.to_string(),
                source,
            }
        })?;
        invocation.clear_cache_state();
        for overlay in &invocation.vfs_overlays {
            if !ambient_overlays.contains(overlay) {
                args.push(VFS_OVERLAY_FLAG.into());
                args.push(overlay.clone());
            }
        }
        for arg in invocation.to_args() {
            args.push(FOREIGN_ARG_FLAG.into());
            args.push(arg);
        }
        args.extend(config.cas.configuration_flags());

        let cas_fs_root_id = module.cas_fs_root_id.clone().unwrap_or_default();
        let include_tree_id = module.include_tree_id.clone().unwrap_or_default();
        if !cas_fs_root_id.is_empty() {
            args.push(NO_INCLUDE_TREE_FLAG.into());
            args.push(CAS_FS_FLAG.into());
            args.push(cas_fs_root_id.clone());
        }
        if !include_tree_id.is_empty() {
            args.push(INCLUDE_TREE_ROOT_FLAG.into());
            args.push(include_tree_id.clone());
        }

        let mut info = ModuleDependencyInfo::for_foreign_module(ForeignModuleDetails {
            pcm_output_path,
            module_map_file: module.module_map_file.clone(),
            context_hash: module.id.context_hash.clone(),
            command_line: args,
            file_dependencies: module.file_deps.clone(),
            captured_pcm_args: config.captured_pcm_args(),
            cas_fs_root_id,
            include_tree_id,
        });

        let mut already_added = BTreeSet::new();
        for dep in &module.module_deps {
            info.add_module_import(&dep.module_name, &mut already_added);
            info.add_module_dependency(ModuleDependencyId::foreign(dep.module_name.as_str()));
        }
        info.set_resolved(true);

        tracing::trace!(module = name, edges = info.module_dependencies.len(), "bridged foreign module");
        result.push((ModuleDependencyId::foreign(name), info));
    }
    Ok(result)
}
