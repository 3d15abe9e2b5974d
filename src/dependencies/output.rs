//! JSON dependency graph.
//!
//! The graph lists the main module and everything it transitively depends on, keyed by encoded id and sorted:
//!
//! ```json
//! {
//!   "mainModuleName": "App",
//!   "modules": [["foreign:Bar", { "modulePath": "...", "details": { "foreign": { ... } } }]]
//! }
//! ```

use serde::Serialize;

use super::cache::ModuleDependenciesCache;
use super::graph::{encode_id, transitive_closure};
use super::{BridgingHeader, DependencyScanError, ModuleDependencyId, ModuleDependencyInfo, ModuleDetails};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    pub main_module_name: String,
    pub modules: Vec<(String, ModuleEntry)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEntry {
    pub module_path: String,
    pub source_files: Vec<String>,
    pub direct_dependencies: Vec<String>,
    pub details: EntryDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryDetails {
    Foreign(ForeignEntry),
    Textual(TextualEntry),
    Source(SourceEntry),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignEntry {
    pub module_map_path: String,
    pub context_hash: String,
    pub command_line: Vec<String>,
    #[serde(rename = "capturedPCMArgs")]
    pub captured_pcm_args: Vec<String>,
    #[serde(rename = "casFSRootID", skip_serializing_if = "String::is_empty")]
    pub cas_fs_root_id: String,
    #[serde(rename = "includeTreeID", skip_serializing_if = "String::is_empty")]
    pub include_tree_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextualEntry {
    pub module_interface_path: String,
    pub context_hash: String,
    pub command_line: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridging_header: Option<BridgingHeaderEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridging_header: Option<BridgingHeaderEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgingHeaderEntry {
    pub path: String,
    pub source_files: Vec<String>,
    pub module_dependencies: Vec<String>,
    #[serde(rename = "includeTreeID", skip_serializing_if = "String::is_empty")]
    pub include_tree_id: String,
    pub command_line: Vec<String>,
}

impl From<&BridgingHeader> for BridgingHeaderEntry {
    fn from(header: &BridgingHeader) -> Self {
        Self {
            path: header.path.clone(),
            source_files: header.source_files.clone(),
            module_dependencies: header.module_dependencies.clone(),
            include_tree_id: header.include_tree_id.clone(),
            command_line: header.command_line.clone(),
        }
    }
}

fn module_entry(id: &ModuleDependencyId, info: &ModuleDependencyInfo) -> ModuleEntry {
    let direct_dependencies = info.all_dependencies().iter().map(encode_id).collect();
    match &info.details {
        ModuleDetails::Foreign(details) => ModuleEntry {
            module_path: details.pcm_output_path.clone(),
            source_files: details.file_dependencies.clone(),
            direct_dependencies,
            details: EntryDetails::Foreign(ForeignEntry {
                module_map_path: details.module_map_file.clone(),
                context_hash: details.context_hash.clone(),
                command_line: details.command_line.clone(),
                captured_pcm_args: details.captured_pcm_args.clone(),
                cas_fs_root_id: details.cas_fs_root_id.clone(),
                include_tree_id: details.include_tree_id.clone(),
            }),
        },
        ModuleDetails::TextualInterface(details) => ModuleEntry {
            module_path: format!("{}.qmod", id.name),
            source_files: details
                .bridging_header
                .as_ref()
                .map(|h| h.source_files.clone())
                .unwrap_or_default(),
            direct_dependencies,
            details: EntryDetails::Textual(TextualEntry {
                module_interface_path: details.interface_file.clone(),
                context_hash: details.context_hash.clone(),
                command_line: details.command_line.clone(),
                bridging_header: details.bridging_header.as_ref().map(BridgingHeaderEntry::from),
            }),
        },
        ModuleDetails::Source(details) => ModuleEntry {
            module_path: format!("{}.qmod", id.name),
            source_files: details.source_files.clone(),
            direct_dependencies,
            details: EntryDetails::Source(SourceEntry {
                bridging_header: details.bridging_header.as_ref().map(BridgingHeaderEntry::from),
            }),
        },
    }
}

/// Graph of `main` and its transitive dependencies. Dependencies without a record are listed as edges only.
pub fn build_dependency_graph(
    cache: &ModuleDependenciesCache,
    main: &ModuleDependencyId,
) -> Result<DependencyGraph, DependencyScanError> {
    if !cache.contains(main) {
        return Err(DependencyScanError::MissingRecord(main.clone()));
    }
    let mut ids = transitive_closure(cache, main);
    ids.insert(main.clone());

    let modules = ids
        .iter()
        .filter_map(|id| cache.find_dependency(id).map(|info| (encode_id(id), module_entry(id, &info))))
        .collect();
    Ok(DependencyGraph {
        main_module_name: main.name.clone(),
        modules,
    })
}

impl DependencyGraph {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dependencies::ForeignModuleDetails;

    #[test]
    fn test_missing_main_module_is_error() {
        let cache = ModuleDependenciesCache::new("/mc");
        assert!(build_dependency_graph(&cache, &ModuleDependencyId::foreign("Foo")).is_err());
    }

    #[test]
    fn test_foreign_entry_json_keys() {
        let cache = ModuleDependenciesCache::new("/mc");
        let mut info = ModuleDependencyInfo::for_foreign_module(ForeignModuleDetails {
            pcm_output_path: "/mc/Foo-H.pcm".into(),
            module_map_file: "/inc/module.modulemap".into(),
            context_hash: "H".into(),
            captured_pcm_args: vec!["-Xcc".into(), "-fapinotes-host-version=1".into()],
            cas_fs_root_id: "root".into(),
            ..ForeignModuleDetails::default()
        });
        info.add_module_dependency(ModuleDependencyId::foreign("Bar"));
        cache.record_dependencies([(ModuleDependencyId::foreign("Foo"), info)]);

        let graph = build_dependency_graph(&cache, &ModuleDependencyId::foreign("Foo")).unwrap();
        assert_eq!(graph.modules.len(), 1);
        let json: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
        assert_eq!(json["mainModuleName"], "Foo");
        let entry = &json["modules"][0];
        assert_eq!(entry[0], "foreign:Foo");
        assert_eq!(entry[1]["directDependencies"][0], "foreign:Bar");
        let foreign = &entry[1]["details"]["foreign"];
        assert_eq!(foreign["moduleMapPath"], "/inc/module.modulemap");
        assert_eq!(foreign["capturedPCMArgs"][1], "-fapinotes-host-version=1");
        assert_eq!(foreign["casFSRootID"], "root");
        assert!(foreign.get("includeTreeID").is_none());
    }
}
