//! JSON dependency graph output.
//!
//! Review changes: `cargo insta review`

use quill::dependencies::graph::{decode_id, encode_id};
use quill::dependencies::output::build_dependency_graph;
use quill::dependencies::{
    BridgingHeader, ForeignModuleDetails, ModuleDependenciesCache, ModuleDependencyId, ModuleDependencyInfo,
    SourceModuleDetails,
};

/// `App` (from source) whose bridging header imports the foreign module `Bar`.
fn bridged_app() -> ModuleDependenciesCache {
    let cache = ModuleDependenciesCache::new("/mc");
    let app = ModuleDependencyInfo::for_source_module(SourceModuleDetails {
        source_files: vec!["/src/main.qd".to_string()],
        bridging_header: Some(BridgingHeader {
            path: "/src/App-Bridging.h".to_string(),
            source_files: vec!["/src/App-Bridging.h".to_string()],
            module_dependencies: vec!["Bar".to_string()],
            include_tree_id: String::new(),
            command_line: vec!["-frontend".to_string(), "-emit-pch".to_string()],
        }),
    });
    let mut bar = ModuleDependencyInfo::for_foreign_module(ForeignModuleDetails {
        pcm_output_path: "/mc/Bar-H.pcm".to_string(),
        module_map_file: "/inc/Bar/module.modulemap".to_string(),
        context_hash: "H".to_string(),
        command_line: vec!["-frontend".to_string(), "-emit-pcm".to_string()],
        file_dependencies: vec!["/inc/Bar/module.modulemap".to_string()],
        captured_pcm_args: vec!["-Xcc".to_string(), "-fapinotes-host-version=1".to_string()],
        cas_fs_root_id: String::new(),
        include_tree_id: String::new(),
    });
    bar.set_resolved(true);
    cache.record_dependencies([
        (ModuleDependencyId::source("App"), app),
        (ModuleDependencyId::foreign("Bar"), bar),
    ]);
    cache
}

#[test]
fn bridged_app_graph() {
    let cache = bridged_app();
    let graph = build_dependency_graph(&cache, &ModuleDependencyId::source("App")).unwrap();
    let json = graph.to_json().unwrap();
    insta::assert_snapshot!("bridged_app_graph", json);
}

#[test]
fn graph_lists_only_reachable_modules() {
    let cache = bridged_app();
    cache.record_dependencies([(
        ModuleDependencyId::foreign("Unrelated"),
        ModuleDependencyInfo::for_foreign_module(ForeignModuleDetails::default()),
    )]);
    let graph = build_dependency_graph(&cache, &ModuleDependencyId::foreign("Bar")).unwrap();
    assert_eq!(graph.main_module_name, "Bar");
    let keys: Vec<&str> = graph.modules.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["foreign:Bar"]);
}

#[test]
fn graph_keys_decode_to_ids() {
    let cache = bridged_app();
    let graph = build_dependency_graph(&cache, &ModuleDependencyId::source("App")).unwrap();
    for (key, _) in &graph.modules {
        let id = decode_id(key).unwrap();
        assert_eq!(&encode_id(&id), key);
        assert!(cache.contains(&id));
    }
}
