//! The `quill` command line, driven through `execute`.

use std::fs;
use std::path::Path;

use clap::Parser;
use quill::cli::{Cli, ExitCode, execute};
use quill::dependencies::{ModuleDependenciesCache, ModuleDependencyId};

fn run(args: &[&str]) -> Result<ExitCode, quill::cli::CliError> {
    let mut argv = vec!["quill"];
    argv.extend_from_slice(args);
    execute(Cli::try_parse_from(argv).unwrap())
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn modules_fixture(root: &Path) {
    write(root, "inc/Foo/module.modulemap", "module Foo { header \"Foo.h\" }\n");
    write(root, "inc/Foo/Foo.h", "@import Bar;\n");
    write(root, "inc/Bar/module.modulemap", "module Bar { header \"Bar.h\" }\n");
    write(root, "inc/Bar/Bar.h", "int bar(void);\n");
}

#[test]
fn parse_reports_placeholder_errors() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("main.qd");
    fs::write(&file, "let x = <#value#>\n").unwrap();
    let file = file.to_string_lossy();

    assert_eq!(run(&["parse", &file]).unwrap(), ExitCode::FAILURE);
    assert_eq!(run(&["parse", &file, "--downgrade-placeholders"]).unwrap(), ExitCode::SUCCESS);
}

#[test]
fn parse_enables_features_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("main.qd");
    fs::write(&file, "let y = x |> f\n").unwrap();
    let file = file.to_string_lossy();

    assert_eq!(run(&["parse", &file]).unwrap(), ExitCode::FAILURE);
    assert_eq!(
        run(&["parse", &file, "--enable-experimental-feature", "PipelineOperator"]).unwrap(),
        ExitCode::SUCCESS
    );
    let err = run(&["parse", &file, "--enable-experimental-feature", "Telepathy"]).unwrap_err();
    assert!(err.message.contains("Telepathy"));
}

#[test]
fn parse_missing_file_is_an_error() {
    let err = run(&["parse", "/definitely/not/here.qd"]).unwrap_err();
    assert_eq!(err.exit_code, ExitCode::FAILURE);
}

#[test]
fn scan_module_writes_graph_and_cache() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    modules_fixture(root);
    let inc = root.join("inc").to_string_lossy().into_owned();
    let cwd = root.to_string_lossy().into_owned();
    let out = root.join("graph.json").to_string_lossy().into_owned();
    let cache_file = root.join("cache.json").to_string_lossy().into_owned();

    let code = run(&[
        "scan-module",
        "Foo",
        "-I",
        &inc,
        "--working-directory",
        &cwd,
        "--module-cache-path",
        "/mc",
        "-o",
        &out,
        "--serialize-cache",
        &cache_file,
    ])
    .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let graph: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(graph["mainModuleName"], "Foo");
    let keys: Vec<&str> = graph["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry[0].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["foreign:Bar", "foreign:Foo"]);

    let cache = ModuleDependenciesCache::deserialize_from(Path::new(&cache_file)).unwrap();
    assert_eq!(cache.module_output_path(), "/mc");
    assert!(cache.contains(&ModuleDependencyId::foreign("Bar")));

    // A reused cache answers without rescanning, even with the module maps gone.
    fs::remove_dir_all(root.join("inc")).unwrap();
    let code = run(&["scan-module", "Foo", "--reuse-cache", &cache_file, "-o", &out]).unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
}

#[test]
fn scan_module_with_unusable_cache_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    modules_fixture(root);
    let bad_cache = root.join("bad.json");
    fs::write(&bad_cache, "not json").unwrap();
    let inc = root.join("inc").to_string_lossy().into_owned();
    let cwd = root.to_string_lossy().into_owned();
    let out = root.join("graph.json").to_string_lossy().into_owned();

    let code = run(&[
        "scan-module",
        "Bar",
        "-I",
        &inc,
        "--working-directory",
        &cwd,
        "--reuse-cache",
        &bad_cache.to_string_lossy(),
        "-o",
        &out,
    ])
    .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
    assert!(fs::read_to_string(&out).unwrap().contains("\"mainModuleName\": \"Bar\""));
}

#[test]
fn scan_unknown_module_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cwd = dir.path().to_string_lossy().into_owned();
    let err = run(&["scan-module", "Quux", "--working-directory", &cwd]).unwrap_err();
    assert!(err.message.contains("Quux"));
    assert_eq!(err.exit_code, ExitCode::FAILURE);
}

#[test]
fn scan_bridging_header_outputs_source_module() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    modules_fixture(root);
    write(root, "src/App-Bridging.h", "#import <Foo/Foo.h>\n");
    let header = root.join("src/App-Bridging.h").to_string_lossy().into_owned();
    let inc = root.join("inc").to_string_lossy().into_owned();
    let cwd = root.to_string_lossy().into_owned();
    let out = root.join("graph.json").to_string_lossy().into_owned();

    let code = run(&[
        "scan-bridging-header",
        &header,
        "--module",
        "App",
        "-I",
        &inc,
        "--working-directory",
        &cwd,
        "-o",
        &out,
    ])
    .unwrap();
    assert_eq!(code, ExitCode::SUCCESS);

    let graph: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(graph["mainModuleName"], "App");
    let keys: Vec<&str> = graph["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry[0].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["source:App", "foreign:Bar", "foreign:Foo"]);
    let bridging = &graph["modules"][0][1]["details"]["source"]["bridgingHeader"];
    assert_eq!(bridging["moduleDependencies"][0], "Foo");
}
