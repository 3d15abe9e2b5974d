//! Dependency scanning service.
//!
//! [`DependencyScanningTool`] is the seam between the scanner and whatever discovers foreign module dependencies.
//! [`FilesystemScanningService`] is an in-process implementation that reads module maps and headers from disk.

use std::collections::VecDeque;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use thiserror::Error;

use super::invocation::{ActionKind, ForeignInvocation};
use super::{ForeignModuleId, ModuleOutputKind};

/// Maps a module and artifact kind to the path the service should report for it.
pub type LookupModuleOutput<'a> = &'a dyn Fn(&ForeignModuleId, ModuleOutputKind) -> String;

/// Error text reported by the scanning service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ScanFailure {
    pub message: String,
}

impl ScanFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn module_not_found(module_name: &str) -> Self {
        Self::new(format!("fatal error: module '{module_name}' not found"))
    }
}

/// One foreign module as discovered by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignModuleDeps {
    pub id: ForeignModuleId,
    pub module_map_file: String,
    /// Files the module's build reads, in discovery order.
    pub file_deps: Vec<String>,
    /// Modules this module imports.
    pub module_deps: Vec<ForeignModuleId>,
    /// Foreign frontend arguments that build the module.
    pub build_arguments: Vec<String>,
    pub cas_fs_root_id: Option<String>,
    pub include_tree_id: Option<String>,
}

/// Dependencies of a single translation unit (e.g. a bridging header).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationUnitDeps {
    /// Newly discovered modules.
    pub module_graph: Vec<ForeignModuleDeps>,
    pub file_deps: Vec<String>,
    /// Modules the translation unit imports directly.
    pub module_deps: Vec<ForeignModuleId>,
    /// Foreign frontend arguments for the translation unit itself.
    pub command: Vec<String>,
    pub cas_fs_root_id: Option<String>,
    pub include_tree_id: Option<String>,
}

/// A dependency scanning service.
///
/// Modules in `already_seen` were reported by an earlier call. They may be named as dependencies but are not
/// described again.
pub trait DependencyScanningTool {
    fn module_dependencies(
        &self,
        module_name: &str,
        command_line: &[String],
        working_directory: &str,
        already_seen: &FxHashSet<ForeignModuleId>,
        lookup_output: LookupModuleOutput<'_>,
    ) -> Result<Vec<ForeignModuleDeps>, ScanFailure>;

    fn translation_unit_dependencies(
        &self,
        command_line: &[String],
        working_directory: &str,
        already_seen: &FxHashSet<ForeignModuleId>,
        lookup_output: LookupModuleOutput<'_>,
    ) -> Result<TranslationUnitDeps, ScanFailure>;
}

// ============================================================================
// Filesystem service
// ============================================================================

/// Scans module maps and headers on disk.
///
/// ## Notes
/// - Modules are found at `<dir>/module.modulemap` or `<dir>/<Name>/module.modulemap` under each `-I` directory,
///   and at `<dir>/<Name>.framework/Modules/module.modulemap` under each framework directory.
/// - Module maps are read for top-level `module Name { ... }` declarations; every `header "..."` inside
///   (submodules included) belongs to the top-level module.
/// - Headers are followed through `#include`/`#import` of quoted and angled paths. `@import Name;` and
///   `#include <Name/...>` where `Name` is a known module become module dependencies. Angled includes that resolve
///   nowhere are treated as system headers and skipped.
/// - The context hash digests the canonical command line (inputs excluded), so every module found by one scan
///   shares it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemScanningService;

impl FilesystemScanningService {
    pub fn new() -> Self {
        Self
    }
}

impl DependencyScanningTool for FilesystemScanningService {
    #[tracing::instrument(skip_all, fields(module = module_name))]
    fn module_dependencies(
        &self,
        module_name: &str,
        command_line: &[String],
        working_directory: &str,
        already_seen: &FxHashSet<ForeignModuleId>,
        lookup_output: LookupModuleOutput<'_>,
    ) -> Result<Vec<ForeignModuleDeps>, ScanFailure> {
        let mut ctx = ScanContext::new(command_line, working_directory)?;
        ctx.module_graph(&[module_name.to_string()], Some(module_name), already_seen, lookup_output)
    }

    #[tracing::instrument(skip_all)]
    fn translation_unit_dependencies(
        &self,
        command_line: &[String],
        working_directory: &str,
        already_seen: &FxHashSet<ForeignModuleId>,
        lookup_output: LookupModuleOutput<'_>,
    ) -> Result<TranslationUnitDeps, ScanFailure> {
        let mut ctx = ScanContext::new(command_line, working_directory)?;
        let Some(input) = ctx.invocation.inputs.last().cloned() else {
            return Err(ScanFailure::new("error: no input file for translation unit scan"));
        };
        let input_path = ctx.resolve(&input);

        let mut file_deps = Vec::new();
        let mut module_names = Vec::new();
        ctx.follow_includes(vec![input_path], None, &mut file_deps, &mut module_names)?;

        let module_graph = ctx.module_graph(&module_names, None, already_seen, lookup_output)?;
        let module_deps: Vec<ForeignModuleId> = module_names
            .iter()
            .map(|name| ForeignModuleId::new(name.as_str(), ctx.context_hash.as_str()))
            .collect();

        let mut command = ctx.base_invocation(ActionKind::EmitObj);
        for id in &module_deps {
            let pcm = lookup_output(id, ModuleOutputKind::ModuleFile);
            command.passthrough.push(format!("-fmodule-file={}={pcm}", id.module_name));
        }
        command.output_file = format!("{input}.o");
        command.inputs = vec![input];

        Ok(TranslationUnitDeps {
            module_graph,
            file_deps,
            module_deps,
            command: cc1(&command),
            cas_fs_root_id: None,
            include_tree_id: None,
        })
    }
}

fn cc1(invocation: &ForeignInvocation) -> Vec<String> {
    let mut args = vec!["-cc1".to_string()];
    args.extend(invocation.to_args());
    args
}

/// A top-level module declared in a module map.
#[derive(Debug, Clone)]
struct ModuleMapEntry {
    name: String,
    headers: Vec<PathBuf>,
}

/// Located module: its module map and headers.
#[derive(Debug, Clone)]
struct LocatedModule {
    module_map: PathBuf,
    headers: Vec<PathBuf>,
}

struct ScanContext {
    invocation: ForeignInvocation,
    working_directory: PathBuf,
    include_dirs: Vec<PathBuf>,
    framework_dirs: Vec<PathBuf>,
    context_hash: String,
    module_maps: FxHashMap<PathBuf, Vec<ModuleMapEntry>>,
}

impl ScanContext {
    fn new(command_line: &[String], working_directory: &str) -> Result<Self, ScanFailure> {
        // The driver name is not an input.
        let args = match command_line.first() {
            Some(first) if !first.starts_with('-') => &command_line[1..],
            _ => command_line,
        };
        let invocation = ForeignInvocation::from_args(args)
            .map_err(|e| ScanFailure::new(format!("error: invalid scan arguments: {e}")))?;

        let working_directory = PathBuf::from(working_directory);
        let resolve = |p: &str| {
            let path = Path::new(p);
            if path.is_absolute() { path.to_path_buf() } else { working_directory.join(path) }
        };
        let include_dirs = invocation.include_paths.iter().map(|p| resolve(p)).collect();
        let framework_dirs = invocation.framework_paths.iter().map(|(p, _)| resolve(p)).collect();

        let mut canonical = invocation.clone();
        canonical.inputs.clear();
        let mut hasher = FxHasher::default();
        canonical.to_args().hash(&mut hasher);
        let context_hash = format!("{:016X}", hasher.finish());

        Ok(Self {
            invocation,
            working_directory,
            include_dirs,
            framework_dirs,
            context_hash,
            module_maps: FxHashMap::default(),
        })
    }

    fn resolve(&self, p: &str) -> PathBuf {
        let path = Path::new(p);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_directory.join(path)
        }
    }

    /// Invocation carrying the search configuration shared by every command this scan produces.
    fn base_invocation(&self, action: ActionKind) -> ForeignInvocation {
        let inv = &self.invocation;
        ForeignInvocation {
            action,
            language: Some(inv.language.clone().unwrap_or_else(|| "c".to_string())),
            defines: inv.defines.clone(),
            include_paths: inv.include_paths.clone(),
            framework_paths: inv.framework_paths.clone(),
            vfs_overlays: inv.vfs_overlays.clone(),
            path_prefix_mappings: inv.path_prefix_mappings.clone(),
            passthrough: inv.passthrough.iter().filter(|f| *f != "-c").cloned().collect(),
            ..ForeignInvocation::default()
        }
    }

    /// Breadth-first walk over the modules reachable from `roots`.
    ///
    /// Already-seen modules are named as dependencies but neither described nor traversed. `always_include` is
    /// described even if seen.
    fn module_graph(
        &mut self,
        roots: &[String],
        always_include: Option<&str>,
        already_seen: &FxHashSet<ForeignModuleId>,
        lookup_output: LookupModuleOutput<'_>,
    ) -> Result<Vec<ForeignModuleDeps>, ScanFailure> {
        let mut graph = Vec::new();
        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut queue: VecDeque<String> = roots.iter().cloned().collect();

        while let Some(name) = queue.pop_front() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let id = ForeignModuleId::new(name.as_str(), self.context_hash.as_str());
            if already_seen.contains(&id) && always_include != Some(name.as_str()) {
                continue;
            }
            let module = self.find_module(&name)?.ok_or_else(|| ScanFailure::module_not_found(&name))?;

            let mut file_deps = vec![module.module_map.to_string_lossy().into_owned()];
            let mut dep_names = Vec::new();
            self.follow_includes(module.headers.clone(), Some(&name), &mut file_deps, &mut dep_names)?;

            let mut invocation = self.base_invocation(ActionKind::GenerateModule);
            invocation.module_name = Some(name.clone());
            let mut module_deps = Vec::with_capacity(dep_names.len());
            for dep in &dep_names {
                let located = self.find_module(dep)?.ok_or_else(|| ScanFailure::module_not_found(dep))?;
                invocation
                    .module_map_files
                    .push(located.module_map.to_string_lossy().into_owned());
                module_deps.push(ForeignModuleId::new(dep.as_str(), self.context_hash.as_str()));
                queue.push_back(dep.clone());
            }
            invocation.output_file = lookup_output(&id, ModuleOutputKind::ModuleFile);
            let module_map_file = module.module_map.to_string_lossy().into_owned();
            invocation.inputs = vec![module_map_file.clone()];

            tracing::debug!(module = %name, files = file_deps.len(), deps = module_deps.len(), "scanned module");
            graph.push(ForeignModuleDeps {
                id,
                module_map_file,
                file_deps,
                module_deps,
                build_arguments: cc1(&invocation),
                cas_fs_root_id: None,
                include_tree_id: None,
            });
        }
        Ok(graph)
    }

    /// Locate a module by name across the search paths.
    fn find_module(&mut self, name: &str) -> Result<Option<LocatedModule>, ScanFailure> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        for dir in &self.include_dirs {
            candidates.push(dir.join("module.modulemap"));
            candidates.push(dir.join(name).join("module.modulemap"));
        }
        for dir in &self.framework_dirs {
            candidates.push(dir.join(format!("{name}.framework")).join("Modules").join("module.modulemap"));
        }

        for candidate in candidates {
            if !candidate.is_file() {
                continue;
            }
            let entries = self.module_map(&candidate)?;
            if let Some(entry) = entries.iter().find(|e| e.name == name) {
                return Ok(Some(LocatedModule {
                    module_map: candidate,
                    headers: entry.headers.clone(),
                }));
            }
        }
        Ok(None)
    }

    fn module_map(&mut self, path: &Path) -> Result<Vec<ModuleMapEntry>, ScanFailure> {
        if let Some(entries) = self.module_maps.get(path) {
            return Ok(entries.clone());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| ScanFailure::new(format!("fatal error: cannot read '{}': {e}", path.display())))?;
        let entries = parse_module_map(&text, &header_base(path));
        self.module_maps.insert(path.to_path_buf(), entries.clone());
        Ok(entries)
    }

    /// Follow includes from `start`, appending files to `file_deps` and imported modules to `module_deps`
    /// (both deduplicated, in discovery order). Imports of `owner` itself are ignored.
    fn follow_includes(
        &mut self,
        start: Vec<PathBuf>,
        owner: Option<&str>,
        file_deps: &mut Vec<String>,
        module_deps: &mut Vec<String>,
    ) -> Result<(), ScanFailure> {
        let mut seen: FxHashSet<PathBuf> = FxHashSet::default();
        let mut queue: VecDeque<PathBuf> = start.into();

        while let Some(file) = queue.pop_front() {
            if !seen.insert(file.clone()) {
                continue;
            }
            let bytes = fs::read(&file).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ScanFailure::new(format!("fatal error: '{}' file not found", file.display()))
                }
                _ => ScanFailure::new(format!("fatal error: cannot read '{}': {e}", file.display())),
            })?;
            // Headers are not required to be UTF-8; directives are ASCII either way.
            let text = String::from_utf8_lossy(&bytes);
            let display = file.to_string_lossy().into_owned();
            if !file_deps.contains(&display) {
                file_deps.push(display);
            }

            let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
            for directive in scan_directives(&text) {
                match directive {
                    Directive::Import(module) => add_module(module_deps, owner, module),
                    Directive::Angled(path) => {
                        if let Some((first, _)) = path.split_once('/') {
                            if owner != Some(first) && self.find_module(first)?.is_some() {
                                add_module(module_deps, owner, first.to_string());
                                continue;
                            }
                        }
                        if let Some(found) = self.search_include(&path) {
                            queue.push_back(found);
                        }
                    }
                    Directive::Quoted(path) => {
                        let local = dir.join(&path);
                        let found = if local.is_file() { Some(local) } else { self.search_include(&path) };
                        match found {
                            Some(found) => queue.push_back(found),
                            None => {
                                return Err(ScanFailure::new(format!(
                                    "{}: fatal error: '{path}' file not found",
                                    file.display()
                                )));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn search_include(&self, path: &str) -> Option<PathBuf> {
        for dir in &self.include_dirs {
            let candidate = dir.join(path);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        let (framework, rest) = path.split_once('/')?;
        self.framework_dirs
            .iter()
            .map(|dir| dir.join(format!("{framework}.framework")).join("Headers").join(rest))
            .find(|candidate| candidate.is_file())
    }
}

fn add_module(module_deps: &mut Vec<String>, owner: Option<&str>, module: String) {
    if owner != Some(module.as_str()) && !module_deps.contains(&module) {
        module_deps.push(module);
    }
}

/// Directory headers in a module map are relative to: the map's own directory, or `Headers/` for a framework.
fn header_base(module_map: &Path) -> PathBuf {
    let dir = module_map.parent().unwrap_or(Path::new(""));
    let in_framework = dir.file_name().is_some_and(|n| n == "Modules")
        && dir
            .parent()
            .and_then(Path::extension)
            .is_some_and(|ext| ext == "framework");
    match dir.parent() {
        Some(framework) if in_framework => framework.join("Headers"),
        _ => dir.to_path_buf(),
    }
}

// ============================================================================
// Module map and header parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum MapToken {
    Word(String),
    Str(String),
    LBrace,
    RBrace,
}

fn tokenize_module_map(text: &str) -> Vec<MapToken> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' => tokens.push(MapToken::LBrace),
            '}' => tokens.push(MapToken::RBrace),
            '"' => {
                let mut s = String::new();
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    s.push(c);
                }
                tokens.push(MapToken::Str(s));
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(MapToken::Word(word));
            }
            _ => {}
        }
    }
    tokens
}

/// Top-level module declarations with their headers, resolved against `base`.
fn parse_module_map(text: &str, base: &Path) -> Vec<ModuleMapEntry> {
    let tokens = tokenize_module_map(text);
    let mut entries: Vec<ModuleMapEntry> = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            MapToken::LBrace => depth += 1,
            MapToken::RBrace => depth = depth.saturating_sub(1),
            MapToken::Word(w) if w == "module" && depth == 0 => {
                if let Some(MapToken::Word(name)) = tokens.get(i + 1) {
                    entries.push(ModuleMapEntry {
                        name: name.clone(),
                        headers: Vec::new(),
                    });
                    i += 1;
                }
            }
            MapToken::Word(w) if w == "header" && depth > 0 => {
                let excluded = i > 0 && tokens[i - 1] == MapToken::Word("exclude".to_string());
                if let (Some(MapToken::Str(path)), Some(entry)) = (tokens.get(i + 1), entries.last_mut()) {
                    if !excluded {
                        entry.headers.push(base.join(path));
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    entries
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    Quoted(String),
    Angled(String),
    Import(String),
}

fn scan_directives(text: &str) -> Vec<Directive> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim_start();
        if let Some(rest) = line.strip_prefix("@import") {
            let path = rest.trim().trim_end_matches(';').trim();
            if let Some(top) = path.split('.').next().filter(|s| !s.is_empty()) {
                out.push(Directive::Import(top.to_string()));
            }
            continue;
        }
        let Some(rest) = line.strip_prefix('#') else {
            continue;
        };
        let rest = rest.trim_start();
        let Some(rest) = rest.strip_prefix("include").or_else(|| rest.strip_prefix("import")) else {
            continue;
        };
        let rest = rest.trim_start();
        if let Some(quoted) = rest.strip_prefix('"') {
            if let Some((path, _)) = quoted.split_once('"') {
                out.push(Directive::Quoted(path.to_string()));
            }
        } else if let Some(angled) = rest.strip_prefix('<') {
            if let Some((path, _)) = angled.split_once('>') {
                out.push(Directive::Angled(path.to_string()));
            }
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_module_map() {
        let text = r#"
// comment with module Fake { header "no.h" }
module Foo [system] {
  umbrella header "Foo.h"
  exclude header "Private.h"
  module Sub { header "Sub.h" }
  export *
}
module Bar { header "Bar.h" }
"#;
        let entries = parse_module_map(text, Path::new("/inc"));
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Foo", "Bar"]);
        assert_eq!(entries[0].headers, vec![PathBuf::from("/inc/Foo.h"), PathBuf::from("/inc/Sub.h")]);
        assert_eq!(entries[1].headers, vec![PathBuf::from("/inc/Bar.h")]);
    }

    #[test]
    fn test_scan_directives() {
        let text = "#include \"a.h\"\n  #import <Bar/Bar.h>\n# include <stdio.h>\n@import Baz.Sub;\n#include_next <x.h>\n#define X 1\n";
        assert_eq!(
            scan_directives(text),
            vec![
                Directive::Quoted("a.h".into()),
                Directive::Angled("Bar/Bar.h".into()),
                Directive::Angled("stdio.h".into()),
                Directive::Import("Baz".into()),
            ]
        );
    }

    #[test]
    fn test_header_base_for_framework() {
        assert_eq!(
            header_base(Path::new("/F/Foo.framework/Modules/module.modulemap")),
            PathBuf::from("/F/Foo.framework/Headers")
        );
        assert_eq!(header_base(Path::new("/inc/module.modulemap")), PathBuf::from("/inc"));
    }

    #[test]
    fn test_default_module_deps_are_empty() {
        let deps = ForeignModuleDeps::default();
        assert_eq!(deps.id, ForeignModuleId::default());
        assert!(deps.id.module_name.is_empty() && deps.id.context_hash.is_empty());
        assert!(deps.module_deps.is_empty());
    }

    #[test]
    fn test_context_hash_ignores_inputs() {
        let a: Vec<String> = ["clang", "-c", "-I", "/i", "a.h"].iter().map(|s| s.to_string()).collect();
        let b: Vec<String> = ["clang", "-c", "-I", "/i", "b.h"].iter().map(|s| s.to_string()).collect();
        let c: Vec<String> = ["clang", "-c", "-I", "/j", "a.h"].iter().map(|s| s.to_string()).collect();
        let hash = |args: &[String]| ScanContext::new(args, "/").unwrap().context_hash;
        assert_eq!(hash(&a), hash(&b));
        assert_ne!(hash(&a), hash(&c));
    }
}
