//! Queries over the records in a [`ModuleDependenciesCache`].
//!
//! Edges come from [`ModuleDependencyInfo::all_dependencies`](super::ModuleDependencyInfo::all_dependencies), so
//! foreign modules pulled in by a bridging header count as dependencies of the module that owns the header. Ids
//! without a record are leaves.

use std::collections::BTreeSet;

use quill_syntax::diagnostics::DiagnosticId;
use rustc_hash::FxHashSet;

use super::cache::ModuleDependenciesCache;
use super::{ModuleDependencyId, ModuleDependencyKind, ScanDiagnostic};

/// `kind:name`, e.g. `foreign:Bar`.
pub fn encode_id(id: &ModuleDependencyId) -> String {
    id.to_string()
}

pub fn decode_id(encoded: &str) -> Option<ModuleDependencyId> {
    let (kind, name) = encoded.split_once(':')?;
    if name.is_empty() {
        return None;
    }
    Some(ModuleDependencyId::new(name, ModuleDependencyKind::from_name(kind)?))
}

fn dependencies_of(cache: &ModuleDependenciesCache, id: &ModuleDependencyId) -> Vec<ModuleDependencyId> {
    cache.all_dependencies(id).unwrap_or_default()
}

/// Modules reachable from `root` (inclusive), each before everything it depends on.
pub fn topological_sort(cache: &ModuleDependenciesCache, root: &ModuleDependencyId) -> Vec<ModuleDependencyId> {
    let mut visited: FxHashSet<ModuleDependencyId> = FxHashSet::default();
    let mut postorder = Vec::new();
    // (node, children expanded)
    let mut stack = vec![(root.clone(), false)];

    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            postorder.push(id);
            continue;
        }
        if !visited.insert(id.clone()) {
            continue;
        }
        let deps = dependencies_of(cache, &id);
        stack.push((id, true));
        for dep in deps.into_iter().rev() {
            if !visited.contains(&dep) {
                stack.push((dep, false));
            }
        }
    }
    postorder.reverse();
    postorder
}

/// Every module `root` depends on, directly or not. `root` itself is excluded unless it lies on a cycle.
pub fn transitive_closure(cache: &ModuleDependenciesCache, root: &ModuleDependencyId) -> BTreeSet<ModuleDependencyId> {
    let mut closure = BTreeSet::new();
    let mut worklist = dependencies_of(cache, root);
    while let Some(id) = worklist.pop() {
        if closure.insert(id.clone()) {
            worklist.extend(dependencies_of(cache, &id));
        }
    }
    closure
}

/// Foreign modules reachable from the bridging header of `id`.
pub fn bridging_header_transitive_dependencies(
    cache: &ModuleDependenciesCache,
    id: &ModuleDependencyId,
) -> BTreeSet<ModuleDependencyId> {
    let Some(info) = cache.find_dependency(id) else {
        return BTreeSet::new();
    };
    let Some(header) = info.bridging_header() else {
        return BTreeSet::new();
    };
    let mut closure = BTreeSet::new();
    for name in &header.module_dependencies {
        let dep = ModuleDependencyId::foreign(name.as_str());
        closure.extend(transitive_closure(cache, &dep));
        closure.insert(dep);
    }
    closure
}

/// The first dependency cycle reachable from `root`, as a path that starts and ends at the same module.
pub fn find_cycle(cache: &ModuleDependenciesCache, root: &ModuleDependencyId) -> Option<Vec<ModuleDependencyId>> {
    let mut done: FxHashSet<ModuleDependencyId> = FxHashSet::default();
    let mut path: Vec<ModuleDependencyId> = Vec::new();
    visit_for_cycle(cache, root, &mut path, &mut done)
}

fn visit_for_cycle(
    cache: &ModuleDependenciesCache,
    id: &ModuleDependencyId,
    path: &mut Vec<ModuleDependencyId>,
    done: &mut FxHashSet<ModuleDependencyId>,
) -> Option<Vec<ModuleDependencyId>> {
    if let Some(start) = path.iter().position(|p| p == id) {
        let mut cycle = path[start..].to_vec();
        cycle.push(id.clone());
        return Some(cycle);
    }
    if done.contains(id) {
        return None;
    }
    path.push(id.clone());
    for dep in dependencies_of(cache, id) {
        if let Some(cycle) = visit_for_cycle(cache, &dep, path, done) {
            return Some(cycle);
        }
    }
    path.pop();
    done.insert(id.clone());
    None
}

fn module_file_name(id: &ModuleDependencyId) -> String {
    match id.kind {
        ModuleDependencyKind::Foreign => format!("{}.pcm", id.name),
        ModuleDependencyKind::TextualInterface | ModuleDependencyKind::Source => format!("{}.qmod", id.name),
    }
}

/// A `DependencyCycle` diagnostic for the first cycle reachable from `root`, if there is one.
pub fn diagnose_cycle(cache: &ModuleDependenciesCache, root: &ModuleDependencyId) -> Option<ScanDiagnostic> {
    let cycle = find_cycle(cache, root)?;
    let path: Vec<String> = cycle.iter().map(module_file_name).collect();
    Some(ScanDiagnostic::new(
        DiagnosticId::DependencyCycle,
        format!("module dependency cycle: '{}'", path.join(" -> ")),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dependencies::{
        BridgingHeader, ForeignModuleDetails, ModuleDependencyInfo, SourceModuleDetails, TextualModuleDetails,
    };

    fn record(cache: &ModuleDependenciesCache, id: ModuleDependencyId, deps: &[ModuleDependencyId]) {
        let mut info = match id.kind {
            ModuleDependencyKind::Foreign => ModuleDependencyInfo::for_foreign_module(ForeignModuleDetails::default()),
            ModuleDependencyKind::TextualInterface => {
                ModuleDependencyInfo::for_textual_module(TextualModuleDetails::default())
            }
            ModuleDependencyKind::Source => ModuleDependencyInfo::for_source_module(SourceModuleDetails::default()),
        };
        for dep in deps {
            info.add_module_dependency(dep.clone());
        }
        cache.record_dependencies([(id, info)]);
    }

    fn foreign(name: &str) -> ModuleDependencyId {
        ModuleDependencyId::foreign(name)
    }

    #[test]
    fn test_encode_decode() {
        let id = ModuleDependencyId::textual("Foo");
        assert_eq!(encode_id(&id), "textual:Foo");
        assert_eq!(decode_id("textual:Foo"), Some(id));
        assert_eq!(decode_id("foreign:"), None);
        assert_eq!(decode_id("bogus:Foo"), None);
        assert_eq!(decode_id("Foo"), None);
    }

    #[test]
    fn test_topological_sort_puts_dependents_first() {
        let cache = ModuleDependenciesCache::new("/mc");
        record(&cache, foreign("Foo"), &[foreign("Bar"), foreign("Baz")]);
        record(&cache, foreign("Bar"), &[foreign("Baz")]);
        record(&cache, foreign("Baz"), &[]);
        assert_eq!(
            topological_sort(&cache, &foreign("Foo")),
            vec![foreign("Foo"), foreign("Bar"), foreign("Baz")]
        );
    }

    #[test]
    fn test_transitive_closure_includes_unscanned_leaves() {
        let cache = ModuleDependenciesCache::new("/mc");
        record(&cache, foreign("Foo"), &[foreign("Bar")]);
        record(&cache, foreign("Bar"), &[foreign("Unscanned")]);
        let closure: Vec<_> = transitive_closure(&cache, &foreign("Foo")).into_iter().collect();
        assert_eq!(closure, vec![foreign("Bar"), foreign("Unscanned")]);
    }

    #[test]
    fn test_bridging_header_dependencies() {
        let cache = ModuleDependenciesCache::new("/mc");
        let app = ModuleDependencyId::source("App");
        let info = ModuleDependencyInfo::for_source_module(SourceModuleDetails {
            source_files: vec![],
            bridging_header: Some(BridgingHeader {
                path: "B.h".into(),
                module_dependencies: vec!["Bar".into()],
                ..BridgingHeader::default()
            }),
        });
        cache.record_dependencies([(app.clone(), info)]);
        record(&cache, foreign("Bar"), &[foreign("Baz")]);
        let deps: Vec<_> = bridging_header_transitive_dependencies(&cache, &app).into_iter().collect();
        assert_eq!(deps, vec![foreign("Bar"), foreign("Baz")]);
        assert_eq!(topological_sort(&cache, &app).first(), Some(&app));
    }

    #[test]
    fn test_cycle_diagnostic() {
        let cache = ModuleDependenciesCache::new("/mc");
        let a = ModuleDependencyId::textual("A");
        record(&cache, a.clone(), &[foreign("B")]);
        record(&cache, foreign("B"), &[a.clone()]);
        let diagnostic = diagnose_cycle(&cache, &a).unwrap();
        assert_eq!(diagnostic.id, DiagnosticId::DependencyCycle);
        assert_eq!(diagnostic.message, "module dependency cycle: 'A.qmod -> B.pcm -> A.qmod'");
        // Sorting still terminates.
        assert_eq!(topological_sort(&cache, &a).len(), 2);
    }

    #[test]
    fn test_acyclic_graph_has_no_cycle() {
        let cache = ModuleDependenciesCache::new("/mc");
        record(&cache, foreign("Foo"), &[foreign("Bar"), foreign("Baz")]);
        record(&cache, foreign("Bar"), &[foreign("Baz")]);
        assert!(diagnose_cycle(&cache, &foreign("Foo")).is_none());
    }
}
