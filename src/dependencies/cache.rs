//! The per-session module dependency cache.
//!
//! Records are keyed by [`ModuleDependencyId`]. The cache also remembers which foreign modules the scanning service
//! has already described, so later scans ask it only for what is new. Concurrent scans of the same module are
//! serialized with [`ModuleDependenciesCache::scan_lock`].

use std::fs;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{DependencyScanError, ForeignModuleId, ModuleDependencyId, ModuleDependencyInfo, ModuleDetails};

/// Maps a path into the form recorded in command lines (e.g. a prefix-mapped path).
pub type PathRemapper = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Remapper applying `old=new` prefix mappings. The first mapping whose prefix matches wins.
pub fn prefix_map_remapper(mappings: &[String]) -> PathRemapper {
    let pairs: Vec<(String, String)> = mappings
        .iter()
        .filter_map(|m| m.split_once('='))
        .map(|(old, new)| (old.to_string(), new.to_string()))
        .collect();
    Arc::new(move |path: &str| {
        for (old, new) in &pairs {
            if let Some(rest) = path.strip_prefix(old.as_str()) {
                return format!("{new}{rest}");
            }
        }
        path.to_string()
    })
}

/// Error reading or writing a serialized cache.
#[derive(Debug, Error)]
pub enum CacheSerializationError {
    #[error("cannot access dependency cache '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed dependency cache: {0}")]
    Format(#[from] serde_json::Error),
}

pub struct ModuleDependenciesCache {
    entries: DashMap<ModuleDependencyId, ModuleDependencyInfo>,
    seen_foreign_modules: RwLock<FxHashSet<ForeignModuleId>>,
    scan_locks: DashMap<ModuleDependencyId, Arc<Mutex<()>>>,
    module_output_path: String,
    remapper: Option<PathRemapper>,
}

impl std::fmt::Debug for ModuleDependenciesCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDependenciesCache")
            .field("entries", &self.entries.len())
            .field("module_output_path", &self.module_output_path)
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheSnapshot {
    module_output_path: String,
    seen_foreign_modules: Vec<ForeignModuleId>,
    entries: Vec<(ModuleDependencyId, ModuleDependencyInfo)>,
}

impl ModuleDependenciesCache {
    pub fn new(module_output_path: impl Into<String>) -> Self {
        Self {
            entries: DashMap::new(),
            seen_foreign_modules: RwLock::new(FxHashSet::default()),
            scan_locks: DashMap::new(),
            module_output_path: module_output_path.into(),
            remapper: None,
        }
    }

    pub fn with_remapper(mut self, remapper: PathRemapper) -> Self {
        self.remapper = Some(remapper);
        self
    }

    pub fn module_output_path(&self) -> &str {
        &self.module_output_path
    }

    /// Apply the path remapper; identity when none is set.
    pub fn remap_path(&self, path: &str) -> String {
        match &self.remapper {
            Some(remap) => remap(path),
            None => path.to_string(),
        }
    }

    pub fn find_dependency(&self, id: &ModuleDependencyId) -> Option<ModuleDependencyInfo> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &ModuleDependencyId) -> bool {
        self.entries.contains_key(id)
    }

    /// Snapshot of the foreign modules already described by the scanning service.
    pub fn already_seen_foreign_modules(&self) -> FxHashSet<ForeignModuleId> {
        self.seen_foreign_modules.read().clone()
    }

    /// Store scan results. A record already present under the same id is replaced.
    pub fn record_dependencies(&self, records: impl IntoIterator<Item = (ModuleDependencyId, ModuleDependencyInfo)>) {
        for (id, info) in records {
            if let ModuleDetails::Foreign(details) = &info.details {
                self.seen_foreign_modules
                    .write()
                    .insert(ForeignModuleId::new(id.name.as_str(), details.context_hash.as_str()));
            }
            tracing::trace!(module = %id, "recorded dependencies");
            self.entries.insert(id, info);
        }
    }

    /// Replace an existing record.
    pub fn update_dependency(&self, id: &ModuleDependencyId, info: ModuleDependencyInfo) -> Result<(), DependencyScanError> {
        match self.entries.get_mut(id) {
            Some(mut entry) => {
                *entry = info;
                Ok(())
            }
            None => Err(DependencyScanError::MissingRecord(id.clone())),
        }
    }

    /// Direct dependencies of `id`, including those of its bridging header.
    pub fn all_dependencies(&self, id: &ModuleDependencyId) -> Option<Vec<ModuleDependencyId>> {
        self.entries
            .get(id)
            .map(|entry| entry.value().all_dependencies().into_iter().collect())
    }

    /// Lock serializing scans of `id`. Hold the guard for the whole lookup-scan-record sequence.
    pub fn scan_lock(&self, id: &ModuleDependencyId) -> Arc<Mutex<()>> {
        self.scan_locks.entry(id.clone()).or_default().value().clone()
    }

    /// All record ids, sorted.
    pub fn module_ids(&self) -> Vec<ModuleDependencyId> {
        let mut ids: Vec<_> = self.entries.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    pub fn to_json(&self) -> Result<String, CacheSerializationError> {
        let mut seen: Vec<_> = self.already_seen_foreign_modules().into_iter().collect();
        seen.sort();
        let snapshot = CacheSnapshot {
            module_output_path: self.module_output_path.clone(),
            seen_foreign_modules: seen,
            entries: self
                .module_ids()
                .into_iter()
                .filter_map(|id| self.find_dependency(&id).map(|info| (id, info)))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Rebuild a cache from [`to_json`](Self::to_json) output. The remapper is not serialized.
    pub fn from_json(json: &str) -> Result<Self, CacheSerializationError> {
        let snapshot: CacheSnapshot = serde_json::from_str(json)?;
        let cache = Self::new(snapshot.module_output_path);
        cache.seen_foreign_modules.write().extend(snapshot.seen_foreign_modules);
        for (id, info) in snapshot.entries {
            cache.entries.insert(id, info);
        }
        Ok(cache)
    }

    #[tracing::instrument(skip(self), fields(entries = self.len()))]
    pub fn serialize_to(&self, path: &Path) -> Result<(), CacheSerializationError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| CacheSerializationError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    #[tracing::instrument]
    pub fn deserialize_from(path: &Path) -> Result<Self, CacheSerializationError> {
        let json = fs::read_to_string(path).map_err(|source| CacheSerializationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dependencies::{ForeignModuleDetails, SourceModuleDetails};

    fn foreign(name: &str, hash: &str) -> (ModuleDependencyId, ModuleDependencyInfo) {
        let info = ModuleDependencyInfo::for_foreign_module(ForeignModuleDetails {
            context_hash: hash.into(),
            ..ForeignModuleDetails::default()
        });
        (ModuleDependencyId::foreign(name), info)
    }

    #[test]
    fn test_record_marks_foreign_modules_seen() {
        let cache = ModuleDependenciesCache::new("/mc");
        cache.record_dependencies([foreign("Bar", "H1")]);
        cache.record_dependencies([(
            ModuleDependencyId::source("App"),
            ModuleDependencyInfo::for_source_module(SourceModuleDetails::default()),
        )]);
        let seen = cache.already_seen_foreign_modules();
        assert_eq!(seen.len(), 1);
        assert!(seen.contains(&ForeignModuleId::new("Bar", "H1")));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_update_missing_record_is_error() {
        let cache = ModuleDependenciesCache::new("/mc");
        let (id, info) = foreign("Bar", "H1");
        assert!(matches!(
            cache.update_dependency(&id, info.clone()),
            Err(DependencyScanError::MissingRecord(_))
        ));
        cache.record_dependencies([(id.clone(), info.clone())]);
        let mut updated = info;
        updated.set_resolved(true);
        cache.update_dependency(&id, updated).unwrap();
        assert!(cache.find_dependency(&id).unwrap().resolved);
    }

    #[test]
    fn test_remapper_defaults_to_identity() {
        let cache = ModuleDependenciesCache::new("/mc");
        assert_eq!(cache.remap_path("/a/b"), "/a/b");
        let cache = cache.with_remapper(Arc::new(|p: &str| p.replace("/a", "/^a")));
        assert_eq!(cache.remap_path("/a/b"), "/^a/b");
    }

    #[test]
    fn test_prefix_map_remapper() {
        let remap = prefix_map_remapper(&["/src=/^src".to_string(), "/sdk=/^sdk".to_string(), "bogus".to_string()]);
        assert_eq!(remap("/src/a.h"), "/^src/a.h");
        assert_eq!(remap("/sdk/usr/include"), "/^sdk/usr/include");
        assert_eq!(remap("/other/a.h"), "/other/a.h");
    }

    #[test]
    fn test_scan_lock_is_shared_per_id() {
        let cache = ModuleDependenciesCache::new("/mc");
        let a = cache.scan_lock(&ModuleDependencyId::foreign("Bar"));
        let b = cache.scan_lock(&ModuleDependencyId::foreign("Bar"));
        let c = cache.scan_lock(&ModuleDependencyId::foreign("Baz"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_json_round_trip_preserves_records_and_seen_set() {
        let cache = ModuleDependenciesCache::new("/mc");
        cache.record_dependencies([foreign("Bar", "H1"), foreign("Baz", "H1")]);
        let restored = ModuleDependenciesCache::from_json(&cache.to_json().unwrap()).unwrap();
        assert_eq!(restored.module_ids(), cache.module_ids());
        assert_eq!(restored.already_seen_foreign_modules(), cache.already_seen_foreign_modules());
        assert_eq!(restored.module_output_path(), "/mc");
    }

    #[test]
    fn test_serialize_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = ModuleDependenciesCache::new("/mc");
        cache.record_dependencies([foreign("Bar", "H1")]);
        cache.serialize_to(&path).unwrap();
        let restored = ModuleDependenciesCache::deserialize_from(&path).unwrap();
        assert!(restored.contains(&ModuleDependencyId::foreign("Bar")));
        assert!(ModuleDependenciesCache::deserialize_from(&dir.path().join("missing.json")).is_err());
    }
}
