//! Dependency scanning configuration.
//!
//! [`ScanConfig`] carries everything a scan needs from the surrounding compilation: the foreign importer's driver
//! template, search paths, content-addressed storage (CAS) options and the module cache root. It is built in code
//! with `with_*` methods, or loaded from JSON with CLI flags layered on top.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dependencies::command_line::{ImporterArgs, TemplateError};

/// Error loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// A framework search path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkPath {
    pub path: String,
    #[serde(default)]
    pub is_system: bool,
}

impl FrameworkPath {
    pub fn new(path: impl Into<String>, is_system: bool) -> Self {
        Self {
            path: path.into(),
            is_system,
        }
    }
}

/// Search paths forwarded to the foreign scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchPathOptions {
    pub framework_paths: Vec<FrameworkPath>,
    pub import_paths: Vec<String>,
    /// `old=new` prefix mappings applied by the scanner.
    pub scanner_prefix_map: Vec<String>,
    pub vfs_overlay_files: Vec<String>,
}

/// Content-addressed storage (compilation caching) options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CasOptions {
    pub enabled: bool,
    pub on_disk_path: Option<String>,
    pub plugin_path: Option<String>,
}

impl CasOptions {
    /// Frontend flags reproducing this CAS configuration. Empty when caching is disabled.
    pub fn configuration_flags(&self) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }
        let mut flags = vec!["-cache-compile-job".to_string()];
        if let Some(path) = &self.on_disk_path {
            flags.push("-cas-path".to_string());
            flags.push(path.clone());
        }
        if let Some(path) = &self.plugin_path {
            flags.push("-cas-plugin-path".to_string());
            flags.push(path.clone());
        }
        flags
    }
}

/// Configuration for one scanning session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanConfig {
    /// Base driver arguments of the foreign importer.
    #[serde(with = "importer_serde")]
    pub importer: ImporterArgs,
    pub search_paths: SearchPathOptions,
    pub cas: CasOptions,
    /// Root directory for built module artifacts.
    pub module_output_path: String,
    /// Effective host language version, recorded in each module's captured arguments.
    pub language_version: String,
    /// Working directory used when the importer arguments do not set one.
    pub working_directory: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            importer: ImporterArgs::default(),
            search_paths: SearchPathOptions::default(),
            cas: CasOptions::default(),
            module_output_path: "ModuleCache".to_string(),
            language_version: "1".to_string(),
            working_directory: None,
        }
    }
}

impl ScanConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON config. Missing fields keep their defaults.
    pub fn from_json_str(json: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json, path)
    }

    pub fn with_importer(mut self, importer: ImporterArgs) -> Self {
        self.importer = importer;
        self
    }

    /// Replace the importer template with flat driver arguments.
    pub fn with_importer_args(self, args: &[String]) -> Result<Self, ConfigError> {
        Ok(self.with_importer(ImporterArgs::from_driver_args(args)?))
    }

    pub fn with_framework_path(mut self, path: FrameworkPath) -> Self {
        self.search_paths.framework_paths.push(path);
        self
    }

    pub fn with_import_path(mut self, path: impl Into<String>) -> Self {
        self.search_paths.import_paths.push(path.into());
        self
    }

    pub fn with_scanner_prefix_map(mut self, mapping: impl Into<String>) -> Self {
        self.search_paths.scanner_prefix_map.push(mapping.into());
        self
    }

    pub fn with_vfs_overlay(mut self, overlay: impl Into<String>) -> Self {
        self.search_paths.vfs_overlay_files.push(overlay.into());
        self
    }

    pub fn with_cas(mut self, cas: CasOptions) -> Self {
        self.cas = cas;
        self
    }

    /// Set the module cache root
    pub fn with_module_output_path(mut self, path: impl Into<String>) -> Self {
        self.module_output_path = path.into();
        self
    }

    pub fn with_language_version(mut self, version: impl Into<String>) -> Self {
        self.language_version = version.into();
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Arguments recorded on every bridged foreign module, so consumers can tell which host language version its
    /// API notes were applied for.
    pub fn captured_pcm_args(&self) -> Vec<String> {
        vec![
            "-Xcc".to_string(),
            format!("-fapinotes-host-version={}", self.language_version),
        ]
    }
}

/// The importer template is stored as its flat driver arguments.
mod importer_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::dependencies::command_line::ImporterArgs;

    pub fn serialize<S: Serializer>(importer: &ImporterArgs, serializer: S) -> Result<S::Ok, S::Error> {
        importer.to_driver_args().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ImporterArgs, D::Error> {
        let args = Vec::<String>::deserialize(deserializer)?;
        ImporterArgs::from_driver_args(&args).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.module_output_path, "ModuleCache");
        assert!(config.search_paths.import_paths.is_empty());
        assert!(config.cas.configuration_flags().is_empty());
        assert_eq!(config.working_directory, None);
    }

    #[test]
    fn test_cas_configuration_flags() {
        let cas = CasOptions {
            enabled: true,
            on_disk_path: Some("/cas".into()),
            plugin_path: Some("/lib/plugin.so".into()),
        };
        assert_eq!(
            cas.configuration_flags(),
            vec!["-cache-compile-job", "-cas-path", "/cas", "-cas-plugin-path", "/lib/plugin.so"]
        );
    }

    #[test]
    fn test_captured_pcm_args() {
        let config = ScanConfig::new().with_language_version("6");
        assert_eq!(config.captured_pcm_args(), vec!["-Xcc", "-fapinotes-host-version=6"]);
    }

    #[test]
    fn test_json_partial_config_keeps_defaults() {
        let json = r#"{ "searchPaths": { "importPaths": ["/inc"] }, "cas": { "enabled": true } }"#;
        let config = ScanConfig::from_json_str(json, Path::new("quill.json")).unwrap();
        assert_eq!(config.search_paths.import_paths, vec!["/inc"]);
        assert!(config.cas.enabled);
        assert_eq!(config.importer, ImporterArgs::default());
        assert_eq!(config.module_output_path, "ModuleCache");
    }

    #[test]
    fn test_json_round_trip() {
        let config = ScanConfig::new()
            .with_framework_path(FrameworkPath::new("/F", true))
            .with_vfs_overlay("/overlay.yaml")
            .with_working_directory("/work");
        let json = serde_json::to_string(&config).unwrap();
        let back = ScanConfig::from_json_str(&json, Path::new("inline")).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_json_rejects_importer_without_placeholder() {
        let json = r#"{ "importer": ["clang", "-fsyntax-only"] }"#;
        let err = ScanConfig::from_json_str(json, Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("placeholder"), "{err}");
    }

    #[test]
    fn test_load_missing_file() {
        let err = ScanConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
