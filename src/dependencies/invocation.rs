//! Foreign compiler invocations.
//!
//! [`ForeignInvocation::from_args`] parses frontend arguments into typed fields and
//! [`ForeignInvocation::to_args`] writes them back in one canonical order. Parsing the output again yields the same
//! invocation, which is what lets the bridge clear fields and re-serialize arguments it did not write itself.

use thiserror::Error;

/// Arguments that cannot be parsed as a foreign invocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error("missing value for '{0}'")]
    MissingValue(String),
    #[error("malformed '{flag}' value '{value}'")]
    MalformedValue { flag: String, value: String },
}

/// Frontend action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActionKind {
    ParseSyntaxOnly,
    GenerateModule,
    GeneratePch,
    #[default]
    EmitObj,
}

impl ActionKind {
    pub fn as_flag(self) -> &'static str {
        match self {
            ActionKind::ParseSyntaxOnly => "-fsyntax-only",
            ActionKind::GenerateModule => "-emit-module",
            ActionKind::GeneratePch => "-emit-pch",
            ActionKind::EmitObj => "-emit-obj",
        }
    }

    fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "-fsyntax-only" => Some(ActionKind::ParseSyntaxOnly),
            "-emit-module" => Some(ActionKind::GenerateModule),
            "-emit-pch" => Some(ActionKind::GeneratePch),
            "-emit-obj" => Some(ActionKind::EmitObj),
            _ => None,
        }
    }
}

/// A `-fmodule-file-cache-key <path> <key>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCacheKey {
    pub path: String,
    pub key: String,
}

/// Parsed frontend invocation of the foreign compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignInvocation {
    pub action: ActionKind,
    pub language: Option<String>,
    pub output_file: String,
    pub module_name: Option<String>,
    pub working_directory: Option<String>,
    pub defines: Vec<String>,
    pub include_paths: Vec<String>,
    /// `(path, is_system)`
    pub framework_paths: Vec<(String, bool)>,
    pub vfs_overlays: Vec<String>,
    pub module_map_files: Vec<String>,
    pub module_cache_keys: Vec<ModuleCacheKey>,
    /// `old=new` prefix mappings.
    pub path_prefix_mappings: Vec<String>,
    /// Flags with no dedicated field, kept in order.
    pub passthrough: Vec<String>,
    pub inputs: Vec<String>,
}

const CC1_FLAG: &str = "-cc1";
const MODULE_NAME_PREFIX: &str = "-fmodule-name=";
const MODULE_MAP_FILE_PREFIX: &str = "-fmodule-map-file=";
const PREFIX_MAP_PREFIX: &str = "-fdepscan-prefix-map=";
const MODULE_CACHE_KEY_FLAG: &str = "-fmodule-file-cache-key";

impl ForeignInvocation {
    /// Parse frontend arguments. A leading `-cc1` is accepted and dropped.
    pub fn from_args(args: &[String]) -> Result<Self, InvocationError> {
        let mut inv = ForeignInvocation::default();
        let mut iter = args.iter().peekable();
        if iter.peek().is_some_and(|a| *a == CC1_FLAG) {
            iter.next();
        }

        fn value<'a>(
            flag: &str,
            iter: &mut impl Iterator<Item = &'a String>,
        ) -> Result<String, InvocationError> {
            iter.next()
                .cloned()
                .ok_or_else(|| InvocationError::MissingValue(flag.to_string()))
        }

        while let Some(arg) = iter.next() {
            if let Some(action) = ActionKind::from_flag(arg) {
                inv.action = action;
                continue;
            }
            match arg.as_str() {
                "-x" => inv.language = Some(value(arg, &mut iter)?),
                "-o" => inv.output_file = value(arg, &mut iter)?,
                "-working-directory" => inv.working_directory = Some(value(arg, &mut iter)?),
                "-D" => inv.defines.push(value(arg, &mut iter)?),
                "-I" => inv.include_paths.push(value(arg, &mut iter)?),
                "-F" => inv.framework_paths.push((value(arg, &mut iter)?, false)),
                "-iframework" => inv.framework_paths.push((value(arg, &mut iter)?, true)),
                "-ivfsoverlay" => inv.vfs_overlays.push(value(arg, &mut iter)?),
                MODULE_CACHE_KEY_FLAG => {
                    let path = value(arg, &mut iter)?;
                    let key = value(arg, &mut iter)?;
                    inv.module_cache_keys.push(ModuleCacheKey { path, key });
                }
                _ => {
                    if let Some(name) = arg.strip_prefix(MODULE_NAME_PREFIX) {
                        inv.module_name = Some(name.to_string());
                    } else if let Some(path) = arg.strip_prefix(MODULE_MAP_FILE_PREFIX) {
                        inv.module_map_files.push(path.to_string());
                    } else if let Some(mapping) = arg.strip_prefix(PREFIX_MAP_PREFIX) {
                        if !mapping.contains('=') {
                            return Err(InvocationError::MalformedValue {
                                flag: PREFIX_MAP_PREFIX.to_string(),
                                value: mapping.to_string(),
                            });
                        }
                        inv.path_prefix_mappings.push(mapping.to_string());
                    } else if let Some(define) = arg.strip_prefix("-D").filter(|d| !d.is_empty()) {
                        inv.defines.push(define.to_string());
                    } else if let Some(path) = arg.strip_prefix("-I").filter(|p| !p.is_empty()) {
                        inv.include_paths.push(path.to_string());
                    } else if arg.starts_with('-') {
                        inv.passthrough.push(arg.clone());
                    } else {
                        inv.inputs.push(arg.clone());
                    }
                }
            }
        }
        Ok(inv)
    }

    /// Canonical frontend arguments (without `-cc1`).
    pub fn to_args(&self) -> Vec<String> {
        let mut out = vec![self.action.as_flag().to_string()];
        if let Some(language) = &self.language {
            out.push("-x".to_string());
            out.push(language.clone());
        }
        if let Some(name) = &self.module_name {
            out.push(format!("{MODULE_NAME_PREFIX}{name}"));
        }
        if let Some(dir) = &self.working_directory {
            out.push("-working-directory".to_string());
            out.push(dir.clone());
        }
        for define in &self.defines {
            out.push("-D".to_string());
            out.push(define.clone());
        }
        for path in &self.include_paths {
            out.push("-I".to_string());
            out.push(path.clone());
        }
        for (path, is_system) in &self.framework_paths {
            out.push(if *is_system { "-iframework" } else { "-F" }.to_string());
            out.push(path.clone());
        }
        for overlay in &self.vfs_overlays {
            out.push("-ivfsoverlay".to_string());
            out.push(overlay.clone());
        }
        for path in &self.module_map_files {
            out.push(format!("{MODULE_MAP_FILE_PREFIX}{path}"));
        }
        for entry in &self.module_cache_keys {
            out.push(MODULE_CACHE_KEY_FLAG.to_string());
            out.push(entry.path.clone());
            out.push(entry.key.clone());
        }
        for mapping in &self.path_prefix_mappings {
            out.push(format!("{PREFIX_MAP_PREFIX}{mapping}"));
        }
        out.extend(self.passthrough.iter().cloned());
        if !self.output_file.is_empty() {
            out.push("-o".to_string());
            out.push(self.output_file.clone());
        }
        out.extend(self.inputs.iter().cloned());
        out
    }

    /// Drop the fields that must not reach a host command line: per-module cache keys and prefix mappings.
    pub fn clear_cache_state(&mut self) {
        self.module_cache_keys.clear();
        self.path_prefix_mappings.clear();
    }
}
