//! Foreign importer command lines for dependency scanning.
//!
//! The importer's base driver arguments are captured once as a structured [`ImporterArgs`] template. The two
//! elements scanning depends on (the input placeholder and the syntax-only action) are checked when the template is
//! built, so rendering a scan command line can never fail.

use std::path::Path;

use thiserror::Error;

use super::{ForeignModuleId, ModuleOutputKind};
use crate::config::ScanConfig;

/// Marker token standing in for the scanned input in the importer's driver arguments.
pub const INPUT_PLACEHOLDER: &str = "<quill-imported-modules>";
/// Action flag the importer normally runs with.
pub const SYNTAX_ONLY_FLAG: &str = "-fsyntax-only";
/// Action flag scanning runs with instead, so dependency edges match a real build.
pub const COMPILE_FLAG: &str = "-c";
/// Prefix of the module-format flag that scanning drops, together with the argument before it.
pub const MODULE_FORMAT_PREFIX: &str = "-fmodule-format=";
/// Appended to every scan command line: built modules embed module-level debug info.
pub const DEBUG_MODULES_FLAG: &str = "-gmodules";
pub const WORKING_DIRECTORY_FLAG: &str = "-working-directory";

/// The importer template is missing an element scanning relies on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("importer arguments do not contain the input placeholder '{INPUT_PLACEHOLDER}'")]
    MissingPlaceholder,
    #[error("importer arguments do not contain the '{SYNTAX_ONLY_FLAG}' action")]
    MissingSyntaxOnlyAction,
    #[error("'{0}' must be preceded by the argument it is paired with")]
    UnpairedModuleFormat(String),
}

/// Action slot of the importer template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImporterAction {
    SyntaxOnly,
    Compile,
}

impl ImporterAction {
    pub fn as_flag(self) -> &'static str {
        match self {
            ImporterAction::SyntaxOnly => SYNTAX_ONLY_FLAG,
            ImporterAction::Compile => COMPILE_FLAG,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateArg {
    Literal(String),
    Input,
    Action(ImporterAction),
    /// `<prefix> -fmodule-format=<fmt>` (e.g. `-Xclang -fmodule-format=obj`).
    ModuleFormat { prefix: String, flag: String },
}

/// What a scan command line is built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanInput {
    /// A named module: the placeholder is dropped.
    Module(String),
    /// A file (e.g. a bridging header): the placeholder becomes the path.
    TranslationUnit(String),
}

/// Structured foreign importer driver arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImporterArgs {
    args: Vec<TemplateArg>,
}

impl ImporterArgs {
    /// Classify flat driver arguments into a template.
    ///
    /// ## Errors
    /// - [`TemplateError::MissingPlaceholder`] / [`TemplateError::MissingSyntaxOnlyAction`] when a required element
    ///   is absent. These indicate a broken toolchain configuration, not user error.
    pub fn from_driver_args(driver_args: &[String]) -> Result<Self, TemplateError> {
        let mut args: Vec<TemplateArg> = Vec::with_capacity(driver_args.len());
        let mut has_input = false;
        let mut has_action = false;
        let mut has_format = false;

        for arg in driver_args {
            if arg == INPUT_PLACEHOLDER && !has_input {
                has_input = true;
                args.push(TemplateArg::Input);
            } else if arg == SYNTAX_ONLY_FLAG && !has_action {
                has_action = true;
                args.push(TemplateArg::Action(ImporterAction::SyntaxOnly));
            } else if arg.starts_with(MODULE_FORMAT_PREFIX) && !has_format {
                has_format = true;
                let prefix = match args.pop() {
                    Some(TemplateArg::Literal(prefix)) => prefix,
                    _ => return Err(TemplateError::UnpairedModuleFormat(arg.clone())),
                };
                args.push(TemplateArg::ModuleFormat {
                    prefix,
                    flag: arg.clone(),
                });
            } else {
                args.push(TemplateArg::Literal(arg.clone()));
            }
        }

        if !has_input {
            return Err(TemplateError::MissingPlaceholder);
        }
        if !has_action {
            return Err(TemplateError::MissingSyntaxOnlyAction);
        }
        Ok(Self { args })
    }

    /// The template as flat driver arguments, exactly as it was given.
    pub fn to_driver_args(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.args.len() + 1);
        for arg in &self.args {
            match arg {
                TemplateArg::Literal(s) => out.push(s.clone()),
                TemplateArg::Input => out.push(INPUT_PLACEHOLDER.to_string()),
                TemplateArg::Action(action) => out.push(action.as_flag().to_string()),
                TemplateArg::ModuleFormat { prefix, flag } => {
                    out.push(prefix.clone());
                    out.push(flag.clone());
                }
            }
        }
        out
    }

    /// Render for scanning: the input is substituted (or dropped), the module-format pair is removed and the action
    /// becomes a compile.
    pub fn render_for_scan(&self, input: &ScanInput) -> Vec<String> {
        let mut out = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            match arg {
                TemplateArg::Literal(s) => out.push(s.clone()),
                TemplateArg::Input => {
                    if let ScanInput::TranslationUnit(path) = input {
                        out.push(path.clone());
                    }
                }
                TemplateArg::Action(_) => out.push(ImporterAction::Compile.as_flag().to_string()),
                TemplateArg::ModuleFormat { .. } => {}
            }
        }
        out
    }
}

impl Default for ImporterArgs {
    fn default() -> Self {
        Self {
            args: vec![
                TemplateArg::Literal("clang".to_string()),
                TemplateArg::Literal("-x".to_string()),
                TemplateArg::Literal("c".to_string()),
                TemplateArg::Action(ImporterAction::SyntaxOnly),
                TemplateArg::Literal("-fmodules".to_string()),
                TemplateArg::ModuleFormat {
                    prefix: "-Xclang".to_string(),
                    flag: "-fmodule-format=obj".to_string(),
                },
                TemplateArg::Input,
            ],
        }
    }
}

/// Build the full command line for a dependency scan of `input`.
pub fn dependency_scanning_arguments(config: &ScanConfig, input: &ScanInput) -> Vec<String> {
    let mut args = config.importer.render_for_scan(input);

    let search = &config.search_paths;
    for framework in &search.framework_paths {
        args.push(if framework.is_system { "-iframework" } else { "-F" }.to_string());
        args.push(framework.path.clone());
    }
    for path in &search.import_paths {
        args.push("-I".to_string());
        args.push(path.clone());
    }
    for mapping in &search.scanner_prefix_map {
        args.push(format!("-fdepscan-prefix-map={mapping}"));
    }

    args.push(DEBUG_MODULES_FLAG.to_string());
    args
}

/// Working directory for a scan.
///
/// The last `-working-directory` on the command line wins; its value is the argument that follows it. Without the
/// flag, `ambient` is used. Returns `None` when the flag has no value: it is the final argument, or the next argument
/// is itself a flag.
pub fn compute_working_directory(args: &[String], ambient: &str) -> Option<String> {
    match args.iter().rposition(|a| a == WORKING_DIRECTORY_FLAG) {
        None => Some(ambient.to_string()),
        Some(pos) => args.get(pos + 1).filter(|value| !value.starts_with('-')).cloned(),
    }
}

/// Deterministic output location for a module artifact under the module cache root.
///
/// `DependencyTargets` is the bare `<name>-<hash>` stem and ignores `root`.
pub fn lookup_module_output(id: &ForeignModuleId, kind: ModuleOutputKind, root: &str) -> String {
    let stem = format!("{}-{}", id.module_name, id.context_hash);
    match kind.extension() {
        None => stem,
        Some(ext) => Path::new(root)
            .join(format!("{stem}.{ext}"))
            .to_string_lossy()
            .into_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{FrameworkPath, ScanConfig};

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_template_requires_placeholder_and_action() {
        assert_eq!(
            ImporterArgs::from_driver_args(&strings(&["clang", "-fsyntax-only"])),
            Err(TemplateError::MissingPlaceholder)
        );
        assert_eq!(
            ImporterArgs::from_driver_args(&strings(&["clang", INPUT_PLACEHOLDER])),
            Err(TemplateError::MissingSyntaxOnlyAction)
        );
        assert_eq!(
            ImporterArgs::from_driver_args(&strings(&["-fmodule-format=obj", "-fsyntax-only", INPUT_PLACEHOLDER])),
            Err(TemplateError::UnpairedModuleFormat("-fmodule-format=obj".to_string()))
        );
    }

    #[test]
    fn test_template_round_trips_driver_args() {
        let raw = strings(&[
            "clang",
            "-fsyntax-only",
            "-Xclang",
            "-fmodule-format=raw",
            INPUT_PLACEHOLDER,
            "-DX=1",
        ]);
        let template = ImporterArgs::from_driver_args(&raw).unwrap();
        assert_eq!(template.to_driver_args(), raw);
    }

    #[test]
    fn test_render_for_module_scan() {
        let rendered = ImporterArgs::default().render_for_scan(&ScanInput::Module("Foo".into()));
        assert_eq!(rendered, strings(&["clang", "-x", "c", "-c", "-fmodules"]));
    }

    #[test]
    fn test_render_for_translation_unit_scan() {
        let rendered = ImporterArgs::default().render_for_scan(&ScanInput::TranslationUnit("Bridging.h".into()));
        assert_eq!(rendered, strings(&["clang", "-x", "c", "-c", "-fmodules", "Bridging.h"]));
    }

    #[test]
    fn test_scanning_arguments_append_search_paths() {
        let config = ScanConfig::new()
            .with_framework_path(FrameworkPath::new("/sys/Frameworks", true))
            .with_framework_path(FrameworkPath::new("/my/Frameworks", false))
            .with_import_path("/usr/include/quill")
            .with_scanner_prefix_map("/src=/^src");
        let args = dependency_scanning_arguments(&config, &ScanInput::Module("Foo".into()));
        assert_eq!(
            args[5..],
            strings(&[
                "-iframework",
                "/sys/Frameworks",
                "-F",
                "/my/Frameworks",
                "-I",
                "/usr/include/quill",
                "-fdepscan-prefix-map=/src=/^src",
                "-gmodules",
            ])[..]
        );
        assert!(!args.iter().any(|a| a == SYNTAX_ONLY_FLAG || a.starts_with(MODULE_FORMAT_PREFIX)));
    }

    #[test]
    fn test_working_directory_last_flag_wins() {
        let args = strings(&["-working-directory", "/a", "-c", "-working-directory", "/b"]);
        assert_eq!(compute_working_directory(&args, "/cwd"), Some("/b".to_string()));
    }

    #[test]
    fn test_working_directory_defaults_to_ambient() {
        assert_eq!(compute_working_directory(&strings(&["-c"]), "/cwd"), Some("/cwd".to_string()));
    }

    #[test]
    fn test_working_directory_flag_without_value() {
        assert_eq!(compute_working_directory(&strings(&["-c", "-working-directory"]), "/cwd"), None);
        assert_eq!(
            compute_working_directory(&strings(&["-working-directory", "-gmodules"]), "/cwd"),
            None
        );
    }

    #[test]
    fn test_lookup_module_output_is_deterministic() {
        let id = ForeignModuleId::new("Foo", "ABC123");
        assert_eq!(lookup_module_output(&id, ModuleOutputKind::ModuleFile, "/cache"), "/cache/Foo-ABC123.pcm");
        assert_eq!(lookup_module_output(&id, ModuleOutputKind::DependencyFile, "/cache"), "/cache/Foo-ABC123.d");
        assert_eq!(
            lookup_module_output(&id, ModuleOutputKind::DiagnosticSerializationFile, "/cache"),
            "/cache/Foo-ABC123.dia"
        );
        assert_eq!(lookup_module_output(&id, ModuleOutputKind::DependencyTargets, "/cache"), "Foo-ABC123");
        assert_eq!(lookup_module_output(&id, ModuleOutputKind::DependencyTargets, "/other"), "Foo-ABC123");
    }
}
