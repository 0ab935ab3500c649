//! Analyzer invocation template.

use std::ffi::OsString;
use std::path::Path;

use pyright_bridge_types::PyrightSettings;

/// The analyzer's command line minus the watched files.
///
/// Built once per configuration; the watch set is appended on every spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerCommand {
    program: String,
    base_args: Vec<OsString>,
}

impl AnalyzerCommand {
    /// `[exe, --outputjson, --watch, --level=L?, --pythonpath=P?,
    /// --ignoreexternal?, --skipunannotated?]`
    #[must_use]
    pub fn from_settings(settings: &PyrightSettings) -> Self {
        let mut base_args: Vec<OsString> = vec!["--outputjson".into(), "--watch".into()];

        if let Some(level) = settings.level() {
            base_args.push(format!("--level={level}").into());
        }
        if let Some(python_path) = settings.python_path() {
            let mut arg = OsString::from("--pythonpath=");
            arg.push(python_path);
            base_args.push(arg);
        }
        if settings.ignore_external() {
            base_args.push("--ignoreexternal".into());
        }
        if settings.skip_unannotated() {
            base_args.push("--skipunannotated".into());
        }

        Self {
            program: settings.variant().executable().to_string(),
            base_args,
        }
    }

    /// An arbitrary program with fixed leading arguments.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, base_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            base_args: base_args.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn base_args(&self) -> &[OsString] {
        &self.base_args
    }

    /// Full argument list: the fixed arguments followed by every watched file.
    pub fn args_for<'a>(&self, watched: impl IntoIterator<Item = &'a Path>) -> Vec<OsString> {
        self.base_args
            .iter()
            .cloned()
            .chain(watched.into_iter().map(|path| path.as_os_str().to_os_string()))
            .collect()
    }
}
