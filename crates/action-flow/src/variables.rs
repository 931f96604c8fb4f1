//! Placeholder resolution
//!
//! Step values and selector locators may embed `{{NAME}}` placeholders, where
//! NAME is a non-empty run of ASCII letters, digits, `_`, `.` or `-`. Anything
//! else that merely looks like a placeholder (`{{ NAME }}`, `{{}}`, unbalanced
//! braces) is literal text.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use replayer_core_types::Workflow;
use thiserror::Error;
use tracing::{debug, info};

use crate::errors::ReplayError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')
}

/// Byte ranges and names of every well-formed placeholder in `text`.
fn scan(text: &str) -> Vec<(Range<usize>, &str)> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = text[cursor..].find(OPEN) {
        let start = cursor + offset;
        let name_start = start + OPEN.len();
        let Some(close) = text[name_start..].find(CLOSE) else {
            break;
        };
        let name = &text[name_start..name_start + close];
        if !name.is_empty() && name.chars().all(is_name_char) {
            let end = name_start + close + CLOSE.len();
            found.push((start..end, name));
            cursor = end;
        } else {
            cursor = start + 1;
        }
    }
    found
}

/// Distinct placeholder names in `text`, in order of first appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    scan(text)
        .into_iter()
        .filter(|(_, name)| seen.insert(*name))
        .map(|(_, name)| name.to_string())
        .collect()
}

/// Sorted distinct placeholder names across every step value and locator.
pub fn required_variables(workflow: &Workflow) -> Vec<String> {
    let mut names = BTreeSet::new();
    for step in &workflow.steps {
        let texts = step
            .value
            .iter()
            .map(String::as_str)
            .chain(step.selector_candidates.iter().map(|c| c.value.as_str()));
        for text in texts {
            names.extend(scan(text).into_iter().map(|(_, name)| name.to_string()));
        }
    }
    names.into_iter().collect()
}

/// Failure to read the environment file.
#[derive(Debug, Error)]
#[error("failed to read environment file {path}: {reason}")]
pub struct EnvError {
    pub path: PathBuf,
    pub reason: String,
}

/// Flat, immutable name -> value map the resolver falls back to.
///
/// Loaded once per process and shared between runs; never reloaded mid-run.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: BTreeMap<String, String>,
}

impl EnvSource {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse a dotenv file without touching the process environment. A
    /// missing file yields an empty source.
    pub fn from_dotenv(path: &Path) -> Result<Self, EnvError> {
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(err) if err.not_found() => {
                debug!(path = %path.display(), "environment file not present");
                return Ok(Self::empty());
            }
            Err(err) => {
                return Err(EnvError {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                })
            }
        };

        let mut vars = BTreeMap::new();
        for item in iter {
            let (key, value) = item.map_err(|err| EnvError {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
            vars.insert(key, value);
        }
        Ok(Self { vars })
    }

    /// Load the dotenv file and, when `inherit_process` is set, layer a
    /// snapshot of the process environment above it.
    pub fn load(path: Option<&Path>, inherit_process: bool) -> Result<Self, EnvError> {
        let mut source = match path {
            Some(path) => Self::from_dotenv(path)?,
            None => Self::empty(),
        };
        if inherit_process {
            for (key, value) in std::env::vars_os() {
                if let (Ok(key), Ok(value)) = (key.into_string(), value.into_string()) {
                    source.vars.insert(key, value);
                }
            }
        }
        info!(
            variables = source.vars.len(),
            env_file = ?path.map(Path::display).map(|d| d.to_string()),
            inherit_process,
            "Environment source loaded"
        );
        Ok(source)
    }

    /// Value for `name`; empty values count as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Run-scoped placeholder bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingSet {
    bindings: BTreeMap<String, String>,
}

impl BindingSet {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Replace every bound placeholder literally; anything else is kept as is.
    pub fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for (range, name) in scan(text) {
            if let Some(value) = self.bindings.get(name) {
                out.push_str(&text[last..range.start]);
                out.push_str(value);
                last = range.end;
            }
        }
        out.push_str(&text[last..]);
        out
    }
}

/// Builds the binding set for a run: overrides first, then the environment.
#[derive(Debug, Clone)]
pub struct VariableResolver {
    env: Arc<EnvSource>,
}

impl VariableResolver {
    pub fn new(env: Arc<EnvSource>) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &EnvSource {
        &self.env
    }

    /// Fails with every unresolved name at once, sorted.
    pub fn resolve(
        &self,
        workflow: &Workflow,
        overrides: &BTreeMap<String, String>,
    ) -> Result<BindingSet, ReplayError> {
        let mut bindings = BTreeMap::new();
        let mut missing = Vec::new();

        for name in required_variables(workflow) {
            let value = overrides
                .get(&name)
                .map(String::as_str)
                .or_else(|| self.env.get(&name));
            match value {
                Some(value) => {
                    bindings.insert(name, value.to_string());
                }
                None => missing.push(name),
            }
        }

        if !missing.is_empty() {
            return Err(ReplayError::MissingVariable(missing));
        }
        debug!(bound = bindings.len(), "Variables resolved");
        Ok(BindingSet { bindings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replayer_core_types::{SelectorCandidate, Step};
    use std::io::Write;

    fn login() -> Workflow {
        Workflow::new(
            "login",
            vec![
                Step::navigate("{{BASE_URL}}/login"),
                Step::type_text(vec![SelectorCandidate::id("user")], "{{USER}}"),
                Step::type_text(vec![SelectorCandidate::id("pass")], "{{PASS}}"),
                Step::click(vec![SelectorCandidate::css("form#{{FORM_ID}} button")]),
            ],
        )
    }

    #[test]
    fn scans_well_formed_placeholders_only() {
        assert_eq!(placeholders("{{A}}-{{b.c}}-{{A}}"), vec!["A", "b.c"]);
        assert!(placeholders("{{ A }} {{}} {{A B}} {A} {{A").is_empty());
        assert_eq!(placeholders("{{{X}}}"), vec!["X"]);
    }

    #[test]
    fn required_variables_cover_values_and_locators() {
        assert_eq!(
            required_variables(&login()),
            vec!["BASE_URL", "FORM_ID", "PASS", "USER"]
        );
    }

    #[test]
    fn overrides_take_precedence_over_env() {
        let env = EnvSource::from_pairs([
            ("BASE_URL", "https://env.example"),
            ("USER", "env-user"),
            ("PASS", "secret"),
            ("FORM_ID", "login"),
        ]);
        let resolver = VariableResolver::new(Arc::new(env));
        let overrides = BTreeMap::from([("USER".to_string(), "cli-user".to_string())]);

        let bindings = resolver.resolve(&login(), &overrides).unwrap();
        assert_eq!(bindings.get("USER"), Some("cli-user"));
        assert_eq!(bindings.get("BASE_URL"), Some("https://env.example"));
        assert_eq!(bindings.len(), 4);

        // identical inputs give identical bindings
        assert_eq!(bindings, resolver.resolve(&login(), &overrides).unwrap());
    }

    #[test]
    fn reports_every_missing_name_sorted() {
        let resolver = VariableResolver::new(Arc::new(EnvSource::from_pairs([
            ("USER", "alice"),
            ("PASS", ""),
        ])));
        match resolver.resolve(&login(), &BTreeMap::new()) {
            Err(ReplayError::MissingVariable(names)) => {
                assert_eq!(names, vec!["BASE_URL", "FORM_ID", "PASS"]);
            }
            other => panic!("expected missing variables, got {other:?}"),
        }
    }

    #[test]
    fn substitution_is_literal_and_independent() {
        let resolver = VariableResolver::new(Arc::new(EnvSource::from_pairs([
            ("HOST", "example.com"),
            ("PATH", "a{{HOST}}b"),
        ])));
        let workflow = Workflow::new("w", vec![Step::navigate("https://{{HOST}}/{{PATH}}?q={{ HOST }}")]);
        let bindings = resolver.resolve(&workflow, &BTreeMap::new()).unwrap();
        assert_eq!(
            bindings.substitute("https://{{HOST}}/{{PATH}}?q={{ HOST }}"),
            "https://example.com/a{{HOST}}b?q={{ HOST }}"
        );
    }

    #[test]
    fn dotenv_file_is_parsed_without_touching_process_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "REPLAYER_TEST_ONLY_USER=alice").unwrap();
        writeln!(file, "QUOTED=\"hello world\"").unwrap();
        drop(file);

        let source = EnvSource::from_dotenv(&path).unwrap();
        assert_eq!(source.get("REPLAYER_TEST_ONLY_USER"), Some("alice"));
        assert_eq!(source.get("QUOTED"), Some("hello world"));
        assert!(std::env::var("REPLAYER_TEST_ONLY_USER").is_err());
    }

    #[test]
    fn missing_dotenv_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = EnvSource::from_dotenv(&dir.path().join("absent.env")).unwrap();
        assert!(source.is_empty());
    }

    #[test]
    #[serial_test::serial]
    fn process_env_layers_above_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "REPLAYER_LAYER_TEST=file\nREPLAYER_FILE_ONLY=1\n").unwrap();
        std::env::set_var("REPLAYER_LAYER_TEST", "process");

        let layered = EnvSource::load(Some(&path), true).unwrap();
        let file_only = EnvSource::load(Some(&path), false).unwrap();
        std::env::remove_var("REPLAYER_LAYER_TEST");

        assert_eq!(layered.get("REPLAYER_LAYER_TEST"), Some("process"));
        assert_eq!(layered.get("REPLAYER_FILE_ONLY"), Some("1"));
        assert_eq!(file_only.get("REPLAYER_LAYER_TEST"), Some("file"));
    }
}
