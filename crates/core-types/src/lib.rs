//! Shared data model for recorded workflows.
//!
//! A [`Workflow`] is the artifact produced by the recording phase and consumed,
//! read-only, by the replay engine. Every other crate in the workspace speaks
//! in terms of these types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Step timeout used when neither the step nor the configuration sets one.
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 15_000;

/// Metadata key that marks a step critical, alongside the `critical` field.
pub const CRITICAL_METADATA_KEY: &str = "critical";

/// Metadata key carrying a human readable step label.
pub const LABEL_METADATA_KEY: &str = "label";

/// Kind of action a step performs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Navigate,
    Click,
    Type,
    Select,
    Wait,
    Extract,
    Assert,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Select => "select",
            ActionKind::Wait => "wait",
            ActionKind::Extract => "extract",
            ActionKind::Assert => "assert",
        }
    }

    /// Whether the action operates on a located element.
    ///
    /// Navigate and wait may run without one; every other kind needs at
    /// least one selector candidate.
    pub fn requires_target(&self) -> bool {
        !matches!(self, ActionKind::Navigate | ActionKind::Wait)
    }

    /// Whether the action cannot run without a `value`.
    pub fn requires_value(&self) -> bool {
        matches!(
            self,
            ActionKind::Navigate | ActionKind::Type | ActionKind::Select
        )
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, ActionKind::Assert)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Locator strategy tag of a selector candidate.
///
/// The set is closed: each tag maps to exactly one matching algorithm in the
/// locator crate.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyTag {
    /// Element `id` attribute.
    Id,
    /// A `data-*` test attribute (`data-test`, `data-testid`, ...).
    DataAttribute,
    /// Element `name` attribute.
    Name,
    /// Raw CSS selector.
    Css,
    /// XPath expression.
    Xpath,
    /// Exact visible text.
    Text,
}

impl StrategyTag {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyTag::Id => "id",
            StrategyTag::DataAttribute => "data-attribute",
            StrategyTag::Name => "name",
            StrategyTag::Css => "css",
            StrategyTag::Xpath => "xpath",
            StrategyTag::Text => "text",
        }
    }
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One strategy + locator pair recorded for a step target.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SelectorCandidate {
    pub strategy: StrategyTag,
    pub value: String,
}

impl SelectorCandidate {
    pub fn new(strategy: StrategyTag, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::new(StrategyTag::Id, value)
    }

    pub fn data_attribute(value: impl Into<String>) -> Self {
        Self::new(StrategyTag::DataAttribute, value)
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(StrategyTag::Css, value)
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(StrategyTag::Xpath, value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(StrategyTag::Text, value)
    }
}

impl fmt::Display for SelectorCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.strategy, self.value)
    }
}

/// One atomic recorded action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub action_kind: ActionKind,

    #[serde(default)]
    pub selector_candidates: Vec<SelectorCandidate>,

    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub critical: Option<bool>,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Step {
    pub fn new(action_kind: ActionKind) -> Self {
        Self {
            action_kind,
            selector_candidates: Vec::new(),
            value: None,
            timeout_ms: None,
            critical: None,
            metadata: Map::new(),
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(ActionKind::Navigate).with_value(url)
    }

    pub fn click(candidates: Vec<SelectorCandidate>) -> Self {
        Self::new(ActionKind::Click).with_candidates(candidates)
    }

    pub fn type_text(candidates: Vec<SelectorCandidate>, text: impl Into<String>) -> Self {
        Self::new(ActionKind::Type)
            .with_candidates(candidates)
            .with_value(text)
    }

    pub fn with_candidates(mut self, candidates: Vec<SelectorCandidate>) -> Self {
        self.selector_candidates = candidates;
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = Some(critical);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Critical via the explicit field or the `critical` metadata annotation.
    pub fn is_critical(&self) -> bool {
        self.critical.unwrap_or(false)
            || self
                .metadata
                .get(CRITICAL_METADATA_KEY)
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }

    pub fn label(&self) -> Option<&str> {
        self.metadata.get(LABEL_METADATA_KEY).and_then(Value::as_str)
    }

    pub fn has_target(&self) -> bool {
        !self.selector_candidates.is_empty()
    }

    /// Step timeout, falling back to `default_ms` when unset.
    pub fn timeout(&self, default_ms: u64) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(default_ms))
    }
}

/// Named, ordered sequence of steps. Step order is execution order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
