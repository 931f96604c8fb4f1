//! Live page abstraction consumed by the locator and the executor.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AdapterError;

/// Query evaluated against the current document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementQuery {
    /// Elements carrying any of `names` with exactly `value`.
    Attribute { names: Vec<String>, value: String },
    /// CSS selector.
    Css { selector: String },
    /// XPath expression, evaluated from the document root.
    #[serde(rename = "xpath")]
    XPath { expression: String },
    /// Leaf-most visible elements whose trimmed text equals `text`.
    Text { text: String },
}

impl ElementQuery {
    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        ElementQuery::Attribute {
            names: vec![name.into()],
            value: value.into(),
        }
    }

    pub fn any_attribute<I, S>(names: I, value: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ElementQuery::Attribute {
            names: names.into_iter().map(Into::into).collect(),
            value: value.into(),
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        ElementQuery::Css {
            selector: selector.into(),
        }
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        ElementQuery::XPath {
            expression: expression.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ElementQuery::Text { text: text.into() }
    }
}

impl fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementQuery::Attribute { names, value } => {
                write!(f, "[{}=\"{}\"]", names.join("|"), value)
            }
            ElementQuery::Css { selector } => write!(f, "css({selector})"),
            ElementQuery::XPath { expression } => write!(f, "xpath({expression})"),
            ElementQuery::Text { text } => write!(f, "text(\"{text}\")"),
        }
    }
}

/// Stable handle to an element matched by a query.
///
/// For Chromium this is a CSS selector on a per-match anchor attribute; the
/// fake page uses its own element index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a single query evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryMatch {
    pub count: usize,
    /// Set only when exactly one element matched.
    pub element: Option<ElementRef>,
}

impl QueryMatch {
    pub fn none() -> Self {
        Self {
            count: 0,
            element: None,
        }
    }

    pub fn unique(element: ElementRef) -> Self {
        Self {
            count: 1,
            element: Some(element),
        }
    }

    pub fn ambiguous(count: usize) -> Self {
        Self {
            count,
            element: None,
        }
    }

    pub fn is_unique(&self) -> bool {
        self.count == 1 && self.element.is_some()
    }
}

/// Observed readiness of an element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    pub attached: bool,
    pub visible: bool,
    pub enabled: bool,
}

impl ElementState {
    pub fn is_interactable(&self) -> bool {
        self.attached && self.visible && self.enabled
    }
}

/// Handle to the single live page of a session.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigate and wait for the load to settle.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AdapterError>;

    /// Evaluate a query once. Invalid selectors surface as
    /// [`AdapterErrorKind::InvalidQuery`](crate::AdapterErrorKind::InvalidQuery).
    async fn query(&self, query: &ElementQuery) -> Result<QueryMatch, AdapterError>;

    async fn element_state(&self, element: &ElementRef) -> Result<ElementState, AdapterError>;

    async fn click(&self, element: &ElementRef) -> Result<(), AdapterError>;

    /// Clear the field, then type `text` into it.
    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), AdapterError>;

    /// Select the option whose value or visible label equals `option`.
    async fn select_option(&self, element: &ElementRef, option: &str)
        -> Result<(), AdapterError>;

    async fn read_text(&self, element: &ElementRef) -> Result<Option<String>, AdapterError>;

    async fn read_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, AdapterError>;

    async fn current_url(&self) -> Result<Option<String>, AdapterError>;

    /// Drop whatever the page holds to address `element`. The reference is
    /// invalid afterwards.
    async fn release(&self, element: &ElementRef) -> Result<(), AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_serializes_with_kind_tag() {
        let value = serde_json::to_value(ElementQuery::xpath("//button")).unwrap();
        assert_eq!(value["kind"], "xpath");
        assert_eq!(value["expression"], "//button");

        let value =
            serde_json::to_value(ElementQuery::any_attribute(["data-test", "data-qa"], "go"))
                .unwrap();
        assert_eq!(value["kind"], "attribute");
        assert_eq!(value["names"][1], "data-qa");
    }

    #[test]
    fn interactable_requires_all_flags() {
        let state = ElementState {
            attached: true,
            visible: true,
            enabled: false,
        };
        assert!(!state.is_interactable());
        assert!(ElementState {
            enabled: true,
            ..state
        }
        .is_interactable());
    }
}
