//! Locator strategies
//!
//! Every [`StrategyTag`] maps to exactly one strategy, and every strategy turns
//! a recorded locator string into one [`ElementQuery`]:
//! 1. `id` - `id` attribute equality
//! 2. `data-attribute` - test attribute equality (`attr=value` or a bare value)
//! 3. `name` - `name` attribute equality
//! 4. `css` - raw CSS selector
//! 5. `xpath` - XPath, `xpath=` prefix stripped, anchored at the root
//! 6. `text` - exact visible text of the leaf-most element

use cdp_adapter::ElementQuery;
use replayer_core_types::{SelectorCandidate, StrategyTag};

/// Attributes tried for a bare `data-attribute` value, in recorder order.
pub const TEST_ATTRIBUTES: [&str; 5] = ["data-test", "data-testid", "data-test-id", "data-qa", "data-cy"];

/// Strategy trait for turning a locator into a page query
pub trait Strategy: Send + Sync {
    fn tag(&self) -> StrategyTag;

    /// Build the query, or explain why the locator cannot be used.
    fn query(&self, locator: &str) -> Result<ElementQuery, String>;

    fn name(&self) -> &'static str {
        self.tag().name()
    }
}

pub struct IdStrategy;
pub struct DataAttributeStrategy;
pub struct NameStrategy;
pub struct CssStrategy;
pub struct XPathStrategy;
pub struct TextStrategy;

fn non_empty(locator: &str) -> Result<&str, String> {
    let trimmed = locator.trim();
    if trimmed.is_empty() {
        Err("empty locator".to_string())
    } else {
        Ok(trimmed)
    }
}

fn unquote(input: &str) -> &str {
    let trimmed = input.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    trimmed
}

impl Strategy for IdStrategy {
    fn tag(&self) -> StrategyTag {
        StrategyTag::Id
    }

    fn query(&self, locator: &str) -> Result<ElementQuery, String> {
        let value = non_empty(locator)?;
        let value = value.strip_prefix('#').unwrap_or(value);
        Ok(ElementQuery::attribute("id", value))
    }
}

impl Strategy for DataAttributeStrategy {
    fn tag(&self) -> StrategyTag {
        StrategyTag::DataAttribute
    }

    fn query(&self, locator: &str) -> Result<ElementQuery, String> {
        let raw = non_empty(locator)?;
        let raw = raw
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(raw);

        match raw.split_once('=') {
            Some((attr, value)) => {
                let attr = attr.trim();
                if attr.is_empty() || attr.contains(char::is_whitespace) {
                    return Err(format!("'{attr}' is not an attribute name"));
                }
                let attr = if attr.starts_with("data-") {
                    attr.to_string()
                } else {
                    format!("data-{attr}")
                };
                Ok(ElementQuery::attribute(attr, unquote(value)))
            }
            None => Ok(ElementQuery::any_attribute(TEST_ATTRIBUTES, unquote(raw))),
        }
    }
}

impl Strategy for NameStrategy {
    fn tag(&self) -> StrategyTag {
        StrategyTag::Name
    }

    fn query(&self, locator: &str) -> Result<ElementQuery, String> {
        Ok(ElementQuery::attribute("name", non_empty(locator)?))
    }
}

impl Strategy for CssStrategy {
    fn tag(&self) -> StrategyTag {
        StrategyTag::Css
    }

    fn query(&self, locator: &str) -> Result<ElementQuery, String> {
        Ok(ElementQuery::css(non_empty(locator)?))
    }
}

impl Strategy for XPathStrategy {
    fn tag(&self) -> StrategyTag {
        StrategyTag::Xpath
    }

    fn query(&self, locator: &str) -> Result<ElementQuery, String> {
        let raw = non_empty(locator)?;
        let raw = raw.strip_prefix("xpath=").unwrap_or(raw).trim();
        if raw.is_empty() {
            return Err("empty xpath expression".to_string());
        }
        if raw.starts_with('/') || raw.starts_with('(') {
            Ok(ElementQuery::xpath(raw))
        } else {
            Ok(ElementQuery::xpath(format!("/{raw}")))
        }
    }
}

impl Strategy for TextStrategy {
    fn tag(&self) -> StrategyTag {
        StrategyTag::Text
    }

    fn query(&self, locator: &str) -> Result<ElementQuery, String> {
        Ok(ElementQuery::text(non_empty(locator)?))
    }
}

/// Strategy implementing `tag`.
pub fn strategy_for(tag: StrategyTag) -> &'static dyn Strategy {
    match tag {
        StrategyTag::Id => &IdStrategy,
        StrategyTag::DataAttribute => &DataAttributeStrategy,
        StrategyTag::Name => &NameStrategy,
        StrategyTag::Css => &CssStrategy,
        StrategyTag::Xpath => &XPathStrategy,
        StrategyTag::Text => &TextStrategy,
    }
}

/// Query for a recorded candidate.
pub fn candidate_query(candidate: &SelectorCandidate) -> Result<ElementQuery, String> {
    strategy_for(candidate.strategy).query(&candidate.value)
}
