//! Scriptable in-memory page used by the test suites.
//!
//! Elements are registered up front with the locators they answer to. Each
//! element can be delayed, hidden, disabled or made to fail its first clicks,
//! and every interaction lands in a journal the tests can assert on.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::page::{ElementQuery, ElementRef, ElementState, PageHandle, QueryMatch};
use crate::session::{LiveSession, SessionFactory};
use crate::{AdapterError, AdapterErrorKind};

const REF_PREFIX: &str = "fake:";

/// Element definition for [`FakePage`].
#[derive(Clone, Debug, Default)]
pub struct FakeElement {
    key: String,
    attrs: BTreeMap<String, String>,
    text: String,
    css: Vec<String>,
    xpath: Vec<String>,
    hidden: bool,
    disabled: bool,
    options: Vec<(String, String)>,
    appear_after: Option<Duration>,
    interactable_after: Option<Duration>,
    click_failures: usize,
    read_failures: usize,
}

impl FakeElement {
    /// `key` names the element in the interaction journal.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn css(mut self, selector: impl Into<String>) -> Self {
        self.css.push(selector.into());
        self
    }

    pub fn xpath(mut self, expression: impl Into<String>) -> Self {
        self.xpath.push(expression.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.push((value.into(), label.into()));
        self
    }

    /// Element is absent from the document until `delay` has elapsed.
    pub fn appear_after(mut self, delay: Duration) -> Self {
        self.appear_after = Some(delay);
        self
    }

    /// Element is present but disabled until `delay` has elapsed.
    pub fn interactable_after(mut self, delay: Duration) -> Self {
        self.interactable_after = Some(delay);
        self
    }

    /// The first `count` clicks fail with a retriable error.
    pub fn fail_clicks(mut self, count: usize) -> Self {
        self.click_failures = count;
        self
    }

    /// The first `count` text reads fail with a non-retriable error.
    pub fn fail_reads(mut self, count: usize) -> Self {
        self.read_failures = count;
        self
    }
}

/// One recorded page interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interaction {
    Navigate(String),
    Click(String),
    Type { element: String, text: String },
    Select { element: String, option: String },
}

#[derive(Debug)]
struct Slot {
    element: FakeElement,
    inserted_at: Instant,
    value: String,
    selected: Option<String>,
    removed: bool,
}

impl Slot {
    fn present(&self, now: Instant) -> bool {
        if self.removed {
            return false;
        }
        match self.element.appear_after {
            Some(delay) => now >= self.inserted_at + delay,
            None => true,
        }
    }

    fn enabled(&self, now: Instant) -> bool {
        if self.element.disabled {
            return false;
        }
        match self.element.interactable_after {
            Some(delay) => now >= self.inserted_at + delay,
            None => true,
        }
    }

    fn matches(&self, query: &ElementQuery) -> bool {
        let el = &self.element;
        match query {
            ElementQuery::Attribute { names, value } => names
                .iter()
                .any(|name| el.attrs.get(name).map(String::as_str) == Some(value.as_str())),
            ElementQuery::Css { selector } => el.css.iter().any(|css| css == selector),
            ElementQuery::XPath { expression } => el.xpath.iter().any(|xp| xp == expression),
            ElementQuery::Text { text } => !el.hidden && el.text.trim() == text,
        }
    }
}

#[derive(Debug, Default)]
struct PageState {
    slots: Vec<Slot>,
    url: Option<String>,
    journal: Vec<Interaction>,
    queries: Vec<ElementQuery>,
    released: Vec<ElementRef>,
    failing_navigations: usize,
}

/// In-memory [`PageHandle`].
#[derive(Debug, Default)]
pub struct FakePage {
    state: Mutex<PageState>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elements(elements: impl IntoIterator<Item = FakeElement>) -> Self {
        let page = Self::new();
        for element in elements {
            page.insert(element);
        }
        page
    }

    /// Add an element; its appearance delays count from now.
    pub fn insert(&self, element: FakeElement) {
        self.state.lock().slots.push(Slot {
            element,
            inserted_at: Instant::now(),
            value: String::new(),
            selected: None,
            removed: false,
        });
    }

    /// Detach every element registered under `key`.
    pub fn remove(&self, key: &str) {
        for slot in self.state.lock().slots.iter_mut() {
            if slot.element.key == key {
                slot.removed = true;
            }
        }
    }

    /// The next `count` navigations fail with a retriable timeout.
    pub fn fail_navigations(&self, count: usize) {
        self.state.lock().failing_navigations = count;
    }

    pub fn journal(&self) -> Vec<Interaction> {
        self.state.lock().journal.clone()
    }

    pub fn queries(&self) -> Vec<ElementQuery> {
        self.state.lock().queries.clone()
    }

    /// References handed back through [`PageHandle::release`], in order.
    pub fn released(&self) -> Vec<ElementRef> {
        self.state.lock().released.clone()
    }

    /// Current value of the first field registered under `key`.
    pub fn value_of(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .slots
            .iter()
            .find(|slot| slot.element.key == key)
            .map(|slot| slot.value.clone())
    }

    pub fn selected_of(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .slots
            .iter()
            .find(|slot| slot.element.key == key)
            .and_then(|slot| slot.selected.clone())
    }

    fn slot_index(element: &ElementRef) -> Result<usize, AdapterError> {
        element
            .as_str()
            .strip_prefix(REF_PREFIX)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::TargetNotFound)
                    .with_hint(format!("unknown element reference {element}"))
            })
    }

    fn with_slot<T>(
        &self,
        element: &ElementRef,
        f: impl FnOnce(&mut Slot, &mut Vec<Interaction>) -> Result<T, AdapterError>,
    ) -> Result<T, AdapterError> {
        let index = Self::slot_index(element)?;
        let now = Instant::now();
        let mut state = self.state.lock();
        let PageState { slots, journal, .. } = &mut *state;
        match slots.get_mut(index) {
            Some(slot) if slot.present(now) => f(slot, journal),
            _ => Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("{element} is no longer attached"))
                .retriable(true)),
        }
    }
}

fn invalid_css(selector: &str) -> bool {
    let trimmed = selector.trim();
    trimmed.is_empty() || !balanced(trimmed) || trimmed.ends_with(['>', '+', '~', ','])
}

fn invalid_xpath(expression: &str) -> bool {
    let trimmed = expression.trim();
    trimmed.is_empty()
        || !balanced(trimmed)
        || !(trimmed.starts_with('/') || trimmed.starts_with('('))
}

fn balanced(input: &str) -> bool {
    let mut stack = Vec::new();
    for ch in input.chars() {
        match ch {
            '[' | '(' => stack.push(ch),
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty()
}

#[async_trait]
impl PageHandle for FakePage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        if state.failing_navigations > 0 {
            state.failing_navigations -= 1;
            return Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(format!("navigation to {url} exceeded {timeout:?}"))
                .retriable(true));
        }
        state.url = Some(url.to_string());
        state.journal.push(Interaction::Navigate(url.to_string()));
        Ok(())
    }

    async fn query(&self, query: &ElementQuery) -> Result<QueryMatch, AdapterError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.queries.push(query.clone());

        let invalid = match query {
            ElementQuery::Css { selector } => invalid_css(selector),
            ElementQuery::XPath { expression } => invalid_xpath(expression),
            _ => false,
        };
        if invalid {
            return Err(AdapterError::new(AdapterErrorKind::InvalidQuery)
                .with_hint(format!("{query} is not a valid selector")));
        }

        let matched: Vec<usize> = state
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.present(now) && slot.matches(query))
            .map(|(index, _)| index)
            .collect();

        Ok(match matched.as_slice() {
            [] => QueryMatch::none(),
            [index] => QueryMatch::unique(ElementRef::new(format!("{REF_PREFIX}{index}"))),
            many => QueryMatch::ambiguous(many.len()),
        })
    }

    async fn element_state(&self, element: &ElementRef) -> Result<ElementState, AdapterError> {
        let now = Instant::now();
        let detached = ElementState::default();
        match self.with_slot(element, |slot, _| {
            Ok(ElementState {
                attached: true,
                visible: !slot.element.hidden,
                enabled: slot.enabled(now),
            })
        }) {
            Ok(state) => Ok(state),
            Err(err) if err.kind == AdapterErrorKind::TargetNotFound => Ok(detached),
            Err(err) => Err(err),
        }
    }

    async fn click(&self, element: &ElementRef) -> Result<(), AdapterError> {
        self.with_slot(element, |slot, journal| {
            if slot.element.click_failures > 0 {
                slot.element.click_failures -= 1;
                return Err(AdapterError::cdp_io("click intercepted").retriable(true));
            }
            journal.push(Interaction::Click(slot.element.key.clone()));
            Ok(())
        })
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), AdapterError> {
        self.with_slot(element, |slot, journal| {
            slot.value = text.to_string();
            journal.push(Interaction::Type {
                element: slot.element.key.clone(),
                text: text.to_string(),
            });
            Ok(())
        })
    }

    async fn select_option(
        &self,
        element: &ElementRef,
        option: &str,
    ) -> Result<(), AdapterError> {
        self.with_slot(element, |slot, journal| {
            let chosen = slot
                .element
                .options
                .iter()
                .find(|(value, _)| value == option)
                .or_else(|| {
                    slot.element
                        .options
                        .iter()
                        .find(|(_, label)| label.trim() == option)
                })
                .map(|(value, _)| value.clone())
                .ok_or_else(|| {
                    AdapterError::new(AdapterErrorKind::OptionNotFound)
                        .with_hint(format!("no option '{option}' in {}", slot.element.key))
                })?;
            slot.selected = Some(chosen.clone());
            journal.push(Interaction::Select {
                element: slot.element.key.clone(),
                option: chosen,
            });
            Ok(())
        })
    }

    async fn read_text(&self, element: &ElementRef) -> Result<Option<String>, AdapterError> {
        self.with_slot(element, |slot, _| {
            if slot.element.read_failures > 0 {
                slot.element.read_failures -= 1;
                return Err(AdapterError::cdp_io("text read failed"));
            }
            if slot.value.is_empty() {
                Ok(Some(slot.element.text.trim().to_string()))
            } else {
                Ok(Some(slot.value.clone()))
            }
        })
    }

    async fn read_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, AdapterError> {
        self.with_slot(element, |slot, _| {
            if name == "value" && !slot.value.is_empty() {
                return Ok(Some(slot.value.clone()));
            }
            Ok(slot.element.attrs.get(name).cloned())
        })
    }

    async fn current_url(&self) -> Result<Option<String>, AdapterError> {
        Ok(self.state.lock().url.clone())
    }

    async fn release(&self, element: &ElementRef) -> Result<(), AdapterError> {
        self.state.lock().released.push(element.clone());
        Ok(())
    }
}

/// [`SessionFactory`] handing out sessions over one shared [`FakePage`].
#[derive(Clone, Debug, Default)]
pub struct FakeBrowser {
    page: Arc<FakePage>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    fail_launch: bool,
}

impl FakeBrowser {
    pub fn new(page: FakePage) -> Self {
        Self {
            page: Arc::new(page),
            ..Self::default()
        }
    }

    /// A browser whose every `open` fails.
    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    pub fn page(&self) -> Arc<FakePage> {
        self.page.clone()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for FakeBrowser {
    async fn open(&self) -> Result<Box<dyn LiveSession>, AdapterError> {
        if self.fail_launch {
            return Err(AdapterError::new(AdapterErrorKind::LaunchFailed)
                .with_hint("fake browser configured to fail"));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            page: self.page.clone(),
            closed_counter: self.closed.clone(),
            closed: false,
        }))
    }
}

struct FakeSession {
    page: Arc<FakePage>,
    closed_counter: Arc<AtomicUsize>,
    closed: bool,
}

#[async_trait]
impl LiveSession for FakeSession {
    fn page(&self) -> Arc<dyn PageHandle> {
        self.page.clone()
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        if !self.closed {
            self.closed = true;
            self.closed_counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_page() -> FakePage {
        FakePage::with_elements([
            FakeElement::new("user").id("user"),
            FakeElement::new("submit")
                .attr("data-test", "submit-btn")
                .text("Log in"),
            FakeElement::new("row-a").css("li.row").text("Row"),
            FakeElement::new("row-b").css("li.row").text("Row"),
        ])
    }

    #[tokio::test]
    async fn unique_ambiguous_and_missing_queries() {
        let page = login_page();
        assert!(page
            .query(&ElementQuery::attribute("id", "user"))
            .await
            .unwrap()
            .is_unique());
        assert_eq!(
            page.query(&ElementQuery::css("li.row")).await.unwrap(),
            QueryMatch::ambiguous(2)
        );
        assert_eq!(
            page.query(&ElementQuery::css("#nope")).await.unwrap(),
            QueryMatch::none()
        );
        assert_eq!(page.queries().len(), 3);
    }

    #[tokio::test]
    async fn malformed_selectors_are_invalid_queries() {
        let page = login_page();
        let err = page.query(&ElementQuery::css("div[")).await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::InvalidQuery);
        let err = page
            .query(&ElementQuery::xpath("//div[@id='x'"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::InvalidQuery);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_element_appears() {
        let page = FakePage::new();
        page.insert(FakeElement::new("late").id("late").appear_after(Duration::from_millis(300)));
        let query = ElementQuery::attribute("id", "late");
        assert_eq!(page.query(&query).await.unwrap(), QueryMatch::none());
        tokio::time::advance(Duration::from_millis(301)).await;
        assert!(page.query(&query).await.unwrap().is_unique());
    }

    #[tokio::test]
    async fn interactions_are_journaled() {
        let page = login_page();
        let user = page
            .query(&ElementQuery::attribute("id", "user"))
            .await
            .unwrap()
            .element
            .unwrap();
        page.type_text(&user, "alice").await.unwrap();
        page.navigate("https://example.com", Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(page.value_of("user").as_deref(), Some("alice"));
        assert_eq!(
            page.journal(),
            vec![
                Interaction::Type {
                    element: "user".into(),
                    text: "alice".into()
                },
                Interaction::Navigate("https://example.com".into()),
            ]
        );
        assert_eq!(
            page.current_url().await.unwrap().as_deref(),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn select_matches_value_or_label() {
        let page = FakePage::with_elements([FakeElement::new("country")
            .id("country")
            .option("de", "Germany")
            .option("fr", "France")]);
        let select = page
            .query(&ElementQuery::attribute("id", "country"))
            .await
            .unwrap()
            .element
            .unwrap();
        page.select_option(&select, "France").await.unwrap();
        assert_eq!(page.selected_of("country").as_deref(), Some("fr"));
        let err = page.select_option(&select, "Spain").await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::OptionNotFound);
    }

    #[tokio::test]
    async fn removed_element_reports_detached_state() {
        let page = login_page();
        let user = page
            .query(&ElementQuery::attribute("id", "user"))
            .await
            .unwrap()
            .element
            .unwrap();
        page.remove("user");
        let state = page.element_state(&user).await.unwrap();
        assert!(!state.attached);
        assert!(page.click(&user).await.is_err());
    }

    #[tokio::test]
    async fn scripted_read_failures_are_not_retriable() {
        let page = FakePage::with_elements([FakeElement::new("banner")
            .id("banner")
            .text("Hello")
            .fail_reads(1)]);
        let banner = page
            .query(&ElementQuery::attribute("id", "banner"))
            .await
            .unwrap()
            .element
            .unwrap();
        let err = page.read_text(&banner).await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::CdpIo);
        assert!(!err.retriable);
        assert_eq!(page.read_text(&banner).await.unwrap().as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn fake_browser_counts_sessions() {
        let browser = FakeBrowser::new(FakePage::new());
        let mut session = browser.open().await.unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();
        assert!(session.is_closed());
        assert_eq!(browser.opened(), 1);
        assert_eq!(browser.closed(), 1);

        assert_eq!(
            FakeBrowser::failing().open().await.err().map(|err| err.kind),
            Some(AdapterErrorKind::LaunchFailed)
        );
    }
}
