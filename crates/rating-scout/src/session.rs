//! Browser session abstraction.
//!
//! Every component takes the session explicitly: reads borrow it shared,
//! navigation and clicks borrow it mutably. There is exactly one page loaded
//! at a time and no component keeps its own handle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Interval between polls in [`BrowserSession::wait_until`].
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Evaluates to the page's `document.readyState`.
pub const READY_STATE_SCRIPT: &str = "document.readyState";

/// Errors raised by a browser session.
///
/// These are all recoverable from the point of view of the rating engine:
/// callers log them and carry on with the next strategy or candidate.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("query {locator} failed: {message}")]
    Query { locator: String, message: String },

    #[error("element {index} of {locator} is no longer attached")]
    StaleElement { locator: String, index: usize },

    #[error("timed out after {waited:?} waiting for {condition}")]
    Timeout { condition: String, waited: Duration },

    #[error("no page is loaded")]
    NoPage,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Snapshot of a DOM element matched by an XPath query.
///
/// The snapshot keeps the locator and match index so the element can be
/// clicked later through [`BrowserSession::click`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// XPath the element was found with.
    pub locator: String,
    /// Position of the element in the query's document-order results.
    pub index: usize,
    /// Lowercase tag name.
    #[serde(default)]
    pub tag: String,
    /// Attribute values at query time.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Rendered (visible) text.
    #[serde(default)]
    pub text: String,
    /// Raw `textContent`, which includes non-rendered text such as script bodies.
    #[serde(default)]
    pub text_content: String,
}

impl ElementHandle {
    /// Attribute value, if the element carries it.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute value, ignoring empty strings.
    pub fn non_empty_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).filter(|v| !v.trim().is_empty())
    }

    /// Rendered text of the element.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Raw text content of the element.
    pub fn text_content(&self) -> &str {
        &self.text_content
    }
}

/// A condition polled by [`BrowserSession::wait_until`].
#[derive(Debug, Clone, Copy)]
pub enum Condition<'a> {
    /// At least one of the locators matches something.
    AnyPresent(&'a [&'a str]),
    /// None of the locators match anything.
    NonePresent(&'a [&'a str]),
}

impl fmt::Display for Condition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::AnyPresent(locators) => write!(f, "any of {locators:?} to appear"),
            Condition::NonePresent(locators) => write!(f, "all of {locators:?} to disappear"),
        }
    }
}

/// A single browser tab driven by the scan.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Load `url` in the tab.
    async fn navigate(&mut self, url: &str) -> SessionResult<()>;

    /// URL of the page currently loaded.
    async fn current_url(&self) -> SessionResult<String>;

    /// All elements matching an XPath expression, in document order.
    ///
    /// Returns an empty vector when nothing matches.
    async fn find_elements(&self, xpath: &str) -> SessionResult<Vec<ElementHandle>>;

    /// Evaluate a JavaScript expression in the page and return its value.
    async fn execute_script(&self, expression: &str) -> SessionResult<serde_json::Value>;

    /// Click a previously matched element.
    async fn click(&mut self, element: &ElementHandle) -> SessionResult<()>;

    /// Full serialized markup of the current page.
    async fn page_source(&self) -> SessionResult<String> {
        let value = self
            .execute_script("document.documentElement.outerHTML")
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SessionError::Script("outerHTML did not evaluate to a string".into()))
    }

    /// Poll until `condition` holds or `timeout` elapses.
    ///
    /// Query failures while polling count as "nothing matched".
    async fn wait_until(&self, condition: Condition<'_>, timeout: Duration) -> SessionResult<()> {
        let started = Instant::now();
        loop {
            let holds = match condition {
                Condition::AnyPresent(locators) => any_present(self, locators).await,
                Condition::NonePresent(locators) => !any_present(self, locators).await,
            };
            if holds {
                return Ok(());
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(SessionError::Timeout {
                    condition: condition.to_string(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL.min(timeout - elapsed)).await;
        }
    }

    /// Poll `document.readyState` until the page is at least interactive.
    async fn wait_for_document(&self, timeout: Duration) -> SessionResult<()> {
        let started = Instant::now();
        loop {
            match self.execute_script(READY_STATE_SCRIPT).await {
                Ok(state) if matches!(state.as_str(), Some("interactive" | "complete")) => {
                    return Ok(())
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "readyState check failed"),
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(SessionError::Timeout {
                    condition: "document to become interactive".into(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL.min(timeout - elapsed)).await;
        }
    }
}

/// Whether any of `locators` matches on the current page.
///
/// Query failures count as "nothing matched".
pub async fn any_present<S: BrowserSession + ?Sized>(session: &S, locators: &[&str]) -> bool {
    for locator in locators {
        match session.find_elements(locator).await {
            Ok(found) if !found.is_empty() => return true,
            Ok(_) => {}
            Err(e) => tracing::debug!(locator = %locator, error = %e, "query failed while polling"),
        }
    }
    false
}

/// Click the first element matched by any of `locators`, waiting up to
/// `timeout_each` for each locator in turn.
///
/// Returns whether something was clicked. Missing elements and failed
/// clicks are not errors.
pub async fn click_first_present(
    session: &mut dyn BrowserSession,
    locators: &[&str],
    timeout_each: Duration,
) -> bool {
    for locator in locators {
        let single = std::slice::from_ref(locator);
        if session
            .wait_until(Condition::AnyPresent(single), timeout_each)
            .await
            .is_err()
        {
            continue;
        }
        let first = match session.find_elements(locator).await {
            Ok(found) => found.into_iter().next(),
            Err(e) => {
                tracing::debug!(locator = %locator, error = %e, "query failed before click");
                None
            }
        };
        if let Some(element) = first {
            match session.click(&element).await {
                Ok(()) => return true,
                Err(e) => tracing::debug!(locator = %locator, error = %e, "click failed"),
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{RecordedElement, RecordedPage, ScriptedSession};

    const URL: &str = "https://shop.test/p/1";

    #[tokio::test]
    async fn test_wait_for_document_on_loaded_page() {
        let session = ScriptedSession::new([RecordedPage::new(URL)]).starting_at(URL);
        session.wait_for_document(Duration::ZERO).await.unwrap();
        assert_eq!(session.scripts(), vec![READY_STATE_SCRIPT.to_string()]);
    }

    #[tokio::test]
    async fn test_wait_for_document_times_out_without_page() {
        let session = ScriptedSession::new(Vec::<RecordedPage>::new());
        assert!(matches!(
            session.wait_for_document(Duration::from_millis(10)).await,
            Err(SessionError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_any_present_checks_every_locator() {
        let page = RecordedPage::new(URL).element(RecordedElement::new("//h1"));
        let session = ScriptedSession::new([page]).starting_at(URL);
        assert!(any_present(&session, &["//h2", "//h1"]).await);
        assert!(!any_present(&session, &["//h2"]).await);
    }
}
