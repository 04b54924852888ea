//! A [`BrowserSession`] that replays recorded pages.
//!
//! Recordings are plain JSON: a start URL and a list of pages, each with the
//! elements its locators matched and its page source. Elements can be held
//! back until the page has been scrolled a number of times, which is how
//! lazily loaded result grids are recorded.

use crate::session::{
    BrowserSession, ElementHandle, SessionError, SessionResult, READY_STATE_SCRIPT,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

/// An element as it appeared in a recorded page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordedElement {
    /// XPath locators this element answers to.
    pub locators: Vec<String>,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub text_content: String,
    /// Number of scrolls after which the element exists.
    #[serde(default)]
    pub after_scrolls: usize,
}

impl RecordedElement {
    /// An element matched by a single locator.
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locators: vec![locator.into()],
            ..Default::default()
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the rendered text (and the raw text content, if not set yet).
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        if self.text_content.is_empty() {
            self.text_content = self.text.clone();
        }
        self
    }

    pub fn text_content(mut self, content: impl Into<String>) -> Self {
        self.text_content = content.into();
        self
    }

    pub fn after_scrolls(mut self, scrolls: usize) -> Self {
        self.after_scrolls = scrolls;
        self
    }
}

/// A recorded page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordedPage {
    pub url: String,
    #[serde(default)]
    pub elements: Vec<RecordedElement>,
    /// Serialized markup returned by `page_source`.
    #[serde(default)]
    pub source: String,
    /// Report a navigation error even though the page loads.
    #[serde(default)]
    pub fail_navigation: bool,
}

impl RecordedPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn element(mut self, element: RecordedElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }
}

/// A full recording: where the run starts and every page it may visit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recording {
    pub start_url: String,
    pub pages: Vec<RecordedPage>,
}

/// Replays a [`Recording`].
#[derive(Debug, Default)]
pub struct ScriptedSession {
    pages: HashMap<String, RecordedPage>,
    current: Option<String>,
    history: Vec<String>,
    clicks: Vec<ElementHandle>,
    scripts: std::sync::Mutex<Vec<String>>,
    scrolls: AtomicUsize,
}

impl ScriptedSession {
    /// Build a session from recorded pages with nothing loaded yet.
    pub fn new(pages: impl IntoIterator<Item = RecordedPage>) -> Self {
        Self {
            pages: pages.into_iter().map(|p| (p.url.clone(), p)).collect(),
            ..Default::default()
        }
    }

    /// Build a session from a recording, positioned on its start URL.
    ///
    /// The start page is loaded without being added to the history.
    pub fn from_recording(recording: Recording) -> Self {
        let mut session = Self::new(recording.pages);
        session.current = Some(recording.start_url);
        session
    }

    /// Position the session on `url` without recording a navigation.
    pub fn starting_at(mut self, url: impl Into<String>) -> Self {
        self.current = Some(url.into());
        self
    }

    /// Every URL passed to `navigate`, in order.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Elements clicked, in order.
    pub fn clicks(&self) -> &[ElementHandle] {
        &self.clicks
    }

    /// Scripts evaluated, in order.
    pub fn scripts(&self) -> Vec<String> {
        self.scripts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// How many times the current page has been scrolled.
    pub fn scroll_count(&self) -> usize {
        self.scrolls.load(Ordering::Relaxed)
    }

    fn current_page(&self) -> Option<&RecordedPage> {
        self.current.as_ref().and_then(|url| self.pages.get(url))
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.history.push(url.to_string());
        self.current = Some(url.to_string());
        self.scrolls.store(0, Ordering::Relaxed);
        match self.pages.get(url) {
            Some(page) if page.fail_navigation => Err(SessionError::Navigation {
                url: url.to_string(),
                message: "recorded navigation failure".into(),
            }),
            Some(_) => Ok(()),
            None => Err(SessionError::Navigation {
                url: url.to_string(),
                message: "page not in recording".into(),
            }),
        }
    }

    async fn current_url(&self) -> SessionResult<String> {
        self.current.clone().ok_or(SessionError::NoPage)
    }

    async fn find_elements(&self, xpath: &str) -> SessionResult<Vec<ElementHandle>> {
        let Some(page) = self.current_page() else {
            return Ok(Vec::new());
        };
        let scrolls = self.scroll_count();
        Ok(page
            .elements
            .iter()
            .filter(|e| e.after_scrolls <= scrolls && e.locators.iter().any(|l| l == xpath))
            .enumerate()
            .map(|(index, e)| ElementHandle {
                locator: xpath.to_string(),
                index,
                tag: e.tag.clone(),
                attributes: e.attributes.clone(),
                text: e.text.clone(),
                text_content: e.text_content.clone(),
            })
            .collect())
    }

    async fn execute_script(&self, expression: &str) -> SessionResult<serde_json::Value> {
        self.scripts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(expression.to_string());
        if expression == READY_STATE_SCRIPT {
            return match self.current_page() {
                Some(_) => Ok(serde_json::Value::String("complete".into())),
                None => Err(SessionError::NoPage),
            };
        }
        if expression == "document.documentElement.outerHTML" {
            return match self.current_page() {
                Some(page) => Ok(serde_json::Value::String(page.source.clone())),
                None => Err(SessionError::NoPage),
            };
        }
        if expression.contains("scrollBy") {
            self.scrolls.fetch_add(1, Ordering::Relaxed);
        }
        Ok(serde_json::Value::Null)
    }

    async fn click(&mut self, element: &ElementHandle) -> SessionResult<()> {
        let still_there = self
            .find_elements(&element.locator)
            .await?
            .iter()
            .any(|e| e.index == element.index);
        if !still_there {
            return Err(SessionError::StaleElement {
                locator: element.locator.clone(),
                index: element.index,
            });
        }
        self.clicks.push(element.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> RecordedPage {
        RecordedPage::new("https://shop.test/p/1")
            .element(RecordedElement::new("//h1").text("Title"))
            .element(RecordedElement::new("//a").attr("href", "/x").after_scrolls(1))
            .source("<html><h1>Title</h1></html>")
    }

    #[tokio::test]
    async fn test_navigation_history_and_current_url() {
        let mut session = ScriptedSession::new([page()]);
        assert!(matches!(session.current_url().await, Err(SessionError::NoPage)));
        session.navigate("https://shop.test/p/1").await.unwrap();
        assert!(session.navigate("https://shop.test/missing").await.is_err());
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.current_url().await.unwrap(), "https://shop.test/missing");
    }

    #[tokio::test]
    async fn test_elements_revealed_by_scrolling() {
        let session = ScriptedSession::new([page()]).starting_at("https://shop.test/p/1");
        assert!(session.find_elements("//a").await.unwrap().is_empty());
        session
            .execute_script("window.scrollBy(0, window.innerHeight);")
            .await
            .unwrap();
        let anchors = session.find_elements("//a").await.unwrap();
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].attribute("href"), Some("/x"));
    }

    #[tokio::test]
    async fn test_page_source_default_script() {
        let session = ScriptedSession::new([page()]).starting_at("https://shop.test/p/1");
        let html = session.page_source().await.unwrap();
        assert!(html.contains("<h1>Title</h1>"));
    }

    #[tokio::test]
    async fn test_click_stale_element() {
        let mut session = ScriptedSession::new([page()]).starting_at("https://shop.test/p/1");
        let h1 = session.find_elements("//h1").await.unwrap().remove(0);
        session.click(&h1).await.unwrap();
        let ghost = ElementHandle {
            locator: "//h1".into(),
            index: 3,
            ..Default::default()
        };
        assert!(matches!(
            session.click(&ghost).await,
            Err(SessionError::StaleElement { index: 3, .. })
        ));
        assert_eq!(session.clicks().len(), 1);
    }

    #[test]
    fn test_recording_round_trips_through_json() {
        let recording = Recording {
            start_url: "https://shop.test/list".into(),
            pages: vec![page()],
        };
        let json = serde_json::to_string(&recording).unwrap();
        let back: Recording = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pages[0].elements.len(), 2);
        assert_eq!(back.pages[0].elements[1].after_scrolls, 1);
    }
}
