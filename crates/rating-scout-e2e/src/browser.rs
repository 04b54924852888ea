//! Chromium-backed browser session using chromiumoxide.
//!
//! XPath queries run inside the page through `document.evaluate`; each match
//! comes back as a JSON snapshot of its tag, attributes and text.

use crate::config::{BrowserArgs, BrowserKind};
use crate::error::{FlowError, FlowResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use rating_scout::{BrowserSession, ElementHandle, SessionError, SessionResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Environment variable naming an explicit browser binary.
pub const CHROMIUM_PATH_ENV: &str = "SCOUT_CHROMIUM_PATH";

const WINDOW_SIZE: (u32, u32) = (1440, 900);

/// Find a Chromium-family binary, preferring the flavour `kind` asks for.
pub fn find_chromium(kind: BrowserKind) -> Option<PathBuf> {
    // 1. explicit override
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. system PATH
    let names: &[&str] = match kind {
        BrowserKind::Chromium => &["chromium", "chromium-browser", "google-chrome"],
        BrowserKind::Chrome | BrowserKind::Firefox => {
            &["google-chrome", "chromium", "chromium-browser"]
        }
    };
    for name in names {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. common macOS locations
    if cfg!(target_os = "macos") {
        for app in [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ] {
            let path = PathBuf::from(app);
            if path.exists() {
                return Some(path);
            }
        }
    }

    None
}

#[derive(Debug, Deserialize)]
struct NodeSnapshot {
    #[serde(default)]
    tag: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    text_content: String,
}

/// Quote `s` as a JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn snapshot_script(xpath: &str) -> String {
    let xpath = js_string(xpath);
    format!(
        "(() => {{
  const snap = document.evaluate({xpath}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
  const out = [];
  for (let i = 0; i < snap.snapshotLength; i++) {{
    const el = snap.snapshotItem(i);
    const attributes = {{}};
    for (const a of (el.attributes || [])) attributes[a.name] = a.value;
    if (typeof el.href === 'string' && el.href) attributes.href = el.href;
    out.push({{
      tag: (el.localName || el.nodeName || '').toLowerCase(),
      attributes,
      text: (el.innerText || '').trim(),
      text_content: el.textContent || ''
    }});
  }}
  return out;
}})()"
    )
}

fn click_script(xpath: &str, index: usize) -> String {
    let xpath = js_string(xpath);
    format!(
        "(() => {{
  const snap = document.evaluate({xpath}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
  const el = snap.snapshotItem({index});
  if (!el) return false;
  el.scrollIntoView({{ block: 'center' }});
  el.click();
  return true;
}})()"
    )
}

/// A single Chromium tab.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    nav_timeout: Duration,
}

impl ChromiumSession {
    /// Launch a browser and open a blank tab.
    pub async fn launch(args: &BrowserArgs) -> FlowResult<Self> {
        if args.browser == BrowserKind::Firefox {
            tracing::warn!("firefox cannot be driven over CDP, using Chromium instead");
        }
        let chrome_path = find_chromium(args.browser).ok_or_else(|| {
            FlowError::Launch(format!(
                "no Chromium or Chrome binary found; set {CHROMIUM_PATH_ENV}"
            ))
        })?;
        tracing::info!(path = %chrome_path.display(), headless = args.headless, "launching browser");

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(WINDOW_SIZE.0, WINDOW_SIZE.1)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--lang=en-US");
        builder = if args.headless {
            builder.arg("--headless=new").arg("--disable-gpu")
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| FlowError::Launch(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FlowError::Launch(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!(error = %e, "cdp handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FlowError::Launch(format!("failed to create page: {e}")))?;

        Ok(Self {
            browser,
            page,
            handler,
            nav_timeout: args.nav_timeout(),
        })
    }

    /// Full-page PNG of the current tab.
    pub async fn screenshot(&self) -> SessionResult<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| SessionError::Script(format!("screenshot failed: {e}")))
    }

    /// Close the browser and stop the event handler.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!(error = %e, "browser close failed");
        }
        self.handler.abort();
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        match tokio::time::timeout(self.nav_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {
                let _ =
                    tokio::time::timeout(self.nav_timeout, self.page.wait_for_navigation()).await;
                Ok(())
            }
            Ok(Err(e)) => Err(SessionError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(SessionError::Navigation {
                url: url.to_string(),
                message: format!("timed out after {:?}", self.nav_timeout),
            }),
        }
    }

    async fn current_url(&self) -> SessionResult<String> {
        self.page
            .url()
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?
            .map(|u| u.to_string())
            .ok_or(SessionError::NoPage)
    }

    async fn find_elements(&self, xpath: &str) -> SessionResult<Vec<ElementHandle>> {
        let value = self
            .execute_script(&snapshot_script(xpath))
            .await
            .map_err(|e| SessionError::Query {
                locator: xpath.to_string(),
                message: e.to_string(),
            })?;
        let nodes: Vec<NodeSnapshot> =
            serde_json::from_value(value).map_err(|e| SessionError::Query {
                locator: xpath.to_string(),
                message: format!("unexpected snapshot shape: {e}"),
            })?;
        Ok(nodes
            .into_iter()
            .enumerate()
            .map(|(index, node)| ElementHandle {
                locator: xpath.to_string(),
                index,
                tag: node.tag,
                attributes: node.attributes,
                text: node.text,
                text_content: node.text_content,
            })
            .collect())
    }

    async fn execute_script(&self, expression: &str) -> SessionResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn click(&mut self, element: &ElementHandle) -> SessionResult<()> {
        let clicked = self
            .execute_script(&click_script(&element.locator, element.index))
            .await?;
        if clicked.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(SessionError::StaleElement {
                locator: element.locator.clone(),
                index: element.index,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xpath_is_quoted_for_js() {
        let script = snapshot_script("//a[@aria-label=\"x\"]");
        assert!(script.contains(r#""//a[@aria-label=\"x\"]""#));
        assert!(script.contains("i < snap.snapshotLength;"));
    }

    #[test]
    fn test_snapshot_reads_every_match() {
        let script = snapshot_script("//a");
        assert!(!script.contains("Math.min"));
        assert!(!script.contains("200"));
    }

    #[test]
    fn test_click_script_targets_index() {
        let script = click_script("//button", 3);
        assert!(script.contains("snapshotItem(3)"));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_queries_and_clicks() {
        let args = BrowserArgs {
            browser: BrowserKind::Chromium,
            headless: true,
            nav_timeout_secs: 10,
        };
        let mut session = ChromiumSession::launch(&args).await.unwrap();
        session
            .navigate("data:text/html,<a href='/shopping/product/1' aria-label='Rated 4.5'>x</a>")
            .await
            .unwrap();
        let found = session.find_elements("//a").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].attribute("aria-label"), Some("Rated 4.5"));
        assert!(session.page_source().await.unwrap().contains("Rated 4.5"));
        session.close().await;
    }
}
