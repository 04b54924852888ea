//! Candidate product link discovery on a results page.
//!
//! Result grids load lazily, so links are gathered over several passes with
//! a viewport-height scroll between them. Links are normalized before
//! deduplication so the same product reached through differently tracked
//! anchors is only visited once.

use crate::selectors;
use crate::session::BrowserSession;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Script that scrolls the viewport by one screen height.
pub const SCROLL_ONE_SCREEN: &str = "window.scrollBy(0, window.innerHeight);";

/// Normalized URL of a product detail page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProductLink(String);

impl ProductLink {
    /// Normalize a raw `href`, resolving it against `base` when relative.
    ///
    /// Returns `None` for links that do not point at a product page.
    pub fn normalize(href: &str, base: Option<&Url>) -> Option<Self> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        let absolute = match Url::parse(href) {
            Ok(url) => url.to_string(),
            Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(href).ok()?.to_string(),
            Err(_) => return None,
        };
        if !absolute.contains(selectors::PRODUCT_PATH_MARKER) {
            return None;
        }
        let stripped = match absolute.find(selectors::TRACKING_MARKER) {
            Some(at) => &absolute[..at],
            None => absolute.as_str(),
        };
        Some(Self(stripped.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProductLink {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered, deduplicated product links, capped at a fixed size.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CandidateList {
    links: Vec<ProductLink>,
    #[serde(skip)]
    seen: HashSet<ProductLink>,
    #[serde(skip)]
    cap: Option<usize>,
}

impl CandidateList {
    /// An empty list that accepts at most `cap` links.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            cap: Some(cap),
            ..Default::default()
        }
    }

    /// Insert a link if it is new and the list is not full.
    ///
    /// Returns whether the link was added.
    pub fn insert(&mut self, link: ProductLink) -> bool {
        if self.is_full() || self.seen.contains(&link) {
            return false;
        }
        self.seen.insert(link.clone());
        self.links.push(link);
        true
    }

    pub fn is_full(&self) -> bool {
        self.cap.is_some_and(|cap| self.links.len() >= cap)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProductLink> {
        self.links.iter()
    }
}

impl FromIterator<ProductLink> for CandidateList {
    fn from_iter<I: IntoIterator<Item = ProductLink>>(iter: I) -> Self {
        let mut list = Self::default();
        for link in iter {
            list.insert(link);
        }
        list
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a ProductLink;
    type IntoIter = std::slice::Iter<'a, ProductLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

/// Bounds for link collection.
#[derive(Debug, Clone, Copy)]
pub struct CollectorLimits {
    /// Maximum number of collect-then-scroll passes.
    pub max_scrolls: usize,
    /// Stop once this many distinct links are known.
    pub max_links: usize,
    /// Pause after each scroll so lazy content can load.
    pub scroll_pause: Duration,
}

impl Default for CollectorLimits {
    fn default() -> Self {
        Self {
            max_scrolls: 5,
            max_links: 50,
            scroll_pause: Duration::from_millis(500),
        }
    }
}

/// Collect product links from the results page loaded in `session`.
///
/// Partial results are returned as-is; an empty list means nothing was
/// found, not that something failed.
pub async fn collect_product_links(
    session: &dyn BrowserSession,
    limits: CollectorLimits,
) -> CandidateList {
    let mut links = CandidateList::with_cap(limits.max_links);
    let base = match session.current_url().await {
        Ok(url) => Url::parse(&url).ok(),
        Err(e) => {
            tracing::debug!(error = %e, "current URL unavailable, relative links will be dropped");
            None
        }
    };

    for pass in 0..limits.max_scrolls {
        match session.find_elements(selectors::PRODUCT_LINKS).await {
            Ok(anchors) => {
                let before = links.len();
                for anchor in &anchors {
                    let Some(link) = anchor
                        .attribute("href")
                        .and_then(|href| ProductLink::normalize(href, base.as_ref()))
                    else {
                        continue;
                    };
                    links.insert(link);
                }
                tracing::debug!(
                    pass,
                    anchors = anchors.len(),
                    new = links.len() - before,
                    total = links.len(),
                    "collected product links"
                );
            }
            Err(e) => tracing::warn!(pass, error = %e, "product link query failed"),
        }

        if links.is_full() {
            break;
        }
        if let Err(e) = session.execute_script(SCROLL_ONE_SCREEN).await {
            tracing::warn!(pass, error = %e, "scroll failed");
        }
        tokio::time::sleep(limits.scroll_pause).await;
    }

    tracing::info!(count = links.len(), "product links collected");
    links
}
