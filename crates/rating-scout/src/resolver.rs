//! Rating resolution for the page currently loaded in a session.
//!
//! The resolver runs an ordered cascade of strategies and stops at the first
//! one that produces a rating. Strategies never fail the cascade: a query
//! error is logged and treated the same as "nothing found".

use crate::rating::{parse_rating_text, Rating};
use crate::selectors;
use crate::session::{BrowserSession, ElementHandle, SessionResult};
use crate::structured;
use serde::Serialize;
use std::fmt;

/// One stage of the rating cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingStrategy {
    /// `aggregateRating` inside JSON-LD blocks.
    StructuredData,
    /// `ratingValue` itemprop and rating meta tags.
    MetaTags,
    /// ARIA-labelled or text-labelled star widgets.
    RatingWidgets,
    /// Store or seller rating text on offer pages.
    StoreRating,
    /// `"ratingValue"` anywhere in the page markup.
    MarkupFallback,
}

impl RatingStrategy {
    /// Default cascade order, most reliable signal first.
    pub const CASCADE: [RatingStrategy; 5] = [
        RatingStrategy::StructuredData,
        RatingStrategy::MetaTags,
        RatingStrategy::RatingWidgets,
        RatingStrategy::StoreRating,
        RatingStrategy::MarkupFallback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RatingStrategy::StructuredData => "structured_data",
            RatingStrategy::MetaTags => "meta_tags",
            RatingStrategy::RatingWidgets => "rating_widgets",
            RatingStrategy::StoreRating => "store_rating",
            RatingStrategy::MarkupFallback => "markup_fallback",
        }
    }

    /// Run this stage against the current page.
    pub async fn apply(self, session: &dyn BrowserSession) -> SessionResult<Option<Rating>> {
        match self {
            RatingStrategy::StructuredData => from_structured_data(session).await,
            RatingStrategy::MetaTags => from_meta_tags(session).await,
            RatingStrategy::RatingWidgets => from_rating_widgets(session).await,
            RatingStrategy::StoreRating => from_store_rating(session).await,
            RatingStrategy::MarkupFallback => from_markup(session).await,
        }
    }
}

impl fmt::Display for RatingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rating together with the stage that found it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedRating {
    pub rating: Rating,
    pub source: RatingStrategy,
}

/// Runs the rating cascade against a session.
#[derive(Debug, Clone)]
pub struct PageRatingResolver {
    strategies: Vec<RatingStrategy>,
}

impl Default for PageRatingResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRatingResolver {
    /// Resolver with the default cascade order.
    pub fn new() -> Self {
        Self::with_strategies(RatingStrategy::CASCADE)
    }

    /// Resolver with a custom stage order.
    pub fn with_strategies(strategies: impl IntoIterator<Item = RatingStrategy>) -> Self {
        Self {
            strategies: strategies.into_iter().collect(),
        }
    }

    /// Resolve the rating of the page currently loaded in `session`.
    pub async fn resolve(&self, session: &dyn BrowserSession) -> Option<ResolvedRating> {
        for &strategy in &self.strategies {
            match strategy.apply(session).await {
                Ok(Some(rating)) => {
                    tracing::debug!(stage = %strategy, rating = rating.value(), "rating resolved");
                    return Some(ResolvedRating {
                        rating,
                        source: strategy,
                    });
                }
                Ok(None) => tracing::trace!(stage = %strategy, "no rating"),
                Err(e) => tracing::debug!(stage = %strategy, error = %e, "stage failed, skipping"),
            }
        }
        None
    }
}

// ── Stages ──────────────────────────────────────────────────────────────────

async fn from_structured_data(session: &dyn BrowserSession) -> SessionResult<Option<Rating>> {
    let scripts = session.find_elements(selectors::JSONLD_SCRIPTS).await?;
    Ok(structured::rating_from_blocks(
        scripts.iter().map(ElementHandle::text_content),
    ))
}

async fn from_meta_tags(session: &dyn BrowserSession) -> SessionResult<Option<Rating>> {
    first_parsed(session, selectors::RATING_META, |el| {
        el.non_empty_attribute("content")
            .or_else(|| el.non_empty_attribute("value"))
            .map(str::to_string)
    })
    .await
}

async fn from_rating_widgets(session: &dyn BrowserSession) -> SessionResult<Option<Rating>> {
    first_parsed(session, selectors::RATING_WIDGETS, |el| {
        el.non_empty_attribute("aria-label")
            .or_else(|| el.non_empty_attribute("content"))
            .map(str::to_string)
            .or_else(|| Some(el.text().to_string()))
    })
    .await
}

async fn from_store_rating(session: &dyn BrowserSession) -> SessionResult<Option<Rating>> {
    first_parsed(session, selectors::STORE_RATINGS, |el| {
        el.non_empty_attribute("aria-label")
            .map(str::to_string)
            .or_else(|| Some(el.text().to_string()))
    })
    .await
}

async fn from_markup(session: &dyn BrowserSession) -> SessionResult<Option<Rating>> {
    let html = session.page_source().await?;
    Ok(structured::scan_rating_value_field(&html))
}

/// Try each locator in order and return the first element text that parses.
///
/// A failing locator does not stop the remaining ones; the stage only fails
/// when every locator failed.
async fn first_parsed<F>(
    session: &dyn BrowserSession,
    locators: &[&str],
    label_of: F,
) -> SessionResult<Option<Rating>>
where
    F: Fn(&ElementHandle) -> Option<String> + Send + Sync,
{
    let mut last_error = None;
    let mut any_ok = false;
    for locator in locators {
        let elements = match session.find_elements(locator).await {
            Ok(elements) => elements,
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        };
        any_ok = true;
        let found = elements
            .iter()
            .filter_map(&label_of)
            .find_map(|label| parse_rating_text(label.trim()));
        if found.is_some() {
            return Ok(found);
        }
    }
    match last_error {
        Some(e) if !any_ok => Err(e),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{RecordedElement, RecordedPage, ScriptedSession};

    const URL: &str = "https://shop.test/shopping/product/1";

    fn session_with(page: RecordedPage) -> ScriptedSession {
        ScriptedSession::new([page]).starting_at(URL)
    }

    fn jsonld(body: &str) -> RecordedElement {
        RecordedElement::new(selectors::JSONLD_SCRIPTS)
            .tag("script")
            .text_content(body)
    }

    #[tokio::test]
    async fn test_structured_data_beats_conflicting_meta() {
        let page = RecordedPage::new(URL)
            .element(jsonld(r#"{"aggregateRating": {"ratingValue": 4.6}}"#))
            .element(
                RecordedElement::new(selectors::RATING_META[0])
                    .tag("meta")
                    .attr("content", "3.1"),
            );
        let resolved = PageRatingResolver::new()
            .resolve(&session_with(page))
            .await
            .unwrap();
        assert_eq!(resolved.rating.value(), 4.6);
        assert_eq!(resolved.source, RatingStrategy::StructuredData);
    }

    #[tokio::test]
    async fn test_meta_tag_used_when_no_structured_data() {
        let page = RecordedPage::new(URL).element(
            RecordedElement::new(selectors::RATING_META[1])
                .tag("meta")
                .attr("content", "4,4"),
        );
        let resolved = PageRatingResolver::new()
            .resolve(&session_with(page))
            .await
            .unwrap();
        assert_eq!(resolved.rating.value(), 4.4);
        assert_eq!(resolved.source, RatingStrategy::MetaTags);
    }

    #[tokio::test]
    async fn test_meta_value_attribute_fallback() {
        let page = RecordedPage::new(URL).element(
            RecordedElement::new(selectors::RATING_META[0])
                .tag("meta")
                .attr("content", "")
                .attr("value", "3.8"),
        );
        let resolved = PageRatingResolver::new()
            .resolve(&session_with(page))
            .await
            .unwrap();
        assert_eq!(resolved.rating.value(), 3.8);
    }

    #[tokio::test]
    async fn test_widget_prefers_aria_label_over_text() {
        let page = RecordedPage::new(URL).element(
            RecordedElement::new(selectors::RATING_WIDGETS[0])
                .tag("span")
                .attr("aria-label", "Rated 4.5 out of 5")
                .text("1,204 reviews"),
        );
        let resolved = PageRatingResolver::new()
            .resolve(&session_with(page))
            .await
            .unwrap();
        assert_eq!(resolved.rating.value(), 4.5);
        assert_eq!(resolved.source, RatingStrategy::RatingWidgets);
    }

    #[tokio::test]
    async fn test_widget_noise_is_skipped() {
        let page = RecordedPage::new(URL)
            .element(
                RecordedElement::new(selectors::RATING_WIDGETS[5])
                    .tag("div")
                    .text("2,318 ratings"),
            )
            .element(
                RecordedElement::new(selectors::RATING_WIDGETS[5])
                    .tag("span")
                    .text("Rating: 4.2"),
            );
        let resolved = PageRatingResolver::new()
            .resolve(&session_with(page))
            .await
            .unwrap();
        assert_eq!(resolved.rating.value(), 4.2);
    }

    #[tokio::test]
    async fn test_store_rating_before_markup_fallback() {
        let page = RecordedPage::new(URL)
            .element(
                RecordedElement::new(selectors::STORE_RATINGS[0])
                    .tag("div")
                    .text("4.7 store rating"),
            )
            .source(r#"<script>{"ratingValue": "3.0"}</script>"#);
        let resolved = PageRatingResolver::new()
            .resolve(&session_with(page))
            .await
            .unwrap();
        assert_eq!(resolved.rating.value(), 4.7);
        assert_eq!(resolved.source, RatingStrategy::StoreRating);
    }

    #[tokio::test]
    async fn test_markup_fallback_is_last_resort() {
        let page = RecordedPage::new(URL)
            .source(r#"<div data-state='{"ratingValue":"4,1"}'></div>"#);
        let resolved = PageRatingResolver::new()
            .resolve(&session_with(page))
            .await
            .unwrap();
        assert_eq!(resolved.rating.value(), 4.1);
        assert_eq!(resolved.source, RatingStrategy::MarkupFallback);
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let page = RecordedPage::new(URL).source("<html><body>No reviews</body></html>");
        assert!(PageRatingResolver::new()
            .resolve(&session_with(page))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_custom_order() {
        let page = RecordedPage::new(URL)
            .element(jsonld(r#"{"aggregateRating": {"ratingValue": 4.6}}"#))
            .element(
                RecordedElement::new(selectors::RATING_META[0])
                    .tag("meta")
                    .attr("content", "3.1"),
            );
        let resolver =
            PageRatingResolver::with_strategies([RatingStrategy::MetaTags, RatingStrategy::StructuredData]);
        let resolved = resolver.resolve(&session_with(page)).await.unwrap();
        assert_eq!(resolved.rating.value(), 3.1);
    }
}
