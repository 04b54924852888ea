//! Shopping search page: opening results and applying filters.

use crate::captcha::{wait_for_clearance, CaptchaStatus};
use crate::config::Pacing;
use crate::error::{FlowError, FlowResult};
use crate::locators;
use rating_scout::{click_first_present, BrowserSession, Condition};
use serde::Serialize;
use url::Url;

const SEARCH_ENDPOINT: &str = "https://www.google.com/search";

const INITIAL_SCROLL: &str = "window.scrollTo(0, document.body.scrollHeight * 0.3);";

/// Shopping-tab search URL for `keyword`, pinned to English/US results.
pub fn search_url(keyword: &str) -> Url {
    let query = format!("book {}", keyword.trim());
    let mut url = Url::parse(SEARCH_ENDPOINT).expect("search endpoint is a valid URL");
    url.query_pairs_mut()
        .append_pair("q", &query)
        .append_pair("tbm", "shop")
        .append_pair("hl", "en")
        .append_pair("gl", "us")
        .append_pair("pws", "0")
        .append_pair("udm", "14");
    url
}

/// Whether `url` is still on the shopping tab.
fn on_shopping_tab(url: &str) -> bool {
    Url::parse(url)
        .map(|u| u.query_pairs().any(|(k, v)| k == "tbm" && v == "shop"))
        .unwrap_or(false)
}

async fn load_search(session: &mut dyn BrowserSession, url: &Url) {
    if let Err(e) = session.navigate(url.as_str()).await {
        tracing::warn!(error = %e, "search navigation failed");
    }
    let landed = session.current_url().await.unwrap_or_default();
    if !on_shopping_tab(&landed) {
        tracing::info!(landed = %landed, "left the shopping tab, navigating again");
        if let Err(e) = session.navigate(url.as_str()).await {
            tracing::warn!(error = %e, "search navigation failed");
        }
    }
}

/// Open the shopping results for `keyword` and wait for the grid.
///
/// Each attempt reloads the search and waits out any CAPTCHA first. When
/// every attempt times out the run is blocked.
pub async fn open_results(
    session: &mut dyn BrowserSession,
    keyword: &str,
    pacing: &Pacing,
) -> FlowResult<()> {
    let url = search_url(keyword);
    let attempts = pacing.results_attempts.max(1);
    let mut captcha_stuck = false;

    for attempt in 1..=attempts {
        tracing::info!(attempt, url = %url, "opening shopping results");
        load_search(session, &url).await;

        let status =
            wait_for_clearance(&*session, pacing.captcha_timeout, pacing.captcha_poll).await;
        captcha_stuck = status == CaptchaStatus::StillPresent;

        match session
            .wait_until(
                Condition::AnyPresent(locators::RESULTS_READY),
                pacing.results_timeout,
            )
            .await
        {
            Ok(()) => return Ok(()),
            Err(e) => tracing::warn!(attempt, error = %e, "results did not appear"),
        }
    }

    let cause = if captcha_stuck {
        "CAPTCHA was never cleared"
    } else {
        "result grid never rendered"
    };
    Err(FlowError::Blocked(format!(
        "{cause} after {attempts} attempt(s)"
    )))
}

/// Which filters took effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FiltersApplied {
    pub sorted_high_to_low: bool,
    pub price_capped: bool,
    pub min_rating_chip: bool,
}

/// Sort by price, cap the price and pick the minimum-rating chip.
///
/// Every step is best effort: a control that is missing leaves the results
/// as they are.
pub async fn apply_filters(
    session: &mut dyn BrowserSession,
    max_price: f64,
    pacing: &Pacing,
) -> FiltersApplied {
    let mut applied = FiltersApplied::default();

    if click_first_present(session, locators::SORT_BUTTONS, pacing.click_wait).await {
        applied.sorted_high_to_low =
            click_first_present(session, locators::SORT_HIGH_TO_LOW, pacing.click_wait).await;
        tokio::time::sleep(pacing.filter_pause).await;
    }
    if !applied.sorted_high_to_low {
        tracing::info!("sort control not available, keeping default order");
    }

    applied.price_capped = set_max_price(&*session, max_price).await;
    if applied.price_capped {
        tokio::time::sleep(pacing.filter_pause).await;
    } else {
        tracing::info!(max_price, "price filter not available");
    }

    applied.min_rating_chip =
        click_first_present(session, locators::MIN_RATING_CHIP, pacing.chip_wait).await;
    if applied.min_rating_chip {
        tokio::time::sleep(pacing.filter_pause).await;
    } else {
        tracing::info!("minimum rating chip not available");
    }

    if let Err(e) = session.execute_script(INITIAL_SCROLL).await {
        tracing::debug!(error = %e, "initial scroll failed");
    }
    tokio::time::sleep(pacing.scroll_pause).await;

    tracing::info!(?applied, "filters applied");
    applied
}

/// Price as typed into the input: no trailing `.0` for whole amounts.
fn format_price(price: f64) -> String {
    if price.fract() == 0.0 && price.abs() < 1e15 {
        format!("{}", price as i64)
    } else {
        price.to_string()
    }
}

fn max_price_script(price: &str) -> String {
    let xpath = serde_json::Value::String(locators::MAX_PRICE_INPUT.to_string());
    let price = serde_json::Value::String(price.to_string());
    format!(
        "(() => {{
  const el = document.evaluate({xpath}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  if (!el) return false;
  el.focus();
  el.value = {price};
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  if (el.form) {{
    if (el.form.requestSubmit) el.form.requestSubmit(); else el.form.submit();
  }}
  return true;
}})()"
    )
}

async fn set_max_price(session: &dyn BrowserSession, max_price: f64) -> bool {
    match session
        .execute_script(&max_price_script(&format_price(max_price)))
        .await
    {
        Ok(value) => value.as_bool() == Some(true),
        Err(e) => {
            tracing::debug!(error = %e, "setting max price failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url() {
        let url = search_url("Harry Potter");
        assert_eq!(
            url.as_str(),
            "https://www.google.com/search?q=book+Harry+Potter&tbm=shop&hl=en&gl=us&pws=0&udm=14"
        );
        assert!(on_shopping_tab(url.as_str()));
    }

    #[test]
    fn test_shopping_tab_detection() {
        assert!(!on_shopping_tab("https://www.google.com/search?q=book+Dune"));
        assert!(!on_shopping_tab("not a url"));
    }

    #[test]
    fn test_price_formatting() {
        assert_eq!(format_price(1000.0), "1000");
        assert_eq!(format_price(49.99), "49.99");
        assert!(max_price_script("1000").contains(r#"el.value = "1000";"#));
    }
}
