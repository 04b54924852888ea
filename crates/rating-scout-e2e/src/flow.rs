//! The shopping scenario end to end.
//!
//! Open results, apply filters, collect product links, then scan for the
//! second product rated at or above the threshold.

use crate::config::{Pacing, RunConfig};
use crate::error::FlowError;
use crate::shopping::{apply_filters, open_results, FiltersApplied};
use rating_scout::{
    collect_product_links, evaluate, BrowserSession, CollectorLimits, Outcome,
    QualificationResult, QualificationScanner, Recording, ScanOptions, ScriptedSession,
};
use serde::Serialize;

/// Scenario name used for artifacts and logs.
pub const SCENARIO: &str = "second_product_rating";

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub keyword: String,
    pub threshold: f64,
    pub filters: Option<FiltersApplied>,
    /// Distinct product links collected.
    pub candidates: usize,
    pub result: Option<QualificationResult>,
    pub outcome: Outcome,
}

/// Collect links from the current page and scan them.
pub async fn scan_results(
    session: &mut dyn BrowserSession,
    limits: CollectorLimits,
    options: ScanOptions,
) -> (usize, QualificationResult) {
    let candidates = collect_product_links(&*session, limits).await;
    tracing::info!(count = candidates.len(), "product links collected");
    let result = QualificationScanner::new(options)
        .scan(session, &candidates)
        .await;
    (candidates.len(), result)
}

/// Run the full scenario against a live session.
///
/// A blocked results page becomes a skip; everything past that point is
/// decided by the scan.
#[tracing::instrument(skip_all, fields(scenario = SCENARIO, keyword = %config.keyword))]
pub async fn run_scenario(
    session: &mut dyn BrowserSession,
    config: &RunConfig,
    pacing: &Pacing,
) -> ScenarioReport {
    let mut report = ScenarioReport {
        keyword: config.keyword.clone(),
        threshold: config.min_rating,
        filters: None,
        candidates: 0,
        result: None,
        outcome: Outcome::Skipped {
            reason: String::new(),
        },
    };

    match open_results(session, &config.keyword, pacing).await {
        Ok(()) => {}
        Err(FlowError::Blocked(reason)) => {
            tracing::warn!(%reason, "skipping: results page blocked");
            report.outcome = Outcome::Skipped { reason };
            return report;
        }
        Err(e) => {
            report.outcome = Outcome::Failed {
                message: e.to_string(),
            };
            return report;
        }
    }

    report.filters = Some(apply_filters(session, config.max_price, pacing).await);

    let (candidates, result) = scan_results(
        session,
        config.collector_limits(pacing),
        config.scan_options(pacing),
    )
    .await;
    report.candidates = candidates;
    report.outcome = evaluate(&result, config.min_rating);
    report.result = Some(result);

    log_outcome(&report.outcome);
    report
}

/// Scan a recorded results page with no waits.
pub async fn replay(
    recording: Recording,
    min_rating: f64,
    max_products: usize,
    max_scrolls: usize,
) -> ScenarioReport {
    let pacing = Pacing::immediate();
    let mut session = ScriptedSession::from_recording(recording);
    let limits = CollectorLimits {
        max_scrolls,
        max_links: max_products.saturating_mul(2),
        scroll_pause: pacing.scroll_pause,
    };
    let options = ScanOptions {
        visit_budget: max_products,
        threshold: min_rating,
        settle_delay: pacing.settle_delay,
        ready_timeout: pacing.ready_timeout,
    };

    let (candidates, result) = scan_results(&mut session, limits, options).await;
    let outcome = evaluate(&result, min_rating);
    log_outcome(&outcome);
    ScenarioReport {
        keyword: String::new(),
        threshold: min_rating,
        filters: None,
        candidates,
        result: Some(result),
        outcome,
    }
}

fn log_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Passed { rating, threshold } => {
            tracing::info!(rating, threshold, "PASS: second qualifying product found")
        }
        Outcome::Failed { message } => tracing::error!(%message, "FAIL"),
        Outcome::Skipped { reason } => tracing::warn!(%reason, "SKIP"),
    }
}
