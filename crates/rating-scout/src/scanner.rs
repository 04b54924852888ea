//! Sequential qualification scan over candidate product pages.
//!
//! Candidates are visited one at a time in discovery order. Ratings at or
//! above the threshold qualify; the scan ends as soon as the second
//! qualifying rating is seen, and that rating is the result.

use crate::collector::{CandidateList, ProductLink};
use crate::rating::{Rating, MAX_RATING, MIN_RATING};
use crate::resolver::{PageRatingResolver, ResolvedRating};
use crate::session::BrowserSession;
use serde::Serialize;
use std::time::Duration;

/// How many qualifying ratings end the scan.
pub const QUALIFYING_TARGET: usize = 2;

/// Default rating threshold.
pub const DEFAULT_THRESHOLD: f64 = 4.0;

/// Scan parameters.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Maximum number of candidates to visit.
    pub visit_budget: usize,
    /// Minimum rating that qualifies.
    pub threshold: f64,
    /// Pause after each navigation before reading the page.
    pub settle_delay: Duration,
    /// How long to wait for the visited page to render anything.
    pub ready_timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            visit_budget: 50,
            threshold: DEFAULT_THRESHOLD,
            settle_delay: Duration::from_millis(900),
            ready_timeout: Duration::from_secs(10),
        }
    }
}

/// What happened on one candidate page.
#[derive(Debug, Clone, Serialize)]
pub struct Visit {
    pub link: ProductLink,
    pub resolved: Option<ResolvedRating>,
    pub qualified: bool,
}

/// Why no second qualifying rating was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    /// The candidate list was empty.
    NoCandidates,
    /// The visit budget or the candidates ran out first.
    Exhausted,
}

/// Outcome of a qualification scan.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QualificationResult {
    Found {
        /// The second qualifying rating, in visit order.
        rating: Rating,
        qualifying: Vec<Rating>,
        visits: Vec<Visit>,
    },
    NotFound {
        reason: NotFoundReason,
        /// Qualifying ratings seen before giving up (at most one).
        qualifying: Vec<Rating>,
        visits: Vec<Visit>,
    },
}

impl QualificationResult {
    /// The second qualifying rating, if found.
    pub fn rating(&self) -> Option<Rating> {
        match self {
            QualificationResult::Found { rating, .. } => Some(*rating),
            QualificationResult::NotFound { .. } => None,
        }
    }

    pub fn qualifying(&self) -> &[Rating] {
        match self {
            QualificationResult::Found { qualifying, .. }
            | QualificationResult::NotFound { qualifying, .. } => qualifying,
        }
    }

    pub fn visits(&self) -> &[Visit] {
        match self {
            QualificationResult::Found { visits, .. }
            | QualificationResult::NotFound { visits, .. } => visits,
        }
    }
}

/// Visits candidates and picks the second qualifying rating.
#[derive(Debug, Clone, Default)]
pub struct QualificationScanner {
    resolver: PageRatingResolver,
    options: ScanOptions,
}

impl QualificationScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            resolver: PageRatingResolver::new(),
            options,
        }
    }

    /// Use a custom resolver.
    pub fn with_resolver(mut self, resolver: PageRatingResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Whether `rating` lies within `[threshold, 5.0]`.
    pub fn qualifies(&self, rating: Rating) -> bool {
        (MIN_RATING..=MAX_RATING).contains(&rating.value()) && rating.meets(self.options.threshold)
    }

    /// Scan `candidates` in order.
    ///
    /// The session is returned to the originating list page after every
    /// visit, including the final one.
    pub async fn scan(
        &self,
        session: &mut dyn BrowserSession,
        candidates: &CandidateList,
    ) -> QualificationResult {
        if candidates.is_empty() {
            tracing::warn!("no candidate product links to visit");
            return QualificationResult::NotFound {
                reason: NotFoundReason::NoCandidates,
                qualifying: Vec::new(),
                visits: Vec::new(),
            };
        }

        let list_url = match session.current_url().await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, "could not record list URL, will not return to it");
                None
            }
        };

        let mut qualifying = Vec::with_capacity(QUALIFYING_TARGET);
        let mut visits = Vec::new();

        for (n, link) in candidates
            .iter()
            .take(self.options.visit_budget)
            .enumerate()
        {
            tracing::info!(candidate = n + 1, url = %link, "visiting product");
            let resolved = self.visit(session, link).await;
            let qualified = resolved.is_some_and(|r| self.qualifies(r.rating));

            match resolved {
                Some(r) => tracing::info!(
                    rating = r.rating.value(),
                    stage = %r.source,
                    qualified,
                    "rating read"
                ),
                None => tracing::info!("no rating on page"),
            }

            visits.push(Visit {
                link: link.clone(),
                resolved,
                qualified,
            });

            if let Some(r) = resolved.filter(|_| qualified) {
                qualifying.push(r.rating);
                tracing::info!(
                    threshold = self.options.threshold,
                    count = qualifying.len(),
                    "rating qualifies"
                );
            }

            return_to_list(session, list_url.as_deref()).await;

            if qualifying.len() == QUALIFYING_TARGET {
                return QualificationResult::Found {
                    rating: qualifying[QUALIFYING_TARGET - 1],
                    qualifying,
                    visits,
                };
            }
        }

        tracing::warn!(
            threshold = self.options.threshold,
            qualifying = ?qualifying.iter().map(|r| r.value()).collect::<Vec<_>>(),
            visited = visits.len(),
            "fewer than two qualifying ratings"
        );
        QualificationResult::NotFound {
            reason: NotFoundReason::Exhausted,
            qualifying,
            visits,
        }
    }

    async fn visit(
        &self,
        session: &mut dyn BrowserSession,
        link: &ProductLink,
    ) -> Option<ResolvedRating> {
        if let Err(e) = session.navigate(link.as_str()).await {
            tracing::warn!(url = %link, error = %e, "navigation failed, reading whatever loaded");
        }
        tokio::time::sleep(self.options.settle_delay).await;
        if let Err(e) = session.wait_for_document(self.options.ready_timeout).await {
            tracing::debug!(url = %link, error = %e, "page not ready, reading anyway");
        }
        self.resolver.resolve(&*session).await
    }
}

async fn return_to_list(session: &mut dyn BrowserSession, list_url: Option<&str>) {
    let Some(url) = list_url else {
        return;
    };
    if let Err(e) = session.navigate(url).await {
        tracing::warn!(url, error = %e, "could not return to list page");
    }
}
