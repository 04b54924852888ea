//! Run configuration, read from flags or the environment.

use crate::error::FlowError;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, ValueEnum};
use rating_scout::{CollectorLimits, ScanOptions};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Browser requested for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Chromium,
    /// Not drivable over CDP; the run falls back to Chromium.
    Firefox,
}

/// Options for launching the browser.
#[derive(Debug, Clone, Args)]
pub struct BrowserArgs {
    /// Browser to drive (chrome, chromium, firefox)
    #[arg(long, env = "BROWSER", value_enum, default_value_t = BrowserKind::Chrome)]
    pub browser: BrowserKind,

    /// Run without a visible window (true/false)
    #[arg(
        long,
        env = "HEADLESS",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub headless: bool,

    /// Page load timeout in seconds
    #[arg(long = "nav-timeout", env = "NAV_TIMEOUT_SECS", default_value_t = 30)]
    pub nav_timeout_secs: u64,
}

impl BrowserArgs {
    pub fn nav_timeout(&self) -> Duration {
        Duration::from_secs(self.nav_timeout_secs)
    }
}

/// Everything the shopping scenario needs.
#[derive(Debug, Clone, Args)]
pub struct RunConfig {
    /// Book title to search for (searched as "book <keyword>")
    #[arg(long, env = "BOOK_NAME", default_value = "Harry Potter")]
    pub keyword: String,

    /// Maximum acceptable price
    #[arg(long, env = "MAX_PRICE", default_value_t = 1000.0)]
    pub max_price: f64,

    /// Minimum rating that qualifies a product (0-5)
    #[arg(long, env = "MIN_RATING", default_value_t = rating_scout::scanner::DEFAULT_THRESHOLD)]
    pub min_rating: f64,

    /// Maximum number of product pages to visit
    #[arg(long, env = "MAX_PRODUCTS", default_value_t = 50)]
    pub max_products: usize,

    /// Maximum number of scroll passes when collecting product links
    #[arg(long, env = "MAX_SCROLLS", default_value_t = 12)]
    pub max_scrolls: usize,

    /// Seconds to wait for a CAPTCHA to be solved by hand
    #[arg(long = "captcha-timeout", env = "CAPTCHA_TIMEOUT_SECS", default_value_t = 180)]
    pub captcha_timeout_secs: u64,

    /// Directory for failure screenshots and reports
    #[arg(long, env = "ARTIFACTS_DIR", default_value = "screenshots")]
    pub artifacts_dir: PathBuf,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

impl RunConfig {
    /// Reject values the scenario cannot work with.
    pub fn validate(&self) -> Result<(), FlowError> {
        if !(0.0..=5.0).contains(&self.min_rating) {
            return Err(FlowError::Config(format!(
                "min rating {} is outside 0-5",
                self.min_rating
            )));
        }
        if !(self.max_price.is_finite() && self.max_price > 0.0) {
            return Err(FlowError::Config(format!(
                "max price {} must be positive",
                self.max_price
            )));
        }
        if self.max_products == 0 {
            return Err(FlowError::Config("max products must be at least 1".into()));
        }
        if self.keyword.trim().is_empty() {
            return Err(FlowError::Config("keyword is empty".into()));
        }
        Ok(())
    }

    /// Timings for a live run.
    pub fn pacing(&self) -> Pacing {
        Pacing {
            captcha_timeout: Duration::from_secs(self.captcha_timeout_secs),
            ..Pacing::default()
        }
    }

    /// Link collection gathers twice as many links as will be visited.
    pub fn collector_limits(&self, pacing: &Pacing) -> CollectorLimits {
        CollectorLimits {
            max_scrolls: self.max_scrolls,
            max_links: self.max_products.saturating_mul(2),
            scroll_pause: pacing.scroll_pause,
        }
    }

    pub fn scan_options(&self, pacing: &Pacing) -> ScanOptions {
        ScanOptions {
            visit_budget: self.max_products,
            threshold: self.min_rating,
            settle_delay: pacing.settle_delay,
            ready_timeout: pacing.ready_timeout,
        }
    }
}

/// Waits and pauses used throughout the scenario.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Pause after opening a product page.
    pub settle_delay: Duration,
    /// Pause after each scroll while collecting links.
    pub scroll_pause: Duration,
    /// Pause after changing sort order or price.
    pub filter_pause: Duration,
    /// Wait for each candidate element when clicking through menus.
    pub click_wait: Duration,
    /// Wait for the minimum-rating chip.
    pub chip_wait: Duration,
    /// Wait for result containers on the search page.
    pub results_timeout: Duration,
    /// Attempts at loading the results page.
    pub results_attempts: u32,
    /// Wait for a product page to render anything.
    pub ready_timeout: Duration,
    /// Wait for a human to clear a CAPTCHA.
    pub captcha_timeout: Duration,
    pub captcha_poll: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(900),
            scroll_pause: Duration::from_millis(500),
            filter_pause: Duration::from_millis(600),
            click_wait: Duration::from_secs(3),
            chip_wait: Duration::from_secs(2),
            results_timeout: Duration::from_secs(30),
            results_attempts: 3,
            ready_timeout: Duration::from_secs(10),
            captcha_timeout: Duration::from_secs(180),
            captcha_poll: Duration::from_secs(2),
        }
    }
}

impl Pacing {
    /// No waiting at all; for recorded sessions.
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            scroll_pause: Duration::ZERO,
            filter_pause: Duration::ZERO,
            click_wait: Duration::ZERO,
            chip_wait: Duration::ZERO,
            results_timeout: Duration::ZERO,
            results_attempts: 1,
            ready_timeout: Duration::ZERO,
            captcha_timeout: Duration::ZERO,
            captcha_poll: Duration::ZERO,
        }
    }
}
