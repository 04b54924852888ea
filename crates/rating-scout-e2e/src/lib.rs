//! Browser end-to-end check for shopping results: the second product rated
//! at or above a threshold, found through a live Chromium session or a
//! recorded one.

pub mod artifacts;
pub mod browser;
pub mod captcha;
pub mod config;
pub mod error;
pub mod flow;
pub mod locators;
pub mod logging;
pub mod shopping;

pub use browser::{find_chromium, ChromiumSession};
pub use config::{BrowserArgs, BrowserKind, Pacing, RunConfig};
pub use error::{FlowError, FlowResult};
pub use flow::{replay, run_scenario, ScenarioReport, SCENARIO};
