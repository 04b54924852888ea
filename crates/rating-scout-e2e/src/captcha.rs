//! CAPTCHA detection and the manual-clearance wait.
//!
//! Nothing here interacts with the challenge: when one shows up the run
//! pauses so a person at the keyboard can solve it.

use crate::locators::CAPTCHA_MARKERS;
use rating_scout::{any_present, BrowserSession};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaStatus {
    NotShown,
    Cleared,
    /// Still on screen when the wait ran out.
    StillPresent,
}

/// Whether any CAPTCHA marker matches on the current page.
pub async fn captcha_present(session: &dyn BrowserSession) -> bool {
    any_present(session, CAPTCHA_MARKERS).await
}

/// If a CAPTCHA is showing, poll every `poll` until it disappears or
/// `timeout` elapses. Never fails; the caller decides what a remaining
/// CAPTCHA means.
pub async fn wait_for_clearance(
    session: &dyn BrowserSession,
    timeout: Duration,
    poll: Duration,
) -> CaptchaStatus {
    if !captcha_present(session).await {
        return CaptchaStatus::NotShown;
    }
    tracing::warn!(
        timeout_secs = timeout.as_secs(),
        "CAPTCHA detected, solve it manually in the browser window"
    );

    let started = Instant::now();
    loop {
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            tracing::warn!("CAPTCHA still present, continuing anyway");
            return CaptchaStatus::StillPresent;
        }
        tokio::time::sleep(poll.min(timeout - elapsed)).await;
        if !captcha_present(session).await {
            tracing::info!(waited_secs = started.elapsed().as_secs(), "CAPTCHA cleared");
            return CaptchaStatus::Cleared;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rating_scout::{RecordedElement, RecordedPage, ScriptedSession};

    const URL: &str = "https://www.google.com/sorry/index";

    #[tokio::test]
    async fn test_no_captcha() {
        let session = ScriptedSession::new([RecordedPage::new(URL)]).starting_at(URL);
        assert!(!captcha_present(&session).await);
        let status = wait_for_clearance(&session, Duration::from_secs(5), Duration::ZERO).await;
        assert_eq!(status, CaptchaStatus::NotShown);
    }

    #[tokio::test]
    async fn test_persistent_captcha_times_out() {
        let page = RecordedPage::new(URL).element(
            RecordedElement::new(CAPTCHA_MARKERS[0])
                .tag("iframe")
                .attr("src", "https://www.google.com/recaptcha/api2/anchor"),
        );
        let session = ScriptedSession::new([page]).starting_at(URL);
        let status = wait_for_clearance(
            &session,
            Duration::from_millis(20),
            Duration::from_millis(5),
        )
        .await;
        assert_eq!(status, CaptchaStatus::StillPresent);
    }

    #[tokio::test]
    async fn test_spanish_marker_detected() {
        let page = RecordedPage::new(URL)
            .element(RecordedElement::new(CAPTCHA_MARKERS[1]).text("No soy un robot"));
        let session = ScriptedSession::new([page]).starting_at(URL);
        assert!(captcha_present(&session).await);
    }
}
