//! Anti-detection posture and pacing.
//!
//! Best-effort only: randomized fingerprints and human-like pacing reduce
//! bot-detection signal but nothing here guarantees evasion.

use std::time::Duration;

use koltrack_core::AppConfig;
use rand::Rng;

use crate::browser::{BrowserSession, SessionConfig, Viewport};

/// Draws a randomized session posture from the configured pools.
pub(crate) fn session_config(config: &AppConfig) -> SessionConfig {
    let mut rng = rand::rng();
    let agent_idx = rng.random_range(0..config.user_agents.len());
    SessionConfig {
        user_agent: config.user_agents[agent_idx].clone(),
        viewport: Viewport {
            width: 1920 + rng.random_range(0..100),
            height: 1080 + rng.random_range(0..100),
        },
        proxy: config.proxy.clone(),
        stealth: true,
    }
}

/// Sleeps a uniformly random duration within `[min_ms, max_ms]`.
pub(crate) async fn random_delay(min_ms: u64, max_ms: u64) {
    let delay_ms = {
        let mut rng = rand::rng();
        rng.random_range(min_ms..=max_ms.max(min_ms))
    };
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

/// Pointer movement plus a scroll, followed by a short pause — enough to
/// let lazily loaded counters render and to look less like a headless
/// fetch.
pub(crate) async fn simulate_human(session: &mut dyn BrowserSession) {
    let (x, y, scroll) = {
        let mut rng = rand::rng();
        (
            rng.random_range(100..1100),
            rng.random_range(100..800),
            rng.random_range(100..400),
        )
    };
    session.move_pointer(x, y).await;
    session.scroll_by(scroll).await;
    random_delay(500, 1500).await;
}

/// Attempts to dismiss platform interstitials. Non-fatal: a selector that
/// matches nothing is simply skipped.
pub(crate) async fn dismiss_interstitials(session: &mut dyn BrowserSession, selectors: &[&str]) {
    for selector in selectors {
        if session.dismiss(selector).await {
            tracing::debug!(selector, "dismissed interstitial");
            random_delay(500, 1500).await;
        }
    }
}
