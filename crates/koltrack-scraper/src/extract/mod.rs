//! Per-platform field extraction, dispatched on the platform-type tag.

mod facebook;
mod instagram;
mod tiktok;
mod youtube;

use koltrack_core::PlatformKind;

use crate::browser::BrowserSession;
use crate::error::ScrapeError;
use crate::types::ExtractedProfile;

/// One extraction variant per platform. Selected by tag; each variant
/// knows its profile-URL shape, its interstitial selectors, and its field
/// readers.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PlatformExtractor {
    Facebook,
    Instagram,
    Tiktok,
    Youtube,
}

impl PlatformExtractor {
    pub(crate) fn for_kind(kind: PlatformKind) -> Self {
        match kind {
            PlatformKind::Facebook => PlatformExtractor::Facebook,
            PlatformKind::Instagram => PlatformExtractor::Instagram,
            PlatformKind::Tiktok => PlatformExtractor::Tiktok,
            PlatformKind::Youtube => PlatformExtractor::Youtube,
        }
    }

    /// Profile URL for the job target. Targets that are already absolute
    /// URLs pass through unchanged.
    pub(crate) fn profile_url(self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_owned();
        }
        let handle = target.trim_start_matches('@');
        match self {
            PlatformExtractor::Facebook => format!("https://www.facebook.com/{handle}"),
            PlatformExtractor::Instagram => format!("https://www.instagram.com/{handle}/"),
            PlatformExtractor::Tiktok => format!("https://www.tiktok.com/@{handle}"),
            PlatformExtractor::Youtube => format!("https://www.youtube.com/@{handle}"),
        }
    }

    /// Selectors for the interstitials each platform is known to throw up.
    pub(crate) fn interstitial_selectors(self) -> &'static [&'static str] {
        match self {
            PlatformExtractor::Facebook => &[
                "[aria-label*=\"Close\"]",
                "[data-testid=\"cookie-policy-manage-dialog\"] button",
            ],
            PlatformExtractor::Instagram => &["[role=\"dialog\"] [aria-label=\"Close\"]"],
            PlatformExtractor::Tiktok => &[
                "[data-e2e=\"age-gate-continue\"]",
                "[data-e2e=\"modal-close-inner-button\"]",
            ],
            PlatformExtractor::Youtube => &[
                "button[aria-label*=\"Accept\"]",
                "button[aria-label*=\"Agree\"]",
            ],
        }
    }

    /// Runs the platform's field readers against the loaded document.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Extraction`] only on structural failure (an
    /// empty document); individual field misses fall back to defaults.
    pub(crate) async fn extract(
        self,
        session: &mut dyn BrowserSession,
        target: &str,
    ) -> Result<ExtractedProfile, ScrapeError> {
        require_document(session).await?;
        match self {
            PlatformExtractor::Facebook => facebook::extract(session).await,
            PlatformExtractor::Instagram => instagram::extract(session, target).await,
            PlatformExtractor::Tiktok => tiktok::extract(session, target).await,
            PlatformExtractor::Youtube => youtube::extract(session).await,
        }
    }
}

/// Structural guard: an empty rendered document means the page never
/// loaded, which is an extraction failure rather than a pile of defaults.
async fn require_document(session: &dyn BrowserSession) -> Result<(), ScrapeError> {
    if session.full_text().await.trim().is_empty() {
        return Err(ScrapeError::Extraction {
            reason: "rendered document is empty".to_owned(),
        });
    }
    Ok(())
}

/// First non-empty text among `selectors`, probing in order.
pub(crate) async fn first_text(
    session: &dyn BrowserSession,
    selectors: &[&str],
) -> Option<String> {
    for selector in selectors {
        if let Some(text) = session.text(selector).await {
            return Some(text);
        }
    }
    None
}

/// Mean of the parseable counts in `raw`, zero when none parse.
pub(crate) fn average_count(raw: &[String]) -> i64 {
    let values: Vec<i64> = raw
        .iter()
        .map(|t| crate::parse::parse_count(t, 0))
        .filter(|v| *v > 0)
        .collect();
    if values.is_empty() {
        return 0;
    }
    #[allow(clippy::cast_possible_wrap)]
    let len = values.len() as i64;
    values.iter().sum::<i64>() / len
}

/// Rounds a heuristic rate to two decimals, matching how the rates are
/// displayed downstream.
pub(crate) fn round_rate(rate: f64) -> f64 {
    (rate * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_urls_follow_platform_shapes() {
        assert_eq!(
            PlatformExtractor::Instagram.profile_url("jane"),
            "https://www.instagram.com/jane/"
        );
        assert_eq!(
            PlatformExtractor::Tiktok.profile_url("@jane"),
            "https://www.tiktok.com/@jane"
        );
        assert_eq!(
            PlatformExtractor::Youtube.profile_url("jane"),
            "https://www.youtube.com/@jane"
        );
        assert_eq!(
            PlatformExtractor::Facebook.profile_url("https://www.facebook.com/janepage"),
            "https://www.facebook.com/janepage"
        );
    }

    #[test]
    fn average_count_skips_unparsable_entries() {
        let raw = vec!["1K".to_owned(), "abc".to_owned(), "3K".to_owned()];
        assert_eq!(average_count(&raw), 2000);
        assert_eq!(average_count(&[]), 0);
    }
}
