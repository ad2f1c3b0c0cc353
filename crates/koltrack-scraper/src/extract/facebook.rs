//! Facebook page extraction.
//!
//! Facebook's markup is heavily obfuscated, so beyond the page title the
//! counts come out of full-text patterns rather than selectors.

use std::sync::LazyLock;

use regex::Regex;

use crate::browser::BrowserSession;
use crate::error::ScrapeError;
use crate::parse::parse_count;
use crate::types::ExtractedProfile;

use super::{first_text, round_rate};

static FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9][0-9.,]*[KMB]?)\s*(?:followers|people follow this)")
        .unwrap_or_else(|e| panic!("invalid facebook followers regex: {e}"))
});

static LIKES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9][0-9.,]*[KMB]?)\s*(?:likes|people like this)")
        .unwrap_or_else(|e| panic!("invalid facebook likes regex: {e}"))
});

static POSTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9][0-9.,]*[KMB]?)\s*(?:posts|photos)")
        .unwrap_or_else(|e| panic!("invalid facebook posts regex: {e}"))
});

pub(super) async fn extract(
    session: &mut dyn BrowserSession,
) -> Result<ExtractedProfile, ScrapeError> {
    let mut profile = ExtractedProfile::default();
    let text = session.full_text().await;

    if let Some(caps) = FOLLOWERS_RE.captures(&text) {
        profile.followers = parse_count(&caps[1], 0);
    }
    if let Some(caps) = LIKES_RE.captures(&text) {
        profile.likes = parse_count(&caps[1], 0);
    }
    if let Some(caps) = POSTS_RE.captures(&text) {
        profile.posts = parse_count(&caps[1], 0);
    }

    // Pages that only expose likes still have a followable audience.
    if profile.followers == 0 && profile.likes > 0 {
        profile.followers = profile.likes;
    }

    let page_name = first_text(session, &["h1", "[role=\"main\"] h1 span"])
        .await
        .filter(|t| !t.is_empty());
    profile.meta_str("display_name", page_name);

    let category = session
        .attribute("meta[property=\"og:description\"]", "content")
        .await
        .and_then(|d| d.split('.').next().map(str::trim).map(str::to_owned))
        .filter(|c| !c.is_empty() && c.len() < 80);
    profile.meta_str("category", category);

    profile.engagement_rate = engagement_heuristic(profile.followers, profile.likes);

    Ok(profile)
}

/// Likes-to-audience ratio as a percentage, bounded to [0.0, 10.0].
fn engagement_heuristic(followers: i64, likes: i64) -> f64 {
    if followers <= 0 || likes <= 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = likes as f64 / followers as f64 * 10.0;
    round_rate(rate.clamp(0.0, 10.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StaticSession;

    const PAGE_HTML: &str = r#"
        <html><head>
            <meta property="og:description" content="Media outlet. Daily coverage of local news." />
        </head><body>
            <h1>Jane News Network</h1>
            <div>128K likes &middot; 245K followers &middot; 1,830 posts</div>
        </body></html>
    "#;

    #[tokio::test]
    async fn reads_counts_from_page_text() {
        let mut session = StaticSession::new(PAGE_HTML);
        let profile = extract(&mut session).await.unwrap();
        assert_eq!(profile.followers, 245_000);
        assert_eq!(profile.likes, 128_000);
        assert_eq!(profile.posts, 1830);
        assert_eq!(
            profile.metadata.get("display_name").and_then(|v| v.as_str()),
            Some("Jane News Network")
        );
        assert_eq!(
            profile.metadata.get("category").and_then(|v| v.as_str()),
            Some("Media outlet")
        );
    }

    #[tokio::test]
    async fn likes_stand_in_for_missing_followers() {
        let mut session = StaticSession::new(
            "<html><body><h1>Jane Page</h1><div>5,200 people like this</div></body></html>",
        );
        let profile = extract(&mut session).await.unwrap();
        assert_eq!(profile.likes, 5200);
        assert_eq!(profile.followers, 5200);
    }

    #[test]
    fn engagement_rate_is_bounded() {
        assert!((engagement_heuristic(1_000, 10_000_000) - 10.0).abs() < f64::EPSILON);
        assert!((engagement_heuristic(245_000, 128_000) - 5.22).abs() < f64::EPSILON);
    }
}
