//! Instagram profile extraction.
//!
//! Instagram serves follower counts in the `og:description` meta tag even
//! when the profile grid needs a login, so the meta layer is tried first
//! and the rendered text is only a fallback.

use std::sync::LazyLock;

use regex::Regex;

use crate::browser::BrowserSession;
use crate::error::ScrapeError;
use crate::parse::parse_count;
use crate::types::ExtractedProfile;

use super::round_rate;

// "1.5M Followers, 320 Following, 1,204 Posts - ..."
static OG_STATS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([0-9][0-9.,]*[KMB]?)\s*Followers,\s*([0-9][0-9.,]*[KMB]?)\s*Following,\s*([0-9][0-9.,]*[KMB]?)\s*Posts",
    )
    .unwrap_or_else(|e| panic!("invalid instagram stats regex: {e}"))
});

static TEXT_FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9][0-9.,]*[KMB]?)\s*followers")
        .unwrap_or_else(|e| panic!("invalid instagram followers regex: {e}"))
});

static TEXT_FOLLOWING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9][0-9.,]*[KMB]?)\s*following")
        .unwrap_or_else(|e| panic!("invalid instagram following regex: {e}"))
});

static TEXT_POSTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9][0-9.,]*[KMB]?)\s*posts")
        .unwrap_or_else(|e| panic!("invalid instagram posts regex: {e}"))
});

pub(super) async fn extract(
    session: &mut dyn BrowserSession,
    target: &str,
) -> Result<ExtractedProfile, ScrapeError> {
    let mut profile = ExtractedProfile::default();

    let og_description = session
        .attribute("meta[property=\"og:description\"]", "content")
        .await;
    if let Some(description) = &og_description {
        if let Some(caps) = OG_STATS_RE.captures(description) {
            profile.followers = parse_count(&caps[1], 0);
            profile.following = parse_count(&caps[2], 0);
            profile.posts = parse_count(&caps[3], 0);
        }
    }

    if profile.followers == 0 {
        let text = session.full_text().await;
        if let Some(caps) = TEXT_FOLLOWERS_RE.captures(&text) {
            profile.followers = parse_count(&caps[1], 0);
        }
        if let Some(caps) = TEXT_FOLLOWING_RE.captures(&text) {
            profile.following = parse_count(&caps[1], 0);
        }
        if let Some(caps) = TEXT_POSTS_RE.captures(&text) {
            profile.posts = parse_count(&caps[1], 0);
        }
    }

    let display_name = session
        .attribute("meta[property=\"og:title\"]", "content")
        .await
        .map(|t| strip_handle_suffix(&t, target))
        .filter(|t| !t.is_empty());
    profile.meta_str("display_name", display_name);

    let verified = session.exists("[title=\"Verified\"]").await;
    profile.meta_bool("verified", verified);

    profile.engagement_rate = engagement_heuristic(profile.followers, profile.posts);

    Ok(profile)
}

/// og:title comes back as "Jane Doe (@jane) • Instagram photos and videos";
/// keep only the display name portion.
fn strip_handle_suffix(title: &str, target: &str) -> String {
    let handle = target.trim_start_matches('@');
    let trimmed = title
        .split(" • ")
        .next()
        .unwrap_or(title)
        .replace(&format!("(@{handle})"), "");
    trimmed.trim().to_owned()
}

/// Posts-weighted follower factor: accounts that post more against a large
/// audience trend toward the lower engagement band. Bounded to [0.5, 8.0].
fn engagement_heuristic(followers: i64, posts: i64) -> f64 {
    if followers <= 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let base = 8.0 / (1.0 + (followers as f64 / 10_000.0).ln_1p());
    #[allow(clippy::cast_precision_loss)]
    let post_factor = 1.0 / (1.0 + (posts.max(0) as f64 / 500.0));
    round_rate((base * (0.5 + post_factor)).clamp(0.5, 8.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StaticSession;

    const PROFILE_HTML: &str = r#"
        <html><head>
            <meta property="og:title" content="Jane Doe (@jane) &bull; Instagram photos and videos" />
            <meta property="og:description" content="1.5M Followers, 320 Following, 1,204 Posts - See Instagram photos" />
        </head><body>
            <header><span title="Verified">Verified</span></header>
        </body></html>
    "#;

    const LOGIN_WALL_HTML: &str = r#"
        <html><body>
            <div>jane has 42.5K followers, 12 following, 310 posts. Log in to see more.</div>
        </body></html>
    "#;

    #[tokio::test]
    async fn reads_counts_from_og_description() {
        let mut session = StaticSession::new(PROFILE_HTML);
        let profile = extract(&mut session, "jane").await.unwrap();
        assert_eq!(profile.followers, 1_500_000);
        assert_eq!(profile.following, 320);
        assert_eq!(profile.posts, 1204);
        assert_eq!(
            profile.metadata.get("display_name").and_then(|v| v.as_str()),
            Some("Jane Doe")
        );
        assert_eq!(
            profile.metadata.get("verified").and_then(|v| v.as_bool()),
            Some(true)
        );
        assert!(profile.engagement_rate > 0.0);
    }

    #[tokio::test]
    async fn falls_back_to_rendered_text() {
        let mut session = StaticSession::new(LOGIN_WALL_HTML);
        let profile = extract(&mut session, "jane").await.unwrap();
        assert_eq!(profile.followers, 42_500);
        assert_eq!(profile.following, 12);
        assert_eq!(profile.posts, 310);
        assert_eq!(
            profile.metadata.get("verified").and_then(|v| v.as_bool()),
            Some(false)
        );
    }

    #[test]
    fn engagement_rate_is_deterministic_and_bounded() {
        let a = engagement_heuristic(1_500_000, 1204);
        let b = engagement_heuristic(1_500_000, 1204);
        assert!((a - b).abs() < f64::EPSILON);
        assert!((0.5..=8.0).contains(&a));
        assert!((engagement_heuristic(0, 10) - 0.0).abs() < f64::EPSILON);
    }
}
