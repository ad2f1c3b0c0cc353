//! TikTok profile extraction.
//!
//! TikTok decorates its profile page with stable `data-e2e` attributes, so
//! DOM selectors are the primary layer and full-text regexes only cover
//! stripped-down renders.

use std::sync::LazyLock;

use regex::Regex;

use crate::browser::BrowserSession;
use crate::error::ScrapeError;
use crate::parse::parse_count;
use crate::types::ExtractedProfile;

use super::{average_count, first_text, round_rate};

static TEXT_FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9][0-9.,]*[KMB]?)\s*Followers")
        .unwrap_or_else(|e| panic!("invalid tiktok followers regex: {e}"))
});

static TEXT_LIKES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9][0-9.,]*[KMB]?)\s*Likes")
        .unwrap_or_else(|e| panic!("invalid tiktok likes regex: {e}"))
});

pub(super) async fn extract(
    session: &mut dyn BrowserSession,
    target: &str,
) -> Result<ExtractedProfile, ScrapeError> {
    let mut profile = ExtractedProfile::default();

    if let Some(text) = session.text("[data-e2e=\"followers-count\"]").await {
        profile.followers = parse_count(&text, 0);
    }
    if let Some(text) = session.text("[data-e2e=\"following-count\"]").await {
        profile.following = parse_count(&text, 0);
    }
    if let Some(text) = session.text("[data-e2e=\"likes-count\"]").await {
        profile.likes = parse_count(&text, 0);
    }

    if profile.followers == 0 {
        let text = session.full_text().await;
        if let Some(caps) = TEXT_FOLLOWERS_RE.captures(&text) {
            profile.followers = parse_count(&caps[1], 0);
        }
        if profile.likes == 0 {
            if let Some(caps) = TEXT_LIKES_RE.captures(&text) {
                profile.likes = parse_count(&caps[1], 0);
            }
        }
    }

    let visible_posts = session.count("[data-e2e=\"user-post-item\"]").await;
    profile.posts = i64::try_from(visible_posts).unwrap_or(0);

    // Visible post cards carry their play counts; average the first page as
    // a view proxy.
    let view_texts = session
        .texts("[data-e2e=\"user-post-item\"] strong")
        .await;
    profile.avg_views = average_count(&view_texts);

    let display_name = first_text(
        session,
        &["[data-e2e=\"user-title\"]", "[data-e2e=\"user-subtitle\"]"],
    )
    .await
    .map(|t| t.trim_start_matches('@').to_owned())
    .or_else(|| Some(target.trim_start_matches('@').to_owned()))
    .filter(|t| !t.is_empty());
    profile.meta_str("display_name", display_name);
    profile.meta_str("bio", session.text("[data-e2e=\"user-bio\"]").await);

    profile.engagement_rate =
        engagement_heuristic(profile.followers, profile.likes, profile.posts);

    Ok(profile)
}

/// Lifetime likes spread over posts and audience, as a percentage. Capped
/// at 20 so outlier accounts don't dominate rankings.
fn engagement_heuristic(followers: i64, likes: i64, posts: i64) -> f64 {
    if followers <= 0 || likes <= 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = likes as f64 / (followers as f64 * posts.max(1) as f64) * 100.0;
    round_rate(rate.min(20.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StaticSession;

    const PROFILE_HTML: &str = r#"
        <html><body>
            <h1 data-e2e="user-title">@jane</h1>
            <h2 data-e2e="user-bio">daily clips</h2>
            <strong data-e2e="followers-count">2.4M</strong>
            <strong data-e2e="following-count">105</strong>
            <strong data-e2e="likes-count">48.2M</strong>
            <div data-e2e="user-post-item"><strong>1.2M</strong></div>
            <div data-e2e="user-post-item"><strong>800K</strong></div>
            <div data-e2e="user-post-item"><strong>400K</strong></div>
        </body></html>
    "#;

    #[tokio::test]
    async fn reads_counts_from_data_e2e_nodes() {
        let mut session = StaticSession::new(PROFILE_HTML);
        let profile = extract(&mut session, "@jane").await.unwrap();
        assert_eq!(profile.followers, 2_400_000);
        assert_eq!(profile.following, 105);
        assert_eq!(profile.likes, 48_200_000);
        assert_eq!(profile.posts, 3);
        assert_eq!(profile.avg_views, 800_000);
        assert_eq!(
            profile.metadata.get("display_name").and_then(|v| v.as_str()),
            Some("jane")
        );
        assert_eq!(
            profile.metadata.get("bio").and_then(|v| v.as_str()),
            Some("daily clips")
        );
    }

    #[tokio::test]
    async fn falls_back_to_text_patterns() {
        let mut session = StaticSession::new(
            "<html><body><div>jane - 420.5K Followers - 3.1M Likes</div></body></html>",
        );
        let profile = extract(&mut session, "jane").await.unwrap();
        assert_eq!(profile.followers, 420_500);
        assert_eq!(profile.likes, 3_100_000);
        assert_eq!(profile.posts, 0);
    }

    #[test]
    fn engagement_rate_is_capped() {
        let rate = engagement_heuristic(1_000, 10_000_000, 1);
        assert!((rate - 20.0).abs() < f64::EPSILON);
        assert!((engagement_heuristic(0, 500, 10) - 0.0).abs() < f64::EPSILON);
    }
}
