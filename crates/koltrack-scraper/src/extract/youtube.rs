//! YouTube channel extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::browser::BrowserSession;
use crate::error::ScrapeError;
use crate::parse::parse_count;
use crate::types::ExtractedProfile;

use super::{average_count, first_text, round_rate};

static TEXT_SUBSCRIBERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9][0-9.,]*[KMB]?)\s*subscribers")
        .unwrap_or_else(|e| panic!("invalid youtube subscribers regex: {e}"))
});

static TEXT_VIDEOS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9][0-9.,]*[KMB]?)\s*videos")
        .unwrap_or_else(|e| panic!("invalid youtube videos regex: {e}"))
});

pub(super) async fn extract(
    session: &mut dyn BrowserSession,
) -> Result<ExtractedProfile, ScrapeError> {
    let mut profile = ExtractedProfile::default();

    if let Some(text) = session.text("#subscriber-count").await {
        profile.followers = parse_count(&text, 0);
    }
    let full_text = session.full_text().await;
    if profile.followers == 0 {
        if let Some(caps) = TEXT_SUBSCRIBERS_RE.captures(&full_text) {
            profile.followers = parse_count(&caps[1], 0);
        }
    }

    let visible_videos = session.count("ytd-rich-item-renderer").await;
    profile.posts = i64::try_from(visible_videos).unwrap_or(0);
    if profile.posts == 0 {
        if let Some(caps) = TEXT_VIDEOS_RE.captures(&full_text) {
            profile.posts = parse_count(&caps[1], 0);
        }
    }

    // The videos tab lists a per-video metadata line; the first span that
    // mentions views holds the view count. Average the first page.
    let metadata_spans = session.texts("#metadata-line span").await;
    let view_texts: Vec<String> = metadata_spans
        .into_iter()
        .filter(|t| t.to_ascii_lowercase().contains("view"))
        .take(10)
        .collect();
    profile.avg_views = average_count(&view_texts);

    let channel_name = first_text(
        session,
        &[
            "#channel-name #text",
            "ytd-channel-name yt-formatted-string",
            "#channel-header h1",
        ],
    )
    .await
    .filter(|t| !t.is_empty());
    profile.meta_str("display_name", channel_name);

    profile.engagement_rate = engagement_heuristic(profile.followers, profile.avg_views);

    Ok(profile)
}

/// Average views as a share of the subscriber base, as a percentage.
/// Capped at 100; small channels routinely out-view their subscriber count.
fn engagement_heuristic(followers: i64, avg_views: i64) -> f64 {
    if followers <= 0 || avg_views <= 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = avg_views as f64 / followers as f64 * 100.0;
    round_rate(rate.min(100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StaticSession;

    const CHANNEL_HTML: &str = r#"
        <html><body>
            <div id="channel-name"><span id="text">Jane Labs</span></div>
            <span id="subscriber-count">1.2M subscribers</span>
            <ytd-rich-item-renderer>
                <div id="metadata-line"><span>350K views</span><span>2 days ago</span></div>
            </ytd-rich-item-renderer>
            <ytd-rich-item-renderer>
                <div id="metadata-line"><span>250K views</span><span>9 days ago</span></div>
            </ytd-rich-item-renderer>
        </body></html>
    "#;

    #[tokio::test]
    async fn reads_subscribers_and_average_views() {
        let mut session = StaticSession::new(CHANNEL_HTML);
        let profile = extract(&mut session).await.unwrap();
        assert_eq!(profile.followers, 1_200_000);
        assert_eq!(profile.posts, 2);
        assert_eq!(profile.avg_views, 300_000);
        assert_eq!(
            profile.metadata.get("display_name").and_then(|v| v.as_str()),
            Some("Jane Labs")
        );
        assert!((profile.engagement_rate - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn falls_back_to_text_patterns() {
        let mut session = StaticSession::new(
            "<html><body><div>Jane Labs. 840K subscribers. 312 videos.</div></body></html>",
        );
        let profile = extract(&mut session).await.unwrap();
        assert_eq!(profile.followers, 840_000);
        assert_eq!(profile.posts, 312);
        assert_eq!(profile.avg_views, 0);
    }

    #[test]
    fn engagement_rate_is_capped_at_hundred() {
        let rate = engagement_heuristic(1_000, 50_000);
        assert!((rate - 100.0).abs() < f64::EPSILON);
    }
}
