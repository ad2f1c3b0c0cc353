//! Weekly growth-rate computation over follower snapshots.
//!
//! Growth figures are heuristic estimates over whatever snapshots exist in
//! the window; they are not a rigorous engagement model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// One follower measurement, as supplied by the data layer for the
/// trailing trend window.
#[derive(Debug, Clone)]
pub struct FollowerPoint {
    pub kol_id: i64,
    pub kol_name: String,
    pub platform_id: i64,
    pub followers: i64,
    pub captured_at: DateTime<Utc>,
}

/// Aggregated weekly growth for one KOL.
#[derive(Debug, Clone, Serialize)]
pub struct KolGrowth {
    pub kol_id: i64,
    pub kol_name: String,
    /// Mean percentage follower growth across qualifying platforms;
    /// `0.0` when no platform qualifies.
    pub growth_rate: f64,
    /// Number of platforms that contributed to the mean.
    pub platform_count: usize,
}

/// Ranks KOLs by mean follower growth across their platforms.
///
/// A platform qualifies when it has at least two snapshots in the window
/// and the oldest snapshot has a positive follower count; growth is
/// `(latest - oldest) / oldest * 100`. Platforms whose oldest count is
/// zero are excluded from the mean rather than treated as 0% or infinite.
///
/// The sort is stable: KOLs with equal growth keep their input order.
#[must_use]
pub fn rank_by_weekly_growth(points: &[FollowerPoint], limit: usize) -> Vec<KolGrowth> {
    // (oldest, latest) per platform, plus kol enumeration in first-seen order.
    let mut spans: HashMap<i64, (FollowerPoint, FollowerPoint)> = HashMap::new();
    let mut kol_order: Vec<(i64, String)> = Vec::new();
    let mut kol_platforms: HashMap<i64, Vec<i64>> = HashMap::new();

    for point in points {
        if !kol_order.iter().any(|(id, _)| *id == point.kol_id) {
            kol_order.push((point.kol_id, point.kol_name.clone()));
        }
        let platforms = kol_platforms.entry(point.kol_id).or_default();
        if !platforms.contains(&point.platform_id) {
            platforms.push(point.platform_id);
        }

        match spans.get_mut(&point.platform_id) {
            None => {
                spans.insert(point.platform_id, (point.clone(), point.clone()));
            }
            Some((oldest, latest)) => {
                if point.captured_at < oldest.captured_at {
                    *oldest = point.clone();
                }
                if point.captured_at >= latest.captured_at {
                    *latest = point.clone();
                }
            }
        }
    }

    let mut ranked: Vec<KolGrowth> = kol_order
        .into_iter()
        .map(|(kol_id, kol_name)| {
            let mut total = 0.0_f64;
            let mut qualifying = 0usize;

            for platform_id in kol_platforms.get(&kol_id).into_iter().flatten() {
                let Some((oldest, latest)) = spans.get(platform_id) else {
                    continue;
                };
                // A single snapshot cannot establish a trend.
                if oldest.captured_at == latest.captured_at {
                    continue;
                }
                if oldest.followers <= 0 {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let growth = (latest.followers - oldest.followers) as f64
                    / oldest.followers as f64
                    * 100.0;
                total += growth;
                qualifying += 1;
            }

            #[allow(clippy::cast_precision_loss)]
            let growth_rate = if qualifying > 0 {
                total / qualifying as f64
            } else {
                0.0
            };

            KolGrowth {
                kol_id,
                kol_name,
                growth_rate,
                platform_count: qualifying,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.growth_rate
            .partial_cmp(&a.growth_rate)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn point(kol_id: i64, platform_id: i64, followers: i64, days_ago: i64) -> FollowerPoint {
        FollowerPoint {
            kol_id,
            kol_name: format!("kol-{kol_id}"),
            platform_id,
            followers,
            captured_at: Utc::now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn growth_over_week_is_twenty_percent() {
        let points = vec![point(1, 10, 1000, 7), point(1, 10, 1200, 0)];
        let ranked = rank_by_weekly_growth(&points, 10);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].growth_rate - 20.0).abs() < f64::EPSILON);
        assert_eq!(ranked[0].platform_count, 1);
    }

    #[test]
    fn zero_oldest_followers_excludes_platform() {
        // Platform 10 has a zero baseline; platform 11 grows 10%.
        let points = vec![
            point(1, 10, 0, 7),
            point(1, 10, 500, 0),
            point(1, 11, 1000, 6),
            point(1, 11, 1100, 0),
        ];
        let ranked = rank_by_weekly_growth(&points, 10);
        assert_eq!(ranked[0].platform_count, 1);
        assert!((ranked[0].growth_rate - 10.0).abs() < 1e-9);
    }

    #[test]
    fn single_snapshot_platform_does_not_qualify() {
        let points = vec![point(1, 10, 1000, 3)];
        let ranked = rank_by_weekly_growth(&points, 10);
        assert_eq!(ranked[0].platform_count, 0);
        assert!((ranked[0].growth_rate - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mean_is_taken_across_platforms() {
        let points = vec![
            point(1, 10, 1000, 7),
            point(1, 10, 1200, 0), // +20%
            point(1, 11, 1000, 7),
            point(1, 11, 1100, 0), // +10%
        ];
        let ranked = rank_by_weekly_growth(&points, 10);
        assert!((ranked[0].growth_rate - 15.0).abs() < 1e-9);
        assert_eq!(ranked[0].platform_count, 2);
    }

    #[test]
    fn ranking_is_descending_and_stable_on_ties() {
        let points = vec![
            // kol 1: 0% (no qualifying platforms)
            point(1, 10, 1000, 3),
            // kol 2: +5%
            point(2, 20, 1000, 7),
            point(2, 20, 1050, 0),
            // kol 3: 0% as well — ties with kol 1, must stay after it
            point(3, 30, 2000, 2),
        ];
        let ranked = rank_by_weekly_growth(&points, 10);
        let ids: Vec<i64> = ranked.iter().map(|k| k.kol_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn limit_truncates_result() {
        let points = vec![
            point(1, 10, 1000, 7),
            point(1, 10, 1500, 0),
            point(2, 20, 1000, 7),
            point(2, 20, 1100, 0),
        ];
        let ranked = rank_by_weekly_growth(&points, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].kol_id, 1);
    }
}
