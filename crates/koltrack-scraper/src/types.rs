use serde_json::{Map, Value};

/// The field set produced by one successful extraction.
///
/// Absent fields stay at their defaults; the metadata bag carries raw
/// free-text values (name, bio, avatar URL, per-video view counts) for
/// the attempt audit trail.
#[derive(Debug, Clone, Default)]
pub struct ExtractedProfile {
    pub followers: i64,
    pub following: i64,
    pub posts: i64,
    pub likes: i64,
    /// Heuristic estimate; see the per-platform formulas. Approximate by
    /// design.
    pub engagement_rate: f64,
    pub avg_views: i64,
    pub avg_likes: i64,
    pub avg_comments: i64,
    pub avg_shares: i64,
    pub metadata: Map<String, Value>,
}

impl ExtractedProfile {
    /// Whether extraction found a real follower count. Snapshots are only
    /// persisted when this holds.
    #[must_use]
    pub fn has_followers(&self) -> bool {
        self.followers > 0
    }

    pub(crate) fn meta_str(&mut self, key: &str, value: Option<String>) {
        if let Some(v) = value {
            self.metadata.insert(key.to_owned(), Value::String(v));
        }
    }

    pub(crate) fn meta_bool(&mut self, key: &str, value: bool) {
        self.metadata.insert(key.to_owned(), Value::Bool(value));
    }

    #[must_use]
    pub fn metadata_value(&self) -> Value {
        Value::Object(self.metadata.clone())
    }
}
