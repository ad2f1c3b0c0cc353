//! Shared domain vocabulary: platform kinds and scrape states.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A supported social-media platform.
///
/// Each tracked KOL owns at most one platform record per kind; the
/// extraction pipeline dispatches on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Facebook,
    Instagram,
    Tiktok,
    Youtube,
}

impl PlatformKind {
    pub const ALL: [PlatformKind; 4] = [
        PlatformKind::Facebook,
        PlatformKind::Instagram,
        PlatformKind::Tiktok,
        PlatformKind::Youtube,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PlatformKind::Facebook => "facebook",
            PlatformKind::Instagram => "instagram",
            PlatformKind::Tiktok => "tiktok",
            PlatformKind::Youtube => "youtube",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKind {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "facebook" => Ok(PlatformKind::Facebook),
            "instagram" => Ok(PlatformKind::Instagram),
            "tiktok" => Ok(PlatformKind::Tiktok),
            "youtube" => Ok(PlatformKind::Youtube),
            other => Err(UnknownPlatform(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform type: {0}")]
pub struct UnknownPlatform(pub String);

/// Last-known scrape state of a platform record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Pending,
    Success,
    Failed,
}

impl ScrapeStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScrapeStatus::Pending => "pending",
            ScrapeStatus::Success => "success",
            ScrapeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single extraction attempt, as written to the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeOutcome {
    Started,
    Success,
    Failed,
    Timeout,
}

impl ScrapeOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScrapeOutcome::Started => "started",
            ScrapeOutcome::Success => "success",
            ScrapeOutcome::Failed => "failed",
            ScrapeOutcome::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ScrapeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_kind_round_trips_through_str() {
        for kind in PlatformKind::ALL {
            assert_eq!(kind.as_str().parse::<PlatformKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let err = "myspace".parse::<PlatformKind>().unwrap_err();
        assert_eq!(err, UnknownPlatform("myspace".to_owned()));
    }

    #[test]
    fn serde_uses_lowercase_tags() {
        let json = serde_json::to_string(&PlatformKind::Tiktok).unwrap();
        assert_eq!(json, "\"tiktok\"");
        let back: PlatformKind = serde_json::from_str("\"youtube\"").unwrap();
        assert_eq!(back, PlatformKind::Youtube);
    }
}
