//! Per-platform profile extraction.
//!
//! The pipeline drives one scrape through init → navigate → stabilize →
//! extract → persist → cleanup against an injected browser-session
//! capability. Platform variants share the layered field strategy (meta
//! tags, then DOM lookups, then full-text patterns) and the numeric
//! suffix parser.

pub mod browser;
mod dom;
pub mod error;
mod extract;
pub mod parse;
pub mod pipeline;
mod stealth;
pub mod types;

pub use browser::{Browser, BrowserSession, RenderedBrowser, SessionConfig, Viewport};
pub use error::ScrapeError;
pub use parse::parse_count;
pub use pipeline::{Pipeline, PipelineExecutor, ScrapeTarget};
pub use types::ExtractedProfile;

#[cfg(test)]
pub(crate) mod testutil;
