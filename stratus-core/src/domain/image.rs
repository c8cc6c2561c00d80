//! Container image identity types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag every published image also receives
pub const LATEST_TAG: &str = "latest";

/// Run-specific image tag
///
/// Derived from the source revision when one is available, otherwise from
/// the wall clock at second granularity. Two untagged runs within the same
/// second produce the same timestamp tag and the later push wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageTag {
    /// Short revision id (e.g. `git rev-parse --short HEAD`)
    Revision(String),
    /// `YYYYmmdd-HHMMSS` timestamp
    Timestamp(String),
}

impl ImageTag {
    /// Picks the revision when present and non-empty, otherwise falls back to `now`
    pub fn resolve(revision: Option<&str>, now: DateTime<Utc>) -> Self {
        match revision.map(str::trim).filter(|r| !r.is_empty()) {
            Some(rev) => ImageTag::Revision(rev.to_string()),
            None => ImageTag::Timestamp(now.format("%Y%m%d-%H%M%S").to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ImageTag::Revision(tag) | ImageTag::Timestamp(tag) => tag,
        }
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registry repository, e.g. `123456789012.dkr.ecr.ap-south-1.amazonaws.com/climatepredict`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    url: String,
}

impl Repository {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Registry host used for `docker login`
    pub fn registry(&self) -> &str {
        self.url.split('/').next().unwrap_or(&self.url)
    }

    /// Repository name within the registry, as ECR APIs expect it
    pub fn name(&self) -> &str {
        match self.url.split_once('/') {
            Some((_, name)) => name,
            None => &self.url,
        }
    }

    /// Full image reference for a tag
    pub fn reference(&self, tag: &str) -> String {
        format!("{}:{}", self.url, tag)
    }
}
