//! Page models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A page as served by the Pagepilot backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Unique page ID
    pub id: String,

    /// Owner of the page
    pub owner_id: String,

    /// URL-friendly short name, used to derive subdomains
    #[serde(default)]
    pub slug: Option<String>,

    /// Display title
    #[serde(default)]
    pub title: Option<String>,

    /// Object key of a prebuilt HTML artifact, when the builder produced one
    #[serde(default)]
    pub artifact_key: Option<String>,

    /// Editor document, embedded into the published page
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Published-state write-back sent to the backend after a deploy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedUpdate {
    pub published: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_hostname: Option<String>,

    pub published_at: DateTime<Utc>,
}
