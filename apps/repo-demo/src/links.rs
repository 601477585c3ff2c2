//! Link records as stored, short links as shown, and the mapper between them.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mapped_repo::adapters::Identified;
use mapped_repo::Mapper;
use serde::Serialize;

/// Stored row: timestamps as epoch seconds, slug assigned on first save.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub slug: Option<String>,
    pub target_url: String,
    pub created_at_secs: u64,
    pub created_by: String,
    pub click_count: u64,
    pub active: bool,
}

impl Identified for LinkRecord {
    type Id = String;

    fn id(&self) -> Option<String> {
        self.slug.clone()
    }

    fn set_id(&mut self, id: String) {
        self.slug = Some(id);
    }
}

/// Stored fields that example probes never constrain unless asked to.
pub const NON_KEY_FIELDS: [&str; 4] = ["created_at_secs", "created_by", "click_count", "active"];

/// Link as handed to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShortLink {
    pub slug: Option<String>,
    pub url: String,
    pub created_at: SystemTime,
    pub created_by: String,
    pub clicks: u64,
    pub active: bool,
}

impl ShortLink {
    pub fn new(url: impl Into<String>, created_by: impl Into<String>, created_at: SystemTime) -> Self {
        Self {
            slug: None,
            url: url.into(),
            created_at,
            created_by: created_by.into(),
            clicks: 0,
            active: true,
        }
    }

    /// Probe for example queries on the target URL.
    pub fn probe_url(url: impl Into<String>) -> Self {
        Self::new(url, "", UNIX_EPOCH)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LinkMapper;

impl Mapper for LinkMapper {
    type Domain = ShortLink;
    type Entity = LinkRecord;

    fn to_domain(&self, record: LinkRecord) -> ShortLink {
        ShortLink {
            slug: record.slug,
            url: record.target_url,
            created_at: UNIX_EPOCH + Duration::from_secs(record.created_at_secs),
            created_by: record.created_by,
            clicks: record.click_count,
            active: record.active,
        }
    }

    fn to_entity(&self, link: ShortLink) -> LinkRecord {
        // pre-epoch timestamps are clamped to the epoch
        let created_at_secs = link
            .created_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        LinkRecord {
            slug: link.slug,
            target_url: link.url,
            created_at_secs,
            created_by: link.created_by,
            click_count: link.clicks,
            active: link.active,
        }
    }
}
