use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reference::ExternalId;

/// Video duration used when the caller does not know it yet.
pub const DEFAULT_DURATION_SEC: u32 = 180;
/// Block size of a freshly created track.
pub const DEFAULT_BLOCK_SIZE_SEC: u32 = 5;

/// Represents an externally hosted video being practiced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// internal identifier, assigned once on creation
    pub id: String,
    pub provider: String,
    pub video_id: ExternalId,
    pub url: String,
    pub title: String,
    pub duration_sec: u32,
    pub thumbnail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters of the add operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVideo {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub duration_sec: Option<u32>,
    #[serde(default)]
    pub block_size_sec: Option<u32>,
}

impl NewVideo {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Partial update of a [`Video`]. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub duration_sec: Option<u32>,
}

impl VideoPatch {
    /// Positive duration carried by the patch, the only kind that re-derives the track.
    pub fn new_duration(&self) -> Option<u32> {
        self.duration_sec.filter(|d| *d > 0)
    }

    pub(crate) fn apply(&self, video: &mut Video, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            video.title = title.clone();
        }
        if let Some(instrument) = &self.instrument {
            video.instrument = Some(instrument.clone());
        }
        if let Some(note) = &self.note {
            video.note = Some(note.clone());
        }
        if let Some(duration) = self.new_duration() {
            video.duration_sec = duration;
        }
        video.updated_at = now;
    }
}

/// Trims user text, mapping blank input to `None`.
pub fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

pub fn default_title(id: &ExternalId) -> String {
    format!("YouTube {id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::normalize_reference;

    fn video() -> Video {
        let now = Utc::now();
        let id = normalize_reference("dQw4w9WgXcQ").unwrap();
        Video {
            id: "v1".to_string(),
            provider: "youtube".to_string(),
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            title: default_title(&id),
            duration_sec: 12,
            thumbnail_url: String::new(),
            video_id: id,
            instrument: None,
            note: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut v = video();
        let later = v.updated_at + chrono::Duration::seconds(5);

        let patch = VideoPatch {
            note: Some("watch the bridge".to_string()),
            ..Default::default()
        };
        patch.apply(&mut v, later);

        assert_eq!(v.title, "YouTube dQw4w9WgXcQ");
        assert_eq!(v.note.as_deref(), Some("watch the bridge"));
        assert_eq!(v.duration_sec, 12);
        assert_eq!(v.updated_at, later);
    }

    #[test]
    fn test_patch_ignores_zero_duration() {
        let mut v = video();
        let patch = VideoPatch {
            duration_sec: Some(0),
            ..Default::default()
        };
        assert_eq!(patch.new_duration(), None);
        patch.apply(&mut v, Utc::now());
        assert_eq!(v.duration_sec, 12);
    }

    #[test]
    fn test_video_json_uses_optional_fields() -> anyhow::Result<()> {
        let v = video();
        let json = serde_json::to_value(&v)?;
        assert!(json.get("instrument").is_none());
        assert_eq!(json["video_id"], "dQw4w9WgXcQ");

        let back: Video = serde_json::from_value(json)?;
        assert_eq!(back, v);
        Ok(())
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  guitar ")), Some("guitar".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
