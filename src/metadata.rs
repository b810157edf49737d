//! Lookups of video facts the store cannot know on its own.

use serde::Deserialize;
use thiserror::Error;

use crate::{
    config::MetadataConfig,
    domain::{
        reference::{ExternalId, canonical_url, normalize_reference},
        video::{NewVideo, non_blank},
    },
};

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("title for {0} is unavailable")]
    MetadataUnavailable(String),

    #[error("duration of {0} is unavailable")]
    DurationUnavailable(ExternalId),
}

pub trait TitleResolver {
    fn resolve_title(&self, video_id: &ExternalId) -> Result<String, MetadataError>;
}

pub trait DurationResolver {
    fn resolve_duration_seconds(&self, video_id: &ExternalId) -> Result<u32, MetadataError>;
}

/// Title lookup through the provider's oEmbed endpoint.
pub struct OEmbedClient {
    endpoint: String,
}

#[derive(Deserialize)]
struct OEmbedResponse {
    #[serde(default)]
    title: Option<String>,
}

impl OEmbedClient {
    pub fn new(config: &MetadataConfig) -> Self {
        Self {
            endpoint: config.oembed_endpoint.clone(),
        }
    }
}

impl TitleResolver for OEmbedClient {
    fn resolve_title(&self, video_id: &ExternalId) -> Result<String, MetadataError> {
        let url = canonical_url(video_id);
        log::debug!("Fetching oEmbed title for {url}");

        let response: OEmbedResponse = ureq::get(&self.endpoint)
            .query("url", &url)
            .query("format", "json")
            .call()
            .map_err(|e| MetadataError::MetadataUnavailable(format!("{video_id}: {e}")))?
            .body_mut()
            .read_json()
            .map_err(|e| MetadataError::MetadataUnavailable(format!("{video_id}: {e}")))?;

        Ok(response.title.unwrap_or_default())
    }
}

/// Fills in a missing title and duration from the resolvers.
///
/// Resolvers are only asked for fields the caller left out. Lookup failures are
/// logged and leave the field empty, so the store falls back to its defaults.
pub fn enrich(
    mut params: NewVideo,
    titles: Option<&dyn TitleResolver>,
    durations: Option<&dyn DurationResolver>,
) -> NewVideo {
    let Some(video_id) = normalize_reference(&params.url) else {
        return params;
    };

    if let (None, Some(titles)) = (non_blank(params.title.as_deref()), titles) {
        match titles.resolve_title(&video_id) {
            Ok(title) => params.title = non_blank(Some(&title)),
            Err(e) => log::warn!("{e}, using default title"),
        }
    }

    if let (None, Some(durations)) = (params.duration_sec, durations) {
        match durations.resolve_duration_seconds(&video_id) {
            Ok(secs) if secs > 0 => params.duration_sec = Some(secs),
            Ok(_) => log::warn!("{video_id} reported no duration, using default duration"),
            Err(e) => log::warn!("{e}, using default duration"),
        }
    }

    params
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct StaticTitle(&'static str);

    impl TitleResolver for StaticTitle {
        fn resolve_title(&self, _: &ExternalId) -> Result<String, MetadataError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingTitle;

    impl TitleResolver for FailingTitle {
        fn resolve_title(&self, video_id: &ExternalId) -> Result<String, MetadataError> {
            Err(MetadataError::MetadataUnavailable(video_id.to_string()))
        }
    }

    struct StaticDuration(u32);

    impl DurationResolver for StaticDuration {
        fn resolve_duration_seconds(&self, video_id: &ExternalId) -> Result<u32, MetadataError> {
            match self.0 {
                0 => Err(MetadataError::DurationUnavailable(video_id.clone())),
                secs => Ok(secs),
            }
        }
    }

    struct CountingDuration(Cell<usize>);

    impl DurationResolver for CountingDuration {
        fn resolve_duration_seconds(&self, _: &ExternalId) -> Result<u32, MetadataError> {
            self.0.set(self.0.get() + 1);
            Ok(95)
        }
    }

    const URL: &str = "https://youtu.be/dQw4w9WgXcQ";

    #[test]
    fn test_enrich_fills_missing_fields() {
        let params = enrich(
            NewVideo::from_url(URL),
            Some(&StaticTitle(" Blue in Green ")),
            Some(&StaticDuration(337)),
        );

        assert_eq!(params.title.as_deref(), Some("Blue in Green"));
        assert_eq!(params.duration_sec, Some(337));
    }

    #[test]
    fn test_enrich_keeps_caller_values() {
        let durations = CountingDuration(Cell::new(0));
        let params = enrich(
            NewVideo {
                title: Some("Mine".to_string()),
                duration_sec: Some(12),
                ..NewVideo::from_url(URL)
            },
            Some(&StaticTitle("Theirs")),
            Some(&durations),
        );

        assert_eq!(params.title.as_deref(), Some("Mine"));
        assert_eq!(params.duration_sec, Some(12));
        assert_eq!(durations.0.get(), 0);
    }

    #[test]
    fn test_enrich_tolerates_failures() {
        let params = enrich(
            NewVideo::from_url(URL),
            Some(&FailingTitle),
            Some(&StaticDuration(0)),
        );

        assert_eq!(params.title, None);
        assert_eq!(params.duration_sec, None);
    }

    #[test]
    fn test_enrich_skips_unrecognized_reference() {
        let params = enrich(
            NewVideo::from_url("nonsense"),
            Some(&StaticTitle("Theirs")),
            None,
        );

        assert_eq!(params.title, None);
    }

    #[test]
    fn test_enrich_without_duration_resolver_leaves_duration_empty() {
        let params = enrich(NewVideo::from_url(URL), None, None);

        assert_eq!(params.duration_sec, None);
        assert_eq!(params.title, None);
    }
}
