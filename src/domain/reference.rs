use std::{fmt::Display, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Provider-assigned video identifier (a YouTube video id).
///
/// This is the key linking a [`super::video::Video`] to its [`super::track::Track`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

pub const PROVIDER: &str = "youtube";

static BARE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

static URL_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        ^(?:https?://)?
        (?:
            (?:www\.|m\.|music\.)?youtube(?:-nocookie)?\.com/
            (?:
                watch\?(?:[^\#]*&)?v=
              | embed/
              | shorts/
              | live/
              | v/
            )
          | youtu\.be/
        )
        (?P<id>[A-Za-z0-9_-]{11})
        (?:[?&\#/].*)?$",
    )
    .unwrap()
});

impl ExternalId {
    /// Accepts only a bare identifier, no URL forms.
    pub fn parse(s: &str) -> Option<Self> {
        BARE_ID_RE.is_match(s).then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extracts the external identifier from a bare id or any recognized video URL.
pub fn normalize_reference(input: &str) -> Option<ExternalId> {
    let input = input.trim();
    if let Some(id) = ExternalId::parse(input) {
        return Some(id);
    }
    URL_ID_RE
        .captures(input)
        .and_then(|caps| caps.name("id"))
        .map(|id| ExternalId(id.as_str().to_string()))
}

pub fn canonical_url(id: &ExternalId) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

pub fn thumbnail_url(id: &ExternalId) -> String {
    format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg")
}
