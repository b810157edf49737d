use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::{self, Defaults},
    domain::{
        reference::{ExternalId, PROVIDER, canonical_url, normalize_reference, thumbnail_url},
        track::{Level, Track, block_count},
        video::{NewVideo, Video, VideoPatch, default_title, non_blank},
    },
    storage::{db, documents, error::StorageError, schema::keys},
};

/// Persisted form of the video to track relation.
pub type TracksIndex = BTreeMap<ExternalId, Track>;

/// Result of a mutation addressed by identifier.
///
/// An unknown identifier is not an error, but callers get to see that nothing happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Applied(T),
    NotFound,
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::NotFound => None,
        }
    }
}

/// Like [`Outcome`], for mutations that may find nothing to change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<T> {
    Applied(T),
    /// the target exists but the requested change would not alter it
    Unchanged,
    NotFound,
}

impl<T> Change<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Change::Applied(value) => Some(value),
            Change::Unchanged | Change::NotFound => None,
        }
    }
}

/// Refuses tracks that would need more than `max_blocks` blocks.
fn ensure_block_limit(
    video_id: &ExternalId,
    duration_sec: u32,
    block_size_sec: u32,
    max_blocks: usize,
) -> Result<(), StorageError> {
    let blocks = block_count(duration_sec, block_size_sec);
    if blocks > max_blocks {
        return Err(StorageError::TooManyBlocks {
            video_id: video_id.clone(),
            blocks,
            max: max_blocks,
        });
    }
    Ok(())
}

/// Main structure that owns videos and their tracks
///
/// Every mutation is a single transaction that reads the whole `videos` and
/// `tracks` documents, applies the change and writes them back.
pub struct Store {
    pub(crate) db: rusqlite::Connection,
    defaults: Defaults,
}

impl Store {
    /// when called, opens a data base connection
    pub fn new(db_config: &config::Database, defaults: Defaults) -> Result<Self, StorageError> {
        let db = db::open(db_config)?;
        Ok(Self::from_existing_conn(db, defaults))
    }

    pub fn from_existing_conn(db: rusqlite::Connection, defaults: Defaults) -> Self {
        Self { db, defaults }
    }

    pub fn list_videos(&self) -> Result<Vec<Video>, StorageError> {
        documents::read(&self.db, keys::VIDEOS)
    }

    pub fn get_video(&self, id: &str) -> Result<Option<Video>, StorageError> {
        Ok(self.list_videos()?.into_iter().find(|v| v.id == id))
    }

    pub fn get_video_by_external_id(
        &self,
        video_id: &ExternalId,
    ) -> Result<Option<Video>, StorageError> {
        Ok(self
            .list_videos()?
            .into_iter()
            .find(|v| &v.video_id == video_id))
    }

    pub fn get_track(&self, video_id: &ExternalId) -> Result<Option<Track>, StorageError> {
        let mut tracks: TracksIndex = documents::read(&self.db, keys::TRACKS)?;
        Ok(tracks.remove(video_id))
    }

    /// Adds a video together with a zeroed track.
    ///
    /// Adding a reference that is already known returns the existing video untouched.
    pub fn add_video(&mut self, params: &NewVideo) -> Result<Video, StorageError> {
        let video_id = normalize_reference(&params.url)
            .ok_or_else(|| StorageError::InvalidReference(params.url.clone()))?;

        let tx = self.db.transaction()?;
        let mut videos: Vec<Video> = documents::read(&tx, keys::VIDEOS)?;

        if let Some(existing) = videos.iter().find(|v| v.video_id == video_id) {
            log::debug!("video {video_id} already exists as {}", existing.id);
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let duration_sec = params
            .duration_sec
            .unwrap_or(self.defaults.duration_sec)
            .max(1);
        let block_size_sec = params
            .block_size_sec
            .filter(|b| *b > 0)
            .unwrap_or(self.defaults.block_size_sec)
            .max(1);
        ensure_block_limit(
            &video_id,
            duration_sec,
            block_size_sec,
            self.defaults.max_blocks,
        )?;

        let video = Video {
            id: Uuid::new_v4().to_string(),
            provider: PROVIDER.to_string(),
            url: canonical_url(&video_id),
            title: non_blank(params.title.as_deref()).unwrap_or_else(|| default_title(&video_id)),
            duration_sec,
            thumbnail_url: thumbnail_url(&video_id),
            instrument: non_blank(params.instrument.as_deref()),
            note: None,
            created_at: now,
            updated_at: now,
            video_id: video_id.clone(),
        };
        let track = Track::zeroed(video_id.clone(), duration_sec, block_size_sec);

        let mut tracks: TracksIndex = documents::read(&tx, keys::TRACKS)?;
        videos.push(video.clone());
        tracks.insert(video_id, track);

        documents::write(&tx, keys::VIDEOS, &videos)?;
        documents::write(&tx, keys::TRACKS, &tracks)?;
        tx.commit()?;

        log::info!(
            "added video {} ({}s, {}s blocks) as {}",
            video.video_id,
            duration_sec,
            block_size_sec,
            video.id
        );
        Ok(video)
    }

    /// Applies `patch` to the video with internal id `id`.
    ///
    /// A positive duration in the patch resamples the track against the new
    /// duration, keeping its block size and recorded levels.
    pub fn update_video(
        &mut self,
        id: &str,
        patch: &VideoPatch,
    ) -> Result<Outcome<Video>, StorageError> {
        let tx = self.db.transaction()?;
        let mut videos: Vec<Video> = documents::read(&tx, keys::VIDEOS)?;

        let Some(video) = videos.iter_mut().find(|v| v.id == id) else {
            log::debug!("update of unknown video {id} ignored");
            return Ok(Outcome::NotFound);
        };
        patch.apply(video, Utc::now());
        let video = video.clone();

        if let Some(duration_sec) = patch.new_duration() {
            let mut tracks: TracksIndex = documents::read(&tx, keys::TRACKS)?;
            let old = tracks.get(&video.video_id);
            let block_size_sec = old
                .map(|t| t.block_size_sec)
                .unwrap_or(self.defaults.block_size_sec)
                .max(1);
            ensure_block_limit(
                &video.video_id,
                duration_sec,
                block_size_sec,
                self.defaults.max_blocks,
            )?;

            let track = match old {
                Some(old) => old.resampled(block_size_sec, duration_sec),
                None => Track::zeroed(video.video_id.clone(), duration_sec, block_size_sec),
            };
            log::info!(
                "resampled track {} to {} blocks for {}s",
                video.video_id,
                track.levels.len(),
                duration_sec
            );
            tracks.insert(video.video_id.clone(), track);
            documents::write(&tx, keys::TRACKS, &tracks)?;
        }

        documents::write(&tx, keys::VIDEOS, &videos)?;
        tx.commit()?;

        Ok(Outcome::Applied(video))
    }

    /// Removes a video and its track in one transaction.
    pub fn remove_video(&mut self, id: &str) -> Result<Outcome<Video>, StorageError> {
        let tx = self.db.transaction()?;
        let mut videos: Vec<Video> = documents::read(&tx, keys::VIDEOS)?;

        let Some(pos) = videos.iter().position(|v| v.id == id) else {
            log::debug!("removal of unknown video {id} ignored");
            return Ok(Outcome::NotFound);
        };
        let removed = videos.remove(pos);

        let mut tracks: TracksIndex = documents::read(&tx, keys::TRACKS)?;
        tracks.remove(&removed.video_id);

        documents::write(&tx, keys::VIDEOS, &videos)?;
        documents::write(&tx, keys::TRACKS, &tracks)?;
        tx.commit()?;

        log::info!("removed video {} ({})", removed.video_id, removed.id);
        Ok(Outcome::Applied(removed))
    }

    /// Changes the block size of a track, resampling its levels over the video duration.
    pub fn update_track_block_size(
        &mut self,
        video_id: &ExternalId,
        new_block_size_sec: u32,
    ) -> Result<Change<Track>, StorageError> {
        let tx = self.db.transaction()?;
        let videos: Vec<Video> = documents::read(&tx, keys::VIDEOS)?;
        let mut tracks: TracksIndex = documents::read(&tx, keys::TRACKS)?;

        let (Some(video), Some(track)) = (
            videos.iter().find(|v| &v.video_id == video_id),
            tracks.get(video_id),
        ) else {
            log::debug!("block size change for unknown track {video_id} ignored");
            return Ok(Change::NotFound);
        };

        let block_size_sec = new_block_size_sec.max(1);
        if block_size_sec == track.block_size_sec {
            return Ok(Change::Unchanged);
        }
        ensure_block_limit(
            video_id,
            video.duration_sec,
            block_size_sec,
            self.defaults.max_blocks,
        )?;

        let resampled = track.resampled(block_size_sec, video.duration_sec);
        log::info!(
            "resampled track {video_id} from {}s to {}s blocks",
            track.block_size_sec,
            block_size_sec
        );
        tracks.insert(video_id.clone(), resampled.clone());

        documents::write(&tx, keys::TRACKS, &tracks)?;
        tx.commit()?;

        Ok(Change::Applied(resampled))
    }

    /// Records a user supplied level on one block of a track.
    pub fn set_level(
        &mut self,
        video_id: &ExternalId,
        block_index: usize,
        level: Level,
    ) -> Result<Change<Track>, StorageError> {
        let tx = self.db.transaction()?;
        let mut tracks: TracksIndex = documents::read(&tx, keys::TRACKS)?;

        let Some(track) = tracks.get_mut(video_id) else {
            return Ok(Change::NotFound);
        };
        let blocks = track.levels.len();
        let Some(slot) = track.levels.get_mut(block_index) else {
            return Err(StorageError::BlockOutOfRange {
                video_id: video_id.clone(),
                index: block_index,
                blocks,
            });
        };
        if *slot == level {
            return Ok(Change::Unchanged);
        }
        *slot = level;
        let track = track.clone();

        documents::write(&tx, keys::TRACKS, &tracks)?;
        tx.commit()?;

        log::debug!(
            "track {video_id} block {block_index} set to {}",
            level.value()
        );
        Ok(Change::Applied(track))
    }
}
