use serde::{Deserialize, Serialize};

use super::{reference::ExternalId, resample::resample};

/// Practice level recorded for a single block.
///
/// `0` means the block was never practiced, [`Level::MAX`] means it is fully practiced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const MIN: Level = Level(0);
    pub const MAX: Level = Level(3);

    /// Builds a level, clamping anything above the ceiling to [`Level::MAX`].
    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX.0))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for Level {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

/// Default cap on the number of blocks in one track.
pub const DEFAULT_MAX_BLOCKS: usize = 20_000;

/// Per-video level sequence, one [`Level`] per block of `block_size_sec` seconds.
///
/// Index `i` covers `[i * block_size_sec, (i + 1) * block_size_sec)`,
/// the last block being clipped to the video duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub video_id: ExternalId,
    pub block_size_sec: u32,
    pub levels: Vec<Level>,
}

/// Number of blocks needed to cover `duration_sec` with blocks of `block_size_sec`.
pub fn block_count(duration_sec: u32, block_size_sec: u32) -> usize {
    if block_size_sec == 0 {
        return 0;
    }
    duration_sec.div_ceil(block_size_sec) as usize
}

impl Track {
    /// Fresh track with every block unpracticed.
    pub fn zeroed(video_id: ExternalId, duration_sec: u32, block_size_sec: u32) -> Self {
        Self {
            video_id,
            block_size_sec,
            levels: vec![Level::MIN; block_count(duration_sec, block_size_sec)],
        }
    }

    /// Re-derives the track for a new block size and duration, keeping the highest
    /// level recorded over every overlapping time range.
    pub fn resampled(&self, new_block_size_sec: u32, duration_sec: u32) -> Self {
        Self {
            video_id: self.video_id.clone(),
            block_size_sec: new_block_size_sec,
            levels: resample(
                &self.levels,
                self.block_size_sec,
                new_block_size_sec,
                Some(duration_sec),
            ),
        }
    }
}
