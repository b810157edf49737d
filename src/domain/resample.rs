//! Max-pooling block resizer.
//!
//! Converts a level sequence recorded over one block size into the sequence for
//! another block size (or another total duration). Every output block takes the
//! highest level of any input block overlapping its time range, so coarsening
//! never erases a high mark and refining replicates the coarse value.

use super::track::Level;

/// Resamples `old_levels` from `old_block_sec` blocks to `new_block_sec` blocks.
///
/// `total_duration_sec` overrides the covered duration; when absent (or zero) the
/// old sequence is assumed to exactly cover `old_levels.len() * old_block_sec`.
///
/// Returns an empty sequence when `old_levels` is empty or either block size is zero.
/// Otherwise the result has `max(1, ceil(duration / new_block_sec))` entries.
pub fn resample(
    old_levels: &[Level],
    old_block_sec: u32,
    new_block_sec: u32,
    total_duration_sec: Option<u32>,
) -> Vec<Level> {
    if old_levels.is_empty() || old_block_sec == 0 || new_block_sec == 0 {
        return Vec::new();
    }

    let old_block = u64::from(old_block_sec);
    let new_block = u64::from(new_block_sec);
    let duration = match total_duration_sec {
        Some(total) if total > 0 => u64::from(total),
        _ => old_levels.len() as u64 * old_block,
    };
    let new_len = duration.div_ceil(new_block).max(1);

    (0..new_len)
        .map(|j| {
            let start = j * new_block;
            let end = duration.min(start + new_block);
            max_overlapping(old_levels, old_block, start, end)
        })
        .collect()
}

/// Highest level among old blocks overlapping `[start, end)`.
///
/// An old block touched only at `end` does not overlap, hence the last index is
/// `(end - 1) / old_block`. Indices past the old sequence count as unpracticed.
fn max_overlapping(old_levels: &[Level], old_block: u64, start: u64, end: u64) -> Level {
    if end <= start {
        return Level::MIN;
    }

    let first = start / old_block;
    let last = (end - 1) / old_block;
    let mut max = Level::MIN;

    for i in first..=last {
        let Some(&level) = usize::try_from(i).ok().and_then(|i| old_levels.get(i)) else {
            break;
        };
        max = max.max(level);
        if max == Level::MAX {
            break;
        }
    }

    max
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(values: &[u8]) -> Vec<Level> {
        values.iter().copied().map(Level::new).collect()
    }

    #[test]
    fn test_same_block_size_is_identity() {
        let old = levels(&[0, 1, 2, 3, 1, 0, 2]);
        assert_eq!(resample(&old, 5, 5, Some(35)), old);
        assert_eq!(resample(&old, 5, 5, None), old);
    }

    #[test]
    fn test_same_block_size_truncates_to_shorter_duration() {
        let old = levels(&[1, 2, 3, 2]);
        assert_eq!(resample(&old, 5, 5, Some(12)), levels(&[1, 2, 3]));
        assert_eq!(resample(&old, 5, 5, Some(10)), levels(&[1, 2]));
    }

    #[test]
    fn test_same_block_size_zero_extends_to_longer_duration() {
        let old = levels(&[1, 3, 0]);
        assert_eq!(resample(&old, 5, 5, Some(20)), levels(&[1, 3, 0, 0]));
        assert_eq!(resample(&old, 5, 5, Some(26)), levels(&[1, 3, 0, 0, 0, 0]));
    }

    #[test]
    fn test_coarsening_takes_max_of_covered_blocks() {
        let old = levels(&[1, 3, 0]);
        assert_eq!(resample(&old, 5, 10, Some(12)), levels(&[3, 0]));

        let old = levels(&[0, 1, 2, 1, 0, 0, 2, 0, 1]);
        assert_eq!(resample(&old, 2, 6, None), levels(&[2, 1, 2]));
        assert_eq!(resample(&old, 2, 4, None), levels(&[1, 2, 0, 2, 1]));
    }

    #[test]
    fn test_coarsening_integer_multiple_matches_chunk_max() {
        let old = levels(&[0, 2, 1, 1, 0, 2, 0, 0, 1, 2, 0]);
        for k in 1..=5u32 {
            let expected: Vec<Level> = old
                .chunks(k as usize)
                .map(|chunk| chunk.iter().copied().max().unwrap_or(Level::MIN))
                .collect();
            assert_eq!(resample(&old, 3, 3 * k, None), expected, "k = {k}");
        }
    }

    #[test]
    fn test_refining_replicates_coarse_value() {
        let old = levels(&[2, 0, 3]);
        assert_eq!(
            resample(&old, 10, 5, Some(30)),
            levels(&[2, 2, 0, 0, 3, 3])
        );
        assert_eq!(resample(&old, 10, 5, Some(25)), levels(&[2, 2, 0, 0, 3]));
    }

    #[test]
    fn test_non_multiple_block_sizes_include_straddled_blocks() {
        // new blocks of 3s over old blocks of 2s:
        // [0,3) -> old 0,1; [3,6) -> old 1,2; [6,8) -> old 3
        let old = levels(&[1, 0, 2, 0]);
        assert_eq!(resample(&old, 2, 3, None), levels(&[1, 2, 0]));
    }

    #[test]
    fn test_block_touched_only_at_end_is_excluded() {
        // [0,5) must not pick up old block 1 which starts exactly at 5
        let old = levels(&[0, 3]);
        assert_eq!(resample(&old, 5, 5, Some(10)), levels(&[0, 3]));
        assert_eq!(resample(&old, 5, 1, Some(10))[4], Level::MIN);
        assert_eq!(resample(&old, 5, 1, Some(10))[5], Level::MAX);
    }

    #[test]
    fn test_ceiling_wins_regardless_of_neighbours() {
        let old = levels(&[0, 3, 1, 2, 0, 0]);
        assert_eq!(resample(&old, 1, 6, None), levels(&[3]));

        let old = levels(&[3, 0, 0, 0]);
        assert_eq!(resample(&old, 1, 4, None), levels(&[3]));
    }

    #[test]
    fn test_output_length() {
        let old = levels(&[1, 2, 3]);
        for new_block in 1..=20u32 {
            for duration in [None, Some(1u32), Some(7), Some(15), Some(31)] {
                let effective = duration.unwrap_or(15);
                let expected = effective.div_ceil(new_block).max(1) as usize;
                assert_eq!(
                    resample(&old, 5, new_block, duration).len(),
                    expected,
                    "new_block = {new_block}, duration = {duration:?}"
                );
            }
        }
    }

    #[test]
    fn test_zero_duration_override_falls_back_to_old_coverage() {
        let old = levels(&[1, 2]);
        assert_eq!(resample(&old, 5, 5, Some(0)), old);
    }

    #[test]
    fn test_degenerate_inputs_yield_empty() {
        assert!(resample(&[], 5, 5, None).is_empty());
        assert!(resample(&[], 5, 10, Some(100)).is_empty());
        assert!(resample(&levels(&[1, 2]), 0, 5, None).is_empty());
        assert!(resample(&levels(&[1, 2]), 5, 0, Some(10)).is_empty());
    }
}
