//! # Chunk Extraction

use core::ops::Range;
use std::thread;

use crate::errors::{PairmillError, PmResult};
use crate::pretok::SplitRule;

/// Resolve a requested worker count.
///
/// `None` (or zero) falls back to the available parallelism.
pub fn resolve_workers(requested: Option<usize>) -> usize {
    match requested {
        Some(w) if w > 0 => w,
        _ => thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
    }
}

/// Split a buffer into chunk byte ranges under a [`SplitRule`].
///
/// * Regex mode: each range is a match of the pattern; bytes between matches
///   are discarded. Requires UTF-8 input. When the input is long enough the
///   buffer is partitioned across `workers` threads; a match straddling a
///   partition point may be split or lost, a documented speed/accuracy
///   trade-off of the partitioning heuristic.
/// * Split-byte mode: every split byte starts a new range; ranges cover the
///   whole buffer.
///
/// ## Arguments
/// * `rule` - The split rule.
/// * `data` - The input buffer.
/// * `workers` - Worker thread count for regex matching.
///
/// ## Returns
/// Chunk ranges in input order, none empty.
pub fn chunk_ranges(
    rule: &SplitRule,
    data: &[u8],
    workers: usize,
) -> PmResult<Vec<Range<usize>>> {
    match rule {
        SplitRule::SplitBytes { mask, .. } => Ok(split_byte_ranges(data, mask)),
        SplitRule::Regex { regex, .. } => {
            let text = core::str::from_utf8(data)
                .map_err(|_| PairmillError::Config("regex rule requires UTF-8 input".into()))?;

            if workers > 1 && text.len() > 2 * workers {
                parallel_match_ranges(regex, text, workers)
            } else {
                match_ranges(regex, text, 0)
            }
        }
    }
}

fn split_byte_ranges(
    data: &[u8],
    mask: &[bool; 256],
) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;

    for (i, &b) in data.iter().enumerate() {
        if mask[b as usize] && i > start {
            ranges.push(start..i);
            start = i;
        } else if mask[b as usize] {
            start = i;
        }
    }
    if start < data.len() {
        ranges.push(start..data.len());
    }

    ranges
}

/// Collect match ranges of `regex` over `text`, shifted by `offset`.
fn match_ranges(
    regex: &fancy_regex::Regex,
    text: &str,
    offset: usize,
) -> PmResult<Vec<Range<usize>>> {
    let mut ranges = Vec::new();
    for m in regex.find_iter(text) {
        let m = m.map_err(|e| PairmillError::Pattern(e.to_string()))?;
        if !m.range().is_empty() {
            ranges.push(m.start() + offset..m.end() + offset);
        }
    }
    Ok(ranges)
}

/// Match disjoint partitions of `text` on worker threads and stitch the
/// results in worker order.
fn parallel_match_ranges(
    regex: &fancy_regex::Regex,
    text: &str,
    workers: usize,
) -> PmResult<Vec<Range<usize>>> {
    let cuts = partition_points(text, workers);

    let per_worker: Vec<PmResult<Vec<Range<usize>>>> = thread::scope(|scope| {
        let handles: Vec<_> = cuts
            .windows(2)
            .map(|w| {
                let (lo, hi) = (w[0], w[1]);
                scope.spawn(move || match_ranges(regex, &text[lo..hi], lo))
            })
            .collect();

        // Joining in spawn order preserves input order.
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut ranges: Vec<Range<usize>> = Vec::new();
    for result in per_worker {
        let mut local = result?;
        if let (Some(last), Some(first)) = (ranges.last(), local.first()) {
            if first.start < last.end {
                local.remove(0);
            }
        }
        ranges.extend(local);
    }
    Ok(ranges)
}

/// `workers + 1` monotonic char-boundary partition points covering `text`.
fn partition_points(
    text: &str,
    workers: usize,
) -> Vec<usize> {
    let len = text.len();
    let mut cuts = Vec::with_capacity(workers + 1);
    cuts.push(0);
    for k in 1..workers {
        let mut p = (len * k) / workers;
        while p < len && !text.is_char_boundary(p) {
            p += 1;
        }
        if p > *cuts.last().unwrap() && p < len {
            cuts.push(p);
        }
    }
    cuts.push(len);
    cuts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_byte_ranges() {
        let rule = SplitRule::split_bytes(" ");
        let ranges = chunk_ranges(&rule, b"ab ab", 1).unwrap();
        assert_eq!(ranges, vec![0..2, 2..5]);
    }

    #[test]
    fn test_split_byte_ranges_edges() {
        let rule = SplitRule::split_bytes(" ");

        // Leading and consecutive split bytes start their own chunks.
        assert_eq!(chunk_ranges(&rule, b" x", 1).unwrap(), vec![0..2]);
        assert_eq!(
            chunk_ranges(&rule, b"a  b", 1).unwrap(),
            vec![0..1, 1..2, 2..4]
        );
        assert_eq!(
            chunk_ranges(&rule, b"", 1).unwrap(),
            Vec::<std::ops::Range<usize>>::new()
        );
    }

    #[test]
    fn test_empty_split_set_is_one_chunk() {
        let rule = SplitRule::split_bytes("");
        assert_eq!(chunk_ranges(&rule, b"aaabdaaabac", 1).unwrap(), vec![0..11]);
    }

    #[test]
    fn test_regex_ranges() {
        let rule = SplitRule::regex(r"\w+").unwrap();
        assert_eq!(
            chunk_ranges(&rule, b"abc def", 1).unwrap(),
            vec![0..3, 4..7]
        );
    }

    #[test]
    fn test_regex_rejects_non_utf8() {
        let rule = SplitRule::regex(r"\w+").unwrap();
        assert!(matches!(
            chunk_ranges(&rule, &[0x61, 0xff, 0x61], 1),
            Err(PairmillError::Config(_))
        ));
    }

    #[test]
    fn test_parallel_matches_serial_for_single_byte_matches() {
        // Single-byte matches cannot straddle a partition point, so the
        // stitched result is exactly the serial result.
        let rule = SplitRule::regex(r"[a-z]").unwrap();
        let text = "the quick brown fox jumps over the lazy dog ".repeat(40);
        let data = text.as_bytes();

        let serial = chunk_ranges(&rule, data, 1).unwrap();
        for workers in [2, 3, 8] {
            assert_eq!(chunk_ranges(&rule, data, workers).unwrap(), serial);
        }
    }

    #[test]
    fn test_parallel_coverage_with_straddling_matches() {
        // A match straddling a partition point may be split in two, but the
        // stitched ranges stay ordered, disjoint, and cover the same bytes.
        let rule = SplitRule::regex(r"\s+|\S+").unwrap();
        let text = "the quick brown fox jumps over the lazy dog ".repeat(40);
        let data = text.as_bytes();

        for workers in [2, 3, 8] {
            let ranges = chunk_ranges(&rule, data, workers).unwrap();
            let mut covered = 0;
            for r in &ranges {
                assert_eq!(r.start, covered);
                covered = r.end;
            }
            assert_eq!(covered, data.len());
        }
    }

    #[test]
    fn test_partition_points_respect_char_boundaries() {
        let text = "é".repeat(64);
        for cut in partition_points(&text, 7) {
            assert!(text.is_char_boundary(cut));
        }
    }

    #[test]
    fn test_resolve_workers() {
        assert_eq!(resolve_workers(Some(3)), 3);
        assert!(resolve_workers(None) >= 1);
        assert!(resolve_workers(Some(0)) >= 1);
    }
}
