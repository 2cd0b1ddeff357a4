/// File size histogram: adaptive binning over a fixed ladder of "nice"
/// byte breakpoints.
///
/// The builder is a pure function: it sorts the observed sizes, picks
/// boundaries from [`BREAKPOINTS`] that fall inside the observed range,
/// counts samples per range, merges sparse buckets forward and finally
/// attaches the largest file of each bucket as its representative.
///
/// Ranges are inclusive at both ends, so a size that lands exactly on an
/// interior boundary is counted by both neighbouring buckets.
pub mod label;

use crate::error::HistogramError;
use crate::model::SizeSample;
use label::{format_range_label, parse_range_label};
use serde::Serialize;
use tracing::{debug, warn};

/// Buckets with fewer items than this are folded into their right neighbour.
/// The last bucket is exempt.
pub const MIN_BUCKET_COUNT: usize = 50;

/// Candidate interior boundaries, ascending, in bytes.
pub const BREAKPOINTS: [u64; 15] = [
    100,
    200,
    300,
    1024,
    10 * 1024,
    20 * 1024,
    30 * 1024,
    40 * 1024,
    50 * 1024,
    100 * 1024,
    150 * 1024,
    200 * 1024,
    300 * 1024,
    600 * 1024,
    650 * 1024,
];

/// One labelled size range of the histogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    /// Human-readable range, e.g. `"300 B - 1 KB"`.
    pub label: String,
    /// Lower bound in bytes (inclusive).
    pub start: u64,
    /// Upper bound in bytes (inclusive).
    pub end: u64,
    /// Number of samples whose size falls in `[start, end]`.
    pub count: usize,
    /// The largest sample within the range described by `label`.
    pub representative: Option<SizeSample>,
}

impl Bucket {
    fn new(start: u64, end: u64, count: usize) -> Self {
        Self {
            label: format_range_label(start, end),
            start,
            end,
            count,
            representative: None,
        }
    }

    /// Widen this bucket to also cover `next`.
    fn absorb(&mut self, next: Bucket) {
        self.end = next.end;
        self.count += next.count;
        self.label = format_range_label(self.start, self.end);
    }
}

/// Build a histogram with at most `bucket_budget` buckets.
///
/// Empty input yields an empty histogram. Fails only if a bucket label
/// cannot be parsed back, in which case no partial result is returned.
pub fn build(samples: &[SizeSample], bucket_budget: usize) -> Result<Vec<Bucket>, HistogramError> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let mut sizes: Vec<u64> = samples.iter().map(|sample| sample.size).collect();
    sizes.sort_unstable();

    let distinct = 1 + sizes.windows(2).filter(|pair| pair[0] != pair[1]).count();
    let effective = bucket_budget.min(distinct);
    debug!(
        "Histogram input: {} files, min {} bytes, max {} bytes, {} bucket(s) allowed",
        sizes.len(),
        sizes[0],
        sizes[sizes.len() - 1],
        effective
    );

    let boundaries = select_boundaries(&sizes, effective);
    let buckets = count_buckets(&sizes, &boundaries);

    let total: usize = buckets.iter().map(|bucket| bucket.count).sum();
    if total != sizes.len() {
        warn!(
            "Histogram count {total} does not match input count {}",
            sizes.len()
        );
    }

    let merged = merge_small_buckets(buckets, MIN_BUCKET_COUNT);
    attach_representatives(merged, samples)
}

/// Pick ascending boundaries: the minimum, the breakpoints that fit, then the maximum.
///
/// `sizes` must be sorted and non-empty.
fn select_boundaries(sizes: &[u64], effective: usize) -> Vec<u64> {
    let min = sizes[0];
    let max = sizes[sizes.len() - 1];
    let limit = effective.saturating_sub(1);

    let mut boundaries = vec![min];
    for breakpoint in BREAKPOINTS {
        let last = boundaries[boundaries.len() - 1];
        if breakpoint > last && breakpoint < max && boundaries.len() < limit {
            boundaries.push(breakpoint);
        }
    }

    // A single distinct size still needs one (degenerate) range.
    if max > boundaries[boundaries.len() - 1] || boundaries.len() == 1 {
        boundaries.push(max);
    }
    boundaries
}

/// Count samples per consecutive boundary pair, dropping empty ranges.
fn count_buckets(sizes: &[u64], boundaries: &[u64]) -> Vec<Bucket> {
    boundaries
        .windows(2)
        .filter_map(|pair| {
            let (start, end) = (pair[0], pair[1]);
            let count = sizes
                .iter()
                .filter(|&&size| size >= start && size <= end)
                .count();
            (count > 0).then(|| Bucket::new(start, end, count))
        })
        .collect()
}

/// Fold every under-filled bucket into its right neighbour until each
/// bucket but the last reaches `min_count`.
fn merge_small_buckets(buckets: Vec<Bucket>, min_count: usize) -> Vec<Bucket> {
    let mut merged = Vec::with_capacity(buckets.len());
    let mut remaining = buckets.into_iter();
    let Some(mut current) = remaining.next() else {
        return merged;
    };

    for next in remaining {
        if current.count < min_count {
            current.absorb(next);
        } else {
            merged.push(std::mem::replace(&mut current, next));
        }
    }
    merged.push(current);
    merged
}

/// Set each bucket's representative to the largest sample inside the range
/// its label describes.
fn attach_representatives(
    buckets: Vec<Bucket>,
    samples: &[SizeSample],
) -> Result<Vec<Bucket>, HistogramError> {
    buckets
        .into_iter()
        .map(|mut bucket| {
            let (start, end) = parse_range_label(&bucket.label)?;
            bucket.representative = samples
                .iter()
                .filter(|sample| sample.size >= start && sample.size <= end)
                .max_by_key(|sample| sample.size)
                .cloned();
            Ok(bucket)
        })
        .collect()
}
