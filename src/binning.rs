//! Rank-ordered binning of compilations
//!
//! Compilations of one configuration are ranked by `(total, median)` and
//! split into a fixed number of bins by stepping a real-valued cursor of
//! width `sample_count / bin_count`. Consecutive steps share the same float
//! boundary, so the bins tile `[0, sample_count)` with no gaps or overlaps
//! even when truncation makes their integer widths uneven.

use crate::aggregate::{ConfigurationProfile, PhaseTimes};
use crate::error::{PhaseTimesError, PhaseTimesResult};
use std::ops::Range;

/// Default number of rank bins per configuration
pub const DEFAULT_BIN_COUNT: usize = 50;

/// One populated bin of ranked compilations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin {
    /// Ranks `[start, end)` of the member compilations
    pub ranks: Range<usize>,
    /// Element-wise sums of member phases and totals; median recomputed
    /// over the summed vector
    pub times: PhaseTimes,
    /// Sum of the members' own medians (informational only)
    pub median_sum: u64,
}

impl Bin {
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// All populated bins for one configuration
#[derive(Debug, Clone)]
pub struct BinnedProfile {
    pub configuration: String,
    pub sample_count: usize,
    pub bins: Vec<Bin>,
}

/// Index ranges of the populated bins for `sample_count` ranked samples.
///
/// Steps whose integer span is empty (frequent when there are fewer samples
/// than bins) are dropped. The last range never extends past `sample_count`.
pub fn bin_ranges(sample_count: usize, bin_count: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    if sample_count == 0 || bin_count == 0 {
        return ranges;
    }

    // A step narrower than one sample advances the cursor by at most one
    // rank, so every populated bin holds exactly one sample.
    if bin_count >= sample_count {
        ranges.extend((0..sample_count).map(|i| i..i + 1));
        return ranges;
    }

    // From here each step is at least one sample wide, so the cursor always
    // advances and the loop runs at most `bin_count + 1` times.
    let n = sample_count as f64;
    let bin_size = n / bin_count as f64;
    let mut a = 0.0_f64;
    while a < n {
        let next = a + bin_size;
        let lo = (a as usize).min(sample_count);
        let hi = (next as usize).min(sample_count);
        if lo < hi {
            ranges.push(lo..hi);
        }
        a = next;
    }
    ranges
}

/// Records of `profile` sorted ascending by total, ties broken by median.
///
/// The sort is stable over first-seen order, which keeps reports
/// reproducible across runs.
pub fn rank_samples(profile: &ConfigurationProfile) -> Vec<&PhaseTimes> {
    let mut samples: Vec<&PhaseTimes> = profile.records().map(|(_, times)| times).collect();
    samples.sort_by_key(|t| (t.total(), t.median()));
    samples
}

/// Rank, bin and aggregate one configuration.
///
/// `phase_count` is the number of phases known for the whole run; every bin
/// vector has exactly that length so report columns line up.
pub fn bin_profile(
    profile: &ConfigurationProfile,
    bin_count: usize,
    phase_count: usize,
) -> PhaseTimesResult<BinnedProfile> {
    let samples = rank_samples(profile);
    let bins = bin_ranges(samples.len(), bin_count)
        .into_iter()
        .map(|ranks| -> PhaseTimesResult<Bin> {
            let overflow = || {
                PhaseTimesError::overflow(format!(
                    "configuration {}, bin [{},{})",
                    profile.name(),
                    ranks.start,
                    ranks.end
                ))
            };
            let mut times = PhaseTimes::with_len(phase_count);
            let mut median_sum = 0u64;
            for sample in &samples[ranks.clone()] {
                times.accumulate(sample).map_err(|_| overflow())?;
                median_sum = median_sum
                    .checked_add(sample.median())
                    .ok_or_else(overflow)?;
            }
            times.compute_median();
            Ok(Bin {
                ranks,
                times,
                median_sum,
            })
        })
        .collect::<PhaseTimesResult<Vec<_>>>()?;

    tracing::debug!(
        configuration = profile.name(),
        samples = samples.len(),
        bin_count,
        "binned compilations"
    );

    Ok(BinnedProfile {
        configuration: profile.name().to_string(),
        sample_count: samples.len(),
        bins,
    })
}
