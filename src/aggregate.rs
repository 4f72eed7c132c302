//! Per-compilation phase time aggregation
//!
//! Each configuration owns an independent map from [`CompilationKey`] to
//! [`PhaseTimes`]. A phase slot is written at most once: repeated timing lines
//! for the same compilation and phase are treated as duplicate log emissions,
//! and zero timings never mark a slot as set.

use crate::phase_index::PhaseId;
use fnv::FnvHashMap;
use std::rc::Rc;
use thiserror::Error;

/// A phase time sum no longer fits in `u64`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("phase time sum overflows u64")]
pub struct TimeOverflow;

/// Identity of one compiled unit within a configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompilationKey {
    pub package: Rc<str>,
    /// Normalized `path:line:col` source locator
    pub locator: Rc<str>,
    pub function: Rc<str>,
}

/// Phase times for one compilation (or, summed, for one bin)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseTimes {
    phases: Vec<u64>,
    total: u64,
    median: u64,
}

impl PhaseTimes {
    /// Zero-filled vector of `len` phases
    pub fn with_len(len: usize) -> Self {
        Self {
            phases: vec![0; len],
            total: 0,
            median: 0,
        }
    }

    /// Record `nanos` for `phase` unless the slot is already set.
    ///
    /// Returns true when the value was stored. Zero is never stored. On
    /// overflow of the total the record is left unchanged.
    pub fn set_time(&mut self, phase: PhaseId, nanos: u64) -> Result<bool, TimeOverflow> {
        if nanos == 0 {
            return Ok(false);
        }
        if self.phase(phase) != 0 {
            return Ok(false);
        }
        let total = self.total.checked_add(nanos).ok_or(TimeOverflow)?;
        if self.phases.len() <= phase {
            self.phases.resize(phase + 1, 0);
        }
        self.phases[phase] = nanos;
        self.total = total;
        Ok(true)
    }

    /// Add another record's phases and total into this one, element-wise
    pub fn accumulate(&mut self, other: &PhaseTimes) -> Result<(), TimeOverflow> {
        let total = self.total.checked_add(other.total).ok_or(TimeOverflow)?;
        if self.phases.len() < other.phases.len() {
            self.phases.resize(other.phases.len(), 0);
        }
        for (slot, t) in self.phases.iter_mut().zip(&other.phases) {
            *slot = slot.checked_add(*t).ok_or(TimeOverflow)?;
        }
        self.total = total;
        Ok(())
    }

    /// Recompute the median over the full, zero-padded phase vector
    pub fn compute_median(&mut self) {
        self.median = median_of(&self.phases);
    }

    pub fn phases(&self) -> &[u64] {
        &self.phases
    }

    /// Time for `phase`, zero when never set
    pub fn phase(&self, phase: PhaseId) -> u64 {
        self.phases.get(phase).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn median(&self) -> u64 {
        self.median
    }
}

/// Median as the truncated mean of the elements at `len/2` and `(len-1)/2`
/// after sorting.
///
/// Unset phases count as zeros, so a small compilation that touches only a
/// few phases usually has a median of zero.
pub fn median_of(values: &[u64]) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut scratch = values.to_vec();
    scratch.sort_unstable();
    let len = scratch.len();
    let hi = u128::from(scratch[len / 2]);
    let lo = u128::from(scratch[(len - 1) / 2]);
    ((hi + lo) / 2) as u64
}

/// All compilations seen for one configuration, in first-seen order
#[derive(Debug)]
pub struct ConfigurationProfile {
    name: Rc<str>,
    index: FnvHashMap<CompilationKey, usize>,
    records: Vec<(CompilationKey, PhaseTimes)>,
}

impl ConfigurationProfile {
    pub fn new(name: Rc<str>) -> Self {
        Self {
            name,
            index: FnvHashMap::default(),
            records: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply one timing to the record for `key`, creating it on first sight.
    ///
    /// A new record is pre-sized to `phase_count`, the number of phases known
    /// when it is created.
    pub fn record(
        &mut self,
        key: CompilationKey,
        phase: PhaseId,
        nanos: u64,
        phase_count: usize,
    ) -> Result<bool, TimeOverflow> {
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.records.len();
                self.index.insert(key.clone(), slot);
                self.records.push((key, PhaseTimes::with_len(phase_count)));
                slot
            }
        };
        self.records[slot].1.set_time(phase, nanos)
    }

    pub fn get(&self, key: &CompilationKey) -> Option<&PhaseTimes> {
        self.index.get(key).map(|&slot| &self.records[slot].1)
    }

    pub fn records(&self) -> impl Iterator<Item = (&CompilationKey, &PhaseTimes)> + '_ {
        self.records.iter().map(|(k, t)| (k, t))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Compute every record's median; called once after the input is consumed
    pub fn freeze(&mut self) {
        for (_, times) in &mut self.records {
            times.compute_median();
        }
    }
}

/// Configurations in first-seen order
#[derive(Debug, Default)]
pub struct Aggregator {
    configurations: Vec<ConfigurationProfile>,
    by_name: FnvHashMap<Rc<str>, usize>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The named configuration's profile, creating an empty one if absent
    pub fn open(&mut self, name: Rc<str>) -> &mut ConfigurationProfile {
        let slot = match self.by_name.get(&name) {
            Some(&slot) => slot,
            None => {
                let slot = self.configurations.len();
                self.by_name.insert(Rc::clone(&name), slot);
                self.configurations.push(ConfigurationProfile::new(name));
                slot
            }
        };
        &mut self.configurations[slot]
    }

    pub fn get(&self, name: &str) -> Option<&ConfigurationProfile> {
        self.by_name.get(name).map(|&slot| &self.configurations[slot])
    }

    pub fn configurations(&self) -> &[ConfigurationProfile] {
        &self.configurations
    }

    pub fn freeze(&mut self) {
        for profile in &mut self.configurations {
            profile.freeze();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(package: &str, locator: &str, function: &str) -> CompilationKey {
        CompilationKey {
            package: Rc::from(package),
            locator: Rc::from(locator),
            function: Rc::from(function),
        }
    }

    #[test]
    fn test_set_time_first_write_wins() {
        let mut times = PhaseTimes::with_len(2);
        assert!(times.set_time(0, 100).unwrap());
        assert!(!times.set_time(0, 999).unwrap());
        assert_eq!(times.phase(0), 100);
        assert_eq!(times.total(), 100);
    }

    #[test]
    fn test_set_time_ignores_zero() {
        let mut times = PhaseTimes::with_len(1);
        assert!(!times.set_time(0, 0).unwrap());
        assert_eq!(times.total(), 0);
        // Zero never marks the slot as set
        assert!(times.set_time(0, 40).unwrap());
        assert_eq!(times.phase(0), 40);
    }

    #[test]
    fn test_set_time_zero_does_not_grow() {
        let mut times = PhaseTimes::with_len(1);
        times.set_time(5, 0).unwrap();
        assert_eq!(times.phases().len(), 1);
    }

    #[test]
    fn test_set_time_grows_and_keeps_slots() {
        let mut times = PhaseTimes::with_len(1);
        times.set_time(0, 7).unwrap();
        times.set_time(3, 9).unwrap();
        assert_eq!(times.phases(), &[7, 0, 0, 9]);
        assert_eq!(times.total(), 16);
    }

    #[test]
    fn test_set_time_total_overflow() {
        let mut times = PhaseTimes::with_len(2);
        assert!(times.set_time(0, u64::MAX).unwrap());
        assert_eq!(times.set_time(1, u64::MAX), Err(TimeOverflow));
        // The rejected value is not stored
        assert_eq!(times.phases(), &[u64::MAX, 0]);
        assert_eq!(times.total(), u64::MAX);
    }

    #[test]
    fn test_accumulate_overflow() {
        let mut a = PhaseTimes::with_len(1);
        a.set_time(0, u64::MAX - 1).unwrap();
        let mut b = PhaseTimes::with_len(1);
        b.set_time(0, 2).unwrap();
        let mut bin = PhaseTimes::with_len(1);
        bin.accumulate(&a).unwrap();
        assert_eq!(bin.accumulate(&b), Err(TimeOverflow));
    }

    #[test]
    fn test_median_odd_length() {
        assert_eq!(median_of(&[5, 1, 3]), 3);
    }

    #[test]
    fn test_median_even_length_truncates() {
        assert_eq!(median_of(&[100, 50]), 75);
        assert_eq!(median_of(&[1, 2]), 1);
    }

    #[test]
    fn test_median_counts_zero_padding() {
        // One nonzero phase among mostly unset slots
        assert_eq!(median_of(&[0, 0, 500]), 0);
        assert_eq!(median_of(&[0, 0, 0, 500]), 0);
    }

    #[test]
    fn test_median_empty() {
        assert_eq!(median_of(&[]), 0);
    }

    #[test]
    fn test_median_no_overflow() {
        assert_eq!(median_of(&[u64::MAX, u64::MAX]), u64::MAX);
    }

    #[test]
    fn test_accumulate_sums_element_wise() {
        let mut bin = PhaseTimes::with_len(3);
        let mut a = PhaseTimes::with_len(2);
        a.set_time(0, 10).unwrap();
        a.set_time(1, 20).unwrap();
        let mut b = PhaseTimes::with_len(3);
        b.set_time(0, 1).unwrap();
        b.set_time(2, 5).unwrap();
        bin.accumulate(&a).unwrap();
        bin.accumulate(&b).unwrap();
        assert_eq!(bin.phases(), &[11, 20, 5]);
        assert_eq!(bin.total(), 36);
    }

    #[test]
    fn test_profile_creates_record_presized() {
        let mut profile = ConfigurationProfile::new(Rc::from("Base"));
        let k = key("foo", "a.go:1:1", "main.F");
        profile.record(k.clone(), 1, 50, 4).unwrap();
        let times = profile.get(&k).unwrap();
        assert_eq!(times.phases(), &[0, 50, 0, 0]);
        assert_eq!(profile.len(), 1);
    }

    #[test]
    fn test_profile_duplicate_timing_ignored() {
        let mut profile = ConfigurationProfile::new(Rc::from("Base"));
        let k = key("foo", "a.go:1:1", "main.F");
        assert!(profile.record(k.clone(), 0, 100, 1).unwrap());
        assert!(!profile.record(k.clone(), 0, 300, 1).unwrap());
        let times = profile.get(&k).unwrap();
        assert_eq!(times.phase(0), 100);
        assert_eq!(times.total(), 100);
    }

    #[test]
    fn test_profile_freeze_computes_medians() {
        let mut profile = ConfigurationProfile::new(Rc::from("Base"));
        let k = key("foo", "a.go:1:1", "main.F");
        profile.record(k.clone(), 0, 100, 1).unwrap();
        profile.record(k.clone(), 1, 50, 2).unwrap();
        profile.freeze();
        assert_eq!(profile.get(&k).unwrap().median(), 75);
    }

    #[test]
    fn test_profile_keeps_first_seen_order() {
        let mut profile = ConfigurationProfile::new(Rc::from("Base"));
        profile.record(key("p", "b.go:1:1", "g"), 0, 1, 1).unwrap();
        profile.record(key("p", "a.go:1:1", "f"), 0, 1, 1).unwrap();
        let functions: Vec<_> = profile.records().map(|(k, _)| &*k.function).collect();
        assert_eq!(functions, vec!["g", "f"]);
    }

    #[test]
    fn test_aggregator_configurations_are_independent() {
        let mut agg = Aggregator::new();
        let k = key("foo", "a.go:1:1", "main.F");
        agg.open(Rc::from("Base")).record(k.clone(), 0, 10, 1).unwrap();
        agg.open(Rc::from("Test")).record(k.clone(), 0, 20, 1).unwrap();
        // Reopening returns the existing map
        assert!(!agg.open(Rc::from("Base")).record(k.clone(), 0, 30, 1).unwrap());

        let names: Vec<_> = agg.configurations().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Base", "Test"]);
        assert_eq!(agg.get("Base").unwrap().get(&k).unwrap().total(), 10);
        assert_eq!(agg.get("Test").unwrap().get(&k).unwrap().total(), 20);
        assert!(agg.get("Other").is_none());
    }
}
