//! Range-sum engine: aggregate methylome counts over query ranges.

use rayon::prelude::*;

use crate::methylome::MethylomeData;
use crate::query::QueryContainer;

/// The result of summing counts over one `(start, stop)` range (spec.md
/// §3 "Level element"). `n_covered` is `Some` only for the covered variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Level {
    pub n_meth: u32,
    pub n_unmeth: u32,
    pub n_covered: Option<u32>,
}

impl Level {
    pub fn is_covered_variant(&self) -> bool {
        self.n_covered.is_some()
    }

    /// Wire size in bytes: 8 for the basic variant, 12 for the covered one.
    pub fn wire_len(&self) -> usize {
        if self.is_covered_variant() {
            12
        } else {
            8
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_len());
        buf.extend_from_slice(&self.n_meth.to_le_bytes());
        buf.extend_from_slice(&self.n_unmeth.to_le_bytes());
        if let Some(covered) = self.n_covered {
            buf.extend_from_slice(&covered.to_le_bytes());
        }
        buf
    }

    /// The fraction of methylated calls, or `None` when nothing is covered
    /// (spec.md §4.4: bedgraph/score value is "NA" when `m + u = 0`).
    pub fn score(&self) -> Option<f64> {
        let total = self.n_meth + self.n_unmeth;
        if total == 0 {
            None
        } else {
            Some(self.n_meth as f64 / total as f64)
        }
    }
}

/// Sum `data`'s counts over every range in `query`, independently and with
/// no ordering guarantees beyond "result `k` corresponds to query range
/// `k`" (spec.md §4.3). `covered` selects the covered variant, which also
/// counts sites with `m + u > 0`.
///
/// Each range is a contiguous stride over a dense array, so this is a
/// single bounded scan per range; ranges are processed in parallel with
/// rayon, mirroring the teacher's `parallel::process_chromosomes` fan-out
/// over independent units of work.
pub fn range_sum(data: &MethylomeData, query: &QueryContainer, covered: bool) -> Vec<Level> {
    query
        .v
        .par_iter()
        .map(|&(a, b)| sum_one_range(data, a, b, covered))
        .collect()
}

fn sum_one_range(data: &MethylomeData, a: u32, b: u32, covered: bool) -> Level {
    let mut n_meth: u32 = 0;
    let mut n_unmeth: u32 = 0;
    let mut n_covered: u32 = 0;

    for i in a..b {
        let pair = data.get(i);
        n_meth += pair.m as u32;
        n_unmeth += pair.u as u32;
        if covered && pair.is_covered() {
            n_covered += 1;
        }
    }

    Level {
        n_meth,
        n_unmeth,
        n_covered: if covered { Some(n_covered) } else { None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methylome::CountPair;

    fn sample_data() -> MethylomeData {
        MethylomeData::from_counts(&[
            CountPair { m: 5, u: 1 },
            CountPair { m: 0, u: 0 },
            CountPair { m: 3, u: 3 },
            CountPair { m: 0, u: 2 },
        ])
    }

    #[test]
    fn empty_query_yields_empty_levels() {
        let data = sample_data();
        let q = QueryContainer::default();
        assert!(range_sum(&data, &q, false).is_empty());
    }

    #[test]
    fn zero_width_range_is_all_zero() {
        let data = sample_data();
        let q = QueryContainer::new(vec![(2, 2)]);
        let levels = range_sum(&data, &q, true);
        assert_eq!(levels[0], Level { n_meth: 0, n_unmeth: 0, n_covered: Some(0) });
    }

    #[test]
    fn basic_variant_sums_counts() {
        let data = sample_data();
        let q = QueryContainer::new(vec![(0, 4)]);
        let levels = range_sum(&data, &q, false);
        assert_eq!(levels[0].n_meth, 8);
        assert_eq!(levels[0].n_unmeth, 6);
        assert_eq!(levels[0].n_covered, None);
    }

    #[test]
    fn covered_variant_counts_nonzero_sites() {
        let data = sample_data();
        let q = QueryContainer::new(vec![(0, 4)]);
        let levels = range_sum(&data, &q, true);
        assert_eq!(levels[0].n_covered, Some(3));
    }

    #[test]
    fn uncovered_range_reports_zero_covered_sites() {
        let data = MethylomeData::from_counts(&[CountPair { m: 0, u: 0 }; 5]);
        let q = QueryContainer::new(vec![(0, 5)]);
        let levels = range_sum(&data, &q, true);
        assert_eq!(levels[0].n_covered, Some(0));
    }

    #[test]
    fn result_index_matches_query_index() {
        let data = sample_data();
        let q = QueryContainer::new(vec![(0, 1), (2, 3), (3, 4)]);
        let levels = range_sum(&data, &q, false);
        assert_eq!(levels[0].n_meth, 5);
        assert_eq!(levels[1].n_meth, 3);
        assert_eq!(levels[2].n_meth, 0);
        assert_eq!(levels[2].n_unmeth, 2);
    }

    #[test]
    fn wire_len_matches_variant() {
        let basic = Level { n_meth: 1, n_unmeth: 1, n_covered: None };
        let covered = Level { n_meth: 1, n_unmeth: 1, n_covered: Some(1) };
        assert_eq!(basic.wire_len(), 8);
        assert_eq!(covered.wire_len(), 12);
    }

    #[test]
    fn score_is_none_when_uncovered() {
        let level = Level { n_meth: 0, n_unmeth: 0, n_covered: Some(0) };
        assert_eq!(level.score(), None);
    }

    #[test]
    fn score_is_ratio_when_covered() {
        let level = Level { n_meth: 1, n_unmeth: 3, n_covered: Some(1) };
        assert_eq!(level.score(), Some(0.25));
    }
}
