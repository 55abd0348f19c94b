//! Query translation: genomic intervals and fixed-size bins to `query_container`.

use crate::cpg_index::CpgIndex;
use crate::error::Result;

/// A packed sequence of `(start, stop)` CpG-offset pairs defining one batch
/// of ranges (spec.md §3 "Query container"). Constructed per-request and
/// discarded after the response is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryContainer {
    pub v: Vec<(u32, u32)>,
}

impl QueryContainer {
    pub fn new(v: Vec<(u32, u32)>) -> Self {
        Self { v }
    }

    pub fn size(&self) -> usize {
        self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    /// Translate `(chrom, start_bp, stop_bp)` genomic intervals into CpG
    /// offset ranges against `index` (spec.md §4.1).
    pub fn from_intervals(index: &CpgIndex, intervals: &[(String, u64, u64)]) -> Result<Self> {
        let mut v = Vec::with_capacity(intervals.len());
        for (chrom, start, stop) in intervals {
            let chrom_id = index.lookup(chrom)?;
            v.push(index.translate_interval(chrom_id, *start, *stop)?);
        }
        Ok(Self { v })
    }

    /// Tile the whole genome covered by `index` into `bin_size`-bp bins
    /// (spec.md §4.1 `translate_bins`).
    pub fn from_bins(index: &CpgIndex, bin_size: u64) -> Self {
        Self {
            v: index.translate_bins(bin_size),
        }
    }

    /// Serialize to the wire payload: `8 * size()` bytes, little-endian
    /// `(u32 start, u32 stop)` pairs (spec.md §3, §4.7).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.v.len() * 8);
        for (start, stop) in &self.v {
            buf.extend_from_slice(&start.to_le_bytes());
            buf.extend_from_slice(&stop.to_le_bytes());
        }
        buf
    }

    /// Parse the inverse of [`QueryContainer::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 8 != 0 {
            return Err(crate::error::QueryError::InvalidRequest(format!(
                "query payload length {} is not a multiple of 8",
                bytes.len()
            )));
        }
        let mut v = Vec::with_capacity(bytes.len() / 8);
        for chunk in bytes.chunks_exact(8) {
            let start = u32::from_le_bytes(chunk[0..4].try_into().unwrap());
            let stop = u32::from_le_bytes(chunk[4..8].try_into().unwrap());
            v.push((start, stop));
        }
        Ok(Self { v })
    }
}
