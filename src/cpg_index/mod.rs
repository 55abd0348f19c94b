//! CpG index: genome-wide enumeration of CpG sites and coordinate translation.
//!
//! Mirrors the shape of [`crate::catalog`]'s chromosome-ordered lookup and the
//! teacher's `IntervalIndex` (binary search over sorted per-chromosome data),
//! generalized to translate genomic coordinates into CpG offsets rather than
//! finding overlapping intervals.

mod meta;

pub use meta::CpgIndexMeta;

use rustc_hash::FxHashMap;
use std::io::Write;
use std::path::Path;

use crate::error::{QueryError, Result};

/// A loaded, immutable CpG index for one reference genome.
///
/// Built once at startup and shared read-only thereafter (spec.md §5):
/// no interior mutability, so it needs no synchronization to share across
/// worker threads.
#[derive(Debug, Clone)]
pub struct CpgIndex {
    meta: CpgIndexMeta,
    /// Sorted, 0-based CpG start positions, one vector per chromosome in
    /// `meta.chromosomes` order.
    cpg_positions: Vec<Vec<u32>>,
    chrom_id: FxHashMap<String, usize>,
}

impl CpgIndex {
    pub fn new(meta: CpgIndexMeta, cpg_positions: Vec<Vec<u32>>) -> Self {
        let chrom_id = meta
            .chromosomes
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        Self {
            meta,
            cpg_positions,
            chrom_id,
        }
    }

    pub fn meta(&self) -> &CpgIndexMeta {
        &self.meta
    }

    pub fn n_cpgs(&self) -> u32 {
        self.meta.n_cpgs
    }

    pub fn index_hash(&self) -> u64 {
        self.meta.index_hash
    }

    pub fn assembly(&self) -> &str {
        &self.meta.assembly
    }

    /// Resolve a chromosome name to its linear index, or `InvalidChromosome`.
    pub fn lookup(&self, chrom_name: &str) -> Result<usize> {
        self.chrom_id
            .get(chrom_name)
            .copied()
            .ok_or_else(|| QueryError::InvalidChromosome(chrom_name.to_string()))
    }

    /// Translate a half-open base-pair interval on a chromosome into a
    /// half-open CpG-offset range in this index's linear CpG space.
    ///
    /// `a` counts CpGs strictly before `start_bp`; `b` counts CpGs strictly
    /// before `stop_bp`. A CpG exactly at `stop_bp` is excluded. `a <= b`
    /// always holds given `start_bp <= stop_bp`.
    pub fn translate_interval(&self, chrom_id: usize, start_bp: u64, stop_bp: u64) -> Result<(u32, u32)> {
        if start_bp > stop_bp {
            let (name, _) = &self.meta.chromosomes[chrom_id];
            return Err(QueryError::InvalidInterval {
                chrom: name.clone(),
                start: start_bp,
                stop: stop_bp,
            });
        }
        let positions = &self.cpg_positions[chrom_id];
        let offset = self.meta.chrom_offset[chrom_id];

        let start_bp = start_bp as u32;
        let stop_bp = stop_bp as u32;
        let a = positions.partition_point(|&p| p < start_bp) as u32;
        let b = positions.partition_point(|&p| p < stop_bp) as u32;

        Ok((offset + a, offset + b))
    }

    /// Tile the genome into fixed-size bins, one `(a, b)` CpG-offset range
    /// per bin. Bins never cross a chromosome boundary; the last bin of a
    /// chromosome is clipped to its length.
    pub fn translate_bins(&self, bin_size: u64) -> Vec<(u32, u32)> {
        assert!(bin_size > 0, "bin_size must be positive");
        let mut ranges = Vec::new();
        for (chrom_id, (_, length)) in self.meta.chromosomes.iter().enumerate() {
            let mut start = 0u64;
            while start < *length {
                let stop = (start + bin_size).min(*length);
                let (a, b) = self
                    .translate_interval(chrom_id, start, stop)
                    .expect("start <= stop by construction");
                ranges.push((a, b));
                start = stop;
            }
        }
        ranges
    }

    /// Load a CpG index from a directory holding `{assembly}.cpg_idx` (binary
    /// positions) and `{assembly}.cpg_idx.json` (metadata).
    pub fn load<P: AsRef<Path>>(dir: P, assembly: &str) -> Result<Self> {
        let dir = dir.as_ref();
        let meta_path = dir.join(format!("{assembly}.cpg_idx.json"));
        let data_path = dir.join(format!("{assembly}.cpg_idx"));

        let meta = CpgIndexMeta::read(&meta_path)?;
        let bytes = std::fs::read(&data_path)?;

        let mut cpg_positions = Vec::with_capacity(meta.chromosomes.len());
        let mut cursor = 0usize;
        for _ in &meta.chromosomes {
            let count = read_u32_le(&bytes, cursor)?;
            cursor += 4;
            let mut positions = Vec::with_capacity(count as usize);
            for _ in 0..count {
                positions.push(read_u32_le(&bytes, cursor)?);
                cursor += 4;
            }
            cpg_positions.push(positions);
        }

        Ok(Self::new(meta, cpg_positions))
    }

    /// Serialize this index to `{assembly}.cpg_idx`/`{assembly}.cpg_idx.json`
    /// in `dir`, the inverse of [`CpgIndex::load`].
    pub fn write<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        let meta_path = dir.join(format!("{}.cpg_idx.json", self.meta.assembly));
        let data_path = dir.join(format!("{}.cpg_idx", self.meta.assembly));

        self.meta.write(&meta_path)?;

        let mut buf = Vec::new();
        for positions in &self.cpg_positions {
            buf.write_all(&(positions.len() as u32).to_le_bytes())?;
            for pos in positions {
                buf.write_all(&pos.to_le_bytes())?;
            }
        }
        std::fs::write(&data_path, buf)?;
        Ok(())
    }
}

fn read_u32_le(bytes: &[u8], at: usize) -> Result<u32> {
    let slice = bytes.get(at..at + 4).ok_or_else(|| {
        QueryError::InvalidRequest("truncated CpG index binary".to_string())
    })?;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

/// Immutable, genome-name-keyed collection of loaded indexes, built once at
/// startup (spec.md §5, §9: "the CpG-index registry ... are application
/// singletons owned by the server's top-level object").
#[derive(Debug, Default)]
pub struct CpgIndexRegistry {
    by_assembly: FxHashMap<String, std::sync::Arc<CpgIndex>>,
}

impl CpgIndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: CpgIndex) {
        self.by_assembly
            .insert(index.assembly().to_string(), std::sync::Arc::new(index));
    }

    pub fn get(&self, assembly: &str) -> Option<std::sync::Arc<CpgIndex>> {
        self.by_assembly.get(assembly).cloned()
    }

    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(QueryError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("CpG index directory not found: {}", dir.display()),
            )));
        }
        let mut registry = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("cpg_idx") {
                let assembly = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();
                registry.insert(CpgIndex::load(dir, &assembly)?);
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_index() -> CpgIndex {
        // chr1: CpGs at 10,20,30,40; chr2: CpGs at 5,15,25
        let positions = vec![vec![10, 20, 30, 40], vec![5, 15, 25]];
        let meta = CpgIndexMeta::build(
            "toy",
            vec![("chr1".to_string(), 1000), ("chr2".to_string(), 1000)],
            &positions,
        );
        CpgIndex::new(meta, positions)
    }

    #[test]
    fn lookup_known_and_unknown_chromosome() {
        let idx = toy_index();
        assert_eq!(idx.lookup("chr1").unwrap(), 0);
        assert_eq!(idx.lookup("chr2").unwrap(), 1);
        assert!(idx.lookup("chrX").is_err());
    }

    #[test]
    fn translate_interval_basic() {
        let idx = toy_index();
        let chr1 = idx.lookup("chr1").unwrap();
        // [15, 35) should capture CpGs at 20 and 30 -> offsets 1..3
        assert_eq!(idx.translate_interval(chr1, 15, 35).unwrap(), (1, 3));
        let chr2 = idx.lookup("chr2").unwrap();
        // chr2 offset starts at 4 (4 CpGs in chr1)
        assert_eq!(idx.translate_interval(chr2, 0, 10).unwrap(), (4, 5));
    }

    #[test]
    fn translate_interval_stop_exact_match_is_excluded() {
        let idx = toy_index();
        let chr1 = idx.lookup("chr1").unwrap();
        // a CpG exactly at stop_bp is excluded (half-open)
        assert_eq!(idx.translate_interval(chr1, 10, 20).unwrap(), (0, 1));
    }

    #[test]
    fn translate_interval_outside_any_cpg_is_zero_width() {
        let idx = toy_index();
        let chr1 = idx.lookup("chr1").unwrap();
        assert_eq!(idx.translate_interval(chr1, 100, 200).unwrap(), (4, 4));
    }

    #[test]
    fn translate_interval_rejects_start_after_stop() {
        let idx = toy_index();
        let chr1 = idx.lookup("chr1").unwrap();
        assert!(idx.translate_interval(chr1, 50, 10).is_err());
    }

    #[test]
    fn translate_interval_idempotent_across_equivalent_intervals() {
        let idx = toy_index();
        let chr1 = idx.lookup("chr1").unwrap();
        // [11, 35) and [15, 31) cover the same CpGs (20, 30)
        let a = idx.translate_interval(chr1, 11, 35).unwrap();
        let b = idx.translate_interval(chr1, 15, 31).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn translate_bins_splits_at_chromosome_boundary() {
        let idx = toy_index();
        let bins = idx.translate_bins(600);
        // chr1 (len 1000): bins [0,600) and [600,1000); chr2 likewise.
        assert_eq!(bins.len(), 4);
        // First chr1 bin covers all 4 chr1 CpGs (10..40 < 600).
        assert_eq!(bins[0], (0, 4));
        // Second chr1 bin is empty (no CpGs in [600,1000)).
        assert_eq!(bins[1], (4, 4));
    }

    #[test]
    fn round_trip_binary_load() {
        let idx = toy_index();
        let dir = tempfile::tempdir().unwrap();
        idx.write(dir.path()).unwrap();
        let loaded = CpgIndex::load(dir.path(), "toy").unwrap();
        assert_eq!(loaded.n_cpgs(), idx.n_cpgs());
        assert_eq!(loaded.index_hash(), idx.index_hash());
        let chr1 = loaded.lookup("chr1").unwrap();
        assert_eq!(loaded.translate_interval(chr1, 15, 35).unwrap(), (1, 3));
    }

    #[test]
    fn registry_missing_dir_errors() {
        let result = CpgIndexRegistry::load_dir("/no/such/directory/mquery-test");
        assert!(result.is_err());
    }
}
