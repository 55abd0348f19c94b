//! Dense, position-indexed methylome count array and its on-disk layout.

use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

use super::meta::MethylomeMetadata;
use crate::cpg_index::CpgIndex;
use crate::error::{QueryError, Result};

/// One CpG site's tally: methylated and unmethylated read counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountPair {
    pub m: u16,
    pub u: u16,
}

impl CountPair {
    #[inline]
    pub fn is_covered(&self) -> bool {
        self.m as u32 + self.u as u32 > 0
    }
}

/// Reduce `(m, u)` so neither exceeds `u16::MAX`, scaling both by the same
/// factor to preserve their ratio (spec.md §3 "Saturation rule").
///
/// Grounded on `original_source/test/methylome_data_test.cpp`'s worked
/// example: `(65536, 65536)` rounds to `(65535, 65535)`, which only holds
/// under a scale of `65535 / max(m, u)` (a sum-based `65535 / (m + u)`
/// scale, as spec.md's prose literally states, would instead produce
/// `(32767, 32767)`). We follow the original's behavior; see DESIGN.md.
pub fn conditional_round_to_fit(m: u32, u: u32) -> (u16, u16) {
    let largest = m.max(u);
    if largest <= u16::MAX as u32 {
        return (m as u16, u as u16);
    }
    let cap = u16::MAX as u64;
    let new_m = (m as u64 * cap / largest as u64) as u16;
    let new_u = (u as u64 * cap / largest as u64) as u16;
    (new_m, new_u)
}

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Mapped(m) => &m[..],
            Backing::Owned(v) => &v[..],
        }
    }
}

/// The dense per-CpG count array for one methylome (spec.md §3).
pub struct MethylomeData {
    backing: Backing,
    n_cpgs: u32,
}

impl MethylomeData {
    pub fn size(&self) -> u32 {
        self.n_cpgs
    }

    /// Raw little-endian bytes, 4 per CpG site: `(m: u16 LE, u: u16 LE)`.
    #[inline]
    pub fn raw(&self) -> &[u8] {
        self.backing.bytes()
    }

    #[inline]
    pub fn get(&self, i: u32) -> CountPair {
        let off = i as usize * 4;
        let b = self.raw();
        CountPair {
            m: u16::from_le_bytes([b[off], b[off + 1]]),
            u: u16::from_le_bytes([b[off + 2], b[off + 3]]),
        }
    }

    /// Build an in-memory methylome from already-saturated counts, mainly
    /// for tests and for synthetic fixtures.
    pub fn from_counts(counts: &[CountPair]) -> Self {
        let mut bytes = Vec::with_capacity(counts.len() * 4);
        for c in counts {
            bytes.extend_from_slice(&c.m.to_le_bytes());
            bytes.extend_from_slice(&c.u.to_le_bytes());
        }
        Self {
            n_cpgs: counts.len() as u32,
            backing: Backing::Owned(bytes),
        }
    }

    /// Path for a methylome's binary data file, `{dir}/{name}.m16`.
    pub fn path_for<P: AsRef<Path>>(dir: P, name: &str) -> std::path::PathBuf {
        dir.as_ref().join(format!("{name}.m16"))
    }

    /// Load and validate a methylome's data file against its metadata and
    /// the CpG index it claims to be built against (spec.md §4.2).
    pub fn read<P: AsRef<Path>>(dir: P, name: &str, meta: &MethylomeMetadata, index: &CpgIndex) -> Result<Self> {
        if meta.index_hash != index.index_hash() {
            return Err(QueryError::IndexHashMismatch {
                name: name.to_string(),
                expected: meta.index_hash,
                actual: index.index_hash(),
            });
        }

        let path = Self::path_for(dir, name);
        let file = File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                QueryError::MethylomeFileNotFound { path: path.clone() }
            } else {
                QueryError::Io(e)
            }
        })?;

        let expected_len = 4u64 * meta.n_cpgs as u64;
        let actual_len = file.metadata()?.len();
        if actual_len != expected_len {
            return Err(QueryError::InvalidRequest(format!(
                "methylome {name} has {actual_len} bytes, expected {expected_len} for n_cpgs={}",
                meta.n_cpgs
            )));
        }

        // SAFETY: the file is not expected to be mutated concurrently; the
        // server treats methylome directories as read-only at query time.
        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Self {
            n_cpgs: meta.n_cpgs,
            backing: Backing::Mapped(mmap),
        })
    }

    pub fn write<P: AsRef<Path>>(&self, dir: P, name: &str) -> Result<()> {
        std::fs::write(Self::path_for(dir, name), self.raw())?;
        Ok(())
    }
}
