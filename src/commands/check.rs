//! `mquery check` — validate methylome names against a local index without
//! starting the server (spec.md §6: "exits 0 if all names resolve and
//! hashes match, nonzero otherwise").

use std::path::Path;

use crate::catalog::Catalog;
use crate::cpg_index::CpgIndexRegistry;
use crate::error::{QueryError, Result};
use crate::methylome::MethylomeMetadata;

pub fn run_check(index_dir: &Path, methylome_dir: &Path, names: &[String]) -> Result<()> {
    let index_registry = CpgIndexRegistry::load_dir(index_dir)?;
    let catalog = Catalog::read(methylome_dir.join("methylome_names.json"))?;

    for name in names {
        let genome = catalog
            .genome_for(name)
            .ok_or_else(|| QueryError::InvalidMethylomeName(name.clone()))?;
        let index = index_registry
            .get(genome)
            .ok_or_else(|| QueryError::InvalidChromosome(genome.to_string()))?;
        let meta = MethylomeMetadata::read(MethylomeMetadata::path_for(methylome_dir, name))?;
        if meta.index_hash != index.index_hash() {
            return Err(QueryError::IndexHashMismatch {
                name: name.clone(),
                expected: meta.index_hash,
                actual: index.index_hash(),
            });
        }
        println!("{name}: ok ({genome}, {} CpGs)", meta.n_cpgs);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpg_index::{CpgIndex, CpgIndexMeta};
    use std::collections::{HashMap, HashSet};
    use tempfile::tempdir;

    fn write_fixture(dir: &Path) -> CpgIndex {
        let positions = vec![(0..5u32).map(|i| i * 2).collect::<Vec<u32>>()];
        let meta = CpgIndexMeta::build("toy", vec![("chr1".to_string(), 1_000)], &positions);
        let index = CpgIndex::new(meta, positions);
        index.write(dir).unwrap();

        let mut map: HashMap<String, HashSet<String>> = HashMap::new();
        map.insert("toy".to_string(), HashSet::from(["SRX1".to_string()]));
        Catalog::new(map)
            .write(dir.join("methylome_names.json"))
            .unwrap();

        let methylome_meta = MethylomeMetadata {
            version: "1".to_string(),
            host: "localhost".to_string(),
            user: "test".to_string(),
            creation_time: "now".to_string(),
            index_hash: index.index_hash(),
            assembly: "toy".to_string(),
            n_cpgs: 5,
        };
        methylome_meta
            .write(MethylomeMetadata::path_for(dir, "SRX1"))
            .unwrap();
        index
    }

    #[test]
    fn reports_ok_for_a_matching_methylome() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path());
        run_check(dir.path(), dir.path(), &["SRX1".to_string()]).unwrap();
    }

    #[test]
    fn rejects_an_unknown_methylome_name() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path());
        let err = run_check(dir.path(), dir.path(), &["NOPE".to_string()]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidMethylomeName(_)));
    }

    #[test]
    fn rejects_a_hash_mismatch() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path());
        let mut meta = MethylomeMetadata::read(MethylomeMetadata::path_for(dir.path(), "SRX1")).unwrap();
        meta.index_hash ^= 1;
        meta.write(MethylomeMetadata::path_for(dir.path(), "SRX1")).unwrap();
        let err = run_check(dir.path(), dir.path(), &["SRX1".to_string()]).unwrap_err();
        assert!(matches!(err, QueryError::IndexHashMismatch { .. }));
    }
}
