//! Methylome-name catalog: which methylomes belong to which genome.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The methylome-name catalog (spec.md §4.6): a genome-to-methylomes map
/// plus its inverse, kept mutually consistent at construction time rather
/// than recomputed on every lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub genome_to_methylomes: HashMap<String, HashSet<String>>,
    #[serde(skip)]
    methylome_to_genome: HashMap<String, String>,
}

impl Catalog {
    pub fn new(genome_to_methylomes: HashMap<String, HashSet<String>>) -> Self {
        let mut methylome_to_genome = HashMap::new();
        for (genome, methylomes) in &genome_to_methylomes {
            for name in methylomes {
                methylome_to_genome.insert(name.clone(), genome.clone());
            }
        }
        Self {
            genome_to_methylomes,
            methylome_to_genome,
        }
    }

    pub fn genome_for(&self, methylome_name: &str) -> Option<&str> {
        self.methylome_to_genome.get(methylome_name).map(|s| s.as_str())
    }

    pub fn contains(&self, methylome_name: &str) -> bool {
        self.methylome_to_genome.contains_key(methylome_name)
    }

    pub fn methylome_count(&self) -> usize {
        self.methylome_to_genome.len()
    }

    pub fn genome_count(&self) -> usize {
        self.genome_to_methylomes.len()
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let genome_to_methylomes: HashMap<String, HashSet<String>> =
            serde_json::from_str(&text).map_err(|source| crate::error::QueryError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(genome_to_methylomes))
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(&self.genome_to_methylomes).map_err(|source| {
            crate::error::QueryError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
