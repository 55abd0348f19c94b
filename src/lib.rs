#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! mquery: indexed remote query engine for large collections of methylomes.
//!
//! A methylome is a dense array of per-CpG `(methylated, unmethylated)` read
//! counts for one biological sample. This crate holds many methylomes on
//! disk and serves aggregate methylation levels over client-supplied
//! genomic intervals or fixed-size bins, without streaming raw counts back
//! to the client.
//!
//! # Layout
//!
//! - [`cpg_index`] enumerates a reference genome's CpG sites and translates
//!   genomic coordinates into linear CpG offsets.
//! - [`methylome`] is the on-disk, position-indexed count array for one
//!   sample, plus its metadata.
//! - [`query`] packs `(start, stop)` CpG-offset ranges into a query
//!   container; [`levels`] sums a methylome's counts over each range.
//! - [`methylome_set`] is the bounded, LRU-evicted cache of loaded
//!   methylomes shared across concurrent requests.
//! - [`protocol`] is the wire format request header/body/response framing;
//!   [`server`] drives the TCP accept loop and per-connection pipeline.
//! - [`catalog`], [`config`] and [`format`] are the supporting genome/
//!   methylome name catalog, client TOML configuration, and output
//!   rendering.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod cpg_index;
pub mod error;
pub mod format;
pub mod levels;
pub mod lru;
pub mod methylome;
pub mod methylome_set;
pub mod protocol;
pub mod query;
pub mod runtime_config;
pub mod server;

pub use cpg_index::{CpgIndex, CpgIndexMeta, CpgIndexRegistry};
pub use error::{QueryError, Result};
pub use levels::Level;
pub use methylome::{CountPair, MethylomeData, MethylomeMetadata};
pub use methylome_set::{LoadedMethylome, MethylomeSet};
pub use query::QueryContainer;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::catalog::Catalog;
    pub use crate::cpg_index::{CpgIndex, CpgIndexMeta, CpgIndexRegistry};
    pub use crate::error::{QueryError, Result};
    pub use crate::format::OutputFormat;
    pub use crate::levels::Level;
    pub use crate::methylome::{CountPair, MethylomeData, MethylomeMetadata};
    pub use crate::methylome_set::{LoadedMethylome, MethylomeSet};
    pub use crate::query::QueryContainer;
}

#[cfg(test)]
mod tests {
    use crate::cpg_index::{CpgIndex, CpgIndexMeta};
    use crate::levels::range_sum;
    use crate::methylome::{CountPair, MethylomeData};
    use crate::query::QueryContainer;

    /// End-to-end check that a genomic interval translated against a CpG
    /// index and summed against a methylome reaches the same result as
    /// summing the raw offsets directly.
    #[test]
    fn test_basic_workflow() {
        let positions = vec![vec![10, 20, 30, 40, 50]];
        let meta = CpgIndexMeta::build("toy", vec![("chr1".to_string(), 1000)], &positions);
        let index = CpgIndex::new(meta, positions);

        let counts = vec![
            CountPair { m: 1, u: 0 },
            CountPair { m: 0, u: 1 },
            CountPair { m: 2, u: 2 },
            CountPair { m: 0, u: 0 },
            CountPair { m: 5, u: 0 },
        ];
        let data = MethylomeData::from_counts(&counts);

        let chrom = index.lookup("chr1").unwrap();
        let (a, b) = index.translate_interval(chrom, 15, 45).unwrap();
        let query = QueryContainer::new(vec![(a, b)]);
        let levels = range_sum(&data, &query, true);

        assert_eq!(levels[0].n_meth, 2);
        assert_eq!(levels[0].n_unmeth, 3);
        assert_eq!(levels[0].n_covered, Some(2));
    }
}
