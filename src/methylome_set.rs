//! Bounded, concurrency-safe cache of loaded methylomes.
//!
//! Pairs [`LruTracker`] (recency order) with an `entries` map (the payload)
//! and a `pending` map of one-shot completion slots so concurrent requests
//! for the same not-yet-resident name share a single disk load rather than
//! racing each other (spec.md §4.5, §9).

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::OnceCell;

use crate::catalog::Catalog;
use crate::cpg_index::CpgIndexRegistry;
use crate::error::{QueryError, Result};
use crate::levels::{self, Level};
use crate::lru::LruTracker;
use crate::methylome::{MethylomeData, MethylomeMetadata};
use crate::query::QueryContainer;

/// A fully loaded, shareable methylome: metadata plus its dense count array.
pub struct LoadedMethylome {
    pub metadata: MethylomeMetadata,
    pub data: MethylomeData,
}

type PendingSlot = Arc<OnceCell<std::result::Result<Arc<LoadedMethylome>, QueryError>>>;

struct SetState {
    entries: FxHashMap<String, Arc<LoadedMethylome>>,
    order: LruTracker<String>,
    pending: FxHashMap<String, PendingSlot>,
}

/// The `capacity`-bounded in-memory cache of methylomes described in
/// spec.md §4.5. Guarded by a single `parking_lot::Mutex` that is never
/// held across a disk read — the mutex protects only `entries`/`order`/
/// `pending` bookkeeping, per spec.md §5/§9.
pub struct MethylomeSet {
    methylome_dir: PathBuf,
    state: Mutex<SetState>,
}

impl MethylomeSet {
    pub fn new(methylome_dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            methylome_dir: methylome_dir.into(),
            state: Mutex::new(SetState {
                entries: FxHashMap::default(),
                order: LruTracker::new(capacity),
                pending: FxHashMap::default(),
            }),
        }
    }

    pub fn resident_count(&self) -> usize {
        self.state.lock().order.size()
    }

    pub fn is_resident(&self, name: &str) -> bool {
        self.state.lock().entries.contains_key(name)
    }

    /// Resolve `name` to a loaded methylome, loading it from disk on first
    /// reference. At most one disk load happens per unique `name` at a
    /// time; other callers for the same name await that load's result.
    pub async fn get(
        &self,
        name: &str,
        index_registry: &CpgIndexRegistry,
        catalog: &Catalog,
    ) -> Result<Arc<LoadedMethylome>> {
        if let Some(entry) = self.try_hit(name) {
            return Ok(entry);
        }

        if !catalog.contains(name) {
            return Err(QueryError::InvalidMethylomeName(name.to_string()));
        }

        let slot = self.pending_slot(name);
        let result = slot
            .get_or_try_init(|| self.load(name, index_registry, catalog))
            .await;

        match result {
            Ok(loaded) => self.settle(name, Arc::clone(loaded)),
            Err(e) => {
                self.state.lock().pending.remove(name);
                Err(e.to_shared())
            }
        }
    }

    fn try_hit(&self, name: &str) -> Option<Arc<LoadedMethylome>> {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get(name).cloned() {
            state.order.move_to_front(&name.to_string());
            Some(entry)
        } else {
            None
        }
    }

    fn pending_slot(&self, name: &str) -> PendingSlot {
        let mut state = self.state.lock();
        state
            .pending
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Publish a successful load, evicting the first unreferenced LRU
    /// candidate if the set is at capacity. If every resident entry is
    /// still referenced, the freshly loaded value is dropped and `get`
    /// fails with `cache_exhausted` rather than overrunning `capacity`
    /// (spec.md §4.5: "get fails ... rather than blocking on readers").
    fn settle(&self, name: &str, loaded: Arc<LoadedMethylome>) -> Result<Arc<LoadedMethylome>> {
        let mut state = self.state.lock();
        state.pending.remove(name);

        if state.entries.contains_key(name) {
            state.order.move_to_front(&name.to_string());
            return Ok(loaded);
        }

        if state.order.full() {
            match Self::find_evictable(&state.order, &state.entries) {
                Some(victim) => {
                    state.order.remove(&victim);
                    state.entries.remove(&victim);
                }
                None => return Err(QueryError::CacheExhausted),
            }
        }

        state.entries.insert(name.to_string(), Arc::clone(&loaded));
        state.order.push(name.to_string());
        Ok(loaded)
    }

    /// Scan backward from the least recently used entry for the first one
    /// with no outstanding external reference (spec.md §4.5, §9).
    fn find_evictable(
        order: &LruTracker<String>,
        entries: &FxHashMap<String, Arc<LoadedMethylome>>,
    ) -> Option<String> {
        order
            .iter_back_to_front()
            .find(|name| {
                entries
                    .get(name.as_str())
                    .map(|entry| Arc::strong_count(entry) == 1)
                    .unwrap_or(false)
            })
            .cloned()
    }

    async fn load(
        &self,
        name: &str,
        index_registry: &CpgIndexRegistry,
        catalog: &Catalog,
    ) -> Result<Arc<LoadedMethylome>> {
        let name = name.to_string();
        let genome = catalog
            .genome_for(&name)
            .ok_or_else(|| QueryError::InvalidMethylomeName(name.clone()))?
            .to_string();
        let index = index_registry
            .get(&genome)
            .ok_or_else(|| QueryError::InvalidMethylomeName(name.clone()))?;
        let dir = self.methylome_dir.clone();

        tokio::task::spawn_blocking(move || {
            let meta = MethylomeMetadata::read(MethylomeMetadata::path_for(&dir, &name))?;
            if meta.index_hash != index.index_hash() {
                return Err(QueryError::IndexHashMismatch {
                    name: name.clone(),
                    expected: meta.index_hash,
                    actual: index.index_hash(),
                });
            }
            let data = MethylomeData::read(&dir, &name, &meta, &index)?;
            Ok(Arc::new(LoadedMethylome { metadata: meta, data }))
        })
        .await
        .map_err(|join_err| QueryError::LoadFailed {
            message: format!("methylome load task panicked: {join_err}"),
            wire_code: crate::error::WireErrorCode::IoError as u32,
        })?
    }
}

/// Resolve `names` against `set` and compute `query`'s levels for each,
/// fanning the per-name resolution out on a [`tokio::task::JoinSet`] so a
/// slow load for one methylome doesn't block the others (spec.md §4.3,
/// §5). A failure to resolve one name is reported only against that row;
/// the rest proceed (spec.md §9 open question, resolved in DESIGN.md).
pub async fn get_levels(
    set: Arc<MethylomeSet>,
    index_registry: Arc<CpgIndexRegistry>,
    catalog: Arc<Catalog>,
    names: &[String],
    query: &QueryContainer,
    covered: bool,
) -> Vec<Result<Vec<Level>>> {
    let mut tasks = tokio::task::JoinSet::new();
    for (i, name) in names.iter().cloned().enumerate() {
        let set = Arc::clone(&set);
        let index_registry = Arc::clone(&index_registry);
        let catalog = Arc::clone(&catalog);
        let query = query.clone();
        tasks.spawn(async move {
            let result = set
                .get(&name, &index_registry, &catalog)
                .await
                .map(|loaded| levels::range_sum(&loaded.data, &query, covered));
            if let Err(e) = &result {
                tracing::warn!(methylome = %name, error = %e, "get_levels: methylome failed to resolve");
            }
            (i, result)
        });
    }

    let mut rows: Vec<Option<Result<Vec<Level>>>> = (0..names.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((i, result)) => rows[i] = Some(result),
            Err(join_err) => {
                tracing::warn!(error = %join_err, "get_levels: resolution task panicked");
            }
        }
    }
    rows.into_iter()
        .map(|r| r.unwrap_or_else(|| Err(QueryError::Io(std::io::Error::other("resolution task did not complete")))))
        .collect()
}
