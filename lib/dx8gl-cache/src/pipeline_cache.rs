//! Pipeline cache (spec §4.8): `(vertex-module, fragment-module, 64-bit
//! state-hash)` to a constructed pipeline, with no eviction — "pipelines
//! are cheap in aggregate compared to shader modules, and this matches
//! driver behavior."

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::CacheResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey<Id> {
    vertex_module: Id,
    fragment_module: Id,
    state_hash: u64,
}

/// Maps shader-module id pairs plus a packed pipeline-state hash to a
/// backend-opaque pipeline object `P`. `Id` is whatever handle type the
/// backend uses to name a compiled module (an index, a generational
/// handle, or the module itself if it is cheaply comparable).
pub struct PipelineCache<Id, P> {
    entries: HashMap<PipelineKey<Id>, P>,
}

impl<Id: Eq + Hash + Clone, P> PipelineCache<Id, P> {
    pub fn new() -> Self {
        PipelineCache {
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the pipeline for this module pair and state hash; on a
    /// miss, constructs it via `construct` and inserts it. No entry is
    /// ever evicted.
    pub fn get_or_construct<F>(
        &mut self,
        vertex_module: Id,
        fragment_module: Id,
        state_hash: u64,
        construct: F,
    ) -> CacheResult<&P>
    where
        F: FnOnce() -> CacheResult<P>,
    {
        let key = PipelineKey {
            vertex_module,
            fragment_module,
            state_hash,
        };
        if !self.entries.contains_key(&key) {
            let pipeline = construct()?;
            self.entries.insert(key.clone(), pipeline);
        }
        Ok(self.entries.get(&key).unwrap())
    }
}

impl<Id: Eq + Hash + Clone, P> Default for PipelineCache<Id, P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit_constructs_once() {
        let mut cache: PipelineCache<u32, u32> = PipelineCache::new();
        let mut constructions = 0;
        cache.get_or_construct(1, 2, 0xABCD, || {
            constructions += 1;
            Ok(10)
        }).unwrap();
        cache.get_or_construct(1, 2, 0xABCD, || {
            constructions += 1;
            Ok(10)
        }).unwrap();
        assert_eq!(constructions, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_state_hash_is_a_distinct_entry() {
        let mut cache: PipelineCache<u32, u32> = PipelineCache::new();
        cache.get_or_construct(1, 2, 1, || Ok(10)).unwrap();
        cache.get_or_construct(1, 2, 2, || Ok(11)).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn never_evicts() {
        let mut cache: PipelineCache<u32, u32> = PipelineCache::new();
        for i in 0..100u64 {
            cache.get_or_construct(1, 2, i, || Ok(0)).unwrap();
        }
        assert_eq!(cache.len(), 100);
    }
}
