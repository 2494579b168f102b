//! Shader module cache (spec §4.7): keyed on `(kind, source-hash, state-flags)`,
//! least-recently-used eviction, versioned binary persistence (spec §6
//! "Shader-cache on-disk format").

use std::collections::HashMap;
use std::io::{Read, Write};
use std::time::Duration;

use sha3::{Digest, Keccak256};

use crate::error::{CacheError, CacheResult};

const FORMAT_VERSION: u32 = 1;

/// The three module kinds the on-disk format distinguishes (spec §6: "kind
/// word (0 = vertex, 1 = fragment, 2 = compute)"). `dx8gl-shader` only ever
/// produces the first two; `Compute` exists so the format and this cache
/// are not coupled to that restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheShaderKind {
    Vertex,
    Fragment,
    Compute,
}

impl CacheShaderKind {
    fn to_word(self) -> u32 {
        match self {
            CacheShaderKind::Vertex => 0,
            CacheShaderKind::Fragment => 1,
            CacheShaderKind::Compute => 2,
        }
    }

    fn from_word(word: u32) -> CacheResult<Self> {
        match word {
            0 => Ok(CacheShaderKind::Vertex),
            1 => Ok(CacheShaderKind::Fragment),
            2 => Ok(CacheShaderKind::Compute),
            _ => Err(CacheError::Corrupt("unknown shader kind word")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ShaderModuleKey {
    kind: CacheShaderKind,
    source_hash: [u8; 32],
    state_flags: u32,
}

fn hash_source(source: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(source.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

struct Entry<T> {
    module: T,
    source: String,
    last_access: u64,
    use_count: u64,
}

/// Running totals readable at any time (spec §4.7 "Statistics").
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub total_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub compilations: u64,
    pub compile_time: Duration,
    pub estimated_bytes: usize,
}

/// A content-addressed cache of compiled shader modules of backend-opaque
/// type `T`. `tick` stands in for a last-access clock: it is a plain
/// monotonic counter rather than wall-clock time, which keeps LRU ordering
/// exactly reproducible (spec §8 testable property 8).
pub struct ShaderModuleCache<T> {
    capacity: usize,
    entries: HashMap<ShaderModuleKey, Entry<T>>,
    tick: u64,
    stats: CacheStats,
}

impl<T> ShaderModuleCache<T> {
    pub fn new(capacity: usize) -> Self {
        ShaderModuleCache {
            capacity,
            entries: HashMap::new(),
            tick: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            ..self.stats
        }
    }

    /// Looks up `(kind, source, state_flags)`; on a miss, invokes `compile`
    /// and inserts the result, evicting the least-recently-used entry first
    /// if the cache is at capacity (spec §4.7 "Eviction").
    pub fn get_or_compile<F>(
        &mut self,
        kind: CacheShaderKind,
        source: &str,
        state_flags: u32,
        compile: F,
    ) -> CacheResult<&T>
    where
        F: FnOnce(&str) -> CacheResult<T>,
    {
        let key = ShaderModuleKey {
            kind,
            source_hash: hash_source(source),
            state_flags,
        };
        self.tick += 1;
        let tick = self.tick;

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_access = tick;
            entry.use_count += 1;
            self.stats.hits += 1;
            return Ok(&self.entries.get(&key).unwrap().module);
        }

        self.stats.misses += 1;
        let start = std::time::Instant::now();
        let module = compile(source)?;
        self.stats.compile_time += start.elapsed();
        self.stats.compilations += 1;
        self.stats.estimated_bytes += source.len();

        if self.entries.len() >= self.capacity && self.capacity > 0 {
            self.evict_oldest();
        }
        self.entries.insert(
            key.clone(),
            Entry {
                module,
                source: source.to_string(),
                last_access: tick,
                use_count: 1,
            },
        );
        Ok(&self.entries.get(&key).unwrap().module)
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest_key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone())
        {
            if let Some(entry) = self.entries.remove(&oldest_key) {
                self.stats.estimated_bytes = self.stats.estimated_bytes.saturating_sub(entry.source.len());
            }
        }
    }

    /// Serializes every entry to the versioned binary format of spec §6.
    pub fn save_to<W: Write>(&self, mut w: W) -> CacheResult<()> {
        w.write_all(&FORMAT_VERSION.to_le_bytes())?;
        w.write_all(&(self.entries.len() as u32).to_le_bytes())?;
        for (key, entry) in &self.entries {
            w.write_all(&key.kind.to_word().to_le_bytes())?;
            w.write_all(&key.state_flags.to_le_bytes())?;
            w.write_all(&(key.source_hash.len() as u32).to_le_bytes())?;
            w.write_all(&key.source_hash)?;
            let source_bytes = entry.source.as_bytes();
            w.write_all(&(source_bytes.len() as u32).to_le_bytes())?;
            w.write_all(source_bytes)?;
        }
        Ok(())
    }

    /// Loads entries from the versioned binary format, recompiling each
    /// through `compile`. A missing or unreadable file is treated as an
    /// empty cache (spec §6); entries whose recompilation fails are
    /// skipped rather than failing the whole load (spec §4.7).
    pub fn load_from<R: Read, F>(mut r: R, capacity: usize, mut compile: F) -> CacheResult<Self>
    where
        F: FnMut(&str) -> CacheResult<T>,
    {
        let mut cache = ShaderModuleCache::new(capacity);

        let mut word = [0u8; 4];
        if r.read_exact(&mut word).is_err() {
            return Ok(cache);
        }
        let version = u32::from_le_bytes(word);
        if version != FORMAT_VERSION {
            return Err(CacheError::Corrupt("unsupported cache file version"));
        }
        r.read_exact(&mut word)?;
        let entry_count = u32::from_le_bytes(word);

        for _ in 0..entry_count {
            r.read_exact(&mut word)?;
            let kind = CacheShaderKind::from_word(u32::from_le_bytes(word))?;
            r.read_exact(&mut word)?;
            let state_flags = u32::from_le_bytes(word);
            r.read_exact(&mut word)?;
            let hash_len = u32::from_le_bytes(word) as usize;
            if hash_len != 32 {
                return Err(CacheError::Corrupt("unexpected hash length"));
            }
            let mut source_hash = [0u8; 32];
            r.read_exact(&mut source_hash)?;
            r.read_exact(&mut word)?;
            let source_len = u32::from_le_bytes(word) as usize;
            let mut source_bytes = vec![0u8; source_len];
            r.read_exact(&mut source_bytes)?;
            let source = match String::from_utf8(source_bytes) {
                Ok(s) => s,
                Err(_) => continue,
            };

            match compile(&source) {
                Ok(module) => {
                    cache.tick += 1;
                    let tick = cache.tick;
                    cache.entries.insert(
                        ShaderModuleKey {
                            kind,
                            source_hash,
                            state_flags,
                        },
                        Entry {
                            module,
                            source,
                            last_access: tick,
                            use_count: 0,
                        },
                    );
                }
                Err(_) => {
                    log::warn!("skipping cache entry that failed to recompile after load");
                    continue;
                }
            }
        }
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lookup_of_same_key_is_a_hit() {
        let mut cache: ShaderModuleCache<u32> = ShaderModuleCache::new(8);
        let mut compiles = 0;
        cache
            .get_or_compile(CacheShaderKind::Vertex, "a", 0, |_| {
                compiles += 1;
                Ok(1)
            })
            .unwrap();
        cache
            .get_or_compile(CacheShaderKind::Vertex, "a", 0, |_| {
                compiles += 1;
                Ok(1)
            })
            .unwrap();
        assert_eq!(compiles, 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn hit_miss_counting_matches_scenario() {
        // spec §8 end-to-end scenario 4.
        let mut cache: ShaderModuleCache<u32> = ShaderModuleCache::new(8);
        for src in ["A", "A", "B", "A"] {
            cache
                .get_or_compile(CacheShaderKind::Vertex, src, 0, |_| Ok(1))
                .unwrap();
        }
        assert_eq!(cache.stats().compilations, 2);
        assert_eq!(cache.stats().hits, 2);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn lru_eviction_drops_earliest_key() {
        // spec §8 end-to-end scenario 5.
        let mut cache: ShaderModuleCache<u32> = ShaderModuleCache::new(2);
        cache.get_or_compile(CacheShaderKind::Vertex, "K1", 0, |_| Ok(1)).unwrap();
        cache.get_or_compile(CacheShaderKind::Vertex, "K2", 0, |_| Ok(2)).unwrap();
        cache.get_or_compile(CacheShaderKind::Vertex, "K3", 0, |_| Ok(3)).unwrap();
        assert_eq!(cache.stats().total_entries, 2);

        let mut k1_recompiled = false;
        cache
            .get_or_compile(CacheShaderKind::Vertex, "K1", 0, |_| {
                k1_recompiled = true;
                Ok(1)
            })
            .unwrap();
        assert!(k1_recompiled, "K1 should have been evicted and need recompilation");
    }

    #[test]
    fn round_trips_through_binary_persistence() {
        let mut cache: ShaderModuleCache<u32> = ShaderModuleCache::new(8);
        cache.get_or_compile(CacheShaderKind::Vertex, "vs source", 0, |_| Ok(42)).unwrap();
        cache.get_or_compile(CacheShaderKind::Fragment, "fs source", 7, |_| Ok(43)).unwrap();

        let mut buf = Vec::new();
        cache.save_to(&mut buf).unwrap();

        let mut compiled = Vec::new();
        let loaded: ShaderModuleCache<u32> = ShaderModuleCache::load_from(&buf[..], 8, |src| {
            compiled.push(src.to_string());
            Ok(99)
        })
        .unwrap();
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(compiled.len(), 2);
    }

    #[test]
    fn missing_file_loads_as_empty_cache() {
        let empty: &[u8] = &[];
        let cache: ShaderModuleCache<u32> = ShaderModuleCache::load_from(empty, 8, |_| Ok(1)).unwrap();
        assert_eq!(cache.entries.len(), 0);
    }
}
