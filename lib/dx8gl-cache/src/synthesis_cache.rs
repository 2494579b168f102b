//! Memoizes fixed-function shader synthesis on its configuration (spec
//! §4.8: "cached on the configuration itself so repeated configurations
//! reuse the shader pair").

use std::collections::HashMap;
use std::hash::Hash;

/// A plain memoizing map from a `Hash + Eq` configuration to whatever the
/// synthesizer produced for it. Generic over the value so it can hold
/// either target's `ShaderPair`.
pub struct SynthesisCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash + Clone, V: Clone> SynthesisCache<K, V> {
    pub fn new() -> Self {
        SynthesisCache {
            entries: HashMap::new(),
        }
    }

    pub fn get_or_synthesize<F>(&mut self, config: K, synthesize: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        if let Some(existing) = self.entries.get(&config) {
            return existing.clone();
        }
        let pair = synthesize(&config);
        self.entries.insert(config, pair.clone());
        pair
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for SynthesisCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_config_reuses_synthesis() {
        let mut cache: SynthesisCache<u32, String> = SynthesisCache::new();
        let mut syntheses = 0;
        for _ in 0..3 {
            cache.get_or_synthesize(7, |_| {
                syntheses += 1;
                "shader".to_string()
            });
        }
        assert_eq!(syntheses, 1);
        assert_eq!(cache.len(), 1);
    }
}
