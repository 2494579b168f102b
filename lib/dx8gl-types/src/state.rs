use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Primitive topology, one field of the pipeline state (spec §3 "Pipeline
/// cache entry").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    TriangleFan,
    LineList,
    LineStrip,
    PointList,
}

/// The render-state fields that fold into the 64-bit pipeline state hash:
/// blend, depth, stencil, rasterizer, vertex-layout, primitive-topology.
/// Two states that behave identically must hash identically (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineStateDescriptor {
    pub blend_enabled: bool,
    pub blend_src_factor: u8,
    pub blend_dst_factor: u8,
    pub depth_test_enabled: bool,
    pub depth_write_enabled: bool,
    pub depth_compare: u8,
    /// Scaled depth bias (spec §9 open question on `D3DRS_ZBIAS`); resolved
    /// in DESIGN.md as a fixed-point value scaled by `1.0 / 16.0` per unit.
    pub depth_bias: i32,
    pub stencil_enabled: bool,
    pub stencil_ref: u8,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub cull_mode: u8,
    pub fill_mode: u8,
    pub vertex_stride: u32,
    pub vertex_attrib_formats: Vec<u8>,
    pub topology: PrimitiveTopology,
}

impl PipelineStateDescriptor {
    /// A 64-bit fingerprint used as (part of) the pipeline cache key.
    /// `std::hash::Hash` over every field already satisfies "identical
    /// behavior implies identical hash" because the descriptor contains
    /// exactly the fields the spec lists and nothing incidental (no
    /// pointers, no timestamps).
    pub fn state_hash(&self) -> u64 {
        let mut hasher = fxhash_like_hasher();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// A small FNV-1a hasher. Avoids pulling in a hashing crate for a single
/// fold-a-struct-into-u64 use; deterministic across runs and platforms,
/// which `std`'s `RandomState`-backed `DefaultHasher` is not guaranteed to
/// be (and must not be, since the hash is persisted in the pipeline cache
/// key and compared across cache loads).
struct Fnv1a(u64);

impl Hasher for Fnv1a {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        const PRIME: u64 = 0x100000001b3;
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(PRIME);
        }
    }
}

fn fxhash_like_hasher() -> Fnv1a {
    Fnv1a(0xcbf29ce484222325)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PipelineStateDescriptor {
        PipelineStateDescriptor {
            blend_enabled: false,
            blend_src_factor: 0,
            blend_dst_factor: 0,
            depth_test_enabled: true,
            depth_write_enabled: true,
            depth_compare: 1,
            depth_bias: 0,
            stencil_enabled: false,
            stencil_ref: 0,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
            cull_mode: 0,
            fill_mode: 0,
            vertex_stride: 32,
            vertex_attrib_formats: vec![0, 1, 2],
            topology: PrimitiveTopology::TriangleList,
        }
    }

    #[test]
    fn identical_states_hash_identically() {
        assert_eq!(base().state_hash(), base().state_hash());
    }

    #[test]
    fn differing_states_hash_differently() {
        let mut other = base();
        other.cull_mode = 1;
        assert_ne!(base().state_hash(), other.state_hash());
    }
}
