//! Seed management for map generation
//!
//! Every randomised system gets its own seed derived from one master seed, so
//! the lattice can stay fixed while the terrain changes, or the other way round.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Seeds for the randomised parts of map generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Simplex noise permutation for the base elevation signal
    pub noise: u64,
    /// Peak positions, amplitudes and widths
    pub peaks: u64,
    /// Lattice jitter of generated meshes
    pub mesh: u64,
}

impl WorldSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            noise: derive_seed(master, "noise"),
            peaks: derive_seed(master, "peaks"),
            mesh: derive_seed(master, "mesh"),
        }
    }

    /// Create a builder for customizing individual seeds
    pub fn builder(master: u64) -> WorldSeedsBuilder {
        WorldSeedsBuilder { seeds: Self::from_master(master) }
    }
}

/// Builder for overriding individual seeds while deriving the others from master
pub struct WorldSeedsBuilder {
    seeds: WorldSeeds,
}

impl WorldSeedsBuilder {
    pub fn noise(mut self, seed: u64) -> Self {
        self.seeds.noise = seed;
        self
    }

    pub fn peaks(mut self, seed: u64) -> Self {
        self.seeds.peaks = seed;
        self
    }

    pub fn mesh(mut self, seed: u64) -> Self {
        self.seeds.mesh = seed;
        self
    }

    pub fn build(self) -> WorldSeeds {
        self.seeds
    }
}

/// Derive a sub-seed by hashing the master seed together with a system name.
fn derive_seed(master: u64, system: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    system.hash(&mut hasher);
    hasher.finish()
}

impl std::fmt::Display for WorldSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WorldSeeds {{ master: {}, noise: {}, peaks: {}, mesh: {} }}",
            self.master, self.noise, self.peaks, self.mesh
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_derivation() {
        let a = WorldSeeds::from_master(12345);
        let b = WorldSeeds::from_master(12345);
        assert_eq!(a, b);
    }

    #[test]
    fn test_systems_get_different_seeds() {
        let seeds = WorldSeeds::from_master(12345);
        assert_ne!(seeds.noise, seeds.peaks);
        assert_ne!(seeds.peaks, seeds.mesh);
    }

    #[test]
    fn test_builder_override() {
        let seeds = WorldSeeds::builder(12345).peaks(99999).build();
        assert_eq!(seeds.peaks, 99999);
        assert_eq!(seeds.noise, WorldSeeds::from_master(12345).noise);
    }
}
