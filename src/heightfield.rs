//! Procedural elevation: fractal simplex noise shaped by a lattice of peaks.
//!
//! The noise sum decides land and water. Where it is positive, two shapes
//! derived from the peak lattice are mixed in: sharp cones ("mountains") that
//! take over as the base approaches 1, and narrow bumps ("hills") that matter
//! most around a base of 0.5.

use noise::{NoiseFn, Simplex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::constraints::{ElevationSource, MaskSample};
use crate::mesh::WORLD_SIZE;
use crate::seeds::WorldSeeds;

// =============================================================================
// BASE SIGNAL
// =============================================================================

/// (weight, frequency, phase offset) per octave
const OCTAVES: [(f64, f64, f64); 4] = [
    (0.75, 1.0, 0.0),
    (0.5, 2.0, 5.0),
    (0.125, 4.0, 7.0),
    (0.0625, 8.0, 9.0),
];

// =============================================================================
// BLEND CONSTANTS
// =============================================================================

const BASE_WEIGHT: f64 = 2.0;
const HILL_SHARPNESS: f64 = 3000.0;
const HILL_FLOOR: f64 = 0.3;

/// Peak lattice covers [-PEAK_EXTENT, PEAK_EXTENT]² in normalized coordinates
const PEAK_EXTENT: f64 = 0.9;

/// Base elevation of water pixels in a land mask
const MASK_WATER_BASE: f64 = -0.1;
/// Lowest elevation a land pixel may get, so painted land never turns to water
const MASK_MIN_LAND: f64 = 1.0 / 256.0;

/// A mountain/hill generator in normalized [-1, 1] coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Peak {
    pub x: f64,
    pub y: f64,
    /// Mountain amplitude
    pub zm: f64,
    /// Hill amplitude
    pub zh: f64,
    /// Mountain falloff (cone slope)
    pub wm: f64,
    /// Hill width; the hill bump currently uses a fixed sharpness
    pub wh: f64,
}

/// Place peaks on a staggered lattice with jittered positions and amplitudes.
///
/// Rows run from -0.9 to 0.9; every other row is shifted by half a step.
/// Falloff widths grow towards the bottom of the map.
pub fn generate_peaks(seed: u64, spacing: f64) -> Vec<Peak> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut jitter = move || rng.gen::<f64>() - rng.gen::<f64>();

    let steps = (2.0 * PEAK_EXTENT / spacing + 1e-9).floor() as usize;
    let mut peaks = Vec::with_capacity((steps + 1) * (steps + 1));
    let mut offset = 0.0;
    for row in 0..=steps {
        let y = -PEAK_EXTENT + row as f64 * spacing;
        offset = if offset > 0.0 { 0.0 } else { spacing / 2.0 };
        let mut col = 0;
        loop {
            let x = -PEAK_EXTENT + offset + col as f64 * spacing;
            if x > PEAK_EXTENT + 1e-9 {
                break;
            }
            peaks.push(Peak {
                x: x + jitter() * spacing,
                y: y + jitter() * spacing,
                zm: 1.0 + jitter() * 0.2,
                zh: 1.0 + jitter() * 0.2,
                wm: 20.0 + 3.0 * y,
                wh: 40.0 + 10.0 * y,
            });
            col += 1;
        }
    }
    peaks
}

/// Deterministic elevation function over world coordinates.
pub struct HeightField {
    noise: Simplex,
    peaks: Vec<Peak>,
    source: ElevationSource,
}

impl HeightField {
    pub fn new(noise_seed: u64, peaks: Vec<Peak>, source: ElevationSource) -> Self {
        Self {
            noise: Simplex::new(noise_seed as u32),
            peaks,
            source,
        }
    }

    pub fn from_seeds(seeds: &WorldSeeds, peak_spacing: f64, source: ElevationSource) -> Self {
        Self::new(seeds.noise, generate_peaks(seeds.peaks, peak_spacing), source)
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// Elevation in [-1, 1] at a world coordinate in [0, 1000]².
    pub fn elevation(&self, x: f64, y: f64) -> f64 {
        let half = WORLD_SIZE / 2.0;
        let nx = (x - half) / half;
        let ny = (y - half) / half;

        let e = match &self.source {
            ElevationSource::Noise => {
                let base = self.base(nx, ny);
                if base <= 0.0 {
                    base
                } else {
                    self.blend(base, nx, ny)
                }
            }
            ElevationSource::Mask(mask) => match mask.sample(x, y) {
                MaskSample::Water => MASK_WATER_BASE,
                MaskSample::Land(intensity) => self.blend(intensity, nx, ny).max(MASK_MIN_LAND),
            },
        };
        e.clamp(-1.0, 1.0)
    }

    /// Four-octave simplex sum at normalized coordinates.
    pub fn base(&self, nx: f64, ny: f64) -> f64 {
        OCTAVES
            .iter()
            .map(|&(weight, freq, phase)| {
                weight * self.noise.get([nx * freq + phase, ny * freq + phase])
            })
            .sum()
    }

    /// Mix peak shapes into a positive base value.
    pub fn blend(&self, base: f64, nx: f64, ny: f64) -> f64 {
        let mut em: f64 = 0.0;
        let mut eh: f64 = 0.0;
        for peak in &self.peaks {
            let d2 = (peak.x - nx) * (peak.x - nx) + (peak.y - ny) * (peak.y - ny);
            let mountain = 1.0 - peak.wm * d2.sqrt();
            let hill = ((-d2 * HILL_SHARPNESS).exp().sqrt() - HILL_FLOOR).max(0.0);
            em = em.max(peak.zm * mountain);
            eh = eh.max(peak.zh * hill);
        }

        let wm = 2.0 * base * base;
        let wh = 0.5 * (0.5 - (0.5 - base).abs());
        (BASE_WEIGHT * base + wh * eh + wm * em) / (BASE_WEIGHT + wh + wm)
    }
}
