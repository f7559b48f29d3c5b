//! Painted land/water masks.
//!
//! A mask image replaces the noise signal as the source of the coastline: any
//! pixel whose blue channel beats its green channel is water, everything else is
//! land whose height comes from the green channel. Peaks still add relief on
//! top of painted land.

use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, RgbImage};

use crate::mesh::WORLD_SIZE;

/// Where the base elevation signal comes from.
#[derive(Clone, Default)]
pub enum ElevationSource {
    /// Fractal simplex noise
    #[default]
    Noise,
    /// A painted land/water image stretched over the world
    Mask(Arc<LandMask>),
}

impl ElevationSource {
    pub fn mask(mask: LandMask) -> Self {
        ElevationSource::Mask(Arc::new(mask))
    }
}

impl std::fmt::Debug for ElevationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElevationSource::Noise => write!(f, "Noise"),
            ElevationSource::Mask(m) => write!(f, "Mask({}x{})", m.width(), m.height()),
        }
    }
}

/// Classification of one mask pixel
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaskSample {
    Water,
    /// Land with base intensity `(green / 255)²`
    Land(f64),
}

pub struct LandMask {
    image: RgbImage,
}

impl LandMask {
    /// Fails on an image with no pixels.
    pub fn from_image(image: DynamicImage) -> Result<Self, ConstraintError> {
        let image = image.to_rgb8();
        if image.width() == 0 || image.height() == 0 {
            return Err(ConstraintError::EmptyImage);
        }
        Ok(Self { image })
    }

    pub fn from_image_path<P: AsRef<Path>>(path: P) -> Result<Self, ConstraintError> {
        let mask = Self::from_image(image::open(path)?)?;
        log::info!("loaded land mask {}x{}", mask.width(), mask.height());
        Ok(mask)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Classify the pixel under a world coordinate, clamped to the image.
    pub fn sample(&self, x: f64, y: f64) -> MaskSample {
        let w = self.image.width();
        let h = self.image.height();
        let ix = ((x / WORLD_SIZE) * w as f64).floor().clamp(0.0, w.saturating_sub(1) as f64) as u32;
        let iy = ((y / WORLD_SIZE) * h as f64).floor().clamp(0.0, h.saturating_sub(1) as f64) as u32;
        let [_, green, blue] = self.image.get_pixel(ix, iy).0;
        if blue > green {
            MaskSample::Water
        } else {
            let g = green as f64 / 255.0;
            MaskSample::Land(g * g)
        }
    }

    /// Share of pixels painted as land.
    pub fn land_fraction(&self) -> f64 {
        let total = (self.image.width() * self.image.height()) as f64;
        let land = self.image.pixels().filter(|p| p.0[2] <= p.0[1]).count() as f64;
        land / total.max(1.0)
    }
}

/// Errors from loading a mask image
#[derive(Debug)]
pub enum ConstraintError {
    Image(image::ImageError),
    EmptyImage,
}

impl std::fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintError::Image(e) => write!(f, "mask image error: {}", e),
            ConstraintError::EmptyImage => write!(f, "mask image has no pixels"),
        }
    }
}

impl std::error::Error for ConstraintError {}

impl From<image::ImageError> for ConstraintError {
    fn from(e: image::ImageError) -> Self {
        ConstraintError::Image(e)
    }
}
