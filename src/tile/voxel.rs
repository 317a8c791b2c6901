//! Voxel values stored in a tile

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Value type a tile can cache.
///
/// The accessor only needs equality (to report changes) and a signed
/// interpolation indicator: `>= 0` is inside material, `< 0` is outside.
pub trait TileVoxel: Clone + Default + PartialEq + Send + Sync {
    /// Signed density indicator. `Default` must be the zero threshold.
    type Interpolation: PartialOrd + Default;

    fn interpolation(&self) -> Self::Interpolation;

    /// Inside material (`interpolation >= 0`)
    #[inline]
    fn is_inside(&self) -> bool {
        self.interpolation() >= Self::Interpolation::default()
    }
}

impl TileVoxel for i8 {
    type Interpolation = i8;

    #[inline]
    fn interpolation(&self) -> i8 {
        *self
    }
}

impl TileVoxel for f32 {
    type Interpolation = f32;

    #[inline]
    fn interpolation(&self) -> f32 {
        *self
    }
}

/// Quantized density sample with a material id - exactly 2 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct Density {
    /// Signed density, -127 (fully outside) to 127 (fully inside)
    pub interpolation: i8,
    /// Material ID
    pub material: u8,
}

impl Density {
    /// Fully outside, no material
    pub const EMPTY: Density = Density {
        interpolation: -127,
        material: 0,
    };

    /// Fully inside, material 0
    pub const FULL: Density = Density {
        interpolation: 127,
        material: 0,
    };

    pub fn new(interpolation: i8, material: u8) -> Self {
        Self { interpolation, material }
    }

    /// Quantize a float density in `[-1, 1]` (values outside are clamped)
    pub fn from_f32(density: f32, material: u8) -> Self {
        Self {
            interpolation: (density * 127.0).clamp(-127.0, 127.0).round() as i8,
            material,
        }
    }
}

impl Default for Density {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl TileVoxel for Density {
    type Interpolation = i8;

    #[inline]
    fn interpolation(&self) -> i8 {
        self.interpolation
    }
}
