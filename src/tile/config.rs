//! Tile sizing derived from a single `voxels_per_tile` input.
//!
//! ```text
//! axis coordinate:  -1 | 0 1 2 ... vpt | vpt+1
//!                   halo  surface grid    halo
//! buffer slot:       0 | 1 2 3 ... vpt+1 | vpt+2
//! ```
//!
//! The low halo and the high halo voxel exist for normal correction at tile
//! borders. LOD face buffers sample the tile boundary at twice the surface
//! resolution.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::tile::voxel::TileVoxel;

/// Default edge length of a tile's surface grid
pub const DEFAULT_VOXELS_PER_TILE: i32 = 16;

/// Number of LOD face buffers (two per axis)
pub const LOD_FACE_COUNT: usize = 6;

/// Every size the accessor and its collaborators need, computed once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TileDimsDef", into = "TileDimsDef")]
pub struct TileDims {
    /// Logical edge length of the tile surface grid
    pub voxels_per_tile: i32,
    /// Edge of the dense core buffer (surface grid + halo)
    pub core_edge: i32,
    /// Edge of one 2D LOD face buffer
    pub lod_edge: i32,
    /// Voxels in the core buffer
    pub core_count: usize,
    /// Voxels in one LOD face buffer
    pub lod_face_count: usize,
    /// Voxels across all six LOD face buffers
    pub lod_total_count: usize,
    /// Edge of the surface-sample region (no halo)
    pub surface_edge: i32,
    /// Voxels in the surface-sample region
    pub surface_count: usize,
}

impl TileDims {
    pub const fn new(voxels_per_tile: i32) -> Self {
        assert!(voxels_per_tile > 0, "voxels_per_tile must be positive");

        let core_edge = voxels_per_tile + 3;
        let lod_edge = (voxels_per_tile + 1) * 2;
        let surface_edge = voxels_per_tile + 1;
        let lod_face_count = (lod_edge * lod_edge) as usize;

        Self {
            voxels_per_tile,
            core_edge,
            lod_edge,
            core_count: (core_edge * core_edge * core_edge) as usize,
            lod_face_count,
            lod_total_count: LOD_FACE_COUNT * lod_face_count,
            surface_edge,
            surface_count: (surface_edge * surface_edge * surface_edge) as usize,
        }
    }
}

impl Default for TileDims {
    fn default() -> Self {
        Self::new(DEFAULT_VOXELS_PER_TILE)
    }
}

// Only the input is serialized; everything else is rederived on load.
#[derive(Serialize, Deserialize)]
struct TileDimsDef {
    voxels_per_tile: i32,
}

impl TryFrom<TileDimsDef> for TileDims {
    type Error = String;

    fn try_from(def: TileDimsDef) -> Result<Self, Self::Error> {
        if def.voxels_per_tile <= 0 {
            return Err(format!("voxels_per_tile must be positive, got {}", def.voxels_per_tile));
        }
        Ok(Self::new(def.voxels_per_tile))
    }
}

impl From<TileDims> for TileDimsDef {
    fn from(dims: TileDims) -> Self {
        Self { voxels_per_tile: dims.voxels_per_tile }
    }
}

/// Compile-time tile configuration.
pub trait TileConfig: 'static {
    /// Voxel value stored in the tile buffers
    type Voxel: TileVoxel;

    /// Edge length of the tile surface grid
    const VOXELS_PER_TILE: i32;

    /// Derived sizes; do not override.
    const DIMS: TileDims = TileDims::new(Self::VOXELS_PER_TILE);
}

/// Zero-sized [`TileConfig`] for a voxel type and tile size.
///
/// ```
/// use terratile::tile::{Config, Density, TileAccessor};
///
/// let tile = TileAccessor::<Config<Density, 4>>::create();
/// assert!(tile.is_empty());
/// ```
pub struct Config<V, const N: i32>(PhantomData<fn() -> V>);

impl<V: TileVoxel + 'static, const N: i32> TileConfig for Config<V, N> {
    type Voxel = V;
    const VOXELS_PER_TILE: i32 = N;
}
