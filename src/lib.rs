//! Terratile - per-tile voxel caches for transvoxel terrain meshing
//!
//! A [`tile::TileAccessor`] holds every voxel sample the surface extractor
//! needs for one terrain tile: the dense core grid with its normal-correction
//! halo, and optional half-resolution face planes for stitching against
//! neighbours at another level of detail.

pub mod core;
pub mod tile;
