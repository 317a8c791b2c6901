//! Coordinate to buffer-index mapping.
//!
//! Core buffer: row-major over (x, y, z), x slowest, every axis shifted by
//! +1 so the low halo at -1 lands on slot 0.
//!
//! ```text
//! index = (x+1) * core_edge² + (y+1) * core_edge + (z+1)
//! ```
//!
//! LOD buffer: six `lod_edge × lod_edge` planes, concatenated by face.
//! A 3D face coordinate is first projected onto its plane by dropping the
//! face's own axis (which must be zero).
//!
//! ```text
//! face 0,1 (x):  (0, y, z) -> (y, z)
//! face 2,3 (y):  (x, 0, z) -> (x, z)
//! face 4,5 (z):  (x, y, 0) -> (x, y)
//!
//! index = face * lod_face_count + u * lod_edge + v
//! ```
//!
//! Preconditions are checked with `debug_assert!`. With the checks compiled
//! out, an out-of-range coordinate either aliases another voxel or trips the
//! slice bounds check; coordinates are never clamped or wrapped.

use glam::{IVec2, IVec3};

use crate::tile::config::{TileDims, LOD_FACE_COUNT};

/// Whether `pos` lies in `-1..core_edge-1` on every axis
#[inline]
pub fn in_core_range(dims: &TileDims, pos: IVec3) -> bool {
    pos.cmpge(IVec3::NEG_ONE).all() && pos.cmplt(IVec3::splat(dims.core_edge - 1)).all()
}

/// Whether `pos` lies in the surface-sample region `0..surface_edge`
#[inline]
pub fn in_surface_region(dims: &TileDims, pos: IVec3) -> bool {
    pos.cmpge(IVec3::ZERO).all() && pos.cmplt(IVec3::splat(dims.surface_edge)).all()
}

/// Whether a projected face coordinate lies in `0..lod_edge`
#[inline]
pub fn in_face_range(dims: &TileDims, pos: IVec2) -> bool {
    pos.cmpge(IVec2::ZERO).all() && pos.cmplt(IVec2::splat(dims.lod_edge)).all()
}

/// Flat core-buffer index of a tile-local coordinate
#[inline]
pub fn core_index(dims: &TileDims, pos: IVec3) -> usize {
    debug_assert!(
        in_core_range(dims, pos),
        "core coordinate {pos} outside -1..{}",
        dims.core_edge - 1
    );
    let edge = dims.core_edge;
    ((pos.x + 1) * edge * edge + (pos.y + 1) * edge + (pos.z + 1)) as usize
}

/// Inverse of [`core_index`]
#[inline]
pub fn core_position(dims: &TileDims, index: usize) -> IVec3 {
    debug_assert!(index < dims.core_count);
    let edge = dims.core_edge as usize;
    IVec3::new(
        (index / (edge * edge)) as i32 - 1,
        ((index / edge) % edge) as i32 - 1,
        (index % edge) as i32 - 1,
    )
}

/// Axis (0 = x, 1 = y, 2 = z) a LOD face is perpendicular to
#[inline]
pub fn face_axis(lod: usize) -> usize {
    debug_assert!(lod < LOD_FACE_COUNT, "LOD face {lod} out of range");
    lod / 2
}

/// Project a 3D boundary coordinate onto the 2D plane of face `lod`.
pub fn project_face(dims: &TileDims, pos: IVec3, lod: usize) -> IVec2 {
    debug_assert!(lod < LOD_FACE_COUNT, "LOD face {lod} out of range");
    debug_assert!(
        pos.cmpge(IVec3::ZERO).all() && pos.cmplt(IVec3::splat(dims.lod_edge)).all(),
        "LOD coordinate {pos} outside 0..{}",
        dims.lod_edge
    );
    debug_assert!(pos.x == 0 || pos.y == 0 || pos.z == 0, "LOD coordinate {pos} is not planar");

    match face_axis(lod) {
        0 => {
            debug_assert!(pos.x == 0, "face {lod} needs x == 0, got {pos}");
            IVec2::new(pos.y, pos.z)
        }
        1 => {
            debug_assert!(pos.y == 0, "face {lod} needs y == 0, got {pos}");
            IVec2::new(pos.x, pos.z)
        }
        2 => {
            debug_assert!(pos.z == 0, "face {lod} needs z == 0, got {pos}");
            IVec2::new(pos.x, pos.y)
        }
        _ => panic!("LOD face {lod} out of range"),
    }
}

/// Flat LOD-buffer index of a projected face coordinate
#[inline]
pub fn lod_index(dims: &TileDims, pos: IVec2, lod: usize) -> usize {
    debug_assert!(lod < LOD_FACE_COUNT, "LOD face {lod} out of range");
    debug_assert!(
        in_face_range(dims, pos),
        "face coordinate {pos} outside 0..{}",
        dims.lod_edge
    );
    // Release builds: a bad face or coordinate lands past the buffer end and
    // panics at the slice bounds check, before the caller touches any state.
    lod * dims.lod_face_count + (pos.x * dims.lod_edge + pos.y) as usize
}
