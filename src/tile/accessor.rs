//! Per-tile voxel cache feeding surface extraction.
//!
//! A [`TileAccessor`] owns every voxel the surface extractor reads for one
//! tile: a dense core buffer with a one-voxel halo for normal correction, and
//! (when LOD stitching is enabled) six half-resolution face planes for
//! transvoxel seams. See [`crate::tile::index`] for the coordinate mapping.
//!
//! The two inside-voxel counters let the extractor skip uniform tiles. They
//! are maintained incrementally on writes and only ever go up: rewriting an
//! inside voxel counts it again, and overwriting it with an outside value
//! does not decrement. Bulk fills resync them with
//! [`TileAccessor::resync_counters`] or the raw setters.
//!
//! Accessors are not synchronized; one thread owns a tile at a time.

use std::fmt;

use glam::{IVec2, IVec3};
use rayon::prelude::*;

use crate::tile::config::{TileConfig, TileDims, LOD_FACE_COUNT};
use crate::tile::index::{core_index, core_position, in_surface_region, lod_index, project_face};
use crate::tile::voxel::TileVoxel;

/// Voxel cache for one tile
pub struct TileAccessor<C: TileConfig> {
    /// Core voxels, `core_count` entries, halo included
    voxels: Box<[C::Voxel]>,
    /// Six LOD face planes; present iff LOD mode is enabled
    voxels_lod: Option<Box<[C::Voxel]>>,
    /// Inside writes within the surface-sample region
    num_voxel_larger_zero: u32,
    /// Inside writes to the LOD faces
    num_voxel_larger_zero_lod: u32,
}

impl<C: TileConfig> TileAccessor<C> {
    /// Create an accessor with a default-initialized core buffer, LOD mode
    /// off and both counters at zero.
    pub fn create() -> Box<Self> {
        Box::new(Self {
            voxels: vec![C::Voxel::default(); C::DIMS.core_count].into_boxed_slice(),
            voxels_lod: None,
            num_voxel_larger_zero: 0,
            num_voxel_larger_zero_lod: 0,
        })
    }

    /// Sizes of this tile configuration
    #[inline]
    pub fn dims(&self) -> TileDims {
        C::DIMS
    }

    /// Store a core voxel.
    ///
    /// `pos` must lie in `-1..core_edge-1` on every axis. Returns true if the
    /// stored value changed.
    pub fn set_voxel(&mut self, pos: IVec3, voxel: C::Voxel) -> bool {
        let index = core_index(&C::DIMS, pos);
        let counted = voxel.is_inside() && in_surface_region(&C::DIMS, pos);

        let changed = self.voxels[index] != voxel;
        self.voxels[index] = voxel;

        if counted {
            self.num_voxel_larger_zero = self.num_voxel_larger_zero.saturating_add(1);
        }
        changed
    }

    /// Core voxel at `pos` (`-1..core_edge-1` on every axis)
    #[inline]
    pub fn voxel(&self, pos: IVec3) -> &C::Voxel {
        &self.voxels[core_index(&C::DIMS, pos)]
    }

    /// Store a LOD voxel given in 3D boundary coordinates of face `lod`.
    pub fn set_voxel_lod(&mut self, pos: IVec3, voxel: C::Voxel, lod: usize) -> bool {
        self.set_voxel_lod_planar(project_face(&C::DIMS, pos, lod), voxel, lod)
    }

    /// LOD voxel at 3D boundary coordinate `pos` of face `lod`
    pub fn voxel_lod(&self, pos: IVec3, lod: usize) -> &C::Voxel {
        self.voxel_lod_planar(project_face(&C::DIMS, pos, lod), lod)
    }

    /// Store a LOD voxel given in projected face coordinates.
    ///
    /// Every inside write is counted; LOD faces have no halo.
    pub fn set_voxel_lod_planar(&mut self, pos: IVec2, voxel: C::Voxel, lod: usize) -> bool {
        let index = lod_index(&C::DIMS, pos, lod);
        let counted = voxel.is_inside();

        let buffer = self.lod_buffer_mut();
        let changed = buffer[index] != voxel;
        buffer[index] = voxel;

        if counted {
            self.num_voxel_larger_zero_lod = self.num_voxel_larger_zero_lod.saturating_add(1);
        }
        changed
    }

    /// LOD voxel at projected face coordinate `pos` of face `lod`
    pub fn voxel_lod_planar(&self, pos: IVec2, lod: usize) -> &C::Voxel {
        &self.lod_buffer()[lod_index(&C::DIMS, pos, lod)]
    }

    /// No inside voxel was written to the surface region
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_voxel_larger_zero == 0
    }

    /// Inside writes equal the surface region size
    #[inline]
    pub fn is_full(&self) -> bool {
        self.num_voxel_larger_zero as usize == C::DIMS.surface_count
    }

    /// Whether LOD face buffers are allocated for seam stitching
    #[inline]
    pub fn calculate_lod(&self) -> bool {
        self.voxels_lod.is_some()
    }

    /// Enable or disable LOD stitching.
    ///
    /// Enabling allocates all six face buffers, disabling frees them. Setting
    /// the current mode again does nothing.
    pub fn set_calculate_lod(&mut self, enable: bool) {
        if self.calculate_lod() == enable {
            return;
        }

        if enable {
            self.voxels_lod =
                Some(vec![C::Voxel::default(); C::DIMS.lod_total_count].into_boxed_slice());
            log::debug!(
                "Allocated LOD face buffers: {} faces x {} voxels",
                LOD_FACE_COUNT,
                C::DIMS.lod_face_count
            );
        } else {
            self.voxels_lod = None;
            log::debug!("Released LOD face buffers");
        }
    }

    /// Inside writes counted in the surface region, saturating at `u32::MAX`
    #[inline]
    pub fn num_voxel_larger_zero(&self) -> u32 {
        self.num_voxel_larger_zero
    }

    /// Inside writes counted on the LOD faces, saturating at `u32::MAX`
    #[inline]
    pub fn num_voxel_larger_zero_lod(&self) -> u32 {
        self.num_voxel_larger_zero_lod
    }

    /// Overwrite the core counter after an external bulk fill. Not validated.
    pub fn set_num_voxel_larger_zero(&mut self, count: u32) {
        self.num_voxel_larger_zero = count;
    }

    /// Overwrite the LOD counter after an external bulk fill. Not validated.
    pub fn set_num_voxel_larger_zero_lod(&mut self, count: u32) {
        self.num_voxel_larger_zero_lod = count;
    }

    /// Whole core buffer in index order
    pub fn voxel_array(&self) -> &[C::Voxel] {
        &self.voxels
    }

    /// Whole core buffer for bulk writes; counters are not updated
    pub fn voxel_array_mut(&mut self) -> &mut [C::Voxel] {
        &mut self.voxels
    }

    /// All six LOD faces, or `None` when LOD mode is off
    pub fn voxel_array_lod(&self) -> Option<&[C::Voxel]> {
        self.voxels_lod.as_deref()
    }

    /// All six LOD faces for bulk writes, or `None` when LOD mode is off
    pub fn voxel_array_lod_mut(&mut self) -> Option<&mut [C::Voxel]> {
        self.voxels_lod.as_deref_mut()
    }

    /// Inside voxels currently stored in the surface region
    pub fn count_inside(&self) -> u32 {
        let dims = &C::DIMS;
        let voxels: &[C::Voxel] = &self.voxels;
        (0..dims.surface_edge)
            .into_par_iter()
            .map(|x| {
                let mut count = 0u32;
                for y in 0..dims.surface_edge {
                    for z in 0..dims.surface_edge {
                        if voxels[core_index(dims, IVec3::new(x, y, z))].is_inside() {
                            count += 1;
                        }
                    }
                }
                count
            })
            .sum()
    }

    /// Inside voxels currently stored across all LOD faces (0 when off)
    pub fn count_inside_lod(&self) -> u32 {
        self.voxels_lod
            .as_deref()
            .map(|lod| lod.par_iter().filter(|v| v.is_inside()).count() as u32)
            .unwrap_or(0)
    }

    /// Recompute both counters from buffer contents.
    pub fn resync_counters(&mut self) {
        self.num_voxel_larger_zero = self.count_inside();
        self.num_voxel_larger_zero_lod = self.count_inside_lod();
    }

    /// Fill the whole core buffer, halo included, from `sample` and resync
    /// the core counter. Slabs of constant x are sampled in parallel.
    pub fn populate<F>(&mut self, sample: F)
    where
        F: Fn(IVec3) -> C::Voxel + Sync,
    {
        let dims = &C::DIMS;
        let slab_len = (dims.core_edge * dims.core_edge) as usize;

        self.voxels
            .par_chunks_mut(slab_len)
            .enumerate()
            .for_each(|(slab, voxels)| {
                let base = slab * slab_len;
                for (i, voxel) in voxels.iter_mut().enumerate() {
                    *voxel = sample(core_position(dims, base + i));
                }
            });

        self.num_voxel_larger_zero = self.count_inside();
        log::debug!(
            "Populated {} core voxels, {} inside the surface region",
            dims.core_count,
            self.num_voxel_larger_zero
        );
    }

    /// Fill all six LOD faces from `sample(face, planar_pos)` and resync the
    /// LOD counter. LOD mode must be enabled.
    pub fn populate_lod<F>(&mut self, sample: F)
    where
        F: Fn(usize, IVec2) -> C::Voxel + Sync,
    {
        let dims = &C::DIMS;
        let edge = dims.lod_edge as usize;

        self.lod_buffer_mut()
            .par_chunks_mut(dims.lod_face_count)
            .enumerate()
            .for_each(|(lod, face)| {
                for (i, voxel) in face.iter_mut().enumerate() {
                    *voxel = sample(lod, IVec2::new((i / edge) as i32, (i % edge) as i32));
                }
            });

        self.num_voxel_larger_zero_lod = self.count_inside_lod();
        log::debug!(
            "Populated {} LOD voxels, {} inside",
            dims.lod_total_count,
            self.num_voxel_larger_zero_lod
        );
    }

    fn lod_buffer(&self) -> &[C::Voxel] {
        match self.voxels_lod.as_deref() {
            Some(buffer) => buffer,
            None => panic!("LOD voxel accessed while LOD mode is disabled"),
        }
    }

    fn lod_buffer_mut(&mut self) -> &mut [C::Voxel] {
        match self.voxels_lod.as_deref_mut() {
            Some(buffer) => buffer,
            None => panic!("LOD voxel accessed while LOD mode is disabled"),
        }
    }
}

impl<C: TileConfig> fmt::Debug for TileAccessor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileAccessor")
            .field("voxels_per_tile", &C::DIMS.voxels_per_tile)
            .field("calculate_lod", &self.calculate_lod())
            .field("num_voxel_larger_zero", &self.num_voxel_larger_zero)
            .field("num_voxel_larger_zero_lod", &self.num_voxel_larger_zero_lod)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::logging;
    use crate::tile::config::Config;
    use crate::tile::voxel::Density;

    type Tile4 = Config<Density, 4>;

    const INSIDE: Density = Density { interpolation: 10, material: 1 };
    const OUTSIDE: Density = Density { interpolation: -10, material: 1 };

    #[test]
    fn test_create() {
        let tile = TileAccessor::<Tile4>::create();
        assert!(tile.is_empty());
        assert!(!tile.is_full());
        assert!(!tile.calculate_lod());
        assert!(tile.voxel_array_lod().is_none());
        assert_eq!(tile.num_voxel_larger_zero(), 0);
        assert_eq!(tile.num_voxel_larger_zero_lod(), 0);
        assert_eq!(tile.voxel_array().len(), 343);
        assert!(tile.voxel_array().iter().all(|v| *v == Density::EMPTY));
    }

    #[test]
    fn test_set_get_round_trip_everywhere() {
        let mut tile = TileAccessor::<Tile4>::create();
        for x in -1..6 {
            for y in -1..6 {
                for z in -1..6 {
                    let voxel = Density::new((x * 7 + y * 3 - z) as i8, (x + 1) as u8);
                    tile.set_voxel(IVec3::new(x, y, z), voxel);
                }
            }
        }
        for x in -1..6 {
            for y in -1..6 {
                for z in -1..6 {
                    let voxel = Density::new((x * 7 + y * 3 - z) as i8, (x + 1) as u8);
                    assert_eq!(*tile.voxel(IVec3::new(x, y, z)), voxel);
                }
            }
        }
    }

    #[test]
    fn test_set_voxel_reports_change() {
        let mut tile = TileAccessor::<Tile4>::create();
        let pos = IVec3::new(1, 2, 3);
        assert!(tile.set_voxel(pos, INSIDE));
        assert!(!tile.set_voxel(pos, INSIDE));
        assert!(tile.set_voxel(pos, OUTSIDE));
        assert!(!tile.set_voxel(IVec3::ZERO, Density::EMPTY));
    }

    #[test]
    fn test_inside_rewrite_counts_again() {
        let mut tile = TileAccessor::<Tile4>::create();
        let pos = IVec3::new(2, 2, 2);

        tile.set_voxel(pos, INSIDE);
        assert_eq!(tile.num_voxel_larger_zero(), 1);
        assert!(!tile.is_empty());

        tile.set_voxel(pos, INSIDE);
        assert_eq!(tile.num_voxel_larger_zero(), 2);

        // outside never decrements
        tile.set_voxel(pos, OUTSIDE);
        assert_eq!(tile.num_voxel_larger_zero(), 2);

        // zero interpolation counts as inside
        tile.set_voxel(pos, Density::new(0, 0));
        assert_eq!(tile.num_voxel_larger_zero(), 3);
    }

    #[test]
    fn test_halo_writes_not_counted() {
        let mut tile = TileAccessor::<Tile4>::create();
        let halo = [
            IVec3::new(-1, 0, 0),
            IVec3::new(0, -1, 2),
            IVec3::new(3, 3, -1),
            IVec3::new(5, 0, 0),
            IVec3::new(0, 5, 0),
            IVec3::new(4, 4, 5),
            IVec3::NEG_ONE,
            IVec3::splat(5),
        ];
        for pos in halo {
            assert!(tile.set_voxel(pos, INSIDE));
        }
        assert_eq!(tile.num_voxel_larger_zero(), 0);
        assert!(tile.is_empty());
    }

    #[test]
    fn test_is_full_exactly_at_surface_count() {
        let mut tile = TileAccessor::<Tile4>::create();
        let mut written = 0;
        for x in 0..5 {
            for y in 0..5 {
                for z in 0..5 {
                    if written == 124 {
                        assert!(!tile.is_full());
                    }
                    tile.set_voxel(IVec3::new(x, y, z), Density::FULL);
                    written += 1;
                }
            }
        }
        assert_eq!(tile.num_voxel_larger_zero(), 125);
        assert!(tile.is_full());
        assert!(!tile.is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn test_set_voxel_out_of_range() {
        let mut tile = TileAccessor::<Tile4>::create();
        tile.set_voxel(IVec3::new(0, 0, 6), INSIDE);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn test_get_voxel_out_of_range() {
        let tile = TileAccessor::<Tile4>::create();
        tile.voxel(IVec3::new(-2, 0, 0));
    }

    #[test]
    fn test_calculate_lod_toggle() {
        logging::init_for_tests();
        let mut tile = TileAccessor::<Tile4>::create();

        tile.set_calculate_lod(true);
        assert!(tile.calculate_lod());
        let ptr = tile.voxel_array_lod().map(|lod| lod.as_ptr());
        assert_eq!(tile.voxel_array_lod().map(|lod| lod.len()), Some(600));

        tile.set_voxel_lod(IVec3::new(0, 1, 1), INSIDE, 0);
        tile.set_calculate_lod(true);
        assert_eq!(tile.voxel_array_lod().map(|lod| lod.as_ptr()), ptr);
        assert_eq!(tile.num_voxel_larger_zero_lod(), 1);
        assert_eq!(*tile.voxel_lod(IVec3::new(0, 1, 1), 0), INSIDE);

        tile.set_calculate_lod(false);
        assert!(!tile.calculate_lod());
        assert!(tile.voxel_array_lod().is_none());

        tile.set_calculate_lod(false);
        assert!(tile.voxel_array_lod().is_none());

        tile.set_calculate_lod(true);
        assert!(tile.voxel_array_lod().is_some_and(|lod| lod.iter().all(|v| *v == Density::EMPTY)));
    }

    #[test]
    fn test_lod_faces_are_independent() {
        let mut tile = TileAccessor::<Tile4>::create();
        tile.set_calculate_lod(true);

        // face 0 and face 1 share the projection but not the storage
        assert!(tile.set_voxel_lod(IVec3::new(0, 3, 4), INSIDE, 0));
        assert!(tile.set_voxel_lod(IVec3::new(0, 3, 4), OUTSIDE, 1));
        assert_eq!(*tile.voxel_lod(IVec3::new(0, 3, 4), 0), INSIDE);
        assert_eq!(*tile.voxel_lod(IVec3::new(0, 3, 4), 1), OUTSIDE);

        // z-face (3, 2, 0) lands on planar (3, 2)
        tile.set_voxel_lod(IVec3::new(3, 2, 0), INSIDE, 4);
        assert_eq!(*tile.voxel_lod_planar(IVec2::new(3, 2), 4), INSIDE);

        let lod = tile.voxel_array_lod().unwrap();
        assert_eq!(lod[3 * 10 + 4], INSIDE);
        assert_eq!(lod[100 + 3 * 10 + 4], OUTSIDE);
        assert_eq!(lod[400 + 3 * 10 + 2], INSIDE);
    }

    #[test]
    fn test_lod_counter_counts_every_inside_write() {
        let mut tile = TileAccessor::<Tile4>::create();
        tile.set_calculate_lod(true);

        assert!(tile.set_voxel_lod_planar(IVec2::new(9, 9), INSIDE, 5));
        assert!(!tile.set_voxel_lod_planar(IVec2::new(9, 9), INSIDE, 5));
        tile.set_voxel_lod_planar(IVec2::new(0, 0), OUTSIDE, 2);
        assert_eq!(tile.num_voxel_larger_zero_lod(), 2);
        assert_eq!(tile.num_voxel_larger_zero(), 0);
    }

    #[test]
    #[should_panic]
    fn test_lod_access_without_lod_mode() {
        let tile = TileAccessor::<Tile4>::create();
        tile.voxel_lod_planar(IVec2::ZERO, 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn test_set_voxel_lod_wrong_axis() {
        let mut tile = TileAccessor::<Tile4>::create();
        tile.set_calculate_lod(true);
        tile.set_voxel_lod(IVec3::new(1, 0, 0), INSIDE, 0);
    }

    #[test]
    fn test_counters_saturate() {
        let mut tile = TileAccessor::<Tile4>::create();
        tile.set_num_voxel_larger_zero(u32::MAX);
        assert!(tile.set_voxel(IVec3::ZERO, Density::FULL));
        assert_eq!(tile.num_voxel_larger_zero(), u32::MAX);

        tile.set_calculate_lod(true);
        tile.set_num_voxel_larger_zero_lod(u32::MAX);
        assert!(tile.set_voxel_lod_planar(IVec2::ZERO, Density::FULL, 0));
        assert_eq!(tile.num_voxel_larger_zero_lod(), u32::MAX);
    }

    #[test]
    fn test_failed_lod_write_leaves_counter() {
        let mut tile = TileAccessor::<Tile4>::create();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tile.set_voxel_lod_planar(IVec2::ZERO, Density::FULL, 0)
        }));
        assert!(result.is_err());
        assert_eq!(tile.num_voxel_larger_zero_lod(), 0);
        assert!(!tile.calculate_lod());
    }

    #[test]
    fn test_failed_lod_write_out_of_face() {
        let mut tile = TileAccessor::<Tile4>::create();
        tile.set_calculate_lod(true);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tile.set_voxel_lod_planar(IVec2::ZERO, Density::FULL, LOD_FACE_COUNT)
        }));
        assert!(result.is_err());
        assert_eq!(tile.num_voxel_larger_zero_lod(), 0);
        assert!(tile.voxel_array_lod().is_some_and(|lod| lod.iter().all(|v| *v == Density::EMPTY)));
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_failed_core_write_leaves_counter() {
        let mut tile = TileAccessor::<Tile4>::create();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tile.set_voxel(IVec3::new(2, 2, 6), Density::FULL)
        }));
        assert!(result.is_err());
        assert_eq!(tile.num_voxel_larger_zero(), 0);
    }

    #[test]
    fn test_counter_setters_and_resync() {
        let mut tile = TileAccessor::<Tile4>::create();
        tile.set_num_voxel_larger_zero(125);
        assert!(tile.is_full());
        tile.set_num_voxel_larger_zero_lod(7);
        assert_eq!(tile.num_voxel_larger_zero_lod(), 7);

        // bulk write through the raw array, then resync
        let index = core_index(&tile.dims(), IVec3::new(1, 1, 1));
        let halo = core_index(&tile.dims(), IVec3::NEG_ONE);
        tile.voxel_array_mut()[index] = INSIDE;
        tile.voxel_array_mut()[halo] = INSIDE;
        tile.resync_counters();
        assert_eq!(tile.num_voxel_larger_zero(), 1);
        assert_eq!(tile.num_voxel_larger_zero_lod(), 0);
    }

    #[test]
    fn test_populate_sphere() {
        logging::init_for_tests();
        let mut tile = TileAccessor::<Tile4>::create();
        tile.populate(|pos| {
            let d = 2.5 - (pos.as_vec3() - glam::Vec3::splat(2.0)).length();
            Density::from_f32(d / 4.0, 2)
        });

        for pos in [IVec3::NEG_ONE, IVec3::splat(2), IVec3::new(5, 0, 3)] {
            let d = 2.5 - (pos.as_vec3() - glam::Vec3::splat(2.0)).length();
            assert_eq!(*tile.voxel(pos), Density::from_f32(d / 4.0, 2));
        }
        assert!(tile.voxel(IVec3::splat(2)).is_inside());
        assert!(!tile.voxel(IVec3::NEG_ONE).is_inside());
        assert_eq!(tile.num_voxel_larger_zero(), tile.count_inside());
        assert!(!tile.is_empty());
        assert!(!tile.is_full());
    }

    #[test]
    fn test_populate_solid_is_full() {
        let mut tile = TileAccessor::<Tile4>::create();
        tile.populate(|_| Density::FULL);
        assert!(tile.is_full());

        tile.populate(|_| Density::EMPTY);
        assert!(tile.is_empty());
    }

    #[test]
    fn test_populate_lod() {
        let mut tile = TileAccessor::<Tile4>::create();
        tile.set_calculate_lod(true);
        tile.populate_lod(|lod, pos| if lod == 3 && pos.x < 2 { INSIDE } else { OUTSIDE });

        assert_eq!(tile.num_voxel_larger_zero_lod(), 20);
        assert_eq!(*tile.voxel_lod(IVec3::new(1, 0, 7), 3), INSIDE);
        assert_eq!(*tile.voxel_lod(IVec3::new(1, 0, 7), 2), OUTSIDE);
        assert_eq!(*tile.voxel_lod(IVec3::new(2, 0, 7), 3), OUTSIDE);
    }
}
