//! Ordered field schema for saving and restoring a tile.
//!
//! | # | field                   | kind   | present             |
//! |---|-------------------------|--------|---------------------|
//! | 1 | `calculateLod`          | flag   | always              |
//! | 2 | `numVoxelLargerZero`    | count  | always              |
//! | 3 | `numVoxelLargerZeroLod` | count  | always              |
//! | 4 | `voxels`                | voxels | always              |
//! | 5 | `voxelsLod`             | voxels | iff `calculateLod`  |
//!
//! Loading applies the LOD flag before anything else, so the face buffers
//! exist by the time field 5 is read.

use crate::core::Result;
use crate::tile::accessor::TileAccessor;
use crate::tile::config::TileConfig;

/// Version of the field layout above
pub const SCHEMA_VERSION: u32 = 1;

/// Field names, in schema order
pub mod field {
    pub const CALCULATE_LOD: &str = "calculateLod";
    pub const NUM_VOXEL_LARGER_ZERO: &str = "numVoxelLargerZero";
    pub const NUM_VOXEL_LARGER_ZERO_LOD: &str = "numVoxelLargerZeroLod";
    pub const VOXELS: &str = "voxels";
    pub const VOXELS_LOD: &str = "voxelsLod";
}

/// Sink for named tile fields, written in schema order
pub trait TileWriter<V> {
    fn write_flag(&mut self, name: &'static str, value: bool) -> Result<()>;
    fn write_count(&mut self, name: &'static str, value: u32) -> Result<()>;
    fn write_voxels(&mut self, name: &'static str, voxels: &[V]) -> Result<()>;
}

/// Source of named tile fields, read in schema order.
///
/// Implementations must fail when the next field's name or kind differs from
/// the one requested.
pub trait TileReader<V> {
    fn read_flag(&mut self, name: &'static str) -> Result<bool>;
    fn read_count(&mut self, name: &'static str) -> Result<u32>;
    /// Fill all of `voxels`; a stored buffer of another length is an error.
    fn read_voxels(&mut self, name: &'static str, voxels: &mut [V]) -> Result<()>;
}

impl<C: TileConfig> TileAccessor<C> {
    /// Emit all fields in schema order.
    pub fn save<W: TileWriter<C::Voxel>>(&self, writer: &mut W) -> Result<()> {
        writer.write_flag(field::CALCULATE_LOD, self.calculate_lod())?;
        writer.write_count(field::NUM_VOXEL_LARGER_ZERO, self.num_voxel_larger_zero())?;
        writer.write_count(field::NUM_VOXEL_LARGER_ZERO_LOD, self.num_voxel_larger_zero_lod())?;
        writer.write_voxels(field::VOXELS, self.voxel_array())?;

        if let Some(lod) = self.voxel_array_lod() {
            writer.write_voxels(field::VOXELS_LOD, lod)?;
        }

        Ok(())
    }

    /// Restore all fields in schema order.
    ///
    /// On error the LOD buffer still matches the LOD flag, but voxel contents
    /// and counters may be partially restored; discard the accessor.
    pub fn load<R: TileReader<C::Voxel>>(&mut self, reader: &mut R) -> Result<()> {
        let calculate_lod = reader.read_flag(field::CALCULATE_LOD)?;
        self.set_calculate_lod(calculate_lod);

        let num_voxel_larger_zero = reader.read_count(field::NUM_VOXEL_LARGER_ZERO)?;
        let num_voxel_larger_zero_lod = reader.read_count(field::NUM_VOXEL_LARGER_ZERO_LOD)?;
        reader.read_voxels(field::VOXELS, self.voxel_array_mut())?;

        if let Some(lod) = self.voxel_array_lod_mut() {
            reader.read_voxels(field::VOXELS_LOD, lod)?;
        }

        self.set_num_voxel_larger_zero(num_voxel_larger_zero);
        self.set_num_voxel_larger_zero_lod(num_voxel_larger_zero_lod);

        log::debug!(
            "Loaded tile: lod={}, {} inside, {} inside lod",
            calculate_lod,
            num_voxel_larger_zero,
            num_voxel_larger_zero_lod
        );
        Ok(())
    }
}
