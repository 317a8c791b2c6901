//! Per-tile voxel cache for surface extraction

pub mod config;
pub mod voxel;
pub mod index;
pub mod accessor;
pub mod archive;
pub mod record;

pub use config::{Config, TileConfig, TileDims, DEFAULT_VOXELS_PER_TILE, LOD_FACE_COUNT};
pub use voxel::{Density, TileVoxel};
pub use accessor::TileAccessor;
pub use archive::{TileReader, TileWriter, SCHEMA_VERSION};
pub use record::{Field, FieldValue, RecordReader, TileRecord};
