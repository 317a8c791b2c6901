//! Self-contained tile records and their byte/JSON encodings.
//!
//! A [`TileRecord`] is a header plus the ordered field stream produced by
//! [`TileAccessor::save`]. Voxel buffers are stored as raw `Pod` bytes in host
//! byte order. The binary form is an rkyv archive compressed with LZ4.

use bytemuck::Pod;
use rkyv::Archive;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::tile::accessor::TileAccessor;
use crate::tile::archive::{TileReader, TileWriter, SCHEMA_VERSION};
use crate::tile::config::TileConfig;

/// Value of one named field
#[derive(Clone, Debug, PartialEq, Archive, rkyv::Serialize, rkyv::Deserialize, Serialize, Deserialize)]
pub enum FieldValue {
    Flag(bool),
    Count(u32),
    /// Voxel buffer as raw bytes
    Voxels(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Archive, rkyv::Serialize, rkyv::Deserialize, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

/// Serialized tile: header plus fields in schema order
#[derive(Clone, Debug, PartialEq, Archive, rkyv::Serialize, rkyv::Deserialize, Serialize, Deserialize)]
pub struct TileRecord {
    /// Schema version the fields follow
    pub version: u32,
    /// Tile size the voxel buffers were written for
    pub voxels_per_tile: i32,
    pub fields: Vec<Field>,
}

impl TileRecord {
    /// Empty record for the current schema
    pub fn new(voxels_per_tile: i32) -> Self {
        Self {
            version: SCHEMA_VERSION,
            voxels_per_tile,
            fields: Vec::new(),
        }
    }

    /// Empty record for tiles of configuration `C`
    pub fn for_tile<C: TileConfig>() -> Self {
        Self::new(C::VOXELS_PER_TILE)
    }

    /// Verify the header matches the current schema and configuration `C`
    pub fn check<C: TileConfig>(&self) -> Result<()> {
        if self.version != SCHEMA_VERSION {
            return Err(Error::Version {
                expected: SCHEMA_VERSION,
                found: self.version,
            });
        }
        if self.voxels_per_tile != C::VOXELS_PER_TILE {
            return Err(Error::TileSize {
                expected: C::VOXELS_PER_TILE,
                found: self.voxels_per_tile,
            });
        }
        Ok(())
    }

    /// Cursor reading the fields from the start
    pub fn reader(&self) -> RecordReader<'_> {
        RecordReader {
            record: self,
            cursor: 0,
        }
    }

    fn push(&mut self, name: &'static str, value: FieldValue) {
        self.fields.push(Field {
            name: name.to_string(),
            value,
        });
    }

    /// Encode as an LZ4-compressed rkyv archive
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let archived = rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map_err(|e| Error::Codec(e.to_string()))?;
        let compressed = lz4_flex::compress_prepend_size(&archived);

        log::debug!(
            "Encoded tile record: {} fields, {} bytes ({} compressed)",
            self.fields.len(),
            archived.len(),
            compressed.len()
        );
        Ok(compressed)
    }

    /// Decode bytes produced by [`TileRecord::to_bytes`]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let decompressed = lz4_flex::decompress_size_prepended(data)
            .map_err(|e| Error::Codec(format!("LZ4 decompression failed: {}", e)))?;

        // rkyv validates in place and needs an aligned buffer
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(decompressed.len());
        aligned.extend_from_slice(&decompressed);

        rkyv::from_bytes::<TileRecord, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::Codec(e.to_string()))
    }

    /// Encode as JSON (debug dumps, fixtures)
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<V: Pod> TileWriter<V> for TileRecord {
    fn write_flag(&mut self, name: &'static str, value: bool) -> Result<()> {
        self.push(name, FieldValue::Flag(value));
        Ok(())
    }

    fn write_count(&mut self, name: &'static str, value: u32) -> Result<()> {
        self.push(name, FieldValue::Count(value));
        Ok(())
    }

    fn write_voxels(&mut self, name: &'static str, voxels: &[V]) -> Result<()> {
        self.push(name, FieldValue::Voxels(bytemuck::cast_slice(voxels).to_vec()));
        Ok(())
    }
}

/// Sequential reader over a [`TileRecord`]'s fields
pub struct RecordReader<'a> {
    record: &'a TileRecord,
    cursor: usize,
}

impl<'a> RecordReader<'a> {
    fn next_field(&mut self, name: &'static str) -> Result<&'a FieldValue> {
        let field = self
            .record
            .fields
            .get(self.cursor)
            .ok_or(Error::MissingField(name))?;

        if field.name != name {
            return Err(Error::FieldMismatch {
                expected: name,
                found: field.name.clone(),
            });
        }

        self.cursor += 1;
        Ok(&field.value)
    }

    /// Fail if fields remain unread
    pub fn finish(self) -> Result<()> {
        match self.record.fields.len() - self.cursor {
            0 => Ok(()),
            remaining => Err(Error::TrailingFields(remaining)),
        }
    }
}

impl<V: Pod> TileReader<V> for RecordReader<'_> {
    fn read_flag(&mut self, name: &'static str) -> Result<bool> {
        match self.next_field(name)? {
            FieldValue::Flag(value) => Ok(*value),
            _ => Err(Error::FieldKind { name, expected: "flag" }),
        }
    }

    fn read_count(&mut self, name: &'static str) -> Result<u32> {
        match self.next_field(name)? {
            FieldValue::Count(value) => Ok(*value),
            _ => Err(Error::FieldKind { name, expected: "count" }),
        }
    }

    fn read_voxels(&mut self, name: &'static str, voxels: &mut [V]) -> Result<()> {
        let bytes = match self.next_field(name)? {
            FieldValue::Voxels(bytes) => bytes,
            _ => return Err(Error::FieldKind { name, expected: "voxel buffer" }),
        };

        let target: &mut [u8] = bytemuck::cast_slice_mut(voxels);
        if bytes.len() != target.len() {
            return Err(Error::BufferSize {
                name,
                expected: target.len(),
                found: bytes.len(),
            });
        }
        target.copy_from_slice(bytes);
        Ok(())
    }
}

impl<C: TileConfig> TileAccessor<C>
where
    C::Voxel: Pod,
{
    /// Save into a fresh record
    pub fn to_record(&self) -> Result<TileRecord> {
        let mut record = TileRecord::for_tile::<C>();
        self.save(&mut record)?;
        Ok(record)
    }

    /// Create an accessor restored from `record`
    pub fn from_record(record: &TileRecord) -> Result<Box<Self>> {
        record.check::<C>()?;

        let mut tile = Self::create();
        let mut reader = record.reader();
        tile.load(&mut reader)?;
        reader.finish()?;
        Ok(tile)
    }
}
