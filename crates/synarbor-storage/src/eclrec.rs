//! ECLREC (external connection list record) format
//!
//! One fixed-layout, big-endian record per synapse:
//!
//! | bytes  | field                                   |
//! |--------|-----------------------------------------|
//! | 0..4   | source-cell index (`i32`)               |
//! | 4..8   | target-cell index (`i32`)               |
//! | 8..10  | externally supplied strength (`i16`)    |
//! | 10..12 | relative connection-type number (`u16`) |
//!
//! Record files wrap a run of records in a small checksummed header.

use crate::{
    error::{Result, StorageError},
    ids::{CellId, ConnTypeId},
    magic,
    schemas::{calculate_checksum, read_u32_be, read_u64_be, validate_checksum, validate_magic},
};

use std::io::{Read, Write};
use std::path::Path;

/// Current record-file version
pub const ECL_VERSION: u32 = 1;

/// One persisted synapse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EclRecord {
    /// Source-cell (Lij) index
    pub source: i32,
    /// Target-cell index
    pub target: i32,
    /// Externally supplied strength, S15 fixed point
    pub strength: i16,
    /// Relative connection-type number
    pub conntype: u16,
}

impl EclRecord {
    /// Encoded size in bytes
    pub const SIZE: usize = 12;

    /// Create a record
    pub fn new(source: u32, target: CellId, strength: i16, conntype: ConnTypeId) -> Self {
        Self {
            source: source as i32,
            target: target.raw() as i32,
            strength,
            conntype: conntype.raw(),
        }
    }

    /// Target cell of this record
    pub fn target_cell(&self) -> CellId {
        CellId::new(self.target as u32)
    }

    /// Connection type of this record
    pub fn conntype_id(&self) -> ConnTypeId {
        ConnTypeId::new(self.conntype)
    }

    /// Encode to the fixed big-endian layout
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.source.to_be_bytes());
        out[4..8].copy_from_slice(&self.target.to_be_bytes());
        out[8..10].copy_from_slice(&self.strength.to_be_bytes());
        out[10..12].copy_from_slice(&self.conntype.to_be_bytes());
        out
    }

    /// Decode from the fixed big-endian layout
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            source: i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            target: i32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            strength: i16::from_be_bytes([bytes[8], bytes[9]]),
            conntype: u16::from_be_bytes([bytes[10], bytes[11]]),
        }
    }

    /// Write one record to a stream
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Read one record from a stream; `Ok(None)` on a clean end of stream
    pub fn read_from<R: Read>(input: &mut R) -> Result<Option<Self>> {
        let mut buf = [0u8; Self::SIZE];
        let mut filled = 0;
        while filled < Self::SIZE {
            let n = input.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        match filled {
            0 => Ok(None),
            Self::SIZE => Ok(Some(Self::from_bytes(&buf))),
            partial => Err(StorageError::invalid_format(format!(
                "truncated record: {} of {} bytes",
                partial,
                Self::SIZE
            ))),
        }
    }
}

/// Record-file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EclHeader {
    /// Magic number "ECLR"
    pub magic: [u8; 4],
    /// Format version
    pub version: u32,
    /// Number of records that follow
    pub record_count: u64,
    /// CRC32 of the record bytes
    pub data_checksum: u32,
    /// Reserved, written as zero
    pub reserved: u32,
}

impl EclHeader {
    /// Encoded size in bytes
    pub const SIZE: usize = 24;

    /// Header for `record_count` records whose bytes hash to `data_checksum`
    pub fn new(record_count: u64, data_checksum: u32) -> Self {
        Self {
            magic: magic::ECLR,
            version: ECL_VERSION,
            record_count,
            data_checksum,
            reserved: 0,
        }
    }

    /// Encode to big-endian bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.magic);
        out[4..8].copy_from_slice(&self.version.to_be_bytes());
        out[8..16].copy_from_slice(&self.record_count.to_be_bytes());
        out[16..20].copy_from_slice(&self.data_checksum.to_be_bytes());
        out[20..24].copy_from_slice(&self.reserved.to_be_bytes());
        out
    }

    /// Decode and validate a header
    pub fn parse(data: &[u8]) -> Result<Self> {
        validate_magic(data, magic::ECLR)?;
        if data.len() < Self::SIZE {
            return Err(StorageError::invalid_format("record file header truncated"));
        }
        let version = read_u32_be(data, 4)?;
        if version != ECL_VERSION {
            return Err(StorageError::UnsupportedVersion {
                version,
                supported: ECL_VERSION,
            });
        }
        Ok(Self {
            magic: magic::ECLR,
            version,
            record_count: read_u64_be(data, 8)?,
            data_checksum: read_u32_be(data, 16)?,
            reserved: read_u32_be(data, 20)?,
        })
    }
}

/// Encode records into a complete record file image
pub fn encode_records(records: &[EclRecord]) -> Vec<u8> {
    let mut body = Vec::with_capacity(records.len() * EclRecord::SIZE);
    for record in records {
        body.extend_from_slice(&record.to_bytes());
    }
    let header = EclHeader::new(records.len() as u64, calculate_checksum(&body));

    let mut bytes = Vec::with_capacity(EclHeader::SIZE + body.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&body);
    bytes
}

/// Decode a complete record file image
pub fn decode_records(data: &[u8]) -> Result<Vec<EclRecord>> {
    let header = EclHeader::parse(data)?;
    let body = &data[EclHeader::SIZE..];
    let expected_len = header.record_count as usize * EclRecord::SIZE;
    if body.len() != expected_len {
        return Err(StorageError::invalid_format(format!(
            "header declares {} records ({} bytes) but body holds {} bytes",
            header.record_count,
            expected_len,
            body.len()
        )));
    }
    validate_checksum(body, header.data_checksum)?;

    let records = body
        .chunks_exact(EclRecord::SIZE)
        .map(|chunk| {
            let mut buf = [0u8; EclRecord::SIZE];
            buf.copy_from_slice(chunk);
            EclRecord::from_bytes(&buf)
        })
        .collect();
    Ok(records)
}

/// Write a record file
pub fn save<P: AsRef<Path>>(path: P, records: &[EclRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, encode_records(records))?;
    log::debug!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Read a record file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<EclRecord>> {
    let data = std::fs::read(path.as_ref())?;
    decode_records(&data)
}
