//! Binary schema definitions and utilities

use crate::error::{Result, StorageError};

/// Validate magic number for a binary format
pub fn validate_magic(data: &[u8], expected: [u8; 4]) -> Result<()> {
    if data.len() < 4 {
        return Err(StorageError::InvalidFormat {
            reason: "Data too short for magic number".to_string(),
        });
    }

    let found = [data[0], data[1], data[2], data[3]];
    if found != expected {
        return Err(StorageError::InvalidMagic { expected, found });
    }

    Ok(())
}

/// Calculate CRC32 checksum
pub fn calculate_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Validate checksum
pub fn validate_checksum(data: &[u8], expected: u32) -> Result<()> {
    let computed = calculate_checksum(data);
    if computed != expected {
        return Err(StorageError::ChecksumMismatch { expected, computed });
    }
    Ok(())
}

/// Read a big-endian `u32` at `offset`
pub(crate) fn read_u32_be(data: &[u8], offset: usize) -> Result<u32> {
    let bytes = data
        .get(offset..offset + 4)
        .ok_or_else(|| StorageError::invalid_format(format!("truncated u32 at byte {}", offset)))?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a big-endian `u64` at `offset`
pub(crate) fn read_u64_be(data: &[u8], offset: usize) -> Result<u64> {
    let hi = read_u32_be(data, offset)? as u64;
    let lo = read_u32_be(data, offset + 4)? as u64;
    Ok((hi << 32) | lo)
}
