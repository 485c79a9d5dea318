//! Binary format of DenHash log records
//!
//! A record is a 16-byte header followed immediately by the key bytes and
//! the value bytes. The header carries both lengths, so the payload needs
//! no framing of its own; the CRC32C covers key and value together. A
//! `SetSubkeys` record carries the encoded subkey list in its value slot.

use crate::error::{DenError, DenResult};

/// Record magic, "DENH" in ASCII. Doubles as the resync marker when the
/// reader scans past a corrupt region.
pub const MAGIC: [u8; 4] = *b"DENH";

/// Maximum key size in bytes
pub const MAX_KEY_SIZE: usize = 4096;

/// Maximum value size in bytes (32MB)
pub const MAX_VALUE_SIZE: usize = 32 * 1024 * 1024;

/// Header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Log operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Insert or update a key-value pair
    Put = 1,
    /// Delete a key (and its subkey list)
    Delete = 2,
    /// Replace the subkey list attached to a key
    SetSubkeys = 3,
}

/// Record header, 16 bytes little-endian on disk:
///
/// ```text
/// [0..4]   magic      "DENH"
/// [4..8]   checksum   CRC32C over key bytes then value bytes
/// [8..10]  key_len    u16
/// [10..14] value_len  u32
/// [14]     op         Put=1, Delete=2, SetSubkeys=3
/// [15]     zero
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RecordHeader {
    pub magic: [u8; 4],
    pub checksum: u32,
    pub key_len: u16,
    pub value_len: u32,
    pub op: u8,
}

impl RecordHeader {
    pub fn new(checksum: u32, key_len: u16, value_len: u32, op: Operation) -> Self {
        Self { magic: MAGIC, checksum, key_len, value_len, op: op as u8 }
    }

    /// Key bytes plus value bytes following the header on disk.
    pub fn payload_len(&self) -> usize {
        self.key_len as usize + self.value_len as usize
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.checksum.to_le_bytes());
        buf[8..10].copy_from_slice(&self.key_len.to_le_bytes());
        buf[10..14].copy_from_slice(&self.value_len.to_le_bytes());
        buf[14] = self.op;
        buf
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Self {
            magic,
            checksum: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            key_len: u16::from_le_bytes([bytes[8], bytes[9]]),
            value_len: u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]),
            op: bytes[14],
        }
    }
}

/// One decoded log record.
#[derive(Debug, Clone)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub operation: Operation,
}

/// Encode a record: header, key bytes, value bytes.
///
/// Size limits are enforced here so nothing oversized ever reaches the
/// file, independent of the engine's configured limits.
pub fn serialize_record(key: &[u8], value: &[u8], op: Operation) -> DenResult<Vec<u8>> {
    if key.len() > MAX_KEY_SIZE {
        return Err(DenError::OversizedEntry {
            entry_size: key.len() as u64,
            max_size: MAX_KEY_SIZE as u64,
            component: "key".to_string(),
        });
    }
    if value.len() > MAX_VALUE_SIZE {
        return Err(DenError::OversizedEntry {
            entry_size: value.len() as u64,
            max_size: MAX_VALUE_SIZE as u64,
            component: "value".to_string(),
        });
    }

    let checksum = crc32c::crc32c_append(crc32c::crc32c(key), value);
    let header = RecordHeader::new(checksum, key.len() as u16, value.len() as u32, op);

    let mut buffer = Vec::with_capacity(HEADER_SIZE + key.len() + value.len());
    buffer.extend_from_slice(&header.to_bytes());
    buffer.extend_from_slice(key);
    buffer.extend_from_slice(value);
    Ok(buffer)
}

/// Decode one record from the front of `data`.
pub fn deserialize_record(data: &[u8]) -> DenResult<Record> {
    let corrupt = |offset: u64, reason: String| DenError::LogCorrupted {
        path: std::path::PathBuf::from("<buffer>"),
        offset,
        reason,
    };

    if data.len() < HEADER_SIZE {
        return Err(corrupt(0, format!(
            "Record too short: {} bytes, header needs {}", data.len(), HEADER_SIZE,
        )));
    }

    let mut header_bytes = [0u8; HEADER_SIZE];
    header_bytes.copy_from_slice(&data[..HEADER_SIZE]);
    let header = RecordHeader::from_bytes(&header_bytes);

    if header.magic != MAGIC {
        return Err(DenError::NoMagicFound {
            path: std::path::PathBuf::from("<buffer>"),
            offset: 0,
            found_bytes: header.magic,
        });
    }

    let operation = match header.op {
        1 => Operation::Put,
        2 => Operation::Delete,
        3 => Operation::SetSubkeys,
        other => return Err(corrupt(14, format!("Invalid operation type: {}", other))),
    };

    let key_end = HEADER_SIZE + header.key_len as usize;
    let value_end = key_end + header.value_len as usize;
    if data.len() < value_end {
        return Err(DenError::TornWrite {
            path: std::path::PathBuf::from("<buffer>"),
            expected_size: header.payload_len() as u32,
            available_bytes: (data.len() - HEADER_SIZE) as u64,
            offset: HEADER_SIZE as u64,
        });
    }

    let key = &data[HEADER_SIZE..key_end];
    let value = &data[key_end..value_end];
    let computed = crc32c::crc32c_append(crc32c::crc32c(key), value);
    if computed != header.checksum {
        return Err(DenError::ChecksumMismatch {
            path: std::path::PathBuf::from("<buffer>"),
            expected: header.checksum,
            actual: computed,
            offset: HEADER_SIZE as u64,
        });
    }

    Ok(Record { key: key.to_vec(), value: value.to_vec(), operation })
}

/// Encode a subkey list for storage in a `SetSubkeys` record value.
///
/// Format: count(u32 LE) + count * (len(u32 LE) + bytes)
pub fn encode_subkeys(subkeys: &[Vec<u8>]) -> Vec<u8> {
    let total: usize = subkeys.iter().map(|s| 4 + s.len()).sum();
    let mut buf = Vec::with_capacity(4 + total);
    buf.extend_from_slice(&(subkeys.len() as u32).to_le_bytes());
    for sk in subkeys {
        buf.extend_from_slice(&(sk.len() as u32).to_le_bytes());
        buf.extend_from_slice(sk);
    }
    buf
}

/// Decode a subkey list from a `SetSubkeys` record value.
pub fn decode_subkeys(data: &[u8]) -> DenResult<Vec<Vec<u8>>> {
    let corrupt = |reason: String| DenError::LogCorrupted {
        path: std::path::PathBuf::from("<buffer>"),
        offset: 0,
        reason,
    };

    if data.len() < 4 {
        return Err(corrupt("Subkey list too short for count field".to_string()));
    }

    let count = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let mut subkeys = Vec::with_capacity(count.min(1024));
    let mut offset = 4;

    for _ in 0..count {
        if data.len() < offset + 4 {
            return Err(corrupt(format!("Subkey list truncated at offset {}", offset)));
        }
        let len = u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]) as usize;
        offset += 4;
        if data.len() < offset + len {
            return Err(corrupt(format!("Subkey bytes truncated at offset {}", offset)));
        }
        subkeys.push(data[offset..offset + len].to_vec());
        offset += len;
    }

    Ok(subkeys)
}
