//! Self-describing blob header used by the out-of-process bridge.
//!
//! ```text
//! u32 metadata_block_size   (52 for version 1)
//! u32 version
//! u32 parameters[11]        ┐
//! u64 compressed_size       ┘ metadata block
//! u8  payload[compressed_size]
//! ```
//!
//! All integers are little-endian. Readers locate the payload with
//! `metadata_block_size`, so later versions may append fields to the block.

use serde::Serialize;

use crate::params::{CompressionParameters, PARAM_COUNT};

/// Version written by this build.
pub const HEADER_VERSION: u32 = 1;
/// `metadata_block_size` + `version`.
pub const HEADER_PREFIX_SIZE: usize = 8;
/// Parameters plus the compressed size.
pub const METADATA_BLOCK_SIZE: usize = PARAM_COUNT * 4 + 8;
/// Bytes in front of the payload for [`HEADER_VERSION`].
pub const FRAMED_HEADER_SIZE: usize = HEADER_PREFIX_SIZE + METADATA_BLOCK_SIZE;

/// Header parse failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("blob too short: need {need} bytes, have {have}")]
    TooShort { need: usize, have: usize },

    #[error("metadata block of {0} bytes is smaller than the 52-byte minimum")]
    BlockTooSmall(u32),

    #[error("unsupported header version {0}")]
    UnsupportedVersion(u32),

    #[error("payload truncated: header declares {declared} bytes, blob carries {available}")]
    PayloadTruncated { declared: u64, available: usize },
}

/// Decoded header fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MetadataHeader {
    pub version: u32,
    pub params: CompressionParameters,
    pub compressed_size: u64,
    /// Offset of the first payload byte within the blob.
    pub payload_offset: usize,
}

impl MetadataHeader {
    /// Header for a payload produced by this build.
    pub fn new(params: CompressionParameters, compressed_size: u64) -> Self {
        Self {
            version: HEADER_VERSION,
            params,
            compressed_size,
            payload_offset: FRAMED_HEADER_SIZE,
        }
    }

    /// Serialize the header (prefix plus metadata block).
    pub fn encode(&self) -> [u8; FRAMED_HEADER_SIZE] {
        let mut out = [0u8; FRAMED_HEADER_SIZE];
        let mut offset = 0;
        put_u32(&mut out, &mut offset, METADATA_BLOCK_SIZE as u32);
        put_u32(&mut out, &mut offset, self.version);
        for word in self.params.to_words() {
            put_u32(&mut out, &mut offset, word);
        }
        out[offset..offset + 8].copy_from_slice(&self.compressed_size.to_le_bytes());
        out
    }

    /// Parse the header at the front of `blob`. Does not check the payload.
    pub fn decode(blob: &[u8]) -> Result<Self, HeaderError> {
        let block_size = get_u32(blob, 0)?;
        let version = get_u32(blob, 4)?;
        if version == 0 {
            return Err(HeaderError::UnsupportedVersion(version));
        }
        if (block_size as usize) < METADATA_BLOCK_SIZE {
            return Err(HeaderError::BlockTooSmall(block_size));
        }
        let payload_offset = HEADER_PREFIX_SIZE + block_size as usize;
        if blob.len() < payload_offset {
            return Err(HeaderError::TooShort {
                need: payload_offset,
                have: blob.len(),
            });
        }

        let mut words = [0u32; PARAM_COUNT];
        for (i, word) in words.iter_mut().enumerate() {
            *word = get_u32(blob, HEADER_PREFIX_SIZE + i * 4)?;
        }
        let size_at = HEADER_PREFIX_SIZE + PARAM_COUNT * 4;
        let mut size_bytes = [0u8; 8];
        size_bytes.copy_from_slice(&blob[size_at..size_at + 8]);

        Ok(Self {
            version,
            params: CompressionParameters::from_array(words),
            compressed_size: u64::from_le_bytes(size_bytes),
            payload_offset,
        })
    }
}

fn put_u32(out: &mut [u8], offset: &mut usize, value: u32) {
    out[*offset..*offset + 4].copy_from_slice(&value.to_le_bytes());
    *offset += 4;
}

fn get_u32(blob: &[u8], at: usize) -> Result<u32, HeaderError> {
    let bytes = blob.get(at..at + 4).ok_or(HeaderError::TooShort {
        need: at + 4,
        have: blob.len(),
    })?;
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    Ok(u32::from_le_bytes(word))
}

/// Header followed by `payload`.
pub fn pack(params: &CompressionParameters, payload: &[u8]) -> Vec<u8> {
    let header = MetadataHeader::new(*params, payload.len() as u64);
    let mut blob = Vec::with_capacity(FRAMED_HEADER_SIZE + payload.len());
    blob.extend_from_slice(&header.encode());
    blob.extend_from_slice(payload);
    blob
}

/// Split a framed blob into its header and exactly `compressed_size` payload
/// bytes. Trailing bytes after the payload are ignored.
pub fn unpack(blob: &[u8]) -> Result<(MetadataHeader, &[u8]), HeaderError> {
    let header = MetadataHeader::decode(blob)?;
    let available = blob.len() - header.payload_offset;
    let declared = header.compressed_size;
    let len = usize::try_from(declared)
        .ok()
        .filter(|&len| len <= available)
        .ok_or(HeaderError::PayloadTruncated {
            declared,
            available,
        })?;
    let start = header.payload_offset;
    Ok((header, &blob[start..start + len]))
}
