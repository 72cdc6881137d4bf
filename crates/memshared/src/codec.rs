//! Snapshot encoding and decoding
//!
//! A snapshot is a 4-byte header followed by the encoded container value:
//!
//! ```text
//! offset 0..2   magic bytes "MS"
//! offset 2      protocol version
//! offset 3      format tag (0x01 = binary, 0x02 = text)
//! offset 4..    payload
//! ```
//!
//! There is deliberately no length field. The segment may hold stale bytes
//! from an earlier, larger write past the payload, so both payload formats
//! must be self-terminating: bincode reads exactly the bytes the mirror type
//! requires, and the JSON deserializer stops at the end of the top-level
//! value. Decoding never inspects what follows the payload.
//!
//! Encoding tries the compact binary format first and falls back to the
//! self-describing text format when the value's `Serialize` impl is not
//! expressible in binary (for example a struct using `#[serde(flatten)]`,
//! which serializes as a map of unknown length). If both fail the error is
//! fatal; nothing is written.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, ShareError};

/// Magic bytes identifying a snapshot.
pub const MAGIC: [u8; 2] = *b"MS";

/// Header length in bytes.
pub const HEADER_LEN: usize = 4;

/// Protocol version stamped into snapshot headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion(pub u8);

impl ProtocolVersion {
    /// The newest protocol this build understands.
    pub const CURRENT: Self = Self(1);
}

/// Payload format recorded in the snapshot header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// Compact binary payload (bincode).
    Binary,
    /// Self-describing text payload (JSON).
    Text,
}

impl SnapshotFormat {
    fn tag(self) -> u8 {
        match self {
            Self::Binary => 0x01,
            Self::Text => 0x02,
        }
    }
}

/// Encoder/decoder for whole-container snapshots.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    protocol: ProtocolVersion,
    format: SnapshotFormat,
}

impl Codec {
    pub fn new(protocol: ProtocolVersion, format: SnapshotFormat) -> Self {
        Self { protocol, format }
    }

    /// Encode a full snapshot, header included.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let (payload, format) = match self.format {
            SnapshotFormat::Binary => match bincode::serialize(value) {
                Ok(payload) => (payload, SnapshotFormat::Binary),
                Err(e) => {
                    debug!("binary encode rejected ({e}), retrying as text");
                    let payload = serde_json::to_vec(value).map_err(ShareError::Encode)?;
                    (payload, SnapshotFormat::Text)
                }
            },
            SnapshotFormat::Text => {
                let payload = serde_json::to_vec(value).map_err(ShareError::Encode)?;
                (payload, SnapshotFormat::Text)
            }
        };

        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
        buf.extend_from_slice(&MAGIC);
        buf.push(self.protocol.0);
        buf.push(format.tag());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode a snapshot from the start of a buffer.
    ///
    /// The buffer is usually the whole segment, so anything past the payload
    /// is ignored. Corrupted or truncated payloads are fatal.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        if bytes.len() < HEADER_LEN {
            return Err(ShareError::SnapshotTruncated { len: bytes.len() });
        }
        if bytes[..2] != MAGIC {
            return Err(ShareError::BadMagic);
        }
        let version = bytes[2];
        if version == 0 || version > ProtocolVersion::CURRENT.0 {
            return Err(ShareError::UnsupportedProtocol {
                found: version,
                supported: ProtocolVersion::CURRENT.0,
            });
        }

        let payload = &bytes[HEADER_LEN..];
        match bytes[3] {
            0x01 => bincode::deserialize(payload).map_err(ShareError::DecodeBinary),
            0x02 => {
                let mut de = serde_json::Deserializer::from_slice(payload);
                // No `end()` check: trailing stale bytes are expected.
                T::deserialize(&mut de).map_err(ShareError::DecodeText)
            }
            tag => Err(ShareError::UnknownFormat(tag)),
        }
    }
}
