//! Error types for shared-segment operations

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShareError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot needs {needed} bytes but segment capacity is {capacity}")]
    CapacityExceeded { needed: usize, capacity: usize },

    #[error("snapshot encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("binary snapshot decode failed: {0}")]
    DecodeBinary(#[source] bincode::Error),

    #[error("text snapshot decode failed: {0}")]
    DecodeText(#[source] serde_json::Error),

    #[error("segment does not hold a snapshot (bad magic)")]
    BadMagic,

    #[error("snapshot header truncated: {len} bytes")]
    SnapshotTruncated { len: usize },

    #[error("unsupported snapshot protocol {found}, this build speaks up to {supported}")]
    UnsupportedProtocol { found: u8, supported: u8 },

    #[error("unknown snapshot format tag {0:#04x}")]
    UnknownFormat(u8),

    #[error("segment {name:?} can only be destroyed by its creator")]
    NotCreator { name: String },

    #[error("segment {name:?} exists but has not been initialized yet")]
    Uninitialized { name: String },
}

pub type Result<T> = std::result::Result<T, ShareError>;
