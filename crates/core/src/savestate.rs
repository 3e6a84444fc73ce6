//! Save state files (quick save / quick load).
//!
//! A [`SaveState`] holds the same data as the fixed-layout snapshot from
//! [`Runtime::serialize`](crate::Runtime::serialize) but is stored on disk
//! with a header and bincode + deflate, so the file stays small and can grow
//! new fields behind a version bump.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "FC4S"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::disk::Disk;
use crate::error::StateError;

const MAGIC: &[u8; 4] = b"FC4S";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    /// The full shared memory region.
    pub memory: Vec<u8>,
    pub disk: Disk,
    /// Whether the guest's `start` has yet to run.
    pub first_frame: bool,
}

/// Encode a state into the file format.
pub fn encode(state: &SaveState) -> Result<Vec<u8>, StateError> {
    let payload = bincode::serialize(state)?;
    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decode the file format, verifying magic and version.
pub fn decode(data: &[u8]) -> Result<SaveState, StateError> {
    if data.len() < HEADER_LEN || &data[0..4] != MAGIC {
        return Err(StateError::BadMagic);
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(StateError::Version(version));
    }

    let payload = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
        .map_err(|e| StateError::Decompress(format!("{:?}", e.status)))?;
    Ok(bincode::deserialize(&payload)?)
}

pub fn save_to_file(state: &SaveState, path: &Path) -> Result<(), StateError> {
    std::fs::write(path, encode(state)?)?;
    log::debug!("saved state to {}", path.display());
    Ok(())
}

pub fn load_from_file(path: &Path) -> Result<SaveState, StateError> {
    let state = decode(&std::fs::read(path)?)?;
    log::debug!("loaded state from {}", path.display());
    Ok(state)
}

/// Derive a save state path next to a disk file: `game.disk` → `game.state`.
pub fn state_path(disk_path: &Path) -> PathBuf {
    disk_path.with_extension("state")
}
