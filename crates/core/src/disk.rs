//! Persistent disk blob.
//!
//! A flat byte store of up to [`DISK_CAPACITY`] bytes with an explicit used
//! size. The runtime only ever copies whole prefixes in and out of it; the
//! contents are guest-defined. Loading and saving the blob to a file is the
//! platform adapter's job.

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Maximum number of bytes a guest can persist.
pub const DISK_CAPACITY: usize = 1024;

/// Serialized size: 2-byte little-endian length followed by the full capacity.
pub const DISK_ENCODED_SIZE: usize = 2 + DISK_CAPACITY;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    size: u16,
    data: Vec<u8>,
}

impl Disk {
    pub fn new() -> Self {
        Disk { size: 0, data: vec![0u8; DISK_CAPACITY] }
    }

    /// Build a disk from saved bytes, truncating anything past the capacity.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut disk = Disk::new();
        disk.store(bytes);
        disk
    }

    /// Number of valid bytes.
    pub fn len(&self) -> usize { self.size as usize }

    pub fn is_empty(&self) -> bool { self.size == 0 }

    /// The valid prefix.
    pub fn contents(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    /// Replace the contents with `bytes`, clamped to capacity. Returns the stored length.
    pub fn store(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(DISK_CAPACITY);
        self.data[..n].copy_from_slice(&bytes[..n]);
        self.size = n as u16;
        n
    }

    /// Copy up to `dest.len()` valid bytes into `dest`. Returns the count copied.
    pub fn load_into(&self, dest: &mut [u8]) -> usize {
        let n = dest.len().min(self.len());
        dest[..n].copy_from_slice(&self.data[..n]);
        n
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(&self.data);
    }

    pub(crate) fn decode(src: &[u8]) -> Result<Self, StateError> {
        if src.len() != DISK_ENCODED_SIZE {
            return Err(StateError::Size { expected: DISK_ENCODED_SIZE, actual: src.len() });
        }
        let size = u16::from_le_bytes([src[0], src[1]]);
        if size as usize > DISK_CAPACITY {
            return Err(StateError::DiskSize(size));
        }
        Ok(Disk { size, data: src[2..].to_vec() })
    }

    /// Check a deserialized disk before it is installed.
    pub(crate) fn validate(&self) -> Result<(), StateError> {
        if self.data.len() != DISK_CAPACITY {
            return Err(StateError::Size { expected: DISK_CAPACITY, actual: self.data.len() });
        }
        if self.len() > DISK_CAPACITY {
            return Err(StateError::DiskSize(self.size));
        }
        Ok(())
    }
}

impl Default for Disk {
    fn default() -> Self {
        Self::new()
    }
}
