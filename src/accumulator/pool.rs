//! A single entropy pool.

use digest::{Digest, Output};
use sha2::Sha256;

/// A SHA-256 instance that tracks how many bytes were written since the
/// last drain.
///
/// The count is what gates reseeds: pool 0 must have absorbed at least a
/// hash block's worth of event data before a reseed may fire.
#[derive(Debug)]
pub(crate) struct CountedPool {
    hasher: Sha256,
    length: usize,
}

impl CountedPool {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            length: 0,
        }
    }

    pub fn write(&mut self, data: &[u8]) {
        Digest::update(&mut self.hasher, data);
        self.length += data.len();
    }

    /// Bytes absorbed since the last drain.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Extracts the digest and resets both the hash state and the count,
    /// so drained entropy is never counted or extracted twice.
    pub fn drain(&mut self) -> Output<Sha256> {
        self.length = 0;
        self.hasher.finalize_reset()
    }
}
