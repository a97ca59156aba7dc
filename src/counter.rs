//! The little-endian counter fed to the block cipher.

use zeroize::Zeroize;

/// A 128-bit little-endian counter used as the AES input block.
///
/// Little-endian is load-bearing: the construction in *Cryptography
/// Engineering* prescribes it, and a big-endian counter (what stream-cipher
/// CTR APIs use) would produce a different keystream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Counter(pub(crate) [u8; 16]);

impl Counter {
    /// A fresh counter holds the value zero.
    pub fn new() -> Self {
        Self([0; 16])
    }

    /// Adds 1 modulo 2^128.
    pub fn incr(&mut self) {
        incr_le(&mut self.0);
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl Zeroize for Counter {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Adds 1 to `bytes` interpreted as a little-endian unsigned integer, the
/// carry moving from byte 0 upward. When every byte overflows, the value
/// wraps to all-zero.
fn incr_le(bytes: &mut [u8]) {
    for b in bytes.iter_mut() {
        *b = b.wrapping_add(1);
        if *b != 0 {
            return;
        }
    }
}
