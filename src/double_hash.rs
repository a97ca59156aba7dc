//! The double-hash construction used for every rekey.

use digest::crypto_common::BlockSizeUser;
use digest::{Digest, FixedOutputReset, Output};

// Enough zeros to cover the block size of any supported hash (SHA-512 and
// friends use 128-byte blocks).
const ZERO_BLOCK: [u8; 256] = [0; 256];

/// Computes SHAd-X over the concatenation of `segments`: `H(H(0^b ‖ m))`
/// where `b` is the hash block length (*Cryptography Engineering* p. 86,
/// definition 7).
///
/// Prepending a zero block and rehashing makes the result insensitive to
/// length extension, at the cost of claiming only n/2 bits of security
/// (128 bits for SHA-256).
///
/// `hasher` is reset before use; its prior state does not leak into the
/// digest.
pub fn double_hash<D>(hasher: &mut D, segments: &[&[u8]]) -> Output<D>
where
    D: Digest + FixedOutputReset + BlockSizeUser,
{
    Digest::reset(hasher);
    Digest::update(hasher, &ZERO_BLOCK[..D::block_size()]);
    for segment in segments {
        Digest::update(hasher, segment);
    }
    let inner = hasher.finalize_reset();
    Digest::update(hasher, &inner);
    hasher.finalize_reset()
}
