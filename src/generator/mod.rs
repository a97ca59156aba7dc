//! The keyed generator underneath the accumulator.
//!
//! A [`Generator`] turns a small amount of seed material into an arbitrary
//! amount of pseudo-random output by encrypting a little-endian counter
//! under AES in counter mode (*Cryptography Engineering* p. 143):
//!
//! ```ascii
//!        ctr=n          ctr=n+1        ctr=n+2
//!        ╔══↧══╗        ╔══↧══╗        ╔══↧══╗
//!    key ↦ AES ║    key ↦ AES ║    key ↦ AES ║ ...
//!        ╚══↧══╝        ╚══↧══╝        ╚══↧══╝
//!        out[0..16]     out[16..32]    out[32..48]
//! ```
//!
//! The cipher output is written straight into the caller's buffer; there is
//! no XOR against a plaintext, so this is CTR used as a keystream source
//! rather than CTR encryption.
//!
//! Two properties both come from the key schedule:
//!
//! * **Keying.** The key is never the raw seed: every [`Generator::write`]
//!   replaces it with the double hash of the old key and the new material.
//! * **Forward secrecy.** Every [`Generator::read`] ends by generating one
//!   extra key-sized block of keystream and overwriting the key with it, so
//!   compromising the state afterwards reveals nothing about earlier
//!   output.
//!
//! A single read is capped at `2^15 × output_size` bytes (1 MiB with
//! SHA-256). Longer requests would let a statistical attacker notice the
//! absence of block collisions in the output; callers wanting more loop.

mod block_cipher;

use std::sync::Mutex;

use digest::crypto_common::BlockSizeUser;
use digest::{Digest, FixedOutputReset};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::counter::Counter;
use crate::double_hash::double_hash;
use crate::errors::Error;
use block_cipher::{BlockCipher, BYTES_PER_AES_CALL};

/// A deterministic pseudo-random generator: AES in counter mode with a
/// rolling key, rekeyed after every request.
///
/// The hash parameter sets the security level and defaults to SHA-256
/// (AES-256, 128-bit security). All methods take `&self`; the state lives
/// behind an internal lock and the generator is safe to share across
/// threads.
#[derive(Debug)]
pub struct Generator<D = Sha256> {
    state: Mutex<GeneratorState<D>>,
    max_bytes_per_request: usize,
}

#[derive(Debug)]
struct GeneratorState<D> {
    // The current key seeds the next one.
    key: Vec<u8>,
    counter: Counter,
    initialized: bool,
    // Used only as a stateless double-hash primitive, reset before each use.
    hasher: D,
    // Holds the trailing partial block so only the bytes needed are copied
    // into the caller's buffer.
    partial: [u8; BYTES_PER_AES_CALL],
}

impl Generator<Sha256> {
    /// Returns a SHA-256 generator, seeded with `seed` unless it is empty.
    ///
    /// An unseeded generator fails every [`read`](Self::read) until the
    /// first [`write`](Self::write).
    pub fn new(seed: &[u8]) -> Self {
        Self::with_hasher(Sha256::new(), seed)
    }
}

impl<D> Generator<D>
where
    D: Digest + FixedOutputReset + BlockSizeUser,
{
    /// Returns a generator using `hasher` for rekeying. The key length
    /// equals the hash output size and selects the AES variant, so the
    /// hash must produce 16 or 32 bytes.
    pub fn with_hasher(hasher: D, seed: &[u8]) -> Self {
        let key_len = <D as Digest>::output_size();
        let generator = Generator {
            state: Mutex::new(GeneratorState {
                key: vec![0; key_len],
                counter: Counter::new(),
                initialized: false,
                hasher,
                partial: [0; BYTES_PER_AES_CALL],
            }),
            max_bytes_per_request: (1 << 15) * key_len,
        };
        if !seed.is_empty() {
            generator.write(seed);
        }
        generator
    }

    /// Mixes `data` into the generator state and returns its length.
    ///
    /// The new key is the double hash of the old key and `data`; the
    /// counter advances even on the first write, which moves it off the
    /// all-zero value reserved for the unseeded state.
    pub fn write(&self, data: &[u8]) -> usize {
        let mut state = self.state.lock().expect("generator lock poisoned");
        let GeneratorState {
            key,
            counter,
            initialized,
            hasher,
            ..
        } = &mut *state;
        let new_key = double_hash(hasher, &[key.as_slice(), data]);
        key.copy_from_slice(new_key.as_slice());
        counter.incr();
        *initialized = true;
        data.len()
    }

    /// Fills `buf` with pseudo-random bytes and returns how many were
    /// written: the smaller of `buf.len()` and
    /// [`max_bytes_per_request`](Self::max_bytes_per_request).
    ///
    /// Fails with [`Error::NotSeeded`] until seed material has been
    /// written. After the request is served the key is overwritten with
    /// fresh keystream; the previous key is unrecoverable.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut state = self.state.lock().expect("generator lock poisoned");
        if !state.initialized {
            return Err(Error::NotSeeded);
        }
        let n = buf.len().min(self.max_bytes_per_request);
        let cipher = BlockCipher::new(&state.key);
        let GeneratorState {
            key,
            counter,
            partial,
            ..
        } = &mut *state;
        generate_blocks(&cipher, counter, partial, &mut buf[..n]);
        // Rekey under the old cipher before the lock drops; the old key is
        // gone once this returns.
        generate_blocks(&cipher, counter, partial, key);
        Ok(n)
    }

    /// The per-request output cap, `2^15 × output_size` of the hash.
    pub fn max_bytes_per_request(&self) -> usize {
        self.max_bytes_per_request
    }
}

/// Encrypts successive counter values into `out`, one increment per block.
/// A trailing partial block goes through `partial` so exactly `out.len()`
/// bytes are produced while the counter still advances a full step.
fn generate_blocks(
    cipher: &BlockCipher,
    counter: &mut Counter,
    partial: &mut [u8; BYTES_PER_AES_CALL],
    out: &mut [u8],
) {
    let mut chunks = out.chunks_exact_mut(BYTES_PER_AES_CALL);
    for chunk in &mut chunks {
        cipher.encrypt_block(counter.as_bytes(), chunk);
        counter.incr();
    }
    let tail = chunks.into_remainder();
    if !tail.is_empty() {
        cipher.encrypt_block(counter.as_bytes(), partial);
        tail.copy_from_slice(&partial[..tail.len()]);
        counter.incr();
    }
}

impl<D> Drop for GeneratorState<D> {
    fn drop(&mut self) {
        self.key.zeroize();
        self.partial.zeroize();
        self.counter.zeroize();
    }
}
