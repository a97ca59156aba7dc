//! Key-length dispatch over the AES variants.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};

/// One AES call consumes a counter block and produces this many bytes.
pub(crate) const BYTES_PER_AES_CALL: usize = 16;

/// An AES instance selected by key length.
///
/// The cipher is used strictly as a keystream primitive: counter blocks are
/// encrypted directly into the output, with no XOR against a plaintext.
pub(crate) enum BlockCipher {
    Aes128(Aes128),
    Aes256(Aes256),
}

impl BlockCipher {
    /// Builds the cipher for `key`: 16 bytes select AES-128, 32 bytes
    /// AES-256. Any other length means the generator key invariant is
    /// broken and panics.
    pub fn new(key: &[u8]) -> Self {
        match key.len() {
            16 => Self::Aes128(Aes128::new(GenericArray::from_slice(key))),
            32 => Self::Aes256(Aes256::new(GenericArray::from_slice(key))),
            n => panic!("no AES variant for a {n} byte key"),
        }
    }

    /// Encrypts the 16-byte `input` block into the front of `output`.
    pub fn encrypt_block(&self, input: &[u8; 16], output: &mut [u8]) {
        let input = GenericArray::from_slice(input);
        let output = GenericArray::from_mut_slice(&mut output[..BYTES_PER_AES_CALL]);
        match self {
            Self::Aes128(cipher) => cipher.encrypt_block_b2b(input, output),
            Self::Aes256(cipher) => cipher.encrypt_block_b2b(input, output),
        }
    }
}
