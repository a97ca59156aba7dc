//! An implementation of the Fortuna cryptographically secure random number
//! generator, as designed by Niels Ferguson and Bruce Schneier and
//! described in *Cryptography Engineering* (Ferguson, Schneier, Kohno,
//! ISBN 978-0-470-47424-2), chapter 9.
//!
//! Fortuna is meant to live inside a long-running process that observes a
//! stream of unpredictable events: I/O completion times, packet arrivals,
//! user input. Events feed 32 entropy pools; the pools periodically reseed
//! an AES-256 counter-mode generator that produces the output bytes:
//!
//! ```ascii
//!  AddRandomEvent ──→ pools[0..32] ──(reseed)──→ Generator ──→ Read
//! ```
//!
//! The split buys two properties a plain seeded PRNG lacks:
//!
//! * **Recovery from compromise.** Pools drain on an exponential schedule,
//!   so an attacker who learns the state and floods the accumulator with
//!   known events still loses once a slow pool full of honest entropy
//!   reseeds the generator.
//! * **Forward secrecy.** The generator rekeys itself after every request,
//!   so capturing the state never reveals bytes already handed out.
//!
//! # Usage
//!
//! ```no_run
//! use fortuna_csprng::Fortuna;
//!
//! // At least 128 bytes of startup seed material.
//! let fortuna = Fortuna::new(&[0x17; 128])?;
//!
//! // Keep the pools fed with whatever unpredictable bytes the process
//! // observes. Submission is cheap and never blocks on readers.
//! fortuna.add_random_event(1, &[42, 17, 93]);
//!
//! let mut buf = [0u8; 64];
//! let n = fortuna.read(&mut buf);
//! assert_eq!(n, 64);
//! # Ok::<(), fortuna_csprng::Error>(())
//! ```
//!
//! [`Fortuna`] also implements [`rand_core::RngCore`] and
//! [`rand_core::CryptoRng`], so it plugs into anything generic over the
//! `rand` traits.
//!
//! The underlying [`Generator`] is exposed for callers who manage their
//! own seed material and want the deterministic keystream without the
//! accumulator on top.
//!
//! The seed establishes determinism, not security: two instances built
//! from the same seed return identical bytes until their event streams
//! diverge. Supplying real entropy through
//! [`add_random_event`](Fortuna::add_random_event) is what makes the
//! output unpredictable.

pub mod accumulator;
pub mod generator;

mod counter;
mod double_hash;
mod errors;

#[cfg(test)]
pub(crate) mod test_vectors;

pub use accumulator::{Fortuna, MAX_EVENT_SIZE, MIN_POOL_SIZE, NUM_POOLS, RESEED_INTERVAL};
pub use double_hash::double_hash;
pub use errors::Error;
pub use generator::Generator;
