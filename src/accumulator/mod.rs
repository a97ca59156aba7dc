//! The entropy accumulator wrapped around the generator.
//!
//! A [`Fortuna`] owns 32 entropy pools and the generator they feed.
//! Incoming events are spread over the pools round-robin; reads first
//! check whether enough entropy has accumulated to reseed the generator,
//! then delegate to it:
//!
//! ```ascii
//!  events ──→ pools[next_pool] ─┐ (digests of pools where 2^i | count)
//!                               ↓
//!  read ──→ reseed check ──→ generator.write ──→ generator.read ──→ bytes
//! ```
//!
//! Pool `i` only participates in reseed number `n` when `2^i` divides `n`,
//! so higher pools drain exponentially less often. Even an attacker who
//! controls every event source and floods the fast pools cannot drain the
//! slow ones; once a slow pool has gathered enough honest entropy, one of
//! its reseeds puts the generator back out of reach (*Cryptography
//! Engineering* §9.5.2).
//!
//! Reseeds are further limited to one per 100 ms so the pools cannot be
//! bled dry by rapid polling.

mod pool;

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime};

use digest::Digest;
use rand_core::{impls, CryptoRng, RngCore};
use sha1::Sha1;
use zeroize::Zeroize;

use crate::errors::Error;
use crate::generator::Generator;
use pool::CountedPool;

/// Number of entropy pools. With the power-of-two reseed schedule and at
/// most 10 reseeds per second, the last pool would first drain after more
/// than 13 years.
pub const NUM_POOLS: usize = 32;

/// Minimum bytes pool 0 must hold before a reseed may fire (the SHA-256
/// block size).
pub const MIN_POOL_SIZE: usize = 64;

/// Minimum delay between two reseeds. Keeps attacker-controlled event
/// floods from draining the pools faster than honest entropy arrives.
pub const RESEED_INTERVAL: Duration = Duration::from_millis(100);

/// Events longer than this carry no extra credit and are compressed to
/// their SHA-1 digest before pooling.
pub const MAX_EVENT_SIZE: usize = 32;

// Event frame header: source byte plus truncated original length.
const EVENT_HEADER_LEN: usize = 2;

/// The Fortuna accumulator: a thread-safe source of cryptographically
/// secure random bytes that callers keep fed with unpredictable events.
///
/// Construction requires at least 128 seed bytes; randomness quality over
/// the instance's lifetime depends on the entropy supplied through
/// [`add_random_event`](Self::add_random_event). Two instances built from
/// the same seed produce identical output until their event streams
/// diverge.
#[derive(Debug)]
pub struct Fortuna {
    shared: Arc<Shared>,
    events: Sender<Vec<u8>>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<AccumulatorState>,
    // The generator has its own lock; the accumulator lock is never held
    // across generator calls so event delivery can proceed during reads.
    generator: Generator,
}

#[derive(Debug)]
struct AccumulatorState {
    pools: [CountedPool; NUM_POOLS],
    // Receives the next event; cycles 0..NUM_POOLS independently of
    // reseeds.
    next_pool: usize,
    // Selects which pools the next reseed drains.
    num_reseed: u64,
    // None stands for the epoch, before any reseed.
    last_reseed: Option<SystemTime>,
    // Retained across reseeds to avoid a per-reseed allocation.
    seed_scratch: Vec<u8>,
}

impl Fortuna {
    /// Builds an accumulator from `seed`, which must be at least 128 bytes
    /// so that pool 0 is fully initialized and the rest receive some
    /// material.
    ///
    /// The seed alone does not make the output unpredictable; callers are
    /// expected to deliver real entropy through
    /// [`add_random_event`](Self::add_random_event) for the lifetime of
    /// the instance.
    pub fn new(seed: &[u8]) -> Result<Self, Error> {
        if seed.len() < 2 * MIN_POOL_SIZE {
            return Err(Error::SeedTooShort {
                provided: seed.len(),
                minimum: 2 * MIN_POOL_SIZE,
            });
        }

        let generator = Generator::new(&[]);
        let mut state = AccumulatorState {
            pools: std::array::from_fn(|_| CountedPool::new()),
            next_pool: 0,
            num_reseed: 0,
            last_reseed: None,
            seed_scratch: Vec::new(),
        };

        // Pool 0 gets a full block up front so the initial reseed has
        // something to extract. The first 16 bytes stay zero: they stand
        // in for a timestamp slot that deterministic construction leaves
        // absent.
        let mut pool0 = [0u8; MIN_POOL_SIZE];
        pool0[16..].copy_from_slice(&seed[..MIN_POOL_SIZE - 16]);
        state.deliver(frame_event(0, &pool0));

        // Spread everything past the first 64 bytes over the remaining
        // pools, earlier pools taking one byte more when the split is
        // uneven. Construction delivers synchronously: the reseed below
        // must see every event.
        let mut rest = &seed[MIN_POOL_SIZE..];
        for source in 1..NUM_POOLS {
            let per_pool = rest.len().div_ceil(NUM_POOLS - source);
            state.deliver(frame_event(source as u8, &rest[..per_pool]));
            rest = &rest[per_pool..];
        }

        // Initial reseed, skipping both the pool-size and interval gates.
        // The timestamp lands in last_reseed only; it is never mixed into
        // the pools, which keeps construction deterministic.
        state.reseed(&generator, SystemTime::now());

        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            generator,
        });
        let events = spawn_event_worker(Arc::clone(&shared));
        Ok(Fortuna { shared, events })
    }

    /// Fills `buf` with random bytes, reseeding the generator first when
    /// enough entropy has accumulated. Returns the number of bytes
    /// written, at most 1 MiB per call.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        self.maybe_reseed();
        // The construction-time reseed initialized the generator, so this
        // cannot fail.
        self.shared
            .generator
            .read(buf)
            .expect("generator seeded at construction")
    }

    /// Credits `data` from the given source to the next pool.
    ///
    /// Delivery is handed off to the accumulator's worker thread, so the
    /// call returns without waiting on the accumulator lock and never
    /// serializes behind concurrent readers. The event lands in a pool
    /// eventually, not necessarily before the call returns.
    ///
    /// More than 32 bytes of data carry no additional credit; oversized
    /// events are hashed down before queuing.
    pub fn add_random_event(&self, source: u8, data: &[u8]) {
        let buffer = frame_event(source, data);
        // A send failure means the worker is gone, which only happens
        // during teardown.
        let _ = self.events.send(buffer);
    }

    fn maybe_reseed(&self) {
        let now = SystemTime::now();
        let mut state = self.shared.state.lock().expect("accumulator lock poisoned");
        if state.last_reseed.is_some_and(|last| last > now) {
            // The wall clock rewound past the last reseed. Forget it so
            // the interval gate can pass again.
            state.last_reseed = None;
        }
        let interval_elapsed = match state.last_reseed {
            None => true,
            Some(last) => now > last + RESEED_INTERVAL,
        };
        if state.pools[0].length() >= MIN_POOL_SIZE && interval_elapsed {
            state.reseed(&self.shared.generator, now);
        }
    }
}

impl AccumulatorState {
    fn deliver(&mut self, buffer: Vec<u8>) {
        self.pools[self.next_pool].write(&buffer);
        self.next_pool = (self.next_pool + 1) % NUM_POOLS;
    }

    /// Drains the scheduled pools into the generator and records `now` as
    /// the reseed time.
    fn reseed(&mut self, generator: &Generator, now: SystemTime) {
        self.last_reseed = Some(now);
        self.num_reseed += 1;
        // Pool i participates when 2^i divides the reseed count; the mask
        // grows one bit per pool.
        let mut mask: u64 = 0;
        for pool in &mut self.pools {
            if self.num_reseed & mask != 0 {
                break;
            }
            let digest = pool.drain();
            self.seed_scratch.extend_from_slice(digest.as_slice());
            mask = (mask << 1) | 1;
        }
        generator.write(&self.seed_scratch);
        self.seed_scratch.zeroize();
    }
}

impl Drop for AccumulatorState {
    fn drop(&mut self) {
        self.seed_scratch.zeroize();
    }
}

/// Builds the framed pool record for an event: a two-byte header holding
/// the source and the original length truncated to 8 bits, followed by the
/// payload, or by its SHA-1 digest when the payload exceeds
/// [`MAX_EVENT_SIZE`].
fn frame_event(source: u8, data: &[u8]) -> Vec<u8> {
    let header = [source, data.len() as u8];
    if data.len() > MAX_EVENT_SIZE {
        let digest = Sha1::digest(data);
        let mut buffer = Vec::with_capacity(EVENT_HEADER_LEN + digest.len());
        buffer.extend_from_slice(&header);
        buffer.extend_from_slice(digest.as_slice());
        buffer
    } else {
        let mut buffer = Vec::with_capacity(EVENT_HEADER_LEN + data.len());
        buffer.extend_from_slice(&header);
        buffer.extend_from_slice(data);
        buffer
    }
}

/// Spawns the thread that moves framed events from the channel into the
/// pools. It exits when the owning [`Fortuna`] is dropped and the channel
/// disconnects.
fn spawn_event_worker(shared: Arc<Shared>) -> Sender<Vec<u8>> {
    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    thread::Builder::new()
        .name("fortuna-events".into())
        .spawn(move || {
            while let Ok(buffer) = rx.recv() {
                let mut state = shared.state.lock().expect("accumulator lock poisoned");
                state.deliver(buffer);
            }
        })
        .expect("failed to spawn the fortuna event worker");
    tx
}

impl RngCore for Fortuna {
    fn next_u32(&mut self) -> u32 {
        impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        // Single reads are capped; loop until the request is served.
        let mut filled = 0;
        while filled < dest.len() {
            filled += self.read(&mut dest[filled..]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for Fortuna {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn ramp_seed(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    fn new_fortuna() -> Fortuna {
        Fortuna::new(&ramp_seed(128)).expect("128 byte seed meets the minimum")
    }

    fn num_reseed(fortuna: &Fortuna) -> u64 {
        fortuna.shared.state.lock().unwrap().num_reseed
    }

    #[test]
    fn short_seeds_are_rejected() {
        let err = Fortuna::new(&ramp_seed(2 * MIN_POOL_SIZE - 1)).unwrap_err();
        assert_eq!(
            err,
            Error::SeedTooShort {
                provided: 127,
                minimum: 128,
            }
        );
        assert!(Fortuna::new(&ramp_seed(2 * MIN_POOL_SIZE)).is_ok());
    }

    #[test]
    fn construction_performs_one_reseed() {
        let fortuna = new_fortuna();
        let state = fortuna.shared.state.lock().unwrap();
        assert_eq!(state.num_reseed, 1);
        // The initial reseed drained pool 0; the distribution events in
        // the other pools are untouched. 32 construction events walked
        // next_pool all the way around.
        assert_eq!(state.pools[0].length(), 0);
        assert!(state.pools[1].length() > 0);
        assert_eq!(state.next_pool, 0);
    }

    #[test]
    fn reads_are_capped_at_one_mebibyte() {
        let fortuna = new_fortuna();
        let mut buf = vec![0u8; (1 << 20) + 1];
        assert_eq!(fortuna.read(&mut buf), 1 << 20);
    }

    #[test]
    fn same_seed_same_stream_until_events_diverge() {
        let seed = ramp_seed(200);
        let a = Fortuna::new(&seed).unwrap();
        let b = Fortuna::new(&seed).unwrap();
        let mut out_a = [0u8; 64];
        let mut out_b = [0u8; 64];
        assert_eq!(a.read(&mut out_a), 64);
        assert_eq!(b.read(&mut out_b), 64);
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn successive_small_reads_never_repeat() {
        let fortuna = new_fortuna();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..4 {
            let mut block = [0u8; 4];
            assert_eq!(fortuna.read(&mut block), 4);
            assert!(seen.insert(block), "a 4-byte block repeated");
        }
    }

    #[test]
    fn entropy_and_interval_drive_the_second_reseed() {
        let fortuna = new_fortuna();
        assert_eq!(num_reseed(&fortuna), 1);
        // Every 32nd event lands in pool 0 and credits 34 bytes there, so
        // pool 0 crosses MIN_POOL_SIZE after two laps; the reseed then
        // waits out the 100 ms interval.
        let entropy = [0u8; 32];
        let mut buf = [0u8; 1];
        let deadline = Instant::now() + Duration::from_secs(30);
        while num_reseed(&fortuna) != 2 {
            fortuna.add_random_event(1, &entropy);
            assert_eq!(fortuna.read(&mut buf), 1);
            assert!(Instant::now() < deadline, "second reseed never fired");
        }
    }

    #[test]
    fn events_eventually_reach_the_next_pool() {
        let fortuna = new_fortuna();
        fortuna.add_random_event(7, &[0xAB; 8]);
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            {
                let state = fortuna.shared.state.lock().unwrap();
                if state.pools[0].length() > 0 {
                    // Header plus payload.
                    assert_eq!(state.pools[0].length(), 10);
                    assert_eq!(state.next_pool, 1);
                    break;
                }
            }
            assert!(Instant::now() < deadline, "event never delivered");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn small_events_are_framed_verbatim() {
        assert_eq!(frame_event(3, &[1, 2, 3]), vec![3, 3, 1, 2, 3]);
        assert_eq!(frame_event(9, &[]), vec![9, 0]);
    }

    #[test]
    fn oversized_events_are_hashed_down() {
        let data = [0u8; 33];
        let framed = frame_event(1, &data);
        assert_eq!(framed.len(), EVENT_HEADER_LEN + 20);
        assert_eq!(&framed[..2], &[1, 33]);
        assert_eq!(&framed[2..], Sha1::digest(data).as_slice());
    }

    #[test]
    fn event_length_byte_truncates() {
        let framed = frame_event(5, &[0u8; 300]);
        // 300 % 256
        assert_eq!(framed[1], 44);
    }

    #[test]
    fn reseed_count_schedules_the_pools() {
        let fortuna = new_fortuna();
        let mut state = fortuna.shared.state.lock().unwrap();
        for i in 0..3 {
            state.pools[i].write(&[0u8; MIN_POOL_SIZE]);
        }
        // Reseed #2: 2^0 and 2^1 divide 2, 2^2 does not, so pools 0 and 1
        // drain and pool 2 is left alone.
        state.reseed(&fortuna.shared.generator, SystemTime::now());
        assert_eq!(state.num_reseed, 2);
        assert_eq!(state.pools[0].length(), 0);
        assert_eq!(state.pools[1].length(), 0);
        assert_eq!(state.pools[2].length(), MIN_POOL_SIZE);
        // Reseed #3 is odd, so only pool 0 drains.
        state.pools[0].write(&[0u8; MIN_POOL_SIZE]);
        state.pools[1].write(&[0u8; MIN_POOL_SIZE]);
        state.reseed(&fortuna.shared.generator, SystemTime::now());
        assert_eq!(state.pools[1].length(), MIN_POOL_SIZE);
    }

    #[test]
    fn clock_rewind_resets_the_reseed_time() {
        let fortuna = new_fortuna();
        {
            let mut state = fortuna.shared.state.lock().unwrap();
            state.last_reseed = Some(SystemTime::now() + Duration::from_secs(3600));
        }
        let mut buf = [0u8; 1];
        fortuna.read(&mut buf);
        // Pool 0 is empty so no reseed fired, but the bogus future
        // timestamp must be gone.
        let state = fortuna.shared.state.lock().unwrap();
        assert_eq!(state.last_reseed, None);
        assert_eq!(state.num_reseed, 1);
    }

    #[test]
    fn rng_core_fills_past_the_request_cap() {
        let mut fortuna = new_fortuna();
        let mut buf = vec![0u8; (1 << 20) + 4096];
        fortuna.fill_bytes(&mut buf);
        // The tail past the cap boundary must have been filled by the
        // second inner read.
        assert!(buf[(1 << 20)..].iter().any(|&b| b != 0));
        let word = fortuna.next_u64();
        let other = fortuna.next_u64();
        assert_ne!(word, other);
    }
}
