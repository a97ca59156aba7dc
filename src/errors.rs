use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

/// Errors reported at the crate boundary.
///
/// Anything else that can go wrong internally (an AES key whose length
/// matches no variant, a misused hash) is a broken invariant and panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The accumulator was constructed with fewer seed bytes than the
    /// minimum needed to initialize the pools.
    SeedTooShort { provided: usize, minimum: usize },
    /// The generator was read before any seed material was written to it.
    NotSeeded,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::SeedTooShort { provided, minimum } => write!(
                f,
                "initial seed is too short, provide at least {minimum} bytes (got {provided})"
            ),
            Error::NotSeeded => write!(f, "generator is not seeded"),
        }
    }
}

impl StdError for Error {}
