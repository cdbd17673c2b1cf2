//! Wrappers around some of the [sodiumoxide] hashing primitives.
//!
//! See the [crypto module] documentation since this is a private module anyways.
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/
//! [crypto module]: crate::crypto

use derive_more::From;
use sodiumoxide::crypto::hash::sha256;

#[derive(From, Hash, Eq, Ord, PartialEq, Copy, Clone, PartialOrd, Debug)]
/// A digest of the `SHA256` hash function.
pub struct Sha256(sha256::Digest);

impl Sha256 {
    /// Length in bytes of a digest.
    pub const LENGTH: usize = sha256::DIGESTBYTES;

    /// Computes the digest of the message `m`.
    pub fn hash(m: &[u8]) -> Self {
        Self(sha256::hash(m))
    }

    /// Computes the digest of the concatenation of the given `parts`.
    pub fn hash_parts(parts: &[&[u8]]) -> Self {
        let mut state = sha256::State::new();
        for part in parts {
            state.update(part);
        }
        Self(state.finalize())
    }

    /// Gets the digest as an array.
    pub fn as_array(&self) -> [u8; Self::LENGTH] {
        (self.0).0
    }

    /// Gets the digest byte representation.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }
}
