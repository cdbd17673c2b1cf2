//! Key agreement and pseudorandomness.
//!
//! Participants agree on pairwise secrets with a Diffie-Hellman exchange in the multiplicative
//! group of integers modulo a prime `p` with generator `g`. Every participant draws a private
//! exponent `x` and publishes `g^x mod p`. Two participants `i` and `j` then both obtain the
//! shared secret `g^(x_i * x_j) mod p`.
//!
//! Randomness for private exponents and seeds comes from [sodiumoxide]. Pseudorandom masks are
//! derived with the `ChaCha20` stream cipher keyed by a `SHA256` digest of the seed.
//!
//! # Examples
//! ```
//! # use secagg_client::crypto::{GroupParameters, KeyPair};
//! sodiumoxide::init().unwrap();
//! let group = GroupParameters::default();
//! let alice = KeyPair::generate(&group);
//! let bob = KeyPair::generate(&group);
//! assert_eq!(
//!     alice.secret.agree(&group, &bob.public).unwrap(),
//!     bob.secret.agree(&group, &alice.public).unwrap(),
//! );
//! ```
//!
//! [sodiumoxide]: https://docs.rs/sodiumoxide/

pub(crate) mod dh;
pub(crate) mod hash;
pub(crate) mod prng;

pub use self::{
    dh::{GroupParameters, InvalidGroupError, KeyPair, PrivateExponent, PublicKey, SharedSecret},
    hash::Sha256,
    prng::{generate_integer, random_integer},
};
