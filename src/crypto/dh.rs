//! Diffie-Hellman key agreement over a discrete-log group.
//!
//! See the [crypto module] documentation since this is a private module anyways.
//!
//! [crypto module]: crate::crypto

use std::fmt;

use derive_more::{Display, From, Into};
use num::{bigint::BigUint, traits::One};
use thiserror::Error;

use crate::crypto::prng::random_integer;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid group parameters: {0}")]
/// Errors related to invalid group parameters.
pub struct InvalidGroupError(&'static str);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// The discrete-log group used for key agreement.
///
/// All participants and the coordinator must use identical parameters. The invariant
/// `modulus > generator > 1` is checked by [`new()`] and by [`validate()`].
///
/// [`new()`]: GroupParameters::new
/// [`validate()`]: GroupParameters::validate
pub struct GroupParameters {
    generator: BigUint,
    modulus: BigUint,
}

impl Default for GroupParameters {
    /// The demo parameters `g = 3`, `p = 100103`.
    ///
    /// A 17-bit modulus offers no protection against a curious coordinator, these parameters only
    /// exist to get a session going locally.
    fn default() -> Self {
        Self {
            generator: BigUint::from(Self::DEFAULT_GENERATOR),
            modulus: BigUint::from(Self::DEFAULT_MODULUS),
        }
    }
}

impl GroupParameters {
    /// The generator of the default group.
    pub const DEFAULT_GENERATOR: u32 = 3;

    /// The modulus of the default group.
    pub const DEFAULT_MODULUS: u32 = 100_103;

    /// Creates group parameters.
    ///
    /// # Errors
    /// Fails unless `modulus > generator > 1`.
    pub fn new(generator: BigUint, modulus: BigUint) -> Result<Self, InvalidGroupError> {
        let group = Self { generator, modulus };
        group.validate()?;
        Ok(group)
    }

    /// Checks the invariant `modulus > generator > 1`.
    ///
    /// Deserialized parameters bypass [`new()`], hence this is checked again whenever an engine
    /// is configured.
    ///
    /// [`new()`]: GroupParameters::new
    pub fn validate(&self) -> Result<(), InvalidGroupError> {
        let one = BigUint::one();
        if self.modulus <= one {
            return Err(InvalidGroupError("the modulus must be greater than 1"));
        }
        if self.generator <= one {
            return Err(InvalidGroupError("the generator must be greater than 1"));
        }
        if self.generator >= self.modulus {
            return Err(InvalidGroupError("the generator must be less than the modulus"));
        }
        Ok(())
    }

    /// Gets the generator.
    pub fn generator(&self) -> &BigUint {
        &self.generator
    }

    /// Gets the modulus.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Checks whether `value` is a non-zero residue modulo the modulus.
    pub fn contains(&self, value: &BigUint) -> bool {
        value >= &BigUint::one() && value < &self.modulus
    }
}

#[derive(Clone, Debug, Display, From, Into, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// The public value `g^x mod p` of a participant.
pub struct PublicKey(BigUint);

impl PublicKey {
    /// Gets the public value.
    pub fn value(&self) -> &BigUint {
        &self.0
    }
}

/// The private exponent `x` of a participant.
///
/// Neither `Clone` nor serializable, it never leaves the engine that drew it.
pub struct PrivateExponent(BigUint);

impl fmt::Debug for PrivateExponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateExponent(..)")
    }
}

impl PrivateExponent {
    /// Wraps a known exponent.
    pub fn new(exponent: BigUint) -> Self {
        Self(exponent)
    }

    /// Draws a private exponent uniformly from `[0, modulus)`.
    pub fn generate(group: &GroupParameters) -> Self {
        Self(random_integer(group.modulus()))
    }

    /// Checks that the exponent is less than the modulus of the `group`.
    pub fn is_valid(&self, group: &GroupParameters) -> bool {
        &self.0 < group.modulus()
    }

    /// Computes the public value `g^x mod p`.
    pub fn public_key(&self, group: &GroupParameters) -> PublicKey {
        PublicKey(group.generator().modpow(&self.0, group.modulus()))
    }

    /// Computes the shared secret `peer^x mod p` with a peer.
    ///
    /// Returns `None` if the peer's public value is not a non-zero residue of the `group`.
    pub fn agree(&self, group: &GroupParameters, peer: &PublicKey) -> Option<SharedSecret> {
        if group.contains(peer.value()) {
            Some(SharedSecret(peer.value().modpow(&self.0, group.modulus())))
        } else {
            None
        }
    }
}

#[derive(Debug)]
/// An ephemeral Diffie-Hellman key pair.
pub struct KeyPair {
    pub public: PublicKey,
    pub secret: PrivateExponent,
}

impl KeyPair {
    /// Generates a fresh key pair in the `group`.
    ///
    /// `sodiumoxide::init()` must have been called before.
    pub fn generate(group: &GroupParameters) -> Self {
        Self::from_secret(group, PrivateExponent::generate(group))
    }

    /// Completes a key pair from a known private exponent.
    pub fn from_secret(group: &GroupParameters, secret: PrivateExponent) -> Self {
        Self {
            public: secret.public_key(group),
            secret,
        }
    }
}

#[derive(PartialEq, Eq)]
/// A secret `g^(x_i * x_j) mod p` shared by two participants.
pub struct SharedSecret(BigUint);

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

impl SharedSecret {
    /// Gets the secret value, which seeds the pairwise mask.
    pub fn value(&self) -> &BigUint {
        &self.0
    }
}
