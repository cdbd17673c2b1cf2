//! Masking configuration.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use num::{
    bigint::BigUint,
    traits::{pow::Pow, One},
};
use thiserror::Error;

/// The largest supported number of decimal digits kept during the embedding.
pub const MAX_PRECISION: u32 = 18;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid masking configuration: {0}")]
/// Errors related to invalid masking configurations.
pub struct InvalidMaskConfigError(&'static str);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// A masking configuration.
///
/// It determines the finite group `Z_order` in which tensor values are embedded and masked:
/// values are clamped to `[-bound, bound]`, shifted by `bound` and scaled by `10^precision`, so
/// each embedded value is an integer in `[0, 2 * bound * 10^precision]`. The order is large
/// enough that the sum of `max_participants` embedded tensors never wraps around.
pub struct MaskConfig {
    /// The number of decimal digits of a value which survive the embedding.
    pub precision: u32,
    /// The absolute bound of the tensor values.
    pub bound: u64,
    /// The maximal number of masked tensors which may be aggregated.
    pub max_participants: u64,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            precision: 6,
            bound: 100,
            max_participants: 1_000,
        }
    }
}

impl MaskConfig {
    /// Checks the configuration.
    ///
    /// # Errors
    /// Fails if the precision exceeds [`MAX_PRECISION`] or if the bound or the number of
    /// participants is zero.
    pub fn check(&self) -> Result<(), InvalidMaskConfigError> {
        if self.precision > MAX_PRECISION {
            return Err(InvalidMaskConfigError("the precision is too high"));
        }
        if self.bound == 0 {
            return Err(InvalidMaskConfigError("the bound must be positive"));
        }
        if self.max_participants == 0 {
            return Err(InvalidMaskConfigError(
                "at least one participant must be allowed",
            ));
        }
        Ok(())
    }

    /// Gets the scaling factor `10^precision`.
    pub fn exp_shift(&self) -> BigUint {
        BigUint::from(10_u8).pow(self.precision)
    }

    /// Gets the shift which moves bounded values into the non-negative numbers.
    pub fn add_shift(&self) -> BigUint {
        BigUint::from(self.bound)
    }

    /// Gets the order of the finite group.
    pub fn order(&self) -> BigUint {
        BigUint::from(self.max_participants)
            * BigUint::from(2_u8)
            * self.add_shift()
            * self.exp_shift()
            + BigUint::one()
    }
}
