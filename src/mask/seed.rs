//! Mask seed and mask generation.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use std::{fmt, iter};

use num::bigint::BigUint;

use crate::{
    crypto::{
        dh::{GroupParameters, SharedSecret},
        prng::{generate_integer, mask_stream, random_integer},
    },
    mask::{config::MaskConfig, object::MaskTensor, tensor::Shape},
};

/// A seed to generate a mask.
///
/// Pairwise masks are seeded by a [`SharedSecret`], the self-mask by a private random seed.
pub struct MaskSeed(BigUint);

impl fmt::Debug for MaskSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MaskSeed(..)")
    }
}

impl From<&SharedSecret> for MaskSeed {
    fn from(secret: &SharedSecret) -> Self {
        Self(secret.value().clone())
    }
}

impl MaskSeed {
    /// Wraps a known seed.
    pub fn new(seed: BigUint) -> Self {
        Self(seed)
    }

    /// Draws a seed uniformly from `[0, modulus)` of the `group`.
    ///
    /// `sodiumoxide::init()` must have been called before.
    pub fn generate(group: &GroupParameters) -> Self {
        Self(random_integer(group.modulus()))
    }

    /// Gets the seed value.
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    /// Derives a mask of the given `shape` from this seed wrt the masking configuration.
    ///
    /// The mask elements are uniform in `[0, order)` and depend on nothing but the seed, the
    /// shape and the configuration.
    pub fn derive_mask(&self, shape: &Shape, config: MaskConfig) -> MaskTensor {
        derive_mask(&self.0, shape, config)
    }
}

/// Derives the mask of an integer `seed`.
pub(crate) fn derive_mask(seed: &BigUint, shape: &Shape, config: MaskConfig) -> MaskTensor {
    let order = config.order();
    let mut prng = mask_stream(seed);
    let data = iter::repeat_with(|| generate_integer(&mut prng, &order))
        .take(shape.len())
        .collect();
    MaskTensor::new_unchecked(config, shape.clone(), data)
}
