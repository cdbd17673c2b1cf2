//! Masked objects.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use num::{bigint::BigUint, traits::identities::Zero};
use thiserror::Error;

use crate::mask::{config::MaskConfig, tensor::Shape};

#[derive(Error, Debug)]
#[error("the mask tensor is invalid: data is incompatible with its shape or masking configuration")]
/// Errors related to invalid mask tensors.
pub struct InvalidMaskTensorError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// A tensor of elements of the finite group `Z_order`.
///
/// It represents a mask, a masked tensor or reveal material, which are all combined with the same
/// group arithmetic.
pub struct MaskTensor {
    pub shape: Shape,
    pub config: MaskConfig,
    pub data: Vec<BigUint>,
}

impl MaskTensor {
    /// Creates a mask tensor without checking its elements.
    pub fn new_unchecked(config: MaskConfig, shape: Shape, data: Vec<BigUint>) -> Self {
        Self {
            shape,
            config,
            data,
        }
    }

    /// Creates a mask tensor.
    ///
    /// # Errors
    /// Fails if the elements don't conform to the `shape` and the masking configuration.
    pub fn new(
        config: MaskConfig,
        shape: Shape,
        data: Vec<BigUint>,
    ) -> Result<Self, InvalidMaskTensorError> {
        let obj = Self::new_unchecked(config, shape, data);
        if obj.is_valid() {
            Ok(obj)
        } else {
            Err(InvalidMaskTensorError)
        }
    }

    /// Creates the neutral element, a tensor of zeros.
    pub fn zeros(config: MaskConfig, shape: Shape) -> Self {
        let data = vec![BigUint::zero(); shape.len()];
        Self::new_unchecked(config, shape, data)
    }

    /// Checks if the number of elements matches the shape and all elements are group elements.
    pub fn is_valid(&self) -> bool {
        let order = self.config.order();
        self.data.len() == self.shape.len() && self.data.iter().all(|i| i < &order)
    }

    /// Checks if `other` lives in the same group and has the same shape.
    pub fn is_compatible(&self, other: &MaskTensor) -> bool {
        self.config == other.config && self.shape == other.shape
    }

    /// Adds `other` element-wise.
    ///
    /// Both tensors must be valid and compatible, otherwise the result is garbage.
    pub fn add_mask(&mut self, other: &MaskTensor) {
        let order = self.config.order();
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a = (&*a + b) % &order;
        }
    }

    /// Subtracts `other` element-wise.
    ///
    /// Both tensors must be valid and compatible, otherwise the result is garbage.
    pub fn subtract_mask(&mut self, other: &MaskTensor) {
        let order = self.config.order();
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            // PANIC_SAFE: b < order for valid tensors
            *a = (&*a + &order - b) % &order;
        }
    }

    /// Gets the additive inverse.
    pub fn negated(mut self) -> Self {
        let order = self.config.order();
        for a in self.data.iter_mut() {
            *a = (&order - &*a) % &order;
        }
        self
    }
}
