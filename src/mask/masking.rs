//! Embedding, aggregation and unmasking of tensors.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use std::convert::TryFrom;

use num::{
    bigint::{BigInt, ToBigInt},
    clamp,
    rational::Ratio,
    traits::ToPrimitive,
};
use thiserror::Error;

use crate::mask::{
    config::MaskConfig,
    object::MaskTensor,
    tensor::{Shape, Tensor},
};

#[derive(Debug, Error, Eq, PartialEq)]
/// Errors related to the unmasking of aggregated tensors.
pub enum UnmaskingError {
    #[error("there is no tensor to unmask")]
    NoTensor,

    #[error("too many tensors were aggregated for the current masking configuration")]
    TooManyTensors,

    #[error("the unmasked value {0} cannot be represented as a float")]
    Unrepresentable(Ratio<BigInt>),
}

#[derive(Debug, Error, Eq, PartialEq)]
/// Errors related to the aggregation of masked tensors and reveal material.
pub enum AggregationError {
    #[error("the object to aggregate is invalid")]
    InvalidObject,

    #[error("the object to aggregate has an incompatible shape or masking configuration")]
    Mismatch,

    #[error("too many tensors were aggregated for the current masking configuration")]
    TooManyTensors,
}

/// Embeds a tensor into the finite group of the masking configuration.
///
/// The embedding proceeds in the following steps:
/// - Clamp the values to `[-bound, bound]`.
/// - Shift the values into the non-negative reals.
/// - Scale the values by `10^precision` and round them to the nearest integer.
///
/// Values which are multiples of `10^-precision` are embedded exactly.
pub fn embed(tensor: &Tensor, config: MaskConfig) -> MaskTensor {
    let add_shift = Ratio::from_integer(BigInt::from(config.bound));
    let exp_shift = Ratio::from_integer(BigInt::from(config.exp_shift()));
    let lower_bound = -&add_shift;
    let data = tensor
        .iter()
        .map(|value| {
            // UNWRAP_SAFE: tensor values are finite
            let ratio = Ratio::<BigInt>::from_float(*value).unwrap();
            let clamped = clamp(ratio, lower_bound.clone(), add_shift.clone());
            // UNWRAP_SAFE: the shifted value is non-negative
            ((clamped + &add_shift) * &exp_shift)
                .round()
                .to_integer()
                .to_biguint()
                .unwrap()
        })
        .collect();
    MaskTensor::new_unchecked(config, tensor.shape().clone(), data)
}

#[derive(Debug, Clone)]
/// An aggregator for masked tensors and reveal material.
///
/// Masked tensors are counted, since unmasking must remove the embedding shift once per tensor.
/// Reveal material (negated self-masks and partial reveals) is added without being counted.
pub struct Aggregation {
    nb_tensors: usize,
    object: MaskTensor,
}

impl TryFrom<MaskTensor> for Aggregation {
    type Error = AggregationError;

    /// Starts an aggregation from a single masked tensor.
    ///
    /// # Errors
    /// Fails if the `object` is invalid.
    fn try_from(object: MaskTensor) -> Result<Self, Self::Error> {
        if !object.is_valid() {
            return Err(AggregationError::InvalidObject);
        }
        Ok(Self {
            nb_tensors: 1,
            object,
        })
    }
}

impl From<Aggregation> for MaskTensor {
    fn from(aggr: Aggregation) -> Self {
        aggr.object
    }
}

impl Aggregation {
    /// Creates a new, empty aggregator.
    pub fn new(config: MaskConfig, shape: Shape) -> Self {
        Self {
            nb_tensors: 0,
            object: MaskTensor::zeros(config, shape),
        }
    }

    /// Gets the number of aggregated masked tensors.
    pub fn nb_tensors(&self) -> usize {
        self.nb_tensors
    }

    /// Gets the shape of the aggregated tensors.
    pub fn shape(&self) -> &Shape {
        &self.object.shape
    }

    /// Gets the masking configuration of the aggregator.
    pub fn config(&self) -> MaskConfig {
        self.object.config
    }

    fn validate_object(&self, object: &MaskTensor) -> Result<(), AggregationError> {
        if !self.object.is_compatible(object) {
            return Err(AggregationError::Mismatch);
        }
        if !object.is_valid() {
            return Err(AggregationError::InvalidObject);
        }
        Ok(())
    }

    /// Validates if the masked tensor `object` may be aggregated.
    ///
    /// # Errors
    /// Fails if the shapes or masking configurations don't coincide, if the `object` is invalid
    /// or if aggregating it would exceed the number of tensors the configuration allows.
    pub fn validate_aggregation(&self, object: &MaskTensor) -> Result<(), AggregationError> {
        self.validate_object(object)?;
        if self.nb_tensors as u64 >= self.object.config.max_participants {
            return Err(AggregationError::TooManyTensors);
        }
        Ok(())
    }

    /// Aggregates a masked tensor.
    ///
    /// # Errors
    /// Fails if [`validate_aggregation()`] fails.
    ///
    /// [`validate_aggregation()`]: Aggregation::validate_aggregation
    pub fn aggregate(&mut self, object: MaskTensor) -> Result<(), AggregationError> {
        self.validate_aggregation(&object)?;
        self.object.add_mask(&object);
        self.nb_tensors += 1;
        Ok(())
    }

    /// Adds reveal material, i.e. the output of a self-secret or a partial reveal.
    ///
    /// # Errors
    /// Fails if the shapes or masking configurations don't coincide or if the `reveal` is
    /// invalid.
    pub fn add_reveal(&mut self, reveal: MaskTensor) -> Result<(), AggregationError> {
        self.validate_object(&reveal)?;
        self.object.add_mask(&reveal);
        Ok(())
    }

    /// Validates if the aggregate may be unmasked.
    pub fn validate_unmasking(&self) -> Result<(), UnmaskingError> {
        if self.nb_tensors == 0 {
            return Err(UnmaskingError::NoTensor);
        }
        if self.nb_tensors as u64 > self.object.config.max_participants {
            return Err(UnmaskingError::TooManyTensors);
        }
        Ok(())
    }

    /// Decodes the aggregate into the sum of the aggregated tensors.
    ///
    /// This yields the true sum only once every mask has been cancelled, i.e. after all
    /// self-secrets and the partial reveals for every dropped peer have been added. The result is
    /// exact up to the embedding precision.
    ///
    /// # Errors
    /// Fails if [`validate_unmasking()`] fails or a decoded value overflows a float.
    ///
    /// [`validate_unmasking()`]: Aggregation::validate_unmasking
    pub fn unmask(self) -> Result<Tensor, UnmaskingError> {
        self.validate_unmasking()?;
        let MaskTensor {
            shape,
            config,
            data,
        } = self.object;
        let exp_shift = Ratio::from_integer(BigInt::from(config.exp_shift()));
        let scaled_add_shift =
            Ratio::from_integer(BigInt::from(config.bound) * BigInt::from(self.nb_tensors));
        let values = data
            .into_iter()
            .map(|n| {
                // UNWRAP_SAFE: to_bigint never fails for BigUint
                let ratio = Ratio::from_integer(n.to_bigint().unwrap());
                let value = ratio / &exp_shift - &scaled_add_shift;
                value
                    .to_f64()
                    .filter(|value| value.is_finite())
                    .ok_or(UnmaskingError::Unrepresentable(value))
            })
            .collect::<Result<Vec<_>, _>>()?;
        // UNWRAP_SAFE: the object is valid, hence the element count matches the shape, and all
        // values are finite
        Ok(Tensor::new(shape, values).unwrap())
    }
}
