//! Embedding, masking, aggregation and unmasking of tensors.
//!
//! # Tensors
//! A [`Tensor`] is a fixed-[`Shape`] array of finite real numbers. Its meaning is up to the
//! application, e.g. the weights of a local model update.
//!
//! # Masking configurations
//! Masks only cancel exactly in a finite group, hence tensors are embedded into the integers
//! modulo an order before they are masked. The [`MaskConfig`] decides on the embedding:
//! - `precision`: the number of decimal digits which survive the embedding.
//! - `bound`: values are clamped to `[-bound, bound]`.
//! - `max_participants`: the maximal number of tensors whose sum is still representable.
//!
//! Every participant and the coordinator must use the same configuration.
//!
//! # Masks
//! A mask is a [`MaskTensor`] whose elements are drawn uniformly from the group by a `ChaCha20`
//! stream keyed with a [`MaskSeed`]. The same seed, shape and configuration always yield the same
//! mask, on every platform.
//!
//! ```
//! # use num::bigint::BigUint;
//! # use secagg_client::mask::{MaskConfig, MaskSeed, Shape};
//! let shape = Shape::new(vec![2, 3]);
//! let seed = MaskSeed::new(BigUint::from(4711_u32));
//! let mask = seed.derive_mask(&shape, MaskConfig::default());
//! assert_eq!(mask, seed.derive_mask(&shape, MaskConfig::default()));
//! assert!(mask.is_valid());
//! ```
//!
//! # Aggregation and unmasking
//! Masked tensors and reveal material are summed with an [`Aggregation`]. Once every mask is
//! cancelled, [`Aggregation::unmask()`] decodes the sum of the embedded tensors.
//!
//! ```
//! # use num::bigint::BigUint;
//! # use secagg_client::mask::{embed, Aggregation, MaskConfig, MaskSeed, Shape, Tensor};
//! let config = MaskConfig::default();
//! let shape = Shape::new(vec![3]);
//! let tensor = Tensor::new(shape.clone(), vec![0.5, -1.25, 3.0]).unwrap();
//! let mask = MaskSeed::new(BigUint::from(7_u32)).derive_mask(&shape, config);
//!
//! let mut masked = embed(&tensor, config);
//! masked.add_mask(&mask);
//!
//! let mut aggregation = Aggregation::new(config, shape);
//! aggregation.aggregate(masked).unwrap();
//! aggregation.add_reveal(mask.negated()).unwrap();
//! assert_eq!(aggregation.unmask().unwrap(), tensor);
//! ```

pub(crate) mod config;
pub(crate) mod masking;
pub(crate) mod object;
pub(crate) mod seed;
pub(crate) mod tensor;

pub use self::{
    config::{InvalidMaskConfigError, MaskConfig, MAX_PRECISION},
    masking::{embed, Aggregation, AggregationError, UnmaskingError},
    object::{InvalidMaskTensorError, MaskTensor},
    seed::MaskSeed,
    tensor::{Shape, Tensor, TensorError},
};
