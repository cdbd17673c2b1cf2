//! Tensor representation.
//!
//! See the [mask module] documentation since this is a private module anyways.
//!
//! [mask module]: crate::mask

use std::{convert::TryFrom, fmt, slice::Iter};

use derive_more::{From, Into};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, From, Into, Serialize, Deserialize)]
/// The dimensions of a tensor.
pub struct Shape(Vec<usize>);

impl Shape {
    /// Creates a shape from its dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    /// Gets the dimensions.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Gets the number of elements of a tensor of this shape.
    ///
    /// The empty shape describes a scalar and has one element.
    pub fn len(&self) -> usize {
        self.0.iter().product()
    }

    /// Checks whether a tensor of this shape has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, ")")
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
/// Errors related to the construction of tensors.
pub enum TensorError {
    #[error("a tensor of shape {shape} needs {expected} values, got {actual}")]
    LengthMismatch {
        shape: Shape,
        expected: usize,
        actual: usize,
    },

    #[error("the value {value} at index {index} is not finite")]
    NonFinite { index: usize, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TensorData")]
/// A fixed-shape array of finite real numbers, stored in row-major order.
///
/// Deserialization is checked like [`Tensor::new()`].
pub struct Tensor {
    shape: Shape,
    data: Vec<f64>,
}

#[derive(Deserialize)]
/// The unchecked wire form of a [`Tensor`].
struct TensorData {
    shape: Shape,
    data: Vec<f64>,
}

impl TryFrom<TensorData> for Tensor {
    type Error = TensorError;

    fn try_from(TensorData { shape, data }: TensorData) -> Result<Self, Self::Error> {
        Tensor::new(shape, data)
    }
}

impl Tensor {
    /// Creates a tensor.
    ///
    /// # Errors
    /// Fails if the number of values doesn't match the `shape` or if a value is not finite.
    pub fn new(shape: Shape, data: Vec<f64>) -> Result<Self, TensorError> {
        if shape.len() != data.len() {
            return Err(TensorError::LengthMismatch {
                expected: shape.len(),
                actual: data.len(),
                shape,
            });
        }
        if let Some((index, value)) = data.iter().enumerate().find(|(_, value)| !value.is_finite())
        {
            return Err(TensorError::NonFinite {
                index,
                value: *value,
            });
        }
        Ok(Self { shape, data })
    }

    /// Creates a tensor with all values set to zero.
    pub fn zeros(shape: Shape) -> Self {
        Self::filled(shape, 0.0)
    }

    /// Creates a tensor with all values set to `value`.
    ///
    /// # Panics
    /// Panics if `value` is not finite.
    pub fn filled(shape: Shape, value: f64) -> Self {
        assert!(value.is_finite(), "tensor values must be finite");
        Self {
            data: vec![value; shape.len()],
            shape,
        }
    }

    /// Gets the shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Gets the values in row-major order.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Creates an iterator over the values in row-major order.
    pub fn iter(&self) -> Iter<f64> {
        self.data.iter()
    }

    /// Consumes the tensor into its values.
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }
}
