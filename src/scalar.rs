use rand::distributions::uniform::SampleUniform;
use num_traits::{ Float, NumAssignOps, Num, NumCast };
use serde::{ Serialize, de::DeserializeOwned };

use crate::tensor::Gemm;


/// All types that may be stored in a [Tensor](crate::Tensor).
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Inner: PartialEq + Clone + Copy + Send + Sync + std::fmt::Debug {}
impl<T: PartialEq + Clone + Copy + Send + Sync + std::fmt::Debug> Inner for T {}


/// All numeric types.
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Numeric: Inner + PartialOrd + Num + NumCast + NumAssignOps + std::iter::Sum {}
impl<T: Inner + PartialOrd + Num + NumCast + NumAssignOps + std::iter::Sum> Numeric for T {}


/// Floating point types that models can be trained with.
///
/// In practice these are `f32` and `f64`, the types that have a
/// matrix multiplication kernel ([Gemm]) and round-trip exactly
/// through serialization.

pub trait Real: Numeric + Float + SampleUniform + Gemm + Serialize + DeserializeOwned {}
impl<T: Numeric + Float + SampleUniform + Gemm + Serialize + DeserializeOwned> Real for T {}
