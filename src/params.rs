use std::collections::BTreeMap;

use serde::{ Serialize, Deserialize };

use crate::{
  scalar::Real,
  tensor::Tensor,
};


/// Named collection of tensors, ordered by name.
///
/// Used both for a model's learned parameters (its state dict) and for the
/// gradients a backward pass produces for them. Both share the same keys:
/// `"{layer}.weight"` and `"{layer}.bias"` for every dense layer.

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[serde(bound = "T: Real")]
pub struct TensorMap<T: Real> {
  tensors: BTreeMap<String, Tensor<T>>,
}

/// A model's learned weights and biases.
pub type Parameters<T> = TensorMap<T>;

/// Gradients of the loss w.r.t. a model's [Parameters].
pub type Gradients<T> = TensorMap<T>;

impl<T: Real> TensorMap<T> {
  pub fn new() -> Self {
    Self { tensors: BTreeMap::new() }
  }

  pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor<T>) -> Option<Tensor<T>> {
    self.tensors.insert(name.into(), tensor)
  }

  pub fn get(&self, name: &str) -> Option<&Tensor<T>> {
    self.tensors.get(name)
  }

  pub fn remove(&mut self, name: &str) -> Option<Tensor<T>> {
    self.tensors.remove(name)
  }

  pub fn len(&self) -> usize {
    self.tensors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tensors.is_empty()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.tensors.keys().map(|name| name.as_str() )
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor<T>)> {
    self.tensors.iter().map(|(name, tensor)| (name.as_str(), tensor) )
  }

  /// Total number of scalars across all tensors.

  pub fn size(&self) -> usize {
    self.tensors.values().map(|tensor| tensor.size() ).sum()
  }

  /// Euclidean norm over all tensors, as if they were one long vector.

  pub fn norm(&self) -> T {
    self.tensors.values()
      .flat_map(|tensor| tensor.raw().iter() )
      .map(|&a| a * a )
      .sum::<T>()
      .sqrt()
  }

  /// Same names, same shapes and every value within `tolerance`.

  pub fn all_close(&self, rhs: &Self, tolerance: T) -> bool {
    self.len() == rhs.len() && self.iter()
      .all(|(name, tensor)| rhs.get(name)
        .map_or(false, |other| tensor.all_close(other, tolerance) ))
  }
}

impl<T: Real> IntoIterator for TensorMap<T> {
  type Item = (String, Tensor<T>);
  type IntoIter = std::collections::btree_map::IntoIter<String, Tensor<T>>;

  fn into_iter(self) -> Self::IntoIter {
    self.tensors.into_iter()
  }
}

impl<T: Real> FromIterator<(String, Tensor<T>)> for TensorMap<T> {
  fn from_iter<I: IntoIterator<Item = (String, Tensor<T>)>>(iter: I) -> Self {
    Self { tensors: iter.into_iter().collect() }
  }
}
