use log::debug;

use crate::{
  internal::*,
  error::{ Error, Result },
  scalar::Real,
  tensor::Tensor,
};


/// Labeled examples: a `[N, F]` feature matrix and one class label per row.
///
/// Every feature value lies in `[0, 1]` and every label is smaller than
/// the number of classes. Both are checked once, on construction.

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<T: Real> {
  features: Tensor<T>,
  labels: Vec<usize>,
  classes: usize,
}

impl<T: Real> Dataset<T> {
  pub fn new(features: Tensor<T>, labels: Vec<usize>, classes: usize) -> Result<Self> {
    let rows = if features.rank() == 2 { features.shape()[0] } else { 0 };
    if features.rank() != 2 || rows != labels.len() {
      return Err(Error::LabelCount { rows, labels: labels.len() })
    }
    if let Some(&label) = labels.iter().find(|&&label| label >= classes ) {
      return Err(Error::LabelOutOfRange { label, classes })
    }
    let width = features.shape().cols().max(1);
    let outlier = features.raw()
      .iter()
      .position(|&value| !(value >= T::zero() && value <= T::one()) );
    if let Some(index) = outlier {
      return Err(Error::FeatureOutOfRange {
        example: index / width,
        value: features.raw()[index].to_f64().unwrap_or(f64::NAN),
      })
    }
    Ok(Self { features, labels, classes })
  }

  /// Build from individual feature vectors, which must all be `width` long.

  pub fn from_rows(rows: &[Vec<T>], width: usize, labels: Vec<usize>, classes: usize) -> Result<Self> {
    if let Some(row) = rows.iter().find(|row| row.len() != width ) {
      return Err(Error::ShapeMismatch { expected: width, got: row.len() })
    }
    Self::new(Tensor::rows(rows, width), labels, classes)
  }

  /// Build from raw 8-bit pixel intensities, scaled into `[0, 1]`.

  pub fn from_pixels(pixels: &[u8], width: usize, labels: Vec<usize>, classes: usize) -> Result<Self> {
    if width == 0 || pixels.len() % width != 0 {
      return Err(Error::ShapeMismatch { expected: width, got: pixels.len() })
    }
    let scale = real::<T>(255.0);
    let data = pixels.iter()
      .map(|&pixel| count::<T>(pixel as usize) / scale )
      .collect();
    Self::new(Tensor::new(&[pixels.len() / width, width], data), labels, classes)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  /// Length `F` of every feature vector.

  pub fn feature_len(&self) -> usize {
    self.features.shape()[1]
  }

  pub fn classes(&self) -> usize {
    self.classes
  }

  pub fn features(&self) -> &Tensor<T> {
    &self.features
  }

  pub fn labels(&self) -> &[usize] {
    &self.labels
  }

  pub fn example(&self, index: usize) -> (&[T], usize) {
    (self.features.row(index), self.labels[index])
  }

  /// Contiguous minibatches of `batch_size` examples, in dataset order.
  /// The last one holds the remainder and may be shorter.

  pub fn batches(&self, batch_size: usize) -> Result<Batches<'_, T>> {
    if batch_size == 0 { return Err(Error::InvalidBatchSize(batch_size)) }
    Ok(Batches { dataset: self, batch_size, offset: 0 })
  }

  /// Partition into the first `at` examples and the rest.

  pub fn split(&self, at: usize) -> (Self, Self) {
    let at = at.min(self.len());
    let head = Self {
      features: self.features.row_range(0..at),
      labels: self.labels[..at].to_vec(),
      classes: self.classes,
    };
    let tail = Self {
      features: self.features.row_range(at..self.len()),
      labels: self.labels[at..].to_vec(),
      classes: self.classes,
    };
    debug!("Split {} examples into {} and {}", self.len(), head.len(), tail.len());
    (head, tail)
  }

  /// Partition off the leading `fraction` of examples, e.g. for a
  /// train/validation split.

  pub fn split_fraction(&self, fraction: f64) -> (Self, Self) {
    let at = (self.len() as f64 * fraction.clamp(0.0, 1.0)).round() as usize;
    self.split(at)
  }
}


/// A contiguous slice of a [Dataset].

#[derive(Debug, Clone)]
pub struct Minibatch<'a, T: Real> {
  pub features: Tensor<T>,
  pub labels: &'a [usize],
}

impl<'a, T: Real> Minibatch<'a, T> {
  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }
}


/// Iterator over the minibatches of a [Dataset].

#[derive(Debug)]
pub struct Batches<'a, T: Real> {
  dataset: &'a Dataset<T>,
  batch_size: usize,
  offset: usize,
}

impl<'a, T: Real> Iterator for Batches<'a, T> {
  type Item = Minibatch<'a, T>;

  fn next(&mut self) -> Option<Self::Item> {
    let start = self.offset;
    if start >= self.dataset.len() { return None }
    let end = (start + self.batch_size).min(self.dataset.len());
    self.offset = end;
    Some(Minibatch {
      features: self.dataset.features.row_range(start..end),
      labels: &self.dataset.labels[start..end],
    })
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let remaining = self.dataset.len().saturating_sub(self.offset);
    let count = (remaining + self.batch_size - 1) / self.batch_size;
    (count, Some(count))
  }
}

impl<'a, T: Real> ExactSizeIterator for Batches<'a, T> {}
