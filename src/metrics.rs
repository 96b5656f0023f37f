use serde::{ Serialize, Deserialize };

use crate::{
  internal::*,
  scalar::Real,
  tensor::Tensor,
};


/// Number of rows whose greatest logit belongs to the true label.

pub fn hits<T: Real>(logits: &Tensor<T>, labels: &[usize]) -> usize {
  logits.argmax_rows()
    .into_iter()
    .zip(labels)
    .filter(|(pred, &label)| *pred == label )
    .count()
}


/// Summary of one pass over the training data.

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics<T> {
  pub epoch: usize,
  /// Sum of minibatch mean losses divided by the number of examples.
  pub loss: T,
  /// Fraction of correctly classified examples.
  pub accuracy: T,
}


/// Running totals over the minibatches of an epoch.

#[derive(Debug, Clone)]
pub(crate) struct RunningMetrics<T: Real> {
  loss_total: T,
  hits: usize,
  seen: usize,
}

impl<T: Real> RunningMetrics<T> {
  pub fn new() -> Self {
    Self { loss_total: T::zero(), hits: 0, seen: 0 }
  }

  pub fn reset(&mut self) {
    *self = Self::new();
  }

  /// Account for a minibatch whose mean loss was `loss`.

  pub fn record(&mut self, loss: T, batch_len: usize, hits: usize) {
    self.loss_total += loss;
    self.hits += hits;
    self.seen += batch_len;
  }

  pub fn seen(&self) -> usize {
    self.seen
  }

  /// Sum of minibatch losses and hit rate, both over the whole dataset.

  pub fn finish(&self, epoch: usize, dataset_len: usize) -> EpochMetrics<T> {
    debug_assert_eq!(self.seen(), dataset_len, "Epoch ended before covering the dataset");
    let n = count::<T>(dataset_len.max(1));
    EpochMetrics {
      epoch,
      loss: self.loss_total / n,
      accuracy: count::<T>(self.hits) / n,
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn counts_hits() {
    let logits = Tensor::<f32>::new(&[3,2], vec![0.9, 0.1, 0.2, 0.8, 0.6, 0.4]);
    assert_eq!(hits(&logits, &[0, 1, 1]), 2);
  }

  #[test]
  fn average_over_dataset() {
    let mut running = RunningMetrics::<f64>::new();
    running.record(1.0, 8, 8);
    running.record(4.0, 2, 0);
    assert_eq!(running.seen(), 10);
    let metrics = running.finish(0, 10);
    assert_eq!(metrics.loss, 0.5);
    assert_eq!(metrics.accuracy, 0.8);

    running.reset();
    assert_eq!(running.seen(), 0);
    running.record(3.0, 10, 5);
    assert_eq!(running.finish(1, 10).loss, 0.3);
  }

  proptest! {
    #[test]
    fn bounded(batches in prop::collection::vec((0.0f64..50.0, 1usize..16, 0usize..16), 1..20)) {
      let mut running = RunningMetrics::<f64>::new();
      for &(loss, len, hits) in &batches {
        running.record(loss, len, hits.min(len));
      }
      let metrics = running.finish(0, running.seen());
      prop_assert!(metrics.loss >= 0.0);
      prop_assert!(metrics.accuracy >= 0.0 && metrics.accuracy <= 1.0);
    }
  }
}
