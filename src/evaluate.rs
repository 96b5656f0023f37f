use log::debug;
use serde::{ Serialize, Deserialize };

use crate::{
  internal::*,
  dataset::Dataset,
  error::Result,
  loss::cross_entropy_loss,
  metrics::hits,
  model::Model,
  scalar::Real,
  train::check,
};


/// Loss and accuracy of a model on held-out data.

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation<T> {
  pub loss: T,
  pub accuracy: T,
}


/// Mean cross-entropy of `model` on `dataset`.
///
/// Switches the model to [Mode::Eval](crate::Mode::Eval) and leaves it there.
/// Parameters are never touched and no gradients are computed.

pub fn evaluate<T: Real>(model: &mut Model<T>, dataset: &Dataset<T>) -> Result<T> {
  score(model, dataset).map(|evaluation| evaluation.loss )
}

/// Like [evaluate], but also reports accuracy.

pub fn score<T: Real>(model: &mut Model<T>, dataset: &Dataset<T>) -> Result<Evaluation<T>> {
  check(model, dataset)?;
  model.eval();
  let logits = model.forward(dataset.features())?;
  let loss = cross_entropy_loss(&logits, dataset.labels())?;
  let accuracy = count::<T>(hits(&logits, dataset.labels())) / count::<T>(dataset.len());
  debug!("Evaluated {} examples: loss {:.5?}, accuracy {:.4?}", dataset.len(), loss, accuracy);
  Ok(Evaluation { loss, accuracy })
}
