use log::{ info, debug };
use serde::{ Serialize, Deserialize };

use crate::{
  config::TrainConfig,
  dataset::Dataset,
  error::{ Error, Result },
  loss::cross_entropy,
  metrics::{ hits, EpochMetrics, RunningMetrics },
  model::Model,
  optimize::{ Optimizer, Strategy },
  scalar::Real,
};


/// Everything recorded during a training run.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Real")]
pub struct History<T: Real> {
  /// Mean loss of every minibatch, in processing order across all epochs.
  pub losses: Vec<T>,
  pub epochs: Vec<EpochMetrics<T>>,
}

impl<T: Real> History<T> {
  pub fn last_epoch(&self) -> Option<&EpochMetrics<T>> {
    self.epochs.last()
  }
}


/// Make sure `dataset` can be fed to `model` before anything is changed.

pub(crate) fn check<T: Real>(model: &Model<T>, dataset: &Dataset<T>) -> Result<()> {
  if dataset.is_empty() { return Err(Error::EmptyDataset) }
  if dataset.feature_len() != model.inputs() {
    return Err(Error::ShapeMismatch { expected: model.inputs(), got: dataset.feature_len() })
  }
  let classes = model.outputs();
  match dataset.labels().iter().find(|&&label| label >= classes ) {
    Some(&label) => Err(Error::LabelOutOfRange { label, classes }),
    None => Ok(()),
  }
}

/// Run `num_epochs` passes over `dataset` in minibatches of `batch_size`,
/// updating `model` after every minibatch.
///
/// Returns the loss of every minibatch in the order they were processed.
/// Fails before touching any parameter if the data doesn't fit the model.

pub fn train<T, S>(
  model: &mut Model<T>,
  dataset: &Dataset<T>,
  num_epochs: usize,
  batch_size: usize,
  optimizer: &mut Optimizer<T, S>,
) -> Result<Vec<T>>
where
  T: Real,
  S: Strategy<T>,
{
  fit(model, dataset, num_epochs, batch_size, optimizer).map(|history| history.losses )
}

fn fit<T, S>(
  model: &mut Model<T>,
  dataset: &Dataset<T>,
  num_epochs: usize,
  batch_size: usize,
  optimizer: &mut Optimizer<T, S>,
) -> Result<History<T>>
where
  T: Real,
  S: Strategy<T>,
{
  check(model, dataset)?;
  let num_batches = dataset.batches(batch_size)?.len();

  model.train();

  let mut history = History {
    losses: Vec::with_capacity(num_epochs * num_batches),
    epochs: Vec::with_capacity(num_epochs),
  };
  let mut running = RunningMetrics::new();

  for epoch in 0..num_epochs {
    running.reset();

    for (i, batch) in dataset.batches(batch_size)?.enumerate() {
      let (logits, trace) = model.forward_traced(&batch.features)?;
      let (loss, grad) = cross_entropy(&logits, batch.labels)?;
      running.record(loss, batch.len(), hits(&logits, batch.labels));

      // Gradients are fresh for every minibatch and consumed by the step
      let gradients = model.backward(trace, grad);
      optimizer.step(model, gradients)?;

      debug!("Epoch {} batch {}/{}: loss {:.5?}", epoch, i + 1, num_batches, loss);
      history.losses.push(loss);
    }

    let metrics = running.finish(epoch, dataset.len());
    info!("Epoch {}: average loss {:.5?}, accuracy {:.4?}", epoch, metrics.loss, metrics.accuracy);
    history.epochs.push(metrics);
  }

  Ok(history)
}


/// Runs training as described by a [TrainConfig].

#[derive(Debug, Clone, Default)]
pub struct Trainer {
  pub config: TrainConfig,
}

impl Trainer {
  pub fn new(config: TrainConfig) -> Self {
    Self { config }
  }

  /// Train with the optimizer named in the config.

  pub fn train<T: Real>(&self, model: &mut Model<T>, dataset: &Dataset<T>) -> Result<History<T>> {
    let mut optimizer = self.config.optimizer();
    self.train_with(model, dataset, &mut optimizer)
  }

  pub fn train_with<T, S>(&self, model: &mut Model<T>, dataset: &Dataset<T>, optimizer: &mut Optimizer<T, S>) -> Result<History<T>>
  where
    T: Real,
    S: Strategy<T>,
  {
    self.config.validate()?;
    fit(model, dataset, self.config.num_epochs, self.config.batch_size, optimizer)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    layer::Mode,
    loss::cross_entropy_loss,
    optimize::SGD,
    tensor::Tensor,
  };

  fn dataset() -> Dataset<f64> {
    let features = Tensor::new(&[5,3], vec![
      0.1, 0.9, 0.0,
      0.8, 0.2, 0.1,
      0.0, 0.1, 1.0,
      0.9, 0.0, 0.3,
      0.2, 0.7, 0.6,
    ]);
    Dataset::new(features, vec![1, 0, 2, 0, 1], 3).unwrap()
  }

  #[test]
  fn loss_per_minibatch() {
    let mut model = Model::mlp(&[3, 4, 3], None, 0).unwrap();
    let mut optimizer = Optimizer::new(0.1, SGD);
    let losses = train(&mut model, &dataset(), 3, 2, &mut optimizer).unwrap();
    assert_eq!(losses.len(), 3 * 3);
    assert_eq!(optimizer.steps(), 9);
    assert!(losses.iter().all(|loss| loss.is_finite() && *loss >= 0.0 ));
  }

  #[test]
  fn matches_manual_fresh_gradient_steps() {
    let data = dataset();
    let mut trained = Model::mlp(&[3, 4, 3], None, 3).unwrap();
    let mut manual = trained.clone();

    let losses = train(&mut trained, &data, 2, 2, &mut Optimizer::new(0.5, SGD)).unwrap();

    let mut optimizer = Optimizer::new(0.5, SGD);
    let mut expected = vec![];
    for _ in 0..2 {
      for batch in data.batches(2).unwrap() {
        let (logits, trace) = manual.forward_traced(&batch.features).unwrap();
        let (loss, grad) = cross_entropy(&logits, batch.labels).unwrap();
        expected.push(loss);
        let gradients = manual.backward(trace, grad);
        optimizer.step(&mut manual, gradients).unwrap();
      }
    }

    assert_eq!(losses, expected);
    assert_eq!(trained.state_dict(), manual.state_dict());
  }

  #[test]
  fn sets_train_mode() {
    let mut model = Model::mlp(&[3, 4, 3], Some(0.5), 0).unwrap();
    model.eval();
    Trainer::new(TrainConfig { num_epochs: 1, ..Default::default() })
      .train(&mut model, &dataset())
      .unwrap();
    assert_eq!(model.mode(), Mode::Train);
  }

  #[test]
  fn epoch_metrics() {
    let mut model = Model::linear(3, 3, 0);
    let config = TrainConfig { num_epochs: 4, batch_size: 2, learning_rate: 1.0, ..Default::default() };
    let history = Trainer::new(config).train(&mut model, &dataset()).unwrap();
    assert_eq!(history.epochs.len(), 4);
    assert_eq!(history.losses.len(), 4 * 3);
    for (epoch, metrics) in history.epochs.iter().enumerate() {
      assert_eq!(metrics.epoch, epoch);
      assert!(metrics.loss >= 0.0);
      assert!(metrics.accuracy >= 0.0 && metrics.accuracy <= 1.0);
    }
    // Sum of the three minibatch losses over five examples
    let first = &history.losses[0..3];
    let average = (first[0] + first[1] + first[2]) / 5.0;
    assert!((history.epochs[0].loss - average).abs() < 1e-12);
    assert!(history.last_epoch().unwrap().loss < history.epochs[0].loss);
  }

  #[test]
  fn rejects_before_touching_parameters() {
    let mut model = Model::<f64>::linear(3, 3, 0);
    let before = model.state_dict();
    let mut optimizer = Optimizer::new(0.1, SGD);

    let empty = Dataset::new(Tensor::zeros(&[0, 3]), vec![], 3).unwrap();
    assert!(matches!(train(&mut model, &empty, 1, 8, &mut optimizer), Err(Error::EmptyDataset)));
    assert!(matches!(train(&mut model, &dataset(), 1, 0, &mut optimizer), Err(Error::InvalidBatchSize(0))));

    let narrow = Dataset::new(Tensor::zeros(&[2, 2]), vec![0, 1], 3).unwrap();
    assert!(matches!(train(&mut model, &narrow, 1, 8, &mut optimizer), Err(Error::ShapeMismatch { expected: 3, got: 2 })));

    let many = Dataset::new(Tensor::zeros(&[2, 3]), vec![0, 4], 5).unwrap();
    assert!(matches!(train(&mut model, &many, 1, 8, &mut optimizer), Err(Error::LabelOutOfRange { label: 4, classes: 3 })));

    assert_eq!(model.state_dict(), before);
    assert_eq!(optimizer.steps(), 0);
  }

  #[test]
  fn reduces_loss() {
    let data = dataset();
    let mut model = Model::mlp(&[3, 8, 3], None, 1).unwrap();
    let initial = cross_entropy_loss(&model.infer(data.features()).unwrap(), data.labels()).unwrap();
    let config = TrainConfig { num_epochs: 200, batch_size: 5, learning_rate: 0.5, ..Default::default() };
    Trainer::new(config).train(&mut model, &data).unwrap();
    let trained = cross_entropy_loss(&model.infer(data.features()).unwrap(), data.labels()).unwrap();
    assert!(trained < initial * 0.5);
  }
}
