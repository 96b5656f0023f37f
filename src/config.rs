use std::{ fs, path::Path };

use serde::{ Serialize, Deserialize };

use crate::{
  internal::*,
  error::{ Error, Result },
  model::Model,
  optimize::{ Optimizer, AnyStrategy, SGD, Momentum, Nesterov, Adam },
  scalar::Real,
};


/// Model shape and training hyper-parameters, usually read from JSON.
///
/// Missing fields take their default values, so `{}` is a valid config:
///
/// ```
/// use microperceptron::Config;
///
/// let config = Config::from_json(r#"{ "training": { "batch_size": 32 } }"#).unwrap();
/// assert_eq!(config.training.batch_size, 32);
/// assert_eq!(config.training.num_epochs, 10);
/// assert_eq!(config.model.hidden, vec![128]);
/// ```

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub model: ModelConfig,
  pub training: TrainConfig,
}

impl Config {
  pub fn from_json(json: &str) -> Result<Self> {
    let config: Self = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    Self::from_json(&fs::read_to_string(path)?)
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  pub fn validate(&self) -> Result<()> {
    self.model.validate()?;
    self.training.validate()
  }
}


/// Layout of a multilayer perceptron. No hidden layers make a linear classifier.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
  pub inputs: usize,
  pub classes: usize,
  pub hidden: Vec<usize>,
  pub dropout: Option<f64>,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      inputs: 28 * 28,
      classes: 10,
      hidden: vec![128],
      dropout: None,
    }
  }
}

impl ModelConfig {
  pub fn validate(&self) -> Result<()> {
    match self.dropout {
      Some(p) if !(0.0..1.0).contains(&p) => Err(Error::InvalidProbability(p)),
      _ => Ok(()),
    }
  }

  /// All layer widths, from inputs to classes.

  pub fn sizes(&self) -> Vec<usize> {
    let mut sizes = vec![self.inputs];
    sizes.extend(&self.hidden);
    sizes.push(self.classes);
    sizes
  }

  pub fn build<T: Real>(&self, seed: u64) -> Result<Model<T>> {
    Model::mlp(&self.sizes(), self.dropout.map(real), seed)
  }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
  Sgd,
  Momentum,
  Nesterov,
  Adam,
}

impl Default for OptimizerKind {
  fn default() -> Self {
    Self::Sgd
  }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
  pub batch_size: usize,
  pub num_epochs: usize,
  pub learning_rate: f64,
  pub seed: u64,
  pub optimizer: OptimizerKind,
}

impl Default for TrainConfig {
  fn default() -> Self {
    Self {
      batch_size: 8,
      num_epochs: 10,
      learning_rate: 0.01,
      seed: 0,
      optimizer: OptimizerKind::default(),
    }
  }
}

impl TrainConfig {
  pub fn validate(&self) -> Result<()> {
    if self.batch_size == 0 { return Err(Error::InvalidBatchSize(self.batch_size)) }
    Ok(())
  }

  pub fn optimizer<T: Real>(&self) -> Optimizer<T, AnyStrategy<T>> {
    let strategy = match self.optimizer {
      OptimizerKind::Sgd => AnyStrategy::SGD(SGD),
      OptimizerKind::Momentum => AnyStrategy::Momentum(Momentum::default()),
      OptimizerKind::Nesterov => AnyStrategy::Nesterov(Nesterov::default()),
      OptimizerKind::Adam => AnyStrategy::Adam(Adam::default()),
    };
    Optimizer::new(real(self.learning_rate), strategy)
  }
}
