use std::io;

use thiserror::Error;


/// Everything that can go wrong while building, training,
/// evaluating or persisting a [Model](crate::Model).

#[derive(Debug, Error)]
pub enum Error {
  #[error("expected {expected} features per example, got {got}")]
  ShapeMismatch { expected: usize, got: usize },

  #[error("got {labels} labels for {rows} examples")]
  LabelCount { rows: usize, labels: usize },

  #[error("dataset contains no examples")]
  EmptyDataset,

  #[error("batch size must be positive, got {0}")]
  InvalidBatchSize(usize),

  #[error("label {label} is outside of the valid class range 0..{classes}")]
  LabelOutOfRange { label: usize, classes: usize },

  #[error("feature value {value} of example {example} is outside of [0, 1]")]
  FeatureOutOfRange { example: usize, value: f64 },

  #[error("missing parameter '{0}'")]
  MissingParameter(String),

  #[error("parameter '{name}' has shape {got:?}, expected {expected:?}")]
  ParameterShape { name: String, expected: Vec<usize>, got: Vec<usize> },

  #[error("model contains no dense layer")]
  EmptyModel,

  #[error("dropout probability must lie in [0, 1), got {0}")]
  InvalidProbability(f64),

  #[error(transparent)]
  Io(#[from] io::Error),

  #[error("could not serialize parameters: {0}")]
  Serialize(String),

  #[error("invalid configuration: {0}")]
  Config(#[from] serde_json::Error),

  #[error("malformed IDX file: {0}")]
  Format(String),
}

pub type Result<T> = std::result::Result<T, Error>;
