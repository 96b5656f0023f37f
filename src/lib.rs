//! Minibatch training and evaluation of feed-forward classifiers.
//! Tiny. Few dependencies. CPU only.
//!
//! # Features
//!
//! - **Explicit state**: A [Model] owns its parameters, its train/eval
//! [Mode] and the seeded random generator its dropout layers draw from.
//! Nothing is global.
//!
//! - **Explicit gradients**: [Model::backward] returns a fresh set of
//! [Gradients] for every minibatch, which an [Optimizer] consumes by value.
//! Gradients can't leak from one step into the next.
//!
//! - **Stable loss**: Cross-entropy is computed from a fused log-softmax,
//! so extreme logits never produce `inf` or `NaN`.
//!
//! - **Optimization**: Includes a range of standard optimizers, such as ADAM and Nesterov.
//!
//! - **Persistence**: Named parameters can be saved to and restored from
//! compact binary files, bit for bit.
//!
//! # Examples
//!
//! Training a small perceptron and evaluating it:
//! ```
//! use microperceptron::{ Model, Dataset, Tensor, Optimizer, SGD, train, evaluate };
//!
//! let features = Tensor::new(&[4, 2], vec![
//!   0.0, 0.0,
//!   0.0, 1.0,
//!   1.0, 0.0,
//!   1.0, 1.0,
//! ]);
//! let dataset = Dataset::new(features, vec![0, 1, 1, 0], 2).unwrap();
//!
//! let mut model = Model::<f32>::mlp(&[2, 8, 2], None, 42).unwrap();
//! let mut optimizer = Optimizer::new(0.1, SGD);
//!
//! let losses = train(&mut model, &dataset, 5, 2, &mut optimizer).unwrap();
//! assert_eq!(losses.len(), 5 * 2);
//!
//! let loss = evaluate(&mut model, &dataset).unwrap();
//! assert!(loss.is_finite());
//! ```
//!
//! ## More examples
//! Check the `/demos` folder for an MNIST training run.
//!
//! # Optional features
//!
//! Some features can be toggled in your `Cargo.toml`.
//!
//! - `unsafe` *(default)*: Accelerated matrix math using [matrixmultiply] crate.

mod internal;
mod shape;
mod tensor;

pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod idx;
pub mod layer;
pub mod loss;
pub mod metrics;
pub mod model;
pub mod ops;
pub mod optimize;
pub mod params;
pub mod persist;
pub mod scalar;
pub mod train;

pub use config::{ Config, ModelConfig, TrainConfig, OptimizerKind };
pub use dataset::{ Dataset, Minibatch };
pub use error::{ Error, Result };
pub use evaluate::{ evaluate, score, Evaluation };
pub use layer::{ Layer, Dense, Dropout, Mode };
pub use metrics::EpochMetrics;
pub use model::{ Model, ModelBuilder, Trace };
pub use optimize::{ Optimizer, Strategy, SGD, Momentum, Nesterov, Adam };
pub use params::{ Parameters, Gradients };
pub use shape::Shape;
pub use tensor::{ Tensor, Gemm };
pub use train::{ train, Trainer, History };
