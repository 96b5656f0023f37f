use rand::Rng;
use serde::{ Serialize, Deserialize };

use crate::{
  ops::RealOps,
  scalar::Real,
  tensor::Tensor,
};


/// Whether a [Model](crate::Model) is being trained or evaluated.
///
/// Randomized layers like [Dropout] only have an effect in [Mode::Train].

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
  Train,
  Eval,
}


/// Affine transform `x * weights + bias` with `weights` of shape `[inputs, outputs]`.

#[derive(Debug, Clone, PartialEq)]
pub struct Dense<T: Real> {
  pub weights: Tensor<T>,
  pub bias: Tensor<T>,
}

impl<T: Real> Dense<T> {
  /// Glorot-uniform weights and zero bias.

  pub fn new(inputs: usize, outputs: usize, rng: &mut impl Rng) -> Self {
    Self {
      weights: Tensor::glorot_uniform(&[inputs, outputs], rng),
      bias: Tensor::zeros(&[outputs]),
    }
  }

  pub fn zeros(inputs: usize, outputs: usize) -> Self {
    Self {
      weights: Tensor::zeros(&[inputs, outputs]),
      bias: Tensor::zeros(&[outputs]),
    }
  }

  pub fn inputs(&self) -> usize {
    self.weights.shape()[0]
  }

  pub fn outputs(&self) -> usize {
    self.weights.shape()[1]
  }

  pub fn run(&self, input: &Tensor<T>) -> Tensor<T> {
    input.mm(&self.weights).add_row(&self.bias)
  }
}


/// Inverted dropout: zeroes activations with `probability` during training
/// and scales the survivors by `1 / (1 - probability)`.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dropout<T: Real> {
  pub probability: T,
}

impl<T: Real> Dropout<T> {
  pub fn new(probability: T) -> Self {
    Self { probability }
  }

  pub fn is_valid(&self) -> bool {
    self.probability >= T::zero() && self.probability < T::one()
  }
}


/// A single stage of a feed-forward [Model](crate::Model).

#[derive(Debug, Clone, PartialEq)]
pub enum Layer<T: Real> {
  Dense(Dense<T>),
  Relu,
  Sigmoid,
  Dropout(Dropout<T>),
}

/// Whatever a layer needs to remember from its forward pass
/// to compute its backward pass.

#[derive(Debug, Clone)]
pub(crate) enum Cache<T: Real> {
  Dense { input: Tensor<T> },
  Relu { mask: Tensor<T> },
  Sigmoid { output: Tensor<T> },
  Dropout { mask: Option<Tensor<T>> },
}

/// Gradients of a [Dense] layer's parameters.

#[derive(Debug, Clone)]
pub(crate) struct DenseGrad<T: Real> {
  pub weights: Tensor<T>,
  pub bias: Tensor<T>,
}

impl<T: Real> Layer<T> {
  pub fn dense(&self) -> Option<&Dense<T>> {
    match self {
      Self::Dense(dense) => Some(dense),
      _ => None,
    }
  }

  /// Forward pass without recording anything, as used for evaluation.

  pub(crate) fn infer(&self, input: &Tensor<T>) -> Tensor<T> {
    match self {
      Self::Dense(dense) => dense.run(input),
      Self::Relu => input.relu(),
      Self::Sigmoid => input.sigmoid(),
      Self::Dropout(_) => input.clone(),
    }
  }

  pub(crate) fn forward(&self, input: Tensor<T>, mode: Mode, rng: &mut impl Rng) -> (Tensor<T>, Cache<T>) {
    match self {
      Self::Dense(dense) => {
        let output = dense.run(&input);
        (output, Cache::Dense { input })
      },
      Self::Relu => {
        let output = input.relu();
        (output, Cache::Relu { mask: input.positive() })
      },
      Self::Sigmoid => {
        let output = input.sigmoid();
        (output.clone(), Cache::Sigmoid { output })
      },
      Self::Dropout(dropout) => {
        if mode == Mode::Eval || dropout.probability == T::zero() {
          return (input, Cache::Dropout { mask: None })
        }
        let keep = T::one() - dropout.probability;
        let mask = Tensor::bernoulli(&input.shape().dims, keep, rng) / keep;
        (input.mul(&mask), Cache::Dropout { mask: Some(mask) })
      },
    }
  }

  /// Turn the gradient w.r.t. this layer's output into the gradient
  /// w.r.t. its input, plus the gradient of its own parameters, if any.
  /// The input gradient is skipped when `propagate` is false.

  pub(crate) fn backward(&self, cache: Cache<T>, grad: Tensor<T>, propagate: bool) -> (Option<Tensor<T>>, Option<DenseGrad<T>>) {
    match (self, cache) {
      (Self::Dense(dense), Cache::Dense { input }) => {
        let params = DenseGrad {
          weights: input.t_mm(&grad),
          bias: grad.sum_rows(),
        };
        let input_grad = if propagate { Some(grad.mm_t(&dense.weights)) } else { None };
        (input_grad, Some(params))
      },
      (Self::Relu, Cache::Relu { mask }) => (Some(grad.mul(&mask)), None),
      (Self::Sigmoid, Cache::Sigmoid { output }) => {
        let slope = output.vectorize(|s| s * (T::one() - s) );
        (Some(grad.mul(&slope)), None)
      },
      (Self::Dropout(_), Cache::Dropout { mask }) => match mask {
        Some(mask) => (Some(grad.mul(&mask)), None),
        None => (Some(grad), None),
      },
      (layer, cache) => unreachable!("{:?} can't consume {:?}", layer, cache),
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use rand::{ SeedableRng, rngs::StdRng };

  fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
  }

  #[test]
  fn dense_forward() {
    let dense = Dense {
      weights: Tensor::new(&[2,3], vec![1.0, 0.0, -1.0, 2.0, 1.0, 0.0]),
      bias: Tensor::vec(&[0.5, 0.5, 0.5]),
    };
    let x = Tensor::<f64>::new(&[1,2], vec![1.0, 2.0]);
    assert_eq!(dense.run(&x), Tensor::new(&[1,3], vec![5.5, 2.5, -0.5]));
    assert_eq!(dense.inputs(), 2);
    assert_eq!(dense.outputs(), 3);
  }

  #[test]
  fn dense_backward_matches_finite_differences() {
    let mut rng = rng();
    let dense: Dense<f64> = Dense::new(3, 2, &mut rng);
    let layer = Layer::Dense(dense.clone());
    let x = Tensor::uniform(&[4,3], 0.0, 1.0, &mut rng);
    // Loss is the plain sum of all outputs, so its output gradient is all ones
    let (y, cache) = layer.forward(x.clone(), Mode::Train, &mut rng);
    let (input_grad, params) = layer.backward(cache, Tensor::ones(&y.shape().dims), true);
    let params = params.unwrap();

    let eps = 1e-6;
    let mut bumped = dense.clone();
    bumped.weights.raw_mut()[1] += eps;
    let numeric = (bumped.run(&x).sum() - dense.run(&x).sum()) / eps;
    assert!((numeric - params.weights.raw()[1]).abs() < 1e-5);
    assert_eq!(params.bias, Tensor::vec(&[4.0, 4.0]));

    let mut moved = x.clone();
    moved.raw_mut()[0] += eps;
    let numeric = (dense.run(&moved).sum() - dense.run(&x).sum()) / eps;
    assert!((numeric - input_grad.unwrap().raw()[0]).abs() < 1e-5);
  }

  #[test]
  fn dropout_is_identity_in_eval_mode() {
    let layer = Layer::Dropout(Dropout::new(0.5));
    let x = Tensor::<f32>::ones(&[4,8]);
    let (y, _) = layer.forward(x.clone(), Mode::Eval, &mut rng());
    assert_eq!(y, x);
    assert_eq!(layer.infer(&x), x);
  }

  #[test]
  fn dropout_zeroes_and_rescales_in_train_mode() {
    let layer = Layer::Dropout(Dropout::new(0.5));
    let x = Tensor::<f32>::ones(&[16,16]);
    let (y, cache) = layer.forward(x, Mode::Train, &mut rng());
    assert!(y.raw().iter().all(|&a| a == 0.0 || a == 2.0 ));
    assert!(y.raw().iter().any(|&a| a == 0.0 ));
    assert!(y.raw().iter().any(|&a| a == 2.0 ));

    // Gradient flows through the same mask
    let (grad, params) = layer.backward(cache, Tensor::ones(&[16,16]), true);
    assert_eq!(grad.unwrap(), y);
    assert!(params.is_none());
  }

  #[test]
  fn relu_backward_masks_gradient() {
    let layer = Layer::Relu;
    let x = Tensor::<f64>::vec(&[-1.0, 3.0]);
    let (_, cache) = layer.forward(x, Mode::Train, &mut rng());
    let (grad, _) = layer.backward(cache, Tensor::vec(&[5.0, 5.0]), true);
    assert_eq!(grad.unwrap(), Tensor::vec(&[0.0, 5.0]));
  }

  #[test]
  fn sigmoid_backward() {
    let layer = Layer::Sigmoid;
    let x = Tensor::<f64>::vec(&[0.0]);
    let (_, cache) = layer.forward(x, Mode::Train, &mut rng());
    let (grad, _) = layer.backward(cache, Tensor::vec(&[1.0]), true);
    assert_eq!(grad.unwrap(), Tensor::vec(&[0.25]));
  }

  #[test]
  fn dropout_validity() {
    assert!(Dropout::new(0.0f32).is_valid());
    assert!(Dropout::new(0.5f32).is_valid());
    assert!(!Dropout::new(1.0f32).is_valid());
    assert!(!Dropout::new(-0.1f32).is_valid());
  }
}
