use std::collections::HashMap;

use crate::{
  internal::*,
  error::{ Error, Result },
  model::Model,
  params::Gradients,
  scalar::Real,
  tensor::Tensor,
};


/// An optimization strategy to be used with [Optimizer].
///
/// Returns the change to be added to `weights`. Strategies with state
/// keep it per parameter `name`.

pub trait Strategy<R: Real> {
  fn update(&mut self, name: &str, weights: &Tensor<R>, grad: &Tensor<R>, rate: R, step: usize) -> Tensor<R>;
}


/// Generic optimizer that allows for several optimization [strategies](Strategy) to be used.

#[derive(Debug)]
pub struct Optimizer<R: Real, S: Strategy<R>> {
  strategy: S,
  pub learning_rate: R,
  step: usize,
}

impl<R: Real, S: Strategy<R>> Optimizer<R, S> {
  pub fn new(learning_rate: R, strategy: S) -> Self {
    Self { strategy, learning_rate, step: 1 }
  }

  /// Number of steps taken so far.

  pub fn steps(&self) -> usize {
    self.step - 1
  }

  /// Update every parameter of `model` in place, consuming the
  /// gradients of a single backward pass.

  pub fn step(&mut self, model: &mut Model<R>, gradients: Gradients<R>) -> Result<()> {
    let mut params = model.parameters_mut();

    // Validate all gradients before touching anything
    for (name, weights) in &params {
      let grad = gradients.get(name).ok_or_else(|| Error::MissingParameter(name.clone()) )?;
      if grad.shape() != weights.shape() {
        return Err(Error::ParameterShape {
          name: name.clone(),
          expected: weights.shape().dims.clone(),
          got: grad.shape().dims.clone(),
        })
      }
    }

    for (name, weights) in &mut params {
      if let Some(grad) = gradients.get(name) {
        let change = self.strategy.update(name, weights, grad, self.learning_rate, self.step);
        **weights += &change;
      }
    }

    self.step += 1;
    Ok(())
  }
}


/// Stochastic Gradient Descent strategy

#[derive(Debug, Clone, Default)]
pub struct SGD;

impl<R: Real> Strategy<R> for SGD {
  fn update(&mut self, _name: &str, _weights: &Tensor<R>, grad: &Tensor<R>, rate: R, _step: usize) -> Tensor<R> {
    grad * -rate
  }
}


/// Stochastic Gradient Descent with momentum

#[derive(Debug, Clone)]
pub struct Momentum<R: Real> {
  pub momentum: R,
  v: HashMap<String, Tensor<R>>,
}

impl<R: Real> Momentum<R> {
  pub fn new(momentum: R) -> Self {
    Self {
      momentum,
      v: HashMap::new(),
    }
  }
}

impl<R: Real> Default for Momentum<R> {
  fn default() -> Self {
    Self::new(real(0.9))
  }
}

impl<R: Real> Strategy<R> for Momentum<R> {
  fn update(&mut self, name: &str, weights: &Tensor<R>, grad: &Tensor<R>, rate: R, _step: usize) -> Tensor<R> {
    let v = self.v.entry(name.to_string())
      .or_insert_with(|| Tensor::zeros(&weights.shape().dims) );
    *v = &*v * self.momentum - grad * rate;
    v.clone()
  }
}


/// Stochastic Gradient Descent with Nesterov momentum

#[derive(Debug, Clone)]
pub struct Nesterov<R: Real> {
  pub momentum: R,
  v: HashMap<String, Tensor<R>>,
}

impl<R: Real> Nesterov<R> {
  pub fn new(momentum: R) -> Self {
    Self {
      momentum,
      v: HashMap::new(),
    }
  }
}

impl<R: Real> Default for Nesterov<R> {
  fn default() -> Self {
    Self::new(real(0.9))
  }
}

impl<R: Real> Strategy<R> for Nesterov<R> {
  fn update(&mut self, name: &str, weights: &Tensor<R>, grad: &Tensor<R>, rate: R, _step: usize) -> Tensor<R> {
    let v = self.v.entry(name.to_string())
      .or_insert_with(|| Tensor::zeros(&weights.shape().dims) );
    let v_prev = v.clone();
    *v = &v_prev * self.momentum - grad * rate;
    v_prev * -self.momentum + &*v * (R::one() + self.momentum)
  }
}


/// Adaptive Movement Estimation strategy (ADAM)

#[derive(Debug, Clone)]
pub struct Adam<R: Real> {
  pub beta1: R,
  pub beta2: R,
  m: HashMap<String, Tensor<R>>,
  v: HashMap<String, Tensor<R>>,
}

impl<R: Real> Adam<R> {
  pub fn new(beta1: R, beta2: R) -> Self {
    Self {
      beta1,
      beta2,
      m: HashMap::new(),
      v: HashMap::new(),
    }
  }
}

impl<R: Real> Default for Adam<R> {
  fn default() -> Self {
    Self::new(real(0.9), real(0.999))
  }
}

impl<R: Real> Strategy<R> for Adam<R> {
  fn update(&mut self, name: &str, weights: &Tensor<R>, grad: &Tensor<R>, rate: R, step: usize) -> Tensor<R> {
    let shape = &weights.shape().dims;
    let m = self.m.entry(name.to_string()).or_insert_with(|| Tensor::zeros(shape) );
    *m = &*m * self.beta1 + grad * (R::one() - self.beta1);
    let v = self.v.entry(name.to_string()).or_insert_with(|| Tensor::zeros(shape) );
    *v = &*v * self.beta2 + grad.vectorize(|g| g * g ) * (R::one() - self.beta2);

    let step = count::<R>(step);
    let correction1 = R::one() - self.beta1.powf(step);
    let correction2 = R::one() - self.beta2.powf(step);
    let epsilon = real::<R>(1e-8);
    m.zip(v, |(m, v)| -rate * (m / correction1) / ((v / correction2).sqrt() + epsilon) )
  }
}


/// Any of the built-in strategies, chosen at runtime.

#[derive(Debug, Clone)]
pub enum AnyStrategy<R: Real> {
  SGD(SGD),
  Momentum(Momentum<R>),
  Nesterov(Nesterov<R>),
  Adam(Adam<R>),
}

impl<R: Real> Strategy<R> for AnyStrategy<R> {
  fn update(&mut self, name: &str, weights: &Tensor<R>, grad: &Tensor<R>, rate: R, step: usize) -> Tensor<R> {
    match self {
      Self::SGD(s) => s.update(name, weights, grad, rate, step),
      Self::Momentum(s) => s.update(name, weights, grad, rate, step),
      Self::Nesterov(s) => s.update(name, weights, grad, rate, step),
      Self::Adam(s) => s.update(name, weights, grad, rate, step),
    }
  }
}
