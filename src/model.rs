use rand::{ SeedableRng, rngs::StdRng };

use crate::{
  error::{ Error, Result },
  layer::{ Layer, Dense, Dropout, Mode, Cache },
  params::{ Parameters, Gradients },
  scalar::Real,
  tensor::Tensor,
};


/// Feed-forward classifier mapping `[batch, inputs]` feature matrices
/// to `[batch, outputs]` logits.
///
/// The model owns its parameters, its [Mode] and the random
/// generator its dropout layers draw masks from. All three are explicit
/// state of the value, so two models never influence each other.

#[derive(Debug, Clone)]
pub struct Model<T: Real> {
  layers: Vec<Layer<T>>,
  mode: Mode,
  rng: StdRng,
  inputs: usize,
  outputs: usize,
}

/// Recording of a training forward pass, consumed by [Model::backward].

#[derive(Debug)]
pub struct Trace<T: Real> {
  caches: Vec<Cache<T>>,
}

fn parameter_name(layer: usize, part: &str) -> String {
  format!("{layer}.{part}")
}

impl<T: Real> Model<T> {
  /// Assemble a model from explicit layers.
  ///
  /// Consecutive dense layers must agree on their dimensions
  /// and dropout probabilities must lie in `[0, 1)`.

  pub fn new(layers: Vec<Layer<T>>, seed: u64) -> Result<Self> {
    Self::assemble(layers, StdRng::seed_from_u64(seed))
  }

  fn assemble(layers: Vec<Layer<T>>, rng: StdRng) -> Result<Self> {
    let mut dims: Option<(usize, usize)> = None;
    for layer in &layers {
      match layer {
        Layer::Dense(dense) => {
          dims = match dims {
            None => Some((dense.inputs(), dense.outputs())),
            Some((inputs, width)) => {
              if dense.inputs() != width {
                return Err(Error::ShapeMismatch { expected: width, got: dense.inputs() })
              }
              Some((inputs, dense.outputs()))
            },
          };
        },
        Layer::Dropout(dropout) if !dropout.is_valid() => {
          return Err(Error::InvalidProbability(dropout.probability.to_f64().unwrap_or(f64::NAN)))
        },
        _ => {},
      }
    }
    let (inputs, outputs) = dims.ok_or(Error::EmptyModel)?;
    Ok(Self { layers, mode: Mode::Train, rng, inputs, outputs })
  }

  /// Linear classifier: a single dense layer.

  pub fn linear(inputs: usize, classes: usize, seed: u64) -> Self {
    let mut rng = StdRng::seed_from_u64(seed);
    let layers = vec![Layer::Dense(Dense::new(inputs, classes, &mut rng))];
    Self { layers, mode: Mode::Train, rng, inputs, outputs: classes }
  }

  /// Multilayer perceptron with ReLU activations and optional dropout
  /// after every hidden layer. `sizes` lists the input dimension, all
  /// hidden widths and the number of classes, e.g. `&[784, 128, 10]`.

  pub fn mlp(sizes: &[usize], dropout: Option<T>, seed: u64) -> Result<Self> {
    let (&inputs, widths) = sizes.split_first().ok_or(Error::EmptyModel)?;
    let mut builder = Self::builder(inputs, seed);
    for (i, &width) in widths.iter().enumerate() {
      builder = builder.dense(width);
      if i + 1 < widths.len() {
        builder = builder.relu();
        if let Some(probability) = dropout {
          builder = builder.dropout(probability);
        }
      }
    }
    builder.build()
  }

  pub fn builder(inputs: usize, seed: u64) -> ModelBuilder<T> {
    ModelBuilder::new(inputs, seed)
  }

  pub fn inputs(&self) -> usize {
    self.inputs
  }

  pub fn outputs(&self) -> usize {
    self.outputs
  }

  pub fn layers(&self) -> &[Layer<T>] {
    &self.layers
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub fn set_mode(&mut self, mode: Mode) {
    self.mode = mode;
  }

  /// Enable randomized layers.

  pub fn train(&mut self) {
    self.set_mode(Mode::Train)
  }

  /// Disable randomized layers, making forward passes deterministic.

  pub fn eval(&mut self) {
    self.set_mode(Mode::Eval)
  }

  fn check_input(&self, input: &Tensor<T>) -> Result<()> {
    let got = if input.rank() == 2 { input.shape()[1] } else { input.size() };
    if input.rank() != 2 || got != self.inputs {
      return Err(Error::ShapeMismatch { expected: self.inputs, got })
    }
    Ok(())
  }

  /// Compute logits, honoring the current [Mode].

  pub fn forward(&mut self, input: &Tensor<T>) -> Result<Tensor<T>> {
    match self.mode {
      Mode::Eval => self.infer(input),
      Mode::Train => self.forward_traced(input).map(|(logits, _)| logits ),
    }
  }

  /// Compute logits as in [Mode::Eval], regardless of the current mode.

  pub fn infer(&self, input: &Tensor<T>) -> Result<Tensor<T>> {
    self.check_input(input)?;
    let mut x = input.clone();
    for layer in &self.layers {
      x = layer.infer(&x);
    }
    Ok(x)
  }

  /// Most likely class for every row of `input`.

  pub fn predict(&self, input: &Tensor<T>) -> Result<Vec<usize>> {
    Ok(self.infer(input)?.argmax_rows())
  }

  /// Compute logits while recording what [backward](Self::backward) needs.

  pub fn forward_traced(&mut self, input: &Tensor<T>) -> Result<(Tensor<T>, Trace<T>)> {
    self.check_input(input)?;
    let mut caches = Vec::with_capacity(self.layers.len());
    let mut x = input.clone();
    for layer in &self.layers {
      let (output, cache) = layer.forward(x, self.mode, &mut self.rng);
      caches.push(cache);
      x = output;
    }
    Ok((x, Trace { caches }))
  }

  /// Back-propagate the gradient of the loss w.r.t. the logits.
  ///
  /// Returns a fresh gradient for every parameter. Nothing is accumulated
  /// inside the model, so each call starts from zero.

  pub fn backward(&self, trace: Trace<T>, grad: Tensor<T>) -> Gradients<T> {
    let mut gradients = Gradients::new();
    let mut grad = Some(grad);
    for (i, (layer, cache)) in self.layers.iter().zip(trace.caches).enumerate().rev() {
      let Some(output_grad) = grad.take() else { break };
      let (input_grad, params) = layer.backward(cache, output_grad, i > 0);
      if let Some(params) = params {
        gradients.insert(parameter_name(i, "weight"), params.weights);
        gradients.insert(parameter_name(i, "bias"), params.bias);
      }
      grad = input_grad;
    }
    gradients
  }

  /// Copy of all learned parameters, keyed `"{layer}.weight"` and `"{layer}.bias"`.

  pub fn state_dict(&self) -> Parameters<T> {
    let mut params = Parameters::new();
    for (i, layer) in self.layers.iter().enumerate() {
      if let Layer::Dense(dense) = layer {
        params.insert(parameter_name(i, "weight"), dense.weights.clone());
        params.insert(parameter_name(i, "bias"), dense.bias.clone());
      }
    }
    params
  }

  /// Overwrite all learned parameters.
  ///
  /// Every parameter must be present with the shape the model expects.
  /// Nothing is changed unless all of them are.

  pub fn load_state_dict(&mut self, params: &Parameters<T>) -> Result<()> {
    for (name, tensor) in self.parameters_mut() {
      let loaded = params.get(&name).ok_or_else(|| Error::MissingParameter(name.clone()) )?;
      if loaded.shape() != tensor.shape() {
        return Err(Error::ParameterShape {
          name,
          expected: tensor.shape().dims.clone(),
          got: loaded.shape().dims.clone(),
        })
      }
    }
    for (name, tensor) in self.parameters_mut() {
      if let Some(loaded) = params.get(&name) {
        tensor.feed(loaded);
      }
    }
    Ok(())
  }

  /// Mutable access to every learned parameter, by name.

  pub fn parameters_mut(&mut self) -> Vec<(String, &mut Tensor<T>)> {
    let mut params = vec![];
    for (i, layer) in self.layers.iter_mut().enumerate() {
      if let Layer::Dense(Dense { weights, bias }) = layer {
        params.push((parameter_name(i, "weight"), weights));
        params.push((parameter_name(i, "bias"), bias));
      }
    }
    params
  }

  pub fn num_parameters(&self) -> usize {
    self.layers.iter()
      .filter_map(|layer| layer.dense() )
      .map(|dense| dense.weights.size() + dense.bias.size() )
      .sum()
  }
}


/// Fluent construction of a [Model], one layer at a time.
///
/// ```
/// use microperceptron::Model;
///
/// let model = Model::<f32>::builder(784, 0)
///   .dense(128)
///   .relu()
///   .dropout(0.2)
///   .dense(10)
///   .build()
///   .unwrap();
///
/// assert_eq!(model.outputs(), 10);
/// ```

#[derive(Debug)]
pub struct ModelBuilder<T: Real> {
  layers: Vec<Layer<T>>,
  width: usize,
  rng: StdRng,
}

impl<T: Real> ModelBuilder<T> {
  pub fn new(inputs: usize, seed: u64) -> Self {
    Self {
      layers: vec![],
      width: inputs,
      rng: StdRng::seed_from_u64(seed),
    }
  }

  pub fn dense(mut self, size: usize) -> Self {
    let dense = Dense::new(self.width, size, &mut self.rng);
    self.layers.push(Layer::Dense(dense));
    self.width = size;
    self
  }

  pub fn relu(mut self) -> Self {
    self.layers.push(Layer::Relu);
    self
  }

  pub fn sigmoid(mut self) -> Self {
    self.layers.push(Layer::Sigmoid);
    self
  }

  pub fn dropout(mut self, probability: T) -> Self {
    self.layers.push(Layer::Dropout(Dropout::new(probability)));
    self
  }

  pub fn build(self) -> Result<Model<T>> {
    Model::assemble(self.layers, self.rng)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::loss::cross_entropy;

  fn batch() -> Tensor<f64> {
    Tensor::new(&[2,4], vec![0.1, 0.2, 0.3, 0.4, 0.9, 0.8, 0.7, 0.6])
  }

  #[test]
  fn mlp_layout() {
    let model = Model::<f32>::mlp(&[784, 128, 64, 10], Some(0.2), 1).unwrap();
    let kinds: Vec<_> = model.layers().iter().map(|layer| match layer {
      Layer::Dense(_) => "dense",
      Layer::Relu => "relu",
      Layer::Sigmoid => "sigmoid",
      Layer::Dropout(_) => "dropout",
    }).collect();
    assert_eq!(kinds, vec!["dense", "relu", "dropout", "dense", "relu", "dropout", "dense"]);
    assert_eq!(model.inputs(), 784);
    assert_eq!(model.outputs(), 10);
    assert_eq!(model.num_parameters(), 784 * 128 + 128 + 128 * 64 + 64 + 64 * 10 + 10);
  }

  #[test]
  fn rejects_invalid_layouts() {
    assert!(matches!(Model::<f32>::mlp(&[], None, 0), Err(Error::EmptyModel)));
    assert!(matches!(Model::<f32>::mlp(&[4], None, 0), Err(Error::EmptyModel)));
    assert!(matches!(Model::<f32>::mlp(&[4, 8, 2], Some(1.0), 0), Err(Error::InvalidProbability(_))));

    let layers = vec![Layer::Dense(Dense::<f32>::zeros(4, 3)), Layer::Relu, Layer::Dense(Dense::zeros(5, 2))];
    assert!(matches!(Model::new(layers, 0), Err(Error::ShapeMismatch { expected: 3, got: 5 })));
  }

  #[test]
  fn shape_mismatch() {
    let mut model = Model::<f64>::linear(3, 2, 0);
    assert!(matches!(model.forward(&batch()), Err(Error::ShapeMismatch { expected: 3, got: 4 })));
    assert!(matches!(model.infer(&Tensor::vec(&[0.0; 3])), Err(Error::ShapeMismatch { .. })));
  }

  #[test]
  fn seeded_construction_is_reproducible() {
    let a = Model::<f32>::mlp(&[4, 8, 3], None, 5).unwrap();
    let b = Model::<f32>::mlp(&[4, 8, 3], None, 5).unwrap();
    let c = Model::<f32>::mlp(&[4, 8, 3], None, 6).unwrap();
    assert_eq!(a.state_dict(), b.state_dict());
    assert_ne!(a.state_dict(), c.state_dict());
  }

  #[test]
  fn eval_mode_is_deterministic() {
    let mut model = Model::<f64>::mlp(&[4, 16, 3], Some(0.5), 3).unwrap();
    model.eval();
    let a = model.forward(&batch()).unwrap();
    let b = model.forward(&batch()).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, model.infer(&batch()).unwrap());

    // Dropout kicks in once switched back to training
    model.train();
    assert_eq!(model.mode(), Mode::Train);
    let c = model.forward(&batch()).unwrap();
    assert_ne!(a, c);
  }

  #[test]
  fn state_dict_names() {
    let model = Model::<f32>::mlp(&[4, 8, 3], Some(0.1), 0).unwrap();
    let names: Vec<_> = model.state_dict().names().map(String::from).collect();
    assert_eq!(names, vec!["0.bias", "0.weight", "3.bias", "3.weight"]);
  }

  #[test]
  fn load_state_dict_validates() {
    let source = Model::<f64>::mlp(&[4, 8, 3], None, 1).unwrap();
    let mut target = Model::<f64>::mlp(&[4, 8, 3], None, 2).unwrap();
    target.load_state_dict(&source.state_dict()).unwrap();
    assert_eq!(target.state_dict(), source.state_dict());

    let mut partial = source.state_dict();
    partial.remove("2.bias");
    assert!(matches!(target.load_state_dict(&partial), Err(Error::MissingParameter(name)) if name == "2.bias"));

    let mut wrong = source.state_dict();
    wrong.insert("0.bias", Tensor::zeros(&[9]));
    let before = target.state_dict();
    assert!(matches!(target.load_state_dict(&wrong), Err(Error::ParameterShape { .. })));
    assert_eq!(target.state_dict(), before);
  }

  #[test]
  fn gradients_cover_every_parameter() {
    let mut model = Model::<f64>::mlp(&[4, 8, 3], None, 1).unwrap();
    let (logits, trace) = model.forward_traced(&batch()).unwrap();
    let (_, grad) = cross_entropy(&logits, &[0, 2]).unwrap();
    let gradients = model.backward(trace, grad);
    let params = model.state_dict();
    assert_eq!(gradients.len(), params.len());
    for (name, param) in params.iter() {
      assert_eq!(gradients.get(name).unwrap().shape(), param.shape());
    }
  }

  #[test]
  fn gradients_do_not_accumulate() {
    let mut model = Model::<f64>::mlp(&[4, 8, 3], None, 1).unwrap();
    let labels = [1, 2];
    let step = |model: &mut Model<f64>| {
      let (logits, trace) = model.forward_traced(&batch()).unwrap();
      let (_, grad) = cross_entropy(&logits, &labels).unwrap();
      model.backward(trace, grad)
    };
    let first = step(&mut model);
    let second = step(&mut model);
    assert_eq!(first, second);
  }

  #[test]
  fn backward_matches_finite_differences() {
    let mut model = Model::<f64>::builder(4, 9).dense(5).sigmoid().dense(3).build().unwrap();
    let labels = [2, 0];
    let (logits, trace) = model.forward_traced(&batch()).unwrap();
    let (loss, grad) = cross_entropy(&logits, &labels).unwrap();
    let gradients = model.backward(trace, grad);

    let eps = 1e-7;
    for name in ["0.weight", "2.bias"] {
      let mut bumped = model.clone();
      let mut params = bumped.state_dict();
      let mut tensor = params.get(name).unwrap().clone();
      tensor.raw_mut()[0] += eps;
      params.insert(name, tensor);
      bumped.load_state_dict(&params).unwrap();
      let logits = bumped.infer(&batch()).unwrap();
      let numeric = (crate::loss::cross_entropy_loss(&logits, &labels).unwrap() - loss) / eps;
      assert!((numeric - gradients.get(name).unwrap().raw()[0]).abs() < 1e-5, "{}", name);
    }
  }

  #[test]
  fn predict() {
    let layers = vec![Layer::Dense(Dense {
      weights: Tensor::new(&[2,2], vec![1.0, 0.0, 0.0, 1.0]),
      bias: Tensor::zeros(&[2]),
    })];
    let model = Model::<f64>::new(layers, 0).unwrap();
    let x = Tensor::new(&[2,2], vec![0.9, 0.1, 0.2, 0.7]);
    assert_eq!(model.predict(&x).unwrap(), vec![0, 1]);
  }
}
