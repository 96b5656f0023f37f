// This demo trains a multilayer perceptron on the MNIST digits.
//
// Download the four IDX files into a directory and run:
//   RUST_LOG=info cargo run --release --example mnist -- <mnist-dir> [config.json]

use std::{ env, process };

use microperceptron::{ idx::Mnist, persist, Config, Trainer, score };

fn main() {
  env_logger::init();

  let mut args = env::args().skip(1);
  let Some(dir) = args.next() else {
    eprintln!("Usage: mnist <mnist-dir> [config.json]");
    process::exit(1);
  };

  if let Err(err) = run(&dir, args.next()) {
    eprintln!("Error: {}", err);
    process::exit(1);
  }
}

fn run(dir: &str, config: Option<String>) -> microperceptron::Result<()> {
  // Defaults describe a 784-128-10 perceptron trained with plain SGD
  let config = match config {
    Some(path) => Config::from_file(path)?,
    None => Config::default(),
  };

  let mnist = Mnist::<f32>::load(dir)?;
  let (train, valid) = mnist.train.split_fraction(0.9);
  log::info!("Loaded {} training, {} validation and {} test examples", train.len(), valid.len(), mnist.test.len());

  let mut model = config.model.build::<f32>(config.training.seed)?;
  log::info!("Model has {} parameters", model.num_parameters());

  let history = Trainer::new(config.training.clone()).train(&mut model, &train)?;
  if let Some(last) = history.last_epoch() {
    println!("Final training loss {:.4}, accuracy {:.4}", last.loss, last.accuracy);
  }

  let validation = score(&mut model, &valid)?;
  println!("Validation loss {:.4}, accuracy {:.4}", validation.loss, validation.accuracy);

  let test = score(&mut model, &mnist.test)?;
  println!("Test loss {:.4}, accuracy {:.4}", test.loss, test.accuracy);

  persist::save_model(&model, "mnist.model")?;

  Ok(())
}
