//! Saving and loading a model's named parameters.
//!
//! Parameters are stored as a compact [postcard] blob of the state dict.
//! Floats are written bit for bit, so a loaded model behaves exactly
//! like the one that was saved.

use std::{ fs, path::Path };

use log::debug;

use crate::{
  error::{ Error, Result },
  model::Model,
  params::Parameters,
  scalar::Real,
};


pub fn save<T: Real>(params: &Parameters<T>) -> Result<Vec<u8>> {
  postcard::to_allocvec(params).map_err(|e| Error::Serialize(e.to_string()) )
}

pub fn load<T: Real>(bytes: &[u8]) -> Result<Parameters<T>> {
  postcard::from_bytes(bytes).map_err(|e| Error::Serialize(e.to_string()) )
}

pub fn save_file<T: Real>(params: &Parameters<T>, path: impl AsRef<Path>) -> Result<()> {
  let bytes = save(params)?;
  debug!("Saving {} parameters ({} bytes) to {}", params.size(), bytes.len(), path.as_ref().display());
  fs::write(path, bytes)?;
  Ok(())
}

pub fn load_file<T: Real>(path: impl AsRef<Path>) -> Result<Parameters<T>> {
  let bytes = fs::read(&path)?;
  debug!("Loading parameters from {}", path.as_ref().display());
  load(&bytes)
}

/// Save the state dict of `model`.

pub fn save_model<T: Real>(model: &Model<T>, path: impl AsRef<Path>) -> Result<()> {
  save_file(&model.state_dict(), path)
}

/// Overwrite the parameters of `model`, which must have the same layout
/// as the one that was saved.

pub fn load_model<T: Real>(model: &mut Model<T>, path: impl AsRef<Path>) -> Result<()> {
  model.load_state_dict(&load_file(path)?)
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;
  use serde::Serialize;
  use crate::{ shape::Shape, tensor::Tensor };

  #[derive(Serialize)]
  struct LooseTensor {
    shape: Shape,
    data: Vec<f32>,
  }

  #[test]
  fn bit_exact() {
    let model = Model::<f32>::mlp(&[6, 5, 3], Some(0.2), 11).unwrap();
    let params = model.state_dict();
    let restored: Parameters<f32> = load(&save(&params).unwrap()).unwrap();
    assert_eq!(restored, params);
  }

  #[test]
  fn file_round_trip() {
    let path = std::env::temp_dir().join("microperceptron-persist-test.bin");
    let source = Model::<f64>::mlp(&[4, 3, 2], None, 1).unwrap();
    let mut target = Model::<f64>::mlp(&[4, 3, 2], None, 2).unwrap();
    save_model(&source, &path).unwrap();
    load_model(&mut target, &path).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(target.state_dict(), source.state_dict());

    let x = Tensor::new(&[1,4], vec![0.1, 0.2, 0.3, 0.4]);
    assert_eq!(target.infer(&x).unwrap(), source.infer(&x).unwrap());
  }

  #[test]
  fn errors() {
    assert!(matches!(load::<f32>(&[0xff, 0xff]), Err(Error::Serialize(_))));
    assert!(matches!(load_file::<f32>("does/not/exist.bin"), Err(Error::Io(_))));

    let bytes = save(&Model::<f32>::linear(4, 2, 0).state_dict()).unwrap();
    let mut wider = Model::<f32>::linear(5, 2, 0);
    assert!(matches!(wider.load_state_dict(&load(&bytes).unwrap()), Err(Error::ParameterShape { .. })));
  }

  #[test]
  fn rejects_data_not_matching_shape() {
    let mut blob = BTreeMap::new();
    blob.insert("0.weight", LooseTensor { shape: Shape::new(&[2,2]), data: vec![1.0] });
    blob.insert("0.bias", LooseTensor { shape: Shape::new(&[2]), data: vec![0.0, 0.0] });
    let bytes = postcard::to_allocvec(&blob).unwrap();
    assert!(matches!(load::<f32>(&bytes), Err(Error::Serialize(_))));

    let path = std::env::temp_dir().join("microperceptron-truncated-test.bin");
    fs::write(&path, &bytes).unwrap();
    let mut model = Model::<f32>::linear(2, 2, 0);
    let before = model.state_dict();
    let result = load_model(&mut model, &path);
    fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(Error::Serialize(_))));
    assert_eq!(model.state_dict(), before);
  }
}
