//! Softmax cross-entropy, the loss every classifier here is trained with.

use crate::{
  internal::*,
  error::{ Error, Result },
  ops::RealOps,
  scalar::Real,
  tensor::Tensor,
};


fn check<T: Real>(logits: &Tensor<T>, labels: &[usize]) -> Result<()> {
  let rows = logits.shape().rows();
  if logits.rank() != 2 || rows != labels.len() {
    return Err(Error::LabelCount { rows, labels: labels.len() })
  }
  if rows == 0 { return Err(Error::EmptyDataset) }
  let classes = logits.shape().cols();
  match labels.iter().find(|&&label| label >= classes ) {
    Some(&label) => Err(Error::LabelOutOfRange { label, classes }),
    None => Ok(()),
  }
}

/// Mean negative log-likelihood of the true classes, computed from
/// the fused log-softmax so that extreme logits can't produce `inf` or `NaN`.

pub fn cross_entropy_loss<T: Real>(logits: &Tensor<T>, labels: &[usize]) -> Result<T> {
  check(logits, labels)?;
  let log_probs = logits.log_softmax();
  let total: T = labels.iter()
    .enumerate()
    .map(|(i, &label)| log_probs.row(i)[label] )
    .sum();
  Ok(-total / count::<T>(labels.len()))
}

/// Like [cross_entropy_loss], but also returns the gradient of the
/// loss w.r.t. the logits: `(softmax(logits) - one_hot(labels)) / batch_size`.

pub fn cross_entropy<T: Real>(logits: &Tensor<T>, labels: &[usize]) -> Result<(T, Tensor<T>)> {
  check(logits, labels)?;
  let log_probs = logits.log_softmax();
  let n = count::<T>(labels.len());

  let mut total = T::zero();
  let mut grad = log_probs.exp();
  let cols = logits.shape().cols();
  for (i, &label) in labels.iter().enumerate() {
    total += log_probs.row(i)[label];
    grad.raw_mut()[i * cols + label] -= T::one();
  }

  Ok((-total / n, grad / n))
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn uniform_logits_give_log_of_class_count() {
    let logits = Tensor::<f64>::zeros(&[3,10]);
    let loss = cross_entropy_loss(&logits, &[0, 4, 9]).unwrap();
    assert!((loss - 10f64.ln()).abs() < 1e-12);
  }

  #[test]
  fn confident_prediction_has_small_loss() {
    let logits = Tensor::<f32>::new(&[1,3], vec![20.0, 0.0, 0.0]);
    assert!(cross_entropy_loss(&logits, &[0]).unwrap() < 1e-6);
    assert!(cross_entropy_loss(&logits, &[1]).unwrap() > 19.0);
  }

  #[test]
  fn extreme_logits_stay_finite() {
    let logits = Tensor::<f32>::new(&[2,2], vec![1e4, -1e4, -1e4, 1e4]);
    let (loss, grad) = cross_entropy(&logits, &[1, 1]).unwrap();
    assert!(loss.is_finite());
    assert!((loss - 1e4).abs() < 1.0);
    assert!(grad.raw().iter().all(|g| g.is_finite() ));
  }

  #[test]
  fn gradient_matches_finite_differences() {
    let logits = Tensor::<f64>::new(&[2,3], vec![0.2, -1.0, 0.5, 1.5, 0.3, -0.7]);
    let labels = [2, 0];
    let (loss, grad) = cross_entropy(&logits, &labels).unwrap();
    let eps = 1e-7;
    for i in 0..logits.size() {
      let mut bumped = logits.clone();
      bumped.raw_mut()[i] += eps;
      let numeric = (cross_entropy_loss(&bumped, &labels).unwrap() - loss) / eps;
      assert!((numeric - grad.raw()[i]).abs() < 1e-5);
    }
    // Rows of the gradient sum to zero
    for row in grad.row_iter() {
      assert!(row.iter().sum::<f64>().abs() < 1e-12);
    }
  }

  #[test]
  fn rejects_bad_labels() {
    let logits = Tensor::<f32>::zeros(&[2,3]);
    assert!(matches!(cross_entropy_loss(&logits, &[0]), Err(Error::LabelCount { rows: 2, labels: 1 })));
    assert!(matches!(cross_entropy_loss(&logits, &[0, 3]), Err(Error::LabelOutOfRange { label: 3, classes: 3 })));
    assert!(matches!(cross_entropy(&Tensor::<f32>::zeros(&[0,3]), &[]), Err(Error::EmptyDataset)));
  }
}
