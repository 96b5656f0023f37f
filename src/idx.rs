//! Reader for the IDX files MNIST is distributed in.
//!
//! An IDX file starts with a big-endian magic number, followed by one
//! big-endian `u32` per dimension and the raw unsigned bytes.

use std::{ fs, path::Path };

use log::debug;

use crate::{
  dataset::Dataset,
  error::{ Error, Result },
  scalar::Real,
};


const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

/// Images as flat rows of pixel intensities.

#[derive(Debug, Clone, PartialEq)]
pub struct Images {
  pub count: usize,
  pub rows: usize,
  pub cols: usize,
  pub pixels: Vec<u8>,
}

impl Images {
  /// Number of pixels per image.

  pub fn size(&self) -> usize {
    self.rows * self.cols
  }
}


struct Reader<'a> {
  bytes: &'a [u8],
  offset: usize,
}

impl<'a> Reader<'a> {
  fn new(bytes: &'a [u8]) -> Self {
    Self { bytes, offset: 0 }
  }

  fn take(&mut self, len: usize) -> Result<&'a [u8]> {
    let end = self.offset.saturating_add(len);
    let chunk = self.bytes.get(self.offset..end).ok_or_else(|| Error::Format(
      format!("expected {} bytes at offset {}, file has {}", len, self.offset, self.bytes.len())
    ))?;
    self.offset = end;
    Ok(chunk)
  }

  fn u32(&mut self) -> Result<u32> {
    let mut word = [0; 4];
    word.copy_from_slice(self.take(4)?);
    Ok(u32::from_be_bytes(word))
  }

  fn magic(&mut self, expected: u32) -> Result<()> {
    let magic = self.u32()?;
    if magic != expected {
      return Err(Error::Format(format!("magic number {:#010x}, expected {:#010x}", magic, expected)))
    }
    Ok(())
  }
}


pub fn parse_images(bytes: &[u8]) -> Result<Images> {
  let mut reader = Reader::new(bytes);
  reader.magic(IMAGES_MAGIC)?;
  let count = reader.u32()? as usize;
  let rows = reader.u32()? as usize;
  let cols = reader.u32()? as usize;
  let size = count.checked_mul(rows)
    .and_then(|n| n.checked_mul(cols) )
    .ok_or_else(|| Error::Format(format!("{} images of {}x{} pixels is too large", count, rows, cols)) )?;
  let pixels = reader.take(size)?.to_vec();
  Ok(Images { count, rows, cols, pixels })
}

pub fn parse_labels(bytes: &[u8]) -> Result<Vec<usize>> {
  let mut reader = Reader::new(bytes);
  reader.magic(LABELS_MAGIC)?;
  let count = reader.u32()? as usize;
  Ok(reader.take(count)?.iter().map(|&label| label as usize ).collect())
}

pub fn read_images(path: impl AsRef<Path>) -> Result<Images> {
  debug!("Reading images from {}", path.as_ref().display());
  parse_images(&fs::read(path)?)
}

pub fn read_labels(path: impl AsRef<Path>) -> Result<Vec<usize>> {
  debug!("Reading labels from {}", path.as_ref().display());
  parse_labels(&fs::read(path)?)
}


/// The MNIST handwritten digits, split into training and test set.

#[derive(Debug, Clone)]
pub struct Mnist<T: Real> {
  pub train: Dataset<T>,
  pub test: Dataset<T>,
}

impl<T: Real> Mnist<T> {
  pub const CLASSES: usize = 10;

  /// Load the four standard files from `dir`, with pixels scaled to `[0, 1]`.

  pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
    let dir = dir.as_ref();
    Ok(Self {
      train: Self::dataset(read_images(dir.join("train-images-idx3-ubyte"))?, read_labels(dir.join("train-labels-idx1-ubyte"))?)?,
      test: Self::dataset(read_images(dir.join("t10k-images-idx3-ubyte"))?, read_labels(dir.join("t10k-labels-idx1-ubyte"))?)?,
    })
  }

  /// Pair up images and labels that were parsed separately.

  pub fn dataset(images: Images, labels: Vec<usize>) -> Result<Dataset<T>> {
    Dataset::from_pixels(&images.pixels, images.size(), labels, Self::CLASSES)
  }
}
