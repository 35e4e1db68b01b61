//! Discrete space: one of `n` choices.
//!
//! Values travel through environments as one-element `f32` arrays holding
//! the chosen index.

use super::Space;
use ndarray::{Array1, ArrayD};
use rand::Rng;

/// Discrete space with n possible values: {0, 1, ..., n-1}
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discrete {
    /// Number of possible values
    pub n: usize,
    shape: Vec<usize>,
}

impl Discrete {
    /// Create a new discrete space with n values
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "Discrete space must have at least 1 element");
        Self { n, shape: vec![1] }
    }

    /// Array form of `index`
    pub fn encode(&self, index: usize) -> ArrayD<f32> {
        Array1::from_elem(1, index as f32).into_dyn()
    }

    /// Index held by `value`, if it is a valid element of this space
    pub fn decode(&self, value: &ArrayD<f32>) -> Option<usize> {
        match value.as_slice_memory_order() {
            Some(&[x]) => decode_index(x).filter(|&i| i < self.n),
            _ => None,
        }
    }
}

/// Non-negative, finite float rounded to an index
pub(crate) fn decode_index(x: f32) -> Option<usize> {
    (x.is_finite() && x >= 0.0).then(|| x.round() as usize)
}

impl Space for Discrete {
    type Sample = usize;

    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample {
        rng.gen_range(0..self.n)
    }

    fn contains(&self, value: &Self::Sample) -> bool {
        *value < self.n
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn num_elements(&self) -> usize {
        1
    }
}
