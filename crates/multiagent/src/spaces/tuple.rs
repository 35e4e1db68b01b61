//! Tuple observation/action space
//!
//! Multi-agent environments describe their spaces as a tuple with one
//! sub-space per agent index.

use super::{DynSpace, Space};
use ndarray::ArrayD;
use rand::Rng;

/// Tuple space containing an ordered list of sub-spaces
#[derive(Clone, Debug, PartialEq)]
pub struct Tuple {
    /// Ordered sub-spaces
    pub spaces: Vec<DynSpace>,
    /// Cached total shape
    shape: Vec<usize>,
}

impl Tuple {
    /// Create a new tuple space
    pub fn new(spaces: Vec<DynSpace>) -> Self {
        let total: usize = spaces.iter().map(DynSpace::num_elements).sum();
        Self {
            spaces,
            shape: vec![total],
        }
    }

    /// Tuple of `n` copies of one space
    pub fn repeat(space: impl Into<DynSpace>, n: usize) -> Self {
        let space = space.into();
        Self::new(vec![space; n])
    }

    /// Number of sub-spaces
    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    /// Sub-space at index `i`
    pub fn get(&self, i: usize) -> Option<&DynSpace> {
        self.spaces.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DynSpace> {
        self.spaces.iter()
    }

    /// Copy of this tuple with the sub-space at `idx` removed.
    ///
    /// Later indices shift down by one. An out-of-range `idx` removes nothing.
    pub fn without(&self, idx: usize) -> Self {
        let spaces = self
            .spaces
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != idx)
            .map(|(_, s)| s.clone())
            .collect();
        Self::new(spaces)
    }
}

impl Space for Tuple {
    type Sample = Vec<ArrayD<f32>>;

    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample {
        self.spaces.iter().map(|s| s.sample(rng)).collect()
    }

    fn contains(&self, value: &Self::Sample) -> bool {
        value.len() == self.spaces.len()
            && value.iter().zip(self.spaces.iter()).all(|(v, s)| s.contains(v))
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}
