//! Dict observation/action space keyed by agent index

use super::{DynSpace, Space};
use ndarray::ArrayD;
use rand::Rng;
use std::collections::BTreeMap;

/// Dictionary space containing sub-spaces keyed by agent index
#[derive(Clone, Debug, PartialEq)]
pub struct Dict {
    /// Keyed sub-spaces
    pub spaces: BTreeMap<usize, DynSpace>,
    /// Cached total shape (sum of all sub-space shapes)
    shape: Vec<usize>,
}

impl Dict {
    /// Create a new dict space
    pub fn new(spaces: BTreeMap<usize, DynSpace>) -> Self {
        let total: usize = spaces.values().map(DynSpace::num_elements).sum();
        Self {
            spaces,
            shape: vec![total],
        }
    }

    /// Create from a list of (key, space) pairs
    pub fn from_pairs(pairs: Vec<(usize, DynSpace)>) -> Self {
        Self::new(pairs.into_iter().collect())
    }

    /// Get a sub-space by key
    pub fn get(&self, key: usize) -> Option<&DynSpace> {
        self.spaces.get(&key)
    }

    /// All keys in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &usize> {
        self.spaces.keys()
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }
}

impl Space for Dict {
    type Sample = BTreeMap<usize, ArrayD<f32>>;

    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample {
        self.spaces
            .iter()
            .map(|(&k, v)| (k, v.sample(rng)))
            .collect()
    }

    fn contains(&self, value: &Self::Sample) -> bool {
        value.len() == self.spaces.len()
            && self
                .spaces
                .iter()
                .all(|(k, s)| value.get(k).is_some_and(|v| s.contains(v)))
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}
