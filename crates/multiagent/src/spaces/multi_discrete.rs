//! MultiDiscrete space: a fixed-length vector of independent choices.

use super::discrete::decode_index;
use super::Space;
use ndarray::{Array1, ArrayD};
use rand::Rng;

/// MultiDiscrete space for multiple discrete dimensions
///
/// Each dimension i has nvec[i] possible values: {0, 1, ..., nvec[i]-1}.
/// Flattening a tuple of `Discrete` or `MultiDiscrete` spaces produces one of
/// these with the per-agent `nvec`s laid end to end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiDiscrete {
    /// Number of values for each dimension
    pub nvec: Vec<usize>,
    shape: Vec<usize>,
}

impl MultiDiscrete {
    /// Create a new multi-discrete space
    pub fn new(nvec: Vec<usize>) -> Self {
        assert!(!nvec.is_empty(), "MultiDiscrete must have at least 1 dimension");
        assert!(
            nvec.iter().all(|&n| n > 0),
            "All dimensions must have at least 1 element"
        );
        let shape = vec![nvec.len()];
        Self { nvec, shape }
    }

    pub fn from_slice(nvec: &[usize]) -> Self {
        Self::new(nvec.to_vec())
    }

    /// Get the number of dimensions
    pub fn ndim(&self) -> usize {
        self.nvec.len()
    }

    /// Array form of one index per dimension
    pub fn encode(&self, indices: &[usize]) -> ArrayD<f32> {
        Array1::from_iter(indices.iter().map(|&i| i as f32)).into_dyn()
    }

    /// Indices held by `value`, if it is a valid element of this space
    pub fn decode(&self, value: &ArrayD<f32>) -> Option<Vec<usize>> {
        if value.len() != self.nvec.len() {
            return None;
        }
        let indices = value
            .iter()
            .map(|&x| decode_index(x))
            .collect::<Option<Vec<_>>>()?;
        self.contains(&indices).then_some(indices)
    }
}

impl Space for MultiDiscrete {
    type Sample = Vec<usize>;

    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample {
        self.nvec.iter().map(|&n| rng.gen_range(0..n)).collect()
    }

    fn contains(&self, value: &Self::Sample) -> bool {
        value.len() == self.nvec.len() && value.iter().zip(&self.nvec).all(|(&v, &n)| v < n)
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn num_elements(&self) -> usize {
        self.nvec.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_action_decodes_per_dimension() {
        let space = MultiDiscrete::from_slice(&[3, 4]);
        assert_eq!(space.ndim(), 2);
        assert_eq!(space.decode(&space.encode(&[2, 3])), Some(vec![2, 3]));
        // first dimension out of range
        assert_eq!(space.decode(&space.encode(&[3, 0])), None);
        // wrong length
        assert_eq!(space.decode(&space.encode(&[0])), None);
    }

    #[test]
    #[should_panic(expected = "at least 1 element")]
    fn test_zero_sized_dimension_panics() {
        MultiDiscrete::new(vec![2, 0]);
    }
}
