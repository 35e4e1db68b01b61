//! Observation and action space types.
//!
//! Provides Gymnasium-compatible space definitions, the tuple-space flattener
//! and the tuple/mapping bridge used by the vectorized layer.

mod r#box;
mod bridge;
mod dict;
mod discrete;
mod flatten;
mod multi_discrete;
mod tuple;

pub use bridge::{dict_to_tuple, dict_to_tuple_space, tuple_to_dict, tuple_to_dict_space, AgentMap};
pub use dict::Dict;
pub use discrete::Discrete;
pub use flatten::{flatten_space, FlatSpace};
pub use multi_discrete::MultiDiscrete;
pub use r#box::Box;
pub use tuple::Tuple;

use ndarray::{Array1, ArrayD};
use rand::Rng;
use std::fmt;

/// Trait for observation and action spaces
pub trait Space: Clone + Send + Sync {
    /// The type of samples from this space
    type Sample;

    /// Sample a random element from this space
    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample;

    /// Check if a value is contained in this space
    fn contains(&self, value: &Self::Sample) -> bool;

    /// Get the shape of samples from this space
    fn shape(&self) -> &[usize];

    /// Get the total number of elements in a sample
    fn num_elements(&self) -> usize {
        self.shape().iter().product()
    }
}

/// Tag naming the kind of a [`DynSpace`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpaceKind {
    Discrete,
    MultiDiscrete,
    Box,
    Tuple,
    Dict,
}

impl fmt::Display for SpaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpaceKind::Discrete => "Discrete",
            SpaceKind::MultiDiscrete => "MultiDiscrete",
            SpaceKind::Box => "Box",
            SpaceKind::Tuple => "Tuple",
            SpaceKind::Dict => "Dict",
        };
        f.write_str(name)
    }
}

/// Enum for dynamic space types
#[derive(Clone, Debug, PartialEq)]
pub enum DynSpace {
    Discrete(Discrete),
    MultiDiscrete(MultiDiscrete),
    Box(Box),
    Tuple(Tuple),
    Dict(Dict),
}

impl DynSpace {
    /// Kind tag of this space
    pub fn kind(&self) -> SpaceKind {
        match self {
            DynSpace::Discrete(_) => SpaceKind::Discrete,
            DynSpace::MultiDiscrete(_) => SpaceKind::MultiDiscrete,
            DynSpace::Box(_) => SpaceKind::Box,
            DynSpace::Tuple(_) => SpaceKind::Tuple,
            DynSpace::Dict(_) => SpaceKind::Dict,
        }
    }

    /// Get the shape of this space
    pub fn shape(&self) -> Vec<usize> {
        match self {
            DynSpace::Discrete(s) => s.shape().to_vec(),
            DynSpace::MultiDiscrete(s) => s.shape().to_vec(),
            DynSpace::Box(s) => s.shape().to_vec(),
            DynSpace::Tuple(s) => s.shape().to_vec(),
            DynSpace::Dict(s) => s.shape().to_vec(),
        }
    }

    /// Number of scalar elements in one value of this space
    pub fn num_elements(&self) -> usize {
        self.shape().iter().product()
    }

    /// Sample from this space
    ///
    /// Composite spaces are sampled element-wise and concatenated.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ArrayD<f32> {
        match self {
            DynSpace::Discrete(s) => s.encode(s.sample(rng)),
            DynSpace::MultiDiscrete(s) => s.encode(&s.sample(rng)),
            DynSpace::Box(s) => s.sample(rng),
            DynSpace::Tuple(s) => concat_samples(s.sample(rng)),
            DynSpace::Dict(s) => concat_samples(s.sample(rng).into_values().collect()),
        }
    }

    /// Check if this space contains the value
    pub fn contains(&self, value: &ArrayD<f32>) -> bool {
        match self {
            DynSpace::Discrete(s) => s.decode(value).is_some(),
            DynSpace::MultiDiscrete(s) => s.decode(value).is_some(),
            DynSpace::Box(s) => s.contains(value),
            // Composite values are checked through their own `Space` impls
            DynSpace::Tuple(_) | DynSpace::Dict(_) => false,
        }
    }
}

impl From<Discrete> for DynSpace {
    fn from(space: Discrete) -> Self {
        DynSpace::Discrete(space)
    }
}

impl From<MultiDiscrete> for DynSpace {
    fn from(space: MultiDiscrete) -> Self {
        DynSpace::MultiDiscrete(space)
    }
}

impl From<Box> for DynSpace {
    fn from(space: Box) -> Self {
        DynSpace::Box(space)
    }
}

impl From<Tuple> for DynSpace {
    fn from(space: Tuple) -> Self {
        DynSpace::Tuple(space)
    }
}

impl From<Dict> for DynSpace {
    fn from(space: Dict) -> Self {
        DynSpace::Dict(space)
    }
}

fn concat_samples(parts: Vec<ArrayD<f32>>) -> ArrayD<f32> {
    let flat: Vec<f32> = parts.into_iter().flat_map(|v| v.into_iter()).collect();
    Array1::from_vec(flat).into_dyn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_kind_names() {
        assert_eq!(DynSpace::from(Discrete::new(2)).kind().to_string(), "Discrete");
        assert_eq!(
            DynSpace::from(Box::uniform(&[2], 0.0, 1.0)).kind(),
            SpaceKind::Box
        );
    }

    #[test]
    fn test_dyn_sample_contained() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let spaces = [
            DynSpace::from(Discrete::new(3)),
            DynSpace::from(MultiDiscrete::new(vec![2, 5])),
            DynSpace::from(Box::uniform(&[2, 2], -1.0, 1.0)),
        ];
        for space in &spaces {
            for _ in 0..20 {
                let value = space.sample(&mut rng);
                assert!(space.contains(&value), "{:?} does not contain {:?}", space, value);
            }
        }
    }

    #[test]
    fn test_dyn_contains_rejects_negative_discrete() {
        let space = DynSpace::from(Discrete::new(3));
        assert!(!space.contains(&Array1::from_elem(1, -1.0).into_dyn()));
        assert!(!space.contains(&Array1::from_elem(1, 3.0).into_dyn()));
    }
}
