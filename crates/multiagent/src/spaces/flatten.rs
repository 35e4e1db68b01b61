//! Flattening of per-agent tuple spaces into one combined space.
//!
//! `(Discrete(2), Discrete(3))` becomes `MultiDiscrete([2, 3])`,
//! `(MultiDiscrete([2, 2]), MultiDiscrete([4]))` becomes `MultiDiscrete([2, 2, 4])`
//! and `(Box([2]), Box([3, 1]))` becomes `Box([5])`. Mixed kinds cannot be
//! flattened.

use super::{Box as BoxSpace, DynSpace, MultiDiscrete, SpaceKind, Tuple};
use crate::{MultiAgentError, Result};
use ndarray::{Array1, ArrayD, IxDyn};
use std::collections::BTreeSet;

/// A flattened tuple space together with its value mappings.
///
/// Values are laid out agent after agent, each raveled in logical order, so
/// `unflatten(flatten(x)) == x` for every `x` in the original tuple space.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatSpace {
    space: DynSpace,
    /// Per-agent value shapes, in agent order
    parts: Vec<Vec<usize>>,
}

/// Flatten a tuple of like-kinded spaces into a single bigger space.
///
/// Sub-spaces may differ in shape but must share one kind.
pub fn flatten_space(tuple: &Tuple) -> Result<FlatSpace> {
    let kinds: BTreeSet<SpaceKind> = tuple.iter().map(DynSpace::kind).collect();
    if kinds.len() > 1 {
        return Err(MultiAgentError::TypeMismatch {
            kinds: kinds.iter().map(ToString::to_string).collect(),
        });
    }
    let kind = kinds
        .into_iter()
        .next()
        .ok_or_else(|| MultiAgentError::NotSupported("empty tuple space".into()))?;

    let space = match kind {
        SpaceKind::Discrete => {
            let nvec = tuple
                .iter()
                .filter_map(|s| match s {
                    DynSpace::Discrete(d) => Some(d.n),
                    _ => None,
                })
                .collect();
            DynSpace::MultiDiscrete(MultiDiscrete::new(nvec))
        }
        SpaceKind::MultiDiscrete => {
            let nvec = tuple
                .iter()
                .filter_map(|s| match s {
                    DynSpace::MultiDiscrete(m) => Some(m.nvec.iter().copied()),
                    _ => None,
                })
                .flatten()
                .collect();
            DynSpace::MultiDiscrete(MultiDiscrete::new(nvec))
        }
        SpaceKind::Box => {
            let parts = tuple.iter().filter_map(|s| match s {
                DynSpace::Box(b) => Some(b),
                _ => None,
            });
            DynSpace::Box(BoxSpace::concat(parts))
        }
        SpaceKind::Tuple | SpaceKind::Dict => {
            return Err(MultiAgentError::NotSupported(format!(
                "cannot flatten a tuple of {} spaces",
                kind
            )))
        }
    };

    tracing::debug!(%kind, num_agents = tuple.len(), "Flattened tuple space");

    Ok(FlatSpace {
        space,
        parts: tuple.iter().map(DynSpace::shape).collect(),
    })
}

impl FlatSpace {
    /// The combined space
    pub fn space(&self) -> &DynSpace {
        &self.space
    }

    /// Number of agents folded into this space
    pub fn num_agents(&self) -> usize {
        self.parts.len()
    }

    /// Shape of agent `i`'s values in the original tuple space
    pub fn part_shape(&self, i: usize) -> Option<&[usize]> {
        self.parts.get(i).map(Vec::as_slice)
    }

    fn total_size(&self) -> usize {
        self.parts.iter().map(|s| s.iter().product::<usize>()).sum()
    }

    /// Combine per-agent values into one value of the flat space
    pub fn flatten(&self, values: &[ArrayD<f32>]) -> Result<ArrayD<f32>> {
        if values.len() != self.parts.len() {
            return Err(MultiAgentError::ShapeMismatch {
                expected: vec![self.parts.len()],
                actual: vec![values.len()],
            });
        }

        let mut flat = Vec::with_capacity(self.total_size());
        for (value, shape) in values.iter().zip(&self.parts) {
            if value.len() != shape.iter().product::<usize>() {
                return Err(MultiAgentError::ShapeMismatch {
                    expected: shape.clone(),
                    actual: value.shape().to_vec(),
                });
            }
            flat.extend(value.iter().copied());
        }
        Ok(Array1::from_vec(flat).into_dyn())
    }

    /// Split a flat value back into per-agent values with their original shapes
    pub fn unflatten(&self, value: &ArrayD<f32>) -> Result<Vec<ArrayD<f32>>> {
        let total = self.total_size();
        if value.len() != total {
            return Err(MultiAgentError::ShapeMismatch {
                expected: vec![total],
                actual: value.shape().to_vec(),
            });
        }

        let data: Vec<f32> = value.iter().copied().collect();
        let mut offset = 0;
        let mut out = Vec::with_capacity(self.parts.len());
        for shape in &self.parts {
            let size = shape.iter().product::<usize>();
            let part = ArrayD::from_shape_vec(IxDyn(shape), data[offset..offset + size].to_vec())
                .map_err(|_| MultiAgentError::ShapeMismatch {
                    expected: shape.clone(),
                    actual: vec![size],
                })?;
            out.push(part);
            offset += size;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::{Dict, Discrete, Space};
    use rand::SeedableRng;

    fn assert_round_trip(tuple: &Tuple, tolerance: f32) {
        let flat = flatten_space(tuple).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let value = tuple.sample(&mut rng);
            let combined = flat.flatten(&value).unwrap();
            assert!(flat.space().contains(&combined));
            let restored = flat.unflatten(&combined).unwrap();
            assert_eq!(restored.len(), value.len());
            for (a, b) in restored.iter().zip(&value) {
                assert_eq!(a.shape(), b.shape());
                for (x, y) in a.iter().zip(b.iter()) {
                    assert!((x - y).abs() <= tolerance, "{} != {}", x, y);
                }
            }
        }
    }

    #[test]
    fn test_discrete_flattens_to_multi_discrete() {
        let tuple = Tuple::new(vec![Discrete::new(2).into(), Discrete::new(3).into()]);
        let flat = flatten_space(&tuple).unwrap();
        assert_eq!(
            flat.space(),
            &DynSpace::MultiDiscrete(MultiDiscrete::new(vec![2, 3]))
        );
        assert_round_trip(&tuple, 0.0);
    }

    #[test]
    fn test_multi_discrete_concatenates_nvec() {
        let tuple = Tuple::new(vec![
            MultiDiscrete::new(vec![2, 2]).into(),
            MultiDiscrete::new(vec![4]).into(),
        ]);
        let flat = flatten_space(&tuple).unwrap();
        assert_eq!(
            flat.space(),
            &DynSpace::MultiDiscrete(MultiDiscrete::new(vec![2, 2, 4]))
        );
        assert_round_trip(&tuple, 0.0);
    }

    #[test]
    fn test_box_concatenates_bounds_and_restores_shapes() {
        let tuple = Tuple::new(vec![
            BoxSpace::uniform(&[2], -1.0, 1.0).into(),
            BoxSpace::uniform(&[3, 1], 0.0, 5.0).into(),
        ]);
        let flat = flatten_space(&tuple).unwrap();
        match flat.space() {
            DynSpace::Box(b) => {
                assert_eq!(b.shape(), &[5]);
                assert_eq!(b.low.as_slice().unwrap(), &[-1.0, -1.0, 0.0, 0.0, 0.0]);
                assert_eq!(b.high.as_slice().unwrap(), &[1.0, 1.0, 5.0, 5.0, 5.0]);
            }
            other => panic!("expected Box, got {:?}", other),
        }
        assert_eq!(flat.part_shape(1), Some(&[3, 1][..]));
        assert_round_trip(&tuple, 1e-6);
    }

    #[test]
    fn test_box_unflatten_uses_cumulative_offsets() {
        let tuple = Tuple::new(vec![
            BoxSpace::uniform(&[1], -9.0, 9.0).into(),
            BoxSpace::uniform(&[2], -9.0, 9.0).into(),
        ]);
        let flat = flatten_space(&tuple).unwrap();
        let value = Array1::from_vec(vec![1.0, 2.0, 3.0]).into_dyn();
        let parts = flat.unflatten(&value).unwrap();
        assert_eq!(parts[0].as_slice().unwrap(), &[1.0]);
        assert_eq!(parts[1].as_slice().unwrap(), &[2.0, 3.0]);
    }

    #[test]
    fn test_mixed_kinds_is_type_mismatch() {
        let tuple = Tuple::new(vec![
            Discrete::new(2).into(),
            BoxSpace::uniform(&[2], 0.0, 1.0).into(),
        ]);
        match flatten_space(&tuple) {
            Err(MultiAgentError::TypeMismatch { kinds }) => {
                assert_eq!(kinds, vec!["Discrete".to_string(), "Box".to_string()]);
            }
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_and_empty_are_not_supported() {
        let nested = Tuple::new(vec![Tuple::repeat(Discrete::new(2), 2).into()]);
        assert!(matches!(
            flatten_space(&nested),
            Err(MultiAgentError::NotSupported(_))
        ));

        let keyed = Tuple::new(vec![Dict::from_pairs(vec![(0, Discrete::new(2).into())]).into()]);
        assert!(matches!(
            flatten_space(&keyed),
            Err(MultiAgentError::NotSupported(_))
        ));

        assert!(matches!(
            flatten_space(&Tuple::new(vec![])),
            Err(MultiAgentError::NotSupported(_))
        ));
    }

    #[test]
    fn test_wrong_sizes_are_rejected() {
        let tuple = Tuple::repeat(BoxSpace::uniform(&[2], 0.0, 1.0), 2);
        let flat = flatten_space(&tuple).unwrap();

        let one_agent = vec![ArrayD::zeros(IxDyn(&[2]))];
        assert!(matches!(
            flat.flatten(&one_agent),
            Err(MultiAgentError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            flat.unflatten(&ArrayD::zeros(IxDyn(&[3]))),
            Err(MultiAgentError::ShapeMismatch { .. })
        ));
    }
}
