//! Agent-major / environment-major reshaping.
//!
//! `VecMultiEnv` speaks agent-major: a `num_agents`-length sequence whose
//! i'th entry holds agent i's values for every environment. Backends speak
//! environment-major: one `num_agents`-length sequence per environment.

use crate::{MultiAgentError, Result};
use ndarray::{ArrayD, Axis};

/// Swap the two outer dimensions of a rectangular nested sequence.
///
/// Values are moved, not cloned. Ragged input fails with `DimensionMismatch`;
/// an empty outer sequence transposes to an empty sequence.
pub fn tuple_transpose<T>(xs: Vec<Vec<T>>) -> Result<Vec<Vec<T>>> {
    let Some(inner_len) = xs.first().map(Vec::len) else {
        return Ok(Vec::new());
    };
    if let Some((index, x)) = xs.iter().enumerate().find(|(_, x)| x.len() != inner_len) {
        return Err(MultiAgentError::DimensionMismatch {
            index,
            expected: inner_len,
            actual: x.len(),
        });
    }

    let outer_len = xs.len();
    let mut out: Vec<Vec<T>> = (0..inner_len)
        .map(|_| Vec::with_capacity(outer_len))
        .collect();
    for x in xs {
        for (row, value) in out.iter_mut().zip(x) {
            row.push(value);
        }
    }
    Ok(out)
}

/// Stack per-environment values along a new leading batch axis
pub fn stack_batch(values: &[ArrayD<f32>]) -> Result<ArrayD<f32>> {
    let Some(first) = values.first() else {
        return Err(MultiAgentError::PreconditionViolation(
            "cannot stack an empty batch".into(),
        ));
    };
    if let Some(bad) = values.iter().find(|v| v.shape() != first.shape()) {
        return Err(MultiAgentError::ShapeMismatch {
            expected: first.shape().to_vec(),
            actual: bad.shape().to_vec(),
        });
    }
    let views: Vec<_> = values.iter().map(ArrayD::view).collect();
    ndarray::stack(Axis(0), &views).map_err(|_| MultiAgentError::ShapeMismatch {
        expected: first.shape().to_vec(),
        actual: vec![values.len()],
    })
}

/// Split a batch back into per-environment values
pub fn unstack_batch(batch: &ArrayD<f32>) -> Vec<ArrayD<f32>> {
    batch.outer_iter().map(|v| v.to_owned()).collect()
}
