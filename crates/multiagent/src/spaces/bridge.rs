//! Conversion between agent-indexed sequences and agent-keyed mappings.
//!
//! The vectorized layer only routes keyed payloads, so per-agent tuples are
//! keyed by their index on the way in and rebuilt on the way out.

use super::{Dict, Tuple};
use crate::{MultiAgentError, Result};
use std::collections::BTreeMap;

/// Values keyed by agent index
pub type AgentMap<T> = BTreeMap<usize, T>;

/// Key each value by its position
pub fn tuple_to_dict<T>(values: Vec<T>) -> AgentMap<T> {
    values.into_iter().enumerate().collect()
}

/// Rebuild the ordered sequence from a mapping keyed `0..=max_key`.
///
/// Fails with `MissingKey` on the first absent index.
pub fn dict_to_tuple<T>(mut map: AgentMap<T>) -> Result<Vec<T>> {
    let Some(&max_key) = map.keys().next_back() else {
        return Ok(Vec::new());
    };
    (0..=max_key)
        .map(|k| map.remove(&k).ok_or(MultiAgentError::MissingKey(k)))
        .collect()
}

/// Dict space keyed by the tuple's agent indices
pub fn tuple_to_dict_space(tuple: &Tuple) -> Dict {
    Dict::new(tuple_to_dict(tuple.spaces.clone()))
}

/// Tuple space rebuilt from a dict keyed `0..=max_key`
pub fn dict_to_tuple_space(dict: &Dict) -> Result<Tuple> {
    dict_to_tuple(dict.spaces.clone()).map(Tuple::new)
}
