//! Box (continuous) space with per-element bounds.

use super::Space;
use ndarray::{Array1, ArrayD, IxDyn, Zip};
use rand::Rng;
use rand_distr::{Distribution, Exp1, StandardNormal, Uniform};

/// Box space for continuous values with bounds
#[derive(Clone, Debug, PartialEq)]
pub struct Box {
    /// Lower bound for each element
    pub low: ArrayD<f32>,
    /// Upper bound for each element
    pub high: ArrayD<f32>,
    shape: Vec<usize>,
}

impl Box {
    /// Create a new box space with given bounds
    pub fn new(low: ArrayD<f32>, high: ArrayD<f32>) -> Self {
        assert_eq!(low.shape(), high.shape(), "Low and high must have same shape");
        let shape = low.shape().to_vec();
        Self { low, high, shape }
    }

    /// One-dimensional box from bound vectors
    pub fn from_vecs(low: Vec<f32>, high: Vec<f32>) -> Self {
        Self::new(Array1::from_vec(low).into_dyn(), Array1::from_vec(high).into_dyn())
    }

    /// Create a box space with uniform bounds
    pub fn uniform(shape: &[usize], low: f32, high: f32) -> Self {
        Self::new(
            ArrayD::from_elem(IxDyn(shape), low),
            ArrayD::from_elem(IxDyn(shape), high),
        )
    }

    pub fn unbounded(shape: &[usize]) -> Self {
        Self::uniform(shape, f32::NEG_INFINITY, f32::INFINITY)
    }

    /// One-dimensional box holding every part's raveled bounds, in order
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a Box>) -> Self {
        let (low, high): (Vec<f32>, Vec<f32>) = parts
            .into_iter()
            .flat_map(|b| b.low.iter().copied().zip(b.high.iter().copied()))
            .unzip();
        Self::from_vecs(low, high)
    }
}

/// Draw one element: uniform when bounded, shifted exponential when
/// half-bounded, standard normal when unbounded.
fn sample_element<R: Rng>(low: f32, high: f32, rng: &mut R) -> f32 {
    match (low.is_finite(), high.is_finite()) {
        (true, true) if low < high => Uniform::new(low, high).sample(rng),
        (true, true) => low,
        (true, false) => {
            let offset: f32 = Exp1.sample(rng);
            low + offset
        }
        (false, true) => {
            let offset: f32 = Exp1.sample(rng);
            high - offset
        }
        (false, false) => StandardNormal.sample(rng),
    }
}

impl Space for Box {
    type Sample = ArrayD<f32>;

    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample {
        let mut result = ArrayD::zeros(IxDyn(&self.shape));
        Zip::from(&mut result)
            .and(&self.low)
            .and(&self.high)
            .for_each(|r, &l, &h| *r = sample_element(l, h, rng));
        result
    }

    fn contains(&self, value: &Self::Sample) -> bool {
        value.shape() == self.low.shape()
            && Zip::from(value)
                .and(&self.low)
                .and(&self.high)
                .all(|&v, &l, &h| v >= l && v <= h)
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}
