use geo::{Coordinate, Rect};

use rand::Rng;
use rand_distr::Standard;

#[inline]
pub fn uniform_point<R: Rng>(rng: &mut R, bounds: Rect<f64>) -> Coordinate<f64> {
    let coords: [f64; 2] = rng.sample(Standard);
    let dims = bounds.max() - bounds.min();
    Coordinate {
        x: bounds.min().x + dims.x * coords[0],
        y: bounds.min().y + dims.y * coords[1],
    }
}

/// Distinct with probability one; duplicate draws would be rejected by the
/// diagram construction.
#[inline]
pub fn uniform_sites<R: Rng>(rng: &mut R, bounds: Rect<f64>, count: usize) -> Vec<Coordinate<f64>> {
    (0..count).map(|_| uniform_point(rng, bounds)).collect()
}
