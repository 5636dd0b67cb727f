use std::mem;

use geo::{Coordinate, GeoFloat};
use num_traits::{Float, One, Zero};

use crate::diagram::EdgeId;
use crate::events::SiteId;
use crate::Internal;

/// Tolerance for the degeneracy branches: √ε of the scalar type. Below it,
/// directions count as parallel (collinear sites) and marginally negative
/// discriminants count as tangency; above it, the configuration is regular.
pub(crate) fn tolerance<T: GeoFloat>() -> T {
    T::epsilon().sqrt()
}

pub(crate) fn two<T: GeoFloat>() -> T {
    T::one() + T::one()
}

/// The y of the parabola with the given focus and a horizontal directrix,
/// evaluated at `x`. The focus must lie strictly above the directrix.
pub(crate) fn parabola_y<T: GeoFloat>(focus: Coordinate<T>, directrix: T, x: T) -> T {
    let dx = x - focus.x;
    dx * dx / (two::<T>() * (focus.y - directrix)) + (focus.y + directrix) / two()
}

/// A bisector still growing on the beach line, separating the region of
/// `left` (on its left, reading the beach line left to right) from the
/// region of `right`.
///
/// The traced direction is not stored: it is derived from the ordered site
/// pair, so that flipping the pair flips the direction. The same convention
/// fixes which ray/ray and ray/parabola solutions are meaningful, so every
/// derivation goes through [`Bisector::direction`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Bisector<T: GeoFloat> {
    pub left: SiteId,
    pub right: SiteId,
    /// Where the traced edge starts. `None` for bisectors created by the
    /// opening batch of sites sharing the maximal y: those are unbounded in
    /// both directions.
    pub base: Option<Coordinate<T>>,
    /// Handle of the output edge this bisector contributes to.
    pub edge: EdgeId,
}

impl<T: GeoFloat> Bisector<T> {
    /// Direction of the growing edge: the perpendicular of
    /// `sites[right] - sites[left]`, rotated clockwise. With this sign,
    /// `anchor + t * direction` for `t >= 0` traces exactly the half of the
    /// perpendicular bisector swept by the breakpoint between the two arcs.
    pub fn direction(&self, sites: &[Coordinate<T>]) -> Coordinate<T> {
        let d = sites[self.right] - sites[self.left];
        Coordinate { x: d.y, y: -d.x }
    }

    /// A point on the bisector line: the base if the edge is anchored, the
    /// midpoint of the two sites otherwise.
    pub fn anchor(&self, sites: &[Coordinate<T>]) -> Coordinate<T> {
        self.base
            .unwrap_or_else(|| (sites[self.left] + sites[self.right]) / two())
    }

    /// Crossing point of two bisector edges, or `None` when the directions
    /// are (near-)parallel or the crossing lies behind either anchored base.
    ///
    /// Solves `anchor1 + t * dir1 = anchor2 + u * dir2`. A vertical edge is
    /// special-cased to avoid dividing by its zero x-direction; verticals
    /// arise exactly from site pairs sharing a y coordinate, so the zero is
    /// exact. A negative parameter places the crossing on the untraced half
    /// of a bisector line; both parameters are checked, because a crossing
    /// near either base can put one of them at noise level. An unanchored
    /// edge covers its whole line and accepts any parameter.
    pub fn intersection(&self, other: &Bisector<T>, sites: &[Coordinate<T>]) -> Option<Coordinate<T>> {
        let mut base1 = self.anchor(sites);
        let mut dir1 = self.direction(sites);
        let mut free1 = self.base.is_none();
        let mut base2 = other.anchor(sites);
        let mut dir2 = other.direction(sites);
        let mut free2 = other.base.is_none();

        let cross = dir1.x * dir2.y - dir1.y * dir2.x;
        if cross.abs() <= tolerance::<T>() * dir1.x.hypot(dir1.y) * dir2.x.hypot(dir2.y) {
            return None;
        }

        if dir2.x.is_zero() {
            mem::swap(&mut base1, &mut base2);
            mem::swap(&mut dir1, &mut dir2);
            mem::swap(&mut free1, &mut free2);
        }

        let (t, u) = if dir1.x.is_zero() {
            // The vertical edge pins the crossing's x.
            let u = (base1.x - base2.x) / dir2.x;
            let t = (base2.y + u * dir2.y - base1.y) / dir1.y;
            (t, u)
        } else {
            let c1 = dir2.x / dir1.x;
            let c2 = (base2.x - base1.x) / dir1.x;
            let u = (base2.y - base1.y - c2 * dir1.y) / (dir1.y * c1 - dir2.y);
            (u * c1 + c2, u)
        };

        if (!free1 && t < T::zero()) || (!free2 && u < T::zero()) {
            return None;
        }
        // Two anchored edges crossing at both their bases only touch where
        // they were born: the arc between them widens from zero, it never
        // collapses.
        if !free1 && !free2 && t <= tolerance::<T>() && u <= tolerance::<T>() {
            return None;
        }
        Some(base2 + dir2 * u)
    }

    /// The point where this bisector crosses the parabola with focus
    /// `sites[focus]` and the sweep line as directrix.
    ///
    /// A vertical edge shortcuts to evaluating the parabola at its x.
    /// Otherwise the crossing is a quadratic in the edge parameter whose
    /// larger root is the one on the traced half of the bisector — the
    /// other root is real but belongs to the opposite half. A discriminant
    /// driven marginally negative by cancellation is clamped to zero; a
    /// clearly negative one means the edge misses a parabola it is
    /// guaranteed to cross.
    pub fn parabola_intersection(
        &self,
        focus: SiteId,
        directrix: T,
        sites: &[Coordinate<T>],
    ) -> Result<Coordinate<T>, Internal> {
        let p0 = self.anchor(sites);
        let pn = self.direction(sites);
        let f = sites[focus];

        if pn.x.is_zero() {
            return Ok(Coordinate {
                x: p0.x,
                y: parabola_y(f, directrix, p0.x),
            });
        }

        let two = two::<T>();
        let four = two + two;
        let c1 = two * (f.y - directrix);
        let c3 = p0.x - f.x;
        let c4 = pn.x * pn.x / c1;
        let c5 = two * pn.x * c3 / c1 - pn.y;
        let c6 = c3 * c3 / c1 + (f.y + directrix) / two - p0.y;

        let mut disc = c5 * c5 - four * c4 * c6;
        if disc < T::zero() {
            let scale = c5 * c5 + (four * c4 * c6).abs();
            if -disc > tolerance::<T>() * scale {
                return Err(Internal::MissedParabola);
            }
            disc = T::zero();
        }
        let t = (disc.sqrt() - c5) / (two * c4);
        Ok(p0 + pn * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchored(left: SiteId, right: SiteId, base: Coordinate<f64>) -> Bisector<f64> {
        Bisector {
            left,
            right,
            base: Some(base),
            edge: 0,
        }
    }

    fn unanchored(left: SiteId, right: SiteId) -> Bisector<f64> {
        Bisector {
            left,
            right,
            base: None,
            edge: 0,
        }
    }

    #[test]
    fn direction_flips_with_the_site_pair() {
        let sites = vec![Coordinate { x: 0., y: 0. }, Coordinate { x: 4., y: 2. }];
        let forward = unanchored(0, 1).direction(&sites);
        let backward = unanchored(1, 0).direction(&sites);
        assert_eq!(forward, Coordinate { x: 2., y: -4. });
        assert_eq!(backward, -forward);
    }

    #[test]
    fn converging_edges_cross_at_the_circumcenter() {
        // Sites 0, 1, 2 have circumcenter (2, 2).
        let sites = vec![
            Coordinate { x: 0., y: 0. },
            Coordinate { x: 0., y: 4. },
            Coordinate { x: 4., y: 0. },
        ];
        let a = anchored(0, 1, Coordinate { x: 0., y: 2. });
        let b = anchored(1, 2, Coordinate { x: 4., y: 4. });
        assert_eq!(
            a.intersection(&b, &sites),
            Some(Coordinate { x: 2., y: 2. })
        );
    }

    #[test]
    fn diverging_edges_do_not_cross() {
        let sites = vec![
            Coordinate { x: 0., y: 0. },
            Coordinate { x: 0., y: 4. },
            Coordinate { x: 4., y: 0. },
        ];
        // Same lines as above, traced away from the circumcenter.
        let a = anchored(1, 0, Coordinate { x: 0., y: 2. });
        let b = anchored(2, 1, Coordinate { x: 4., y: 4. });
        assert_eq!(a.intersection(&b, &sites), None);
    }

    #[test]
    fn edges_sharing_their_base_only_touch_there() {
        // Both edges start at (0, 2) and trace away from it; their lines
        // meet only at the shared base.
        let sites = vec![
            Coordinate { x: -2., y: 2. },
            Coordinate { x: 0., y: 0. },
            Coordinate { x: 2., y: 2. },
        ];
        let base = Coordinate { x: 0., y: 2. };
        let a = anchored(0, 1, base);
        let b = anchored(1, 2, base);
        assert_eq!(a.intersection(&b, &sites), None);
    }

    #[test]
    fn parallel_edges_do_not_cross() {
        let sites = vec![
            Coordinate { x: 0., y: 0. },
            Coordinate { x: 2., y: 2. },
            Coordinate { x: 4., y: 4. },
        ];
        let a = anchored(0, 1, Coordinate { x: 1., y: 1. });
        let b = anchored(1, 2, Coordinate { x: 3., y: 3. });
        assert_eq!(a.intersection(&b, &sites), None);
    }

    #[test]
    fn vertical_edge_pins_the_crossing() {
        let sites = vec![
            Coordinate { x: 0., y: 2. },
            Coordinate { x: 2., y: 2. },
            Coordinate { x: 2., y: 0. },
        ];
        let vertical = unanchored(0, 1);
        let horizontal = anchored(1, 2, Coordinate { x: 3., y: 1. });
        assert_eq!(
            vertical.intersection(&horizontal, &sites),
            Some(Coordinate { x: 1., y: 1. })
        );
        assert_eq!(
            horizontal.intersection(&vertical, &sites),
            Some(Coordinate { x: 1., y: 1. })
        );
    }

    #[test]
    fn parabola_crossing_agrees_from_both_foci() {
        let sites = vec![Coordinate { x: 0., y: 10. }, Coordinate { x: 1., y: 9. }];
        let edge = anchored(0, 1, Coordinate { x: 1., y: 10. });
        let expected = Coordinate { x: 0., y: 9. };
        assert_eq!(edge.parabola_intersection(0, 8., &sites), Ok(expected));
        assert_eq!(edge.parabola_intersection(1, 8., &sites), Ok(expected));
    }

    #[test]
    fn twin_edge_takes_the_other_root() {
        let sites = vec![Coordinate { x: 0., y: 10. }, Coordinate { x: 1., y: 9. }];
        let twin = anchored(1, 0, Coordinate { x: 1., y: 10. });
        assert_eq!(
            twin.parabola_intersection(0, 8., &sites),
            Ok(Coordinate { x: 4., y: 13. })
        );
    }

    #[test]
    fn vertical_edge_evaluates_the_parabola_directly() {
        let sites = vec![Coordinate { x: 0., y: 2. }, Coordinate { x: 4., y: 2. }];
        let vertical = unanchored(0, 1);
        assert_eq!(
            vertical.parabola_intersection(0, 0., &sites),
            Ok(Coordinate { x: 2., y: 2. })
        );
    }

    #[test]
    fn parabola_evaluation() {
        let focus = Coordinate { x: 1., y: 2. };
        // Points on the parabola are equidistant from focus and directrix.
        assert_eq!(parabola_y(focus, 0., 1.), 1.);
        assert_eq!(parabola_y(focus, 0., 3.), 2.);
        assert_eq!(parabola_y(focus, 0., -1.), 2.);
    }
}
