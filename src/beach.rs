use geo::{Coordinate, GeoFloat};
use itertools::Itertools;

use num_traits::{Float, One};

use crate::bisector::{parabola_y, tolerance, two, Bisector};
use crate::diagram::{EdgeSink, HalfEnd};
use crate::events::SiteId;
use crate::Internal;

/// One element of the beach line.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Element<T: GeoFloat> {
    /// An arc of the parabola focused at `site`.
    Region { site: SiteId },
    /// The growing edge separating the two neighbouring arcs.
    Ray(Bisector<T>),
}

/// The beach line: the ordered cross-section of unresolved parabolic arcs
/// at the current sweep position.
///
/// Elements strictly alternate `Region, Ray, Region, ..., Region`, and
/// every ray names the sites of the regions flanking it; breaking either is
/// a fatal inconsistency. Lookups are linear scans over the element vector.
#[derive(Debug)]
pub(crate) struct BeachLine<T: GeoFloat> {
    elements: Vec<Element<T>>,
}

impl<T: GeoFloat> BeachLine<T> {
    pub fn new() -> Self {
        BeachLine {
            elements: Vec::new(),
        }
    }

    /// Insert the opening batch of sites sharing the maximal y, ordered by
    /// x, with a single unanchored bisector between each adjacent pair: two
    /// parabolas with a common focus height meet in one breakpoint at that
    /// instant, not two.
    pub fn init_batch(
        &mut self,
        batch: &mut [SiteId],
        sites: &[Coordinate<T>],
        sink: &mut EdgeSink<T>,
    ) {
        debug_assert!(self.elements.is_empty());
        // Distinct sites on one row have distinct x.
        batch.sort_unstable_by(|&a, &b| {
            sites[a]
                .x
                .partial_cmp(&sites[b].x)
                .expect("site coordinates are finite")
        });

        for &site in batch.iter() {
            if let Some(&Element::Region { site: prev }) = self.elements.last() {
                let anchor = (sites[prev] + sites[site]) / two();
                let edge = sink.begin(prev, site, anchor);
                let ray = Bisector {
                    left: prev,
                    right: site,
                    base: None,
                    edge,
                };
                // The upper half of the bisector line is never traced by
                // the sweep; it escapes to infinity as-is.
                sink.resolve(edge, HalfEnd::Toward(-ray.direction(sites)));
                self.elements.push(Element::Ray(ray));
            }
            self.elements.push(Element::Region { site });
        }
        self.debug_validate();
    }

    /// Index of the region whose arc lies directly above `x`: the
    /// breakpoint on its left is at or left of `x`, and the breakpoint on
    /// its right at or right of it. An arc whose site lies exactly on the
    /// sweep line was inserted at this very position and still has zero
    /// width, so it is never the arc above anything.
    pub fn locate_arc_above(
        &self,
        x: T,
        directrix: T,
        sites: &[Coordinate<T>],
    ) -> Result<usize, Internal> {
        // Adjacent arcs compute their shared breakpoint through different
        // parabolas; the pad keeps sub-ulp disagreements between the two
        // from leaving `x` unclaimed. The leftmost padded match wins.
        let pad = tolerance::<T>() * (T::one() + x.abs());
        for (index, element) in self.elements.iter().enumerate() {
            let site = match *element {
                Element::Region { site } => site,
                Element::Ray(_) => continue,
            };
            if sites[site].y == directrix {
                continue;
            }
            if index > 0 {
                let ray = self.ray_at(index - 1)?;
                if ray.right != site {
                    return Err(Internal::BrokenAlternation);
                }
                if ray.parabola_intersection(site, directrix, sites)?.x > x + pad {
                    continue;
                }
            }
            if index + 1 < self.elements.len() {
                let ray = self.ray_at(index + 1)?;
                if ray.left != site {
                    return Err(Internal::BrokenAlternation);
                }
                if ray.parabola_intersection(site, directrix, sites)?.x < x - pad {
                    continue;
                }
            }
            return Ok(index);
        }
        Err(Internal::NoArcAbove)
    }

    /// Split the arc at `index` under a newly reached site: the arc's
    /// region `p` is replaced by `p, (p|new), new, (new|p), p`, with both
    /// new edges anchored at the point of `p`'s parabola directly above the
    /// new site. Returns the two new rays, left one first.
    pub fn split_arc(
        &mut self,
        index: usize,
        new_site: SiteId,
        directrix: T,
        sites: &[Coordinate<T>],
        sink: &mut EdgeSink<T>,
    ) -> Result<(Bisector<T>, Bisector<T>), Internal> {
        let arc = self.region_at(index)?;
        let base = Coordinate {
            x: sites[new_site].x,
            y: parabola_y(sites[arc], directrix, sites[new_site].x),
        };
        let edge = sink.begin(arc, new_site, base);
        let left = Bisector {
            left: arc,
            right: new_site,
            base: Some(base),
            edge,
        };
        let right = Bisector {
            left: new_site,
            right: arc,
            base: Some(base),
            edge,
        };
        self.elements.splice(
            index..=index,
            vec![
                Element::Region { site: arc },
                Element::Ray(left),
                Element::Region { site: new_site },
                Element::Ray(right),
                Element::Region { site: arc },
            ],
        );
        self.debug_validate();
        Ok((left, right))
    }

    /// Collapse the region at `index`: its flanking rays meet at a new
    /// diagram vertex, both are finalized there, and the three elements are
    /// replaced by a single merged ray separating the outer pair, anchored
    /// at the vertex. Returns the merged ray.
    pub fn collapse_arc(
        &mut self,
        index: usize,
        sites: &[Coordinate<T>],
        sink: &mut EdgeSink<T>,
    ) -> Result<Bisector<T>, Internal> {
        let left_index = index.checked_sub(1).ok_or(Internal::BrokenAlternation)?;
        let left = *self.ray_at(left_index)?;
        let right = *self.ray_at(index + 1)?;

        let vertex = left
            .intersection(&right, sites)
            .ok_or(Internal::DivergedAtVertex)?;
        sink.vertex(vertex);
        sink.resolve(left.edge, HalfEnd::At(vertex));
        sink.resolve(right.edge, HalfEnd::At(vertex));

        let edge = sink.begin(left.left, right.right, vertex);
        sink.resolve(edge, HalfEnd::At(vertex));
        let merged = Bisector {
            left: left.left,
            right: right.right,
            base: Some(vertex),
            edge,
        };
        self.elements
            .splice(left_index..=index + 1, vec![Element::Ray(merged)]);
        self.debug_validate();
        Ok(merged)
    }

    /// Locate the region collapsing for a vertex event: a region of `mid`
    /// directly flanked by the `(left, mid)` and `(mid, right)` rays.
    pub fn find_collapse(&self, left: SiteId, mid: SiteId, right: SiteId) -> Option<usize> {
        (0..self.elements.len()).find(|&index| match self.elements[index] {
            Element::Region { site } if site == mid && index > 0 => {
                matches!(
                    self.elements[index - 1],
                    Element::Ray(r) if r.left == left && r.right == mid
                ) && matches!(
                    self.elements.get(index + 1),
                    Some(Element::Ray(r)) if r.left == mid && r.right == right
                )
            }
            _ => false,
        })
    }

    /// The rays immediately flanking the element at `index`.
    pub fn neighbors(&self, index: usize) -> (Option<Bisector<T>>, Option<Bisector<T>>) {
        self.flanking(index, 1)
    }

    /// The rays three positions out from a collapsing region: the far
    /// bounds of the triples whose pending vertex events go stale.
    pub fn outer_neighbors(&self, index: usize) -> (Option<Bisector<T>>, Option<Bisector<T>>) {
        self.flanking(index, 3)
    }

    fn flanking(&self, index: usize, distance: usize) -> (Option<Bisector<T>>, Option<Bisector<T>>) {
        let ray = |i: Option<usize>| match i.and_then(|i| self.elements.get(i)) {
            Some(Element::Ray(r)) => Some(*r),
            _ => None,
        };
        (
            ray(index.checked_sub(distance)),
            ray(index.checked_add(distance)),
        )
    }

    /// The rays still alive at the end of the sweep.
    pub fn rays(&self) -> impl Iterator<Item = &Bisector<T>> + '_ {
        self.elements.iter().filter_map(|element| match element {
            Element::Ray(ray) => Some(ray),
            Element::Region { .. } => None,
        })
    }

    pub fn region_at(&self, index: usize) -> Result<SiteId, Internal> {
        match self.elements.get(index) {
            Some(&Element::Region { site }) => Ok(site),
            _ => Err(Internal::BrokenAlternation),
        }
    }

    fn ray_at(&self, index: usize) -> Result<&Bisector<T>, Internal> {
        match self.elements.get(index) {
            Some(Element::Ray(ray)) => Ok(ray),
            _ => Err(Internal::BrokenAlternation),
        }
    }

    fn debug_validate(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        debug_assert!(self.elements.is_empty() || self.elements.len() % 2 == 1);
        for (a, b) in self.elements.iter().tuple_windows() {
            match (a, b) {
                (Element::Region { site }, Element::Ray(ray)) => debug_assert_eq!(ray.left, *site),
                (Element::Ray(ray), Element::Region { site }) => debug_assert_eq!(ray.right, *site),
                _ => panic!("beach line alternation broken: {:?}", self.elements),
            }
        }
    }
}
