use geo::{Coordinate, GeoFloat};
use log::{debug, trace};
use num_traits::{Float, One};
use smallvec::SmallVec;

use crate::beach::BeachLine;
use crate::bisector::{tolerance, Bisector};
use crate::diagram::{Diagram, EdgeSink, HalfEnd};
use crate::events::{Event, EventQueue, SiteId};
use crate::{Error, Internal};

/// One diagram construction.
///
/// Owns the site store, the event queue, the beach line and the output sink
/// for its whole duration; nothing else mutates them mid-sweep.
pub(crate) struct Sweep<T: GeoFloat> {
    sites: Vec<Coordinate<T>>,
    events: EventQueue<T>,
    beach: BeachLine<T>,
    sink: EdgeSink<T>,
    /// Current sweep position; decreases monotonically.
    directrix: T,
}

impl<T: GeoFloat> Sweep<T> {
    /// Sites must be validated (finite, pairwise distinct) and non-empty.
    pub fn new(sites: Vec<Coordinate<T>>) -> Self {
        let mut events = EventQueue::with_capacity(sites.len());
        for (site, &at) in sites.iter().enumerate() {
            events.push_site(site, at);
        }
        Sweep {
            directrix: T::infinity(),
            sites,
            events,
            beach: BeachLine::new(),
            sink: EdgeSink::new(),
        }
    }

    /// Run the sweep to completion and return the finished diagram.
    pub fn run(mut self) -> Result<Diagram<T>, Error> {
        self.open();
        while let Some(event) = self.events.pop() {
            debug_assert!(event.priority() <= self.directrix + self.slack());
            // Vertex priorities are derived quantities; tiny overshoots are
            // clamped so the sweep position never moves back up.
            self.directrix = self.directrix.min(event.priority());
            match event {
                Event::Site { site, .. } => self.handle_site(site)?,
                Event::Vertex {
                    left, mid, right, ..
                } => self.handle_vertex(left, mid, right)?,
            }
        }

        // Whatever is still growing on the beach line escapes to infinity.
        for ray in self.beach.rays() {
            let direction = ray.direction(&self.sites);
            self.sink.resolve(ray.edge, HalfEnd::Toward(direction));
        }
        let Sweep { sites, sink, .. } = self;
        let (edges, vertices) = sink.finish();
        Ok(Diagram::new(sites, edges, vertices))
    }

    /// Pop every site sharing the maximal y and insert them into the beach
    /// line as one batch.
    fn open(&mut self) {
        let first = match self.events.pop() {
            Some(event) => event,
            None => return,
        };
        self.directrix = first.priority();

        let mut batch: SmallVec<[SiteId; 4]> = SmallVec::new();
        match first {
            Event::Site { site, .. } => batch.push(site),
            Event::Vertex { .. } => unreachable!("only site events exist before the sweep opens"),
        }
        while let Some(&Event::Site { site, at }) = self.events.peek() {
            if at.y != self.directrix {
                break;
            }
            batch.push(site);
            let _ = self.events.pop();
        }

        debug!(
            "opening batch of {} site(s) at y = {:?}",
            batch.len(),
            self.directrix
        );
        self.beach.init_batch(&mut batch, &self.sites, &mut self.sink);
    }

    fn handle_site(&mut self, site: SiteId) -> Result<(), Error> {
        debug!("site event: #{} at {:?}", site, self.sites[site]);
        let index =
            self.beach
                .locate_arc_above(self.sites[site].x, self.directrix, &self.sites)?;
        let arc = self.beach.region_at(index)?;
        let (prev, next) = self.beach.neighbors(index);

        let (left, right) =
            self.beach
                .split_arc(index, site, self.directrix, &self.sites, &mut self.sink)?;
        trace!("split arc of #{} under #{}", arc, site);

        if let (Some(p), Some(n)) = (&prev, &next) {
            // The arc their triple converged on no longer exists.
            self.events.cancel_vertex(p.left, arc, n.right);
        }
        if let Some(p) = prev {
            self.try_vertex_event(&p, &left);
        }
        if let Some(n) = next {
            self.try_vertex_event(&right, &n);
        }
        Ok(())
    }

    fn handle_vertex(&mut self, left: SiteId, mid: SiteId, right: SiteId) -> Result<(), Error> {
        debug!("vertex event: ({}, {}, {})", left, mid, right);
        let index = self
            .beach
            .find_collapse(left, mid, right)
            .ok_or(Internal::LostCollapse)?;
        let (outer_left, outer_right) = self.beach.outer_neighbors(index);

        let merged = self.beach.collapse_arc(index, &self.sites, &mut self.sink)?;
        trace!("merged ray ({}, {}) at {:?}", merged.left, merged.right, merged.base);

        if let Some(outer) = outer_left {
            self.events.cancel_vertex(outer.left, left, mid);
            self.try_vertex_event(&outer, &merged);
        }
        if let Some(outer) = outer_right {
            self.events.cancel_vertex(mid, right, outer.right);
            self.try_vertex_event(&merged, &outer);
        }
        Ok(())
    }

    /// Queue a vertex event for two bisectors that have just become
    /// adjacent, if they converge ahead of the sweep.
    ///
    /// The event fires where the arc between them shrinks to nothing: the
    /// sweep position at which the middle site's parabola passes through
    /// the crossing, i.e. the crossing's y minus its distance to the site.
    fn try_vertex_event(&mut self, a: &Bisector<T>, b: &Bisector<T>) {
        debug_assert_eq!(a.right, b.left);
        let crossing = match a.intersection(b, &self.sites) {
            Some(point) => point,
            None => return,
        };
        let mid = self.sites[a.right];
        let priority = crossing.y - (crossing.x - mid.x).hypot(crossing.y - mid.y);
        if priority > self.directrix + self.slack() {
            return;
        }
        trace!(
            "queueing vertex event ({}, {}, {}) at {:?}",
            a.left,
            a.right,
            b.right,
            priority
        );
        self.events
            .push_vertex(priority.min(self.directrix), a.left, a.right, b.right);
    }

    /// Arithmetic-noise allowance for comparisons against the current sweep
    /// position.
    fn slack(&self) -> T {
        tolerance::<T>() * (T::one() + self.directrix.abs())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use approx::assert_relative_eq;
    use geo::prelude::ConvexHull;
    use geo::{MultiPoint, Point, Rect};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::diagram::{voronoi, Diagram, Edge};
    use crate::random::uniform_sites;

    use super::*;

    fn init_log() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn distance(a: Coordinate<f64>, b: Coordinate<f64>) -> f64 {
        (a.x - b.x).hypot(a.y - b.y)
    }

    /// Any point of an edge is equidistant from the edge's two sites, and
    /// no third site is closer.
    fn assert_on_edge(point: Coordinate<f64>, left: SiteId, right: SiteId, sites: &[Coordinate<f64>]) {
        let dl = distance(point, sites[left]);
        let dr = distance(point, sites[right]);
        assert_relative_eq!(dl, dr, max_relative = 1e-6, epsilon = 1e-6);
        for &site in sites {
            assert!(distance(point, site) >= dl.min(dr) - 1e-6 * (1. + dl));
        }
    }

    fn assert_is_voronoi(diagram: &Diagram<f64>, sites: &[Coordinate<f64>]) {
        for edge in diagram.edges() {
            let (left, right) = edge.sites();
            match *edge {
                Edge::Segment { a, b, .. } => {
                    assert_on_edge(a, left, right, sites);
                    assert_on_edge(b, left, right, sites);
                    let mid = (a + b) / 2.;
                    assert_on_edge(mid, left, right, sites);
                }
                Edge::Ray {
                    origin, direction, ..
                } => {
                    for &t in &[0., 0.5, 2.] {
                        assert_on_edge(origin + direction * t, left, right, sites);
                    }
                }
            }
        }
    }

    #[test]
    fn random_diagrams_hold_the_voronoi_property() {
        init_log();
        let bounds = Rect::new([0., 0.], [100., 100.]);
        for seed in 0..4 {
            let mut rng = StdRng::seed_from_u64(seed);
            for &count in &[3usize, 7, 25] {
                let sites = uniform_sites(&mut rng, bounds, count);
                let diagram = voronoi(sites.iter().copied()).unwrap();

                // Every site bounds at least one edge.
                let mut bounded = vec![false; count];
                for edge in diagram.edges() {
                    let (left, right) = edge.sites();
                    bounded[left] = true;
                    bounded[right] = true;
                }
                assert!(bounded.iter().all(|&b| b), "seed {} n {}", seed, count);

                assert_is_voronoi(&diagram, &sites);
            }
        }
    }

    #[test]
    fn unbounded_regions_are_exactly_the_hull_vertices() {
        let bounds = Rect::new([0., 0.], [100., 100.]);
        for seed in 0..4 {
            let mut rng = StdRng::seed_from_u64(100 + seed);
            for &count in &[3usize, 8, 30] {
                let sites = uniform_sites(&mut rng, bounds, count);
                let diagram = voronoi(sites.iter().copied()).unwrap();

                let unbounded: BTreeSet<SiteId> = diagram
                    .edges()
                    .iter()
                    .filter(|edge| edge.is_unbounded())
                    .flat_map(|edge| {
                        let (left, right) = edge.sites();
                        vec![left, right]
                    })
                    .collect();

                let hull = MultiPoint::from(
                    sites.iter().map(|&c| Point(c)).collect::<Vec<_>>(),
                )
                .convex_hull();
                // The exterior ring repeats its first coordinate.
                let hull_vertices = hull.exterior().0.len() - 1;
                assert_eq!(unbounded.len(), hull_vertices, "seed {} n {}", seed, count);
            }
        }
    }

    #[test]
    fn reruns_dispatch_identically() {
        let bounds = Rect::new([0., 0.], [10., 10.]);
        let mut rng = StdRng::seed_from_u64(7);
        let sites = uniform_sites(&mut rng, bounds, 20);
        let first = voronoi(sites.iter().copied()).unwrap();
        let second = voronoi(sites.iter().copied()).unwrap();
        assert_eq!(first.edges(), second.edges());
        assert_eq!(first.vertices(), second.vertices());
    }

    #[test]
    fn collinear_sites_yield_parallel_bisectors() {
        init_log();
        // All on one line: n - 1 parallel full bisector lines, no vertices.
        let sites: Vec<Coordinate<f64>> = (0..5)
            .map(|i| Coordinate {
                x: i as f64,
                y: i as f64 * 2.,
            })
            .collect();
        let diagram = voronoi(sites.iter().copied()).unwrap();
        assert!(diagram.vertices().is_empty());
        assert_eq!(diagram.edges().len(), 8);
        assert!(diagram.edges().iter().all(|e| e.is_unbounded()));
        assert_is_voronoi(&diagram, &sites);
    }

    #[test]
    fn a_row_of_sites_yields_vertical_strips() {
        let sites: Vec<Coordinate<f64>> = (0..4)
            .map(|i| Coordinate {
                x: i as f64 * 3.,
                y: 1.,
            })
            .collect();
        let diagram = voronoi(sites.iter().copied()).unwrap();
        assert!(diagram.vertices().is_empty());
        // Three vertical bisectors, each reported as two complementary rays.
        assert_eq!(diagram.edges().len(), 6);
        for edge in diagram.edges() {
            match *edge {
                Edge::Ray { direction, .. } => assert_eq!(direction.x, 0.),
                Edge::Segment { .. } => panic!("collinear sites have no finite edge"),
            }
        }
        assert_is_voronoi(&diagram, &sites);
    }

    #[test]
    fn interior_site_is_fenced_by_finite_edges() {
        init_log();
        // A centered square plus its center: the center's region is a
        // bounded square fenced by four finite edges.
        let sites = vec![
            Coordinate { x: -2., y: -2. },
            Coordinate { x: 2., y: -2. },
            Coordinate { x: -2., y: 2. },
            Coordinate { x: 2., y: 2. },
            Coordinate { x: 0., y: 0. },
        ];
        let diagram = voronoi(sites.iter().copied()).unwrap();

        let center_edges: Vec<_> = diagram.edges_of(4).collect();
        assert_eq!(center_edges.len(), 4);
        assert!(center_edges.iter().all(|e| !e.is_unbounded()));
        assert!(diagram
            .edges()
            .iter()
            .filter(|e| e.is_unbounded())
            .all(|e| {
                let (l, r) = e.sites();
                l != 4 && r != 4
            }));
        assert_is_voronoi(&diagram, &sites);
    }
}
