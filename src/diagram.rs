//! Finalized diagram edges and the public construction entry point.

use geo::{Coordinate, GeoFloat};
use itertools::Itertools;
use num_traits::{Float, One};

use crate::bisector::tolerance;
use crate::events::SiteId;
use crate::sweep::Sweep;
use crate::Error;

/// Handle tying a beach-line bisector to the output edge it will become.
pub(crate) type EdgeId = usize;

/// A finalized edge of the Voronoi diagram, tagged with the two sites whose
/// regions it separates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edge<T: GeoFloat> {
    /// A finite edge between two diagram vertices.
    Segment {
        a: Coordinate<T>,
        b: Coordinate<T>,
        left: SiteId,
        right: SiteId,
    },
    /// An unbounded edge: the points `origin + t * direction` for
    /// `t >= 0`. The direction is not normalized. A bisector that never
    /// meets a vertex on either side is reported as two complementary
    /// rays sharing an origin.
    Ray {
        origin: Coordinate<T>,
        direction: Coordinate<T>,
        left: SiteId,
        right: SiteId,
    },
}

impl<T: GeoFloat> Edge<T> {
    /// The pair of sites the edge separates.
    pub fn sites(&self) -> (SiteId, SiteId) {
        match *self {
            Edge::Segment { left, right, .. } | Edge::Ray { left, right, .. } => (left, right),
        }
    }

    /// Whether the edge extends to infinity.
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Edge::Ray { .. })
    }
}

/// One resolved end of an edge under construction.
#[derive(Debug, Clone, Copy)]
pub(crate) enum HalfEnd<T: GeoFloat> {
    /// The end terminates at a diagram vertex.
    At(Coordinate<T>),
    /// The end escapes to infinity in this direction.
    Toward(Coordinate<T>),
}

#[derive(Debug, Clone, Copy)]
struct PendingEdge<T: GeoFloat> {
    left: SiteId,
    right: SiteId,
    /// A point on the edge's line; the shared origin of the two emitted
    /// rays when neither end terminates.
    anchor: Coordinate<T>,
    first: Option<HalfEnd<T>>,
}

/// Accumulates output edges as the sweep resolves the two ends of each
/// bisector.
///
/// The twin half-edges created by an arc split share a single entry here,
/// so the collinear pieces they trace merge into one output edge instead of
/// a segment-plus-ray chain; bisectors with only one growing end (opening
/// batch, merged rays) have their fixed end resolved at creation.
#[derive(Debug)]
pub(crate) struct EdgeSink<T: GeoFloat> {
    pending: Vec<PendingEdge<T>>,
    edges: Vec<Edge<T>>,
    vertices: Vec<Coordinate<T>>,
    unresolved: usize,
}

impl<T: GeoFloat> EdgeSink<T> {
    pub fn new() -> Self {
        EdgeSink {
            pending: Vec::new(),
            edges: Vec::new(),
            vertices: Vec::new(),
            unresolved: 0,
        }
    }

    /// Open an edge between the regions of `left` and `right`, anchored
    /// anywhere on its line.
    pub fn begin(&mut self, left: SiteId, right: SiteId, anchor: Coordinate<T>) -> EdgeId {
        self.pending.push(PendingEdge {
            left,
            right,
            anchor,
            first: None,
        });
        self.unresolved += 1;
        self.pending.len() - 1
    }

    /// Record a diagram vertex. Cocircular site quadruples collapse two
    /// triples at one point, so coordinates may repeat.
    pub fn vertex(&mut self, at: Coordinate<T>) {
        self.vertices.push(at);
    }

    /// Resolve one end of a pending edge; the second resolution emits it.
    pub fn resolve(&mut self, edge: EdgeId, end: HalfEnd<T>) {
        let entry = &mut self.pending[edge];
        let first = match entry.first.take() {
            None => {
                entry.first = Some(end);
                return;
            }
            Some(first) => first,
        };
        let (left, right, anchor) = (entry.left, entry.right, entry.anchor);
        self.unresolved -= 1;

        match (first, end) {
            (HalfEnd::At(a), HalfEnd::At(b)) => {
                // A bisector that collapses the instant it is born separates
                // two regions touching in a single point (four or more
                // cocircular sites); there is no edge to keep.
                let scale = T::one() + a.x.hypot(a.y);
                if (a.x - b.x).hypot(a.y - b.y) > tolerance::<T>() * scale {
                    self.edges.push(Edge::Segment { a, b, left, right });
                }
            }
            (HalfEnd::At(origin), HalfEnd::Toward(direction))
            | (HalfEnd::Toward(direction), HalfEnd::At(origin)) => {
                self.edges.push(Edge::Ray {
                    origin,
                    direction,
                    left,
                    right,
                });
            }
            (HalfEnd::Toward(d1), HalfEnd::Toward(d2)) => {
                self.edges.push(Edge::Ray {
                    origin: anchor,
                    direction: d1,
                    left,
                    right,
                });
                self.edges.push(Edge::Ray {
                    origin: anchor,
                    direction: d2,
                    left,
                    right,
                });
            }
        }
    }

    pub fn finish(self) -> (Vec<Edge<T>>, Vec<Coordinate<T>>) {
        debug_assert_eq!(self.unresolved, 0, "every bisector resolves both ends");
        (self.edges, self.vertices)
    }
}

/// The Voronoi diagram of a set of sites.
#[derive(Debug, Clone)]
pub struct Diagram<T: GeoFloat> {
    sites: Vec<Coordinate<T>>,
    edges: Vec<Edge<T>>,
    vertices: Vec<Coordinate<T>>,
}

impl<T: GeoFloat> Diagram<T> {
    pub(crate) fn new(
        sites: Vec<Coordinate<T>>,
        edges: Vec<Edge<T>>,
        vertices: Vec<Coordinate<T>>,
    ) -> Self {
        Diagram {
            sites,
            edges,
            vertices,
        }
    }

    /// The input sites, in input order; edge tags index into this slice.
    pub fn sites(&self) -> &[Coordinate<T>] {
        &self.sites
    }

    /// All finalized edges.
    pub fn edges(&self) -> &[Edge<T>] {
        &self.edges
    }

    /// The diagram vertices, one per arc collapse performed by the sweep.
    /// Cocircular site quadruples collapse two triples at one point, so a
    /// coordinate may repeat.
    pub fn vertices(&self) -> &[Coordinate<T>] {
        &self.vertices
    }

    /// The edges bounding the region of `site`.
    pub fn edges_of(&self, site: SiteId) -> impl Iterator<Item = &Edge<T>> + '_ {
        self.edges.iter().filter(move |edge| {
            let (left, right) = edge.sites();
            left == site || right == site
        })
    }
}

/// Compute the Voronoi diagram of a sequence of sites.
///
/// Sites are identified by their position in the input sequence. The input
/// is validated up front: every coordinate must be finite, and no two sites
/// may coincide exactly — reject or deduplicate coincident points before
/// calling. An empty input yields an empty diagram; a single site yields a
/// diagram with no edges.
pub fn voronoi<T, I>(sites: I) -> Result<Diagram<T>, Error>
where
    T: GeoFloat,
    I: IntoIterator<Item = Coordinate<T>>,
{
    let sites: Vec<Coordinate<T>> = sites.into_iter().collect();
    validate(&sites)?;
    if sites.is_empty() {
        return Ok(Diagram::new(sites, Vec::new(), Vec::new()));
    }
    Sweep::new(sites).run()
}

fn validate<T: GeoFloat>(sites: &[Coordinate<T>]) -> Result<(), Error> {
    for (site, c) in sites.iter().enumerate() {
        if !c.x.is_finite() || !c.y.is_finite() {
            return Err(Error::NonFiniteSite { site });
        }
    }
    let mut order: Vec<SiteId> = (0..sites.len()).collect();
    order.sort_unstable_by(|&a, &b| {
        (sites[a].x, sites[a].y)
            .partial_cmp(&(sites[b].x, sites[b].y))
            .expect("finite coordinates are totally ordered")
    });
    for (&a, &b) in order.iter().tuple_windows() {
        if sites[a] == sites[b] {
            return Err(Error::CoincidentSites {
                first: a.min(b),
                second: a.max(b),
            });
        }
    }
    Ok(())
}
