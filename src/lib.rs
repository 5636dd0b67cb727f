//! Fortune's sweep-line construction of planar Voronoi diagrams.
//!
//! The Voronoi diagram of a finite set of distinct sites partitions the
//! plane into cells of points closer to one site than to any other. This
//! crate builds the diagram in a single top-to-bottom plane sweep: a
//! priority queue drives the sweep over *site* events (the sweep line
//! reaches a new site) and *vertex* events (an arc of the beach line is
//! predicted to shrink to nothing, producing a diagram vertex), while the
//! beach line — the ordered cross-section of unresolved parabolic arcs —
//! is mutated in place.
//!
//! # Usage
//!
//! Pass an iterator of [`Coordinate`](geo::Coordinate)s to [`voronoi`].
//! Sites are identified in the output by their position in the input.
//!
//! ```rust
//! use geo::Coordinate;
//! use geo_fortune::voronoi;
//!
//! let sites = vec![
//!     Coordinate { x: 0., y: 0. },
//!     Coordinate { x: 4., y: 0. },
//!     Coordinate { x: 0., y: 4. },
//! ];
//! let diagram = voronoi(sites).unwrap();
//! // Three mutually unbounded cells: one edge per pair of sites, all
//! // meeting at the circumcenter.
//! assert_eq!(diagram.edges().len(), 3);
//! assert!(diagram.edges().iter().all(|e| e.is_unbounded()));
//! ```
//!
//! The output is a flat list of [`Edge`]s — finite segments and unbounded
//! rays — each tagged with the pair of sites it separates, plus the list of
//! diagram vertices. Clipping edges to a viewport, if needed for display,
//! is left to the consumer and never influences the construction.
use std::fmt;

mod beach;
mod bisector;
mod events;
mod sweep;

pub mod diagram;
pub use diagram::{voronoi, Diagram, Edge};
pub use events::SiteId;

#[cfg(test)]
#[path = "../benches/utils/random.rs"]
pub(crate) mod random;

/// The input sites were faulty, or the construction failed internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A site coordinate was NaN or infinite.
    NonFiniteSite {
        /// Position of the offending site in the input sequence.
        site: SiteId,
    },
    /// Two sites coincide exactly; their bisector is undefined. Deduplicate
    /// the input before constructing the diagram.
    CoincidentSites {
        /// The lower of the two input positions.
        first: SiteId,
        /// The higher of the two input positions.
        second: SiteId,
    },
    /// An invariant broke mid-sweep. There is no partial diagram to return.
    Internal(Internal),
}

/// Invariant violations detected during the sweep.
///
/// These indicate an implementation bug (or a degenerate input that slipped
/// past validation), never a recoverable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Internal {
    /// The beach line lost its strict region/ray alternation.
    BrokenAlternation,
    /// No beach-line arc spans the x-coordinate of a site the sweep reached.
    NoArcAbove,
    /// A vertex event fired for a triple of sites that is no longer
    /// adjacent on the beach line.
    LostCollapse,
    /// The two bisectors flanking a collapsing arc failed to meet.
    DivergedAtVertex,
    /// A bisector missed a parabola it is guaranteed to cross.
    MissedParabola,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NonFiniteSite { site } => {
                write!(f, "site #{} has a non-finite coordinate", site)
            }
            Error::CoincidentSites { first, second } => {
                write!(f, "sites #{} and #{} coincide", first, second)
            }
            Error::Internal(inner) => write!(f, "internal sweep failure: {}", inner),
        }
    }
}

impl fmt::Display for Internal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Internal::BrokenAlternation => "beach line alternation broken",
            Internal::NoArcAbove => "no beach-line arc above a site",
            Internal::LostCollapse => "collapsing triple not found on the beach line",
            Internal::DivergedAtVertex => "bisectors diverged at a vertex event",
            Internal::MissedParabola => "bisector missed its parabola",
        };
        f.write_str(reason)
    }
}

impl std::error::Error for Error {}

impl From<Internal> for Error {
    fn from(inner: Internal) -> Self {
        Error::Internal(inner)
    }
}
