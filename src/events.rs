use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use geo::{Coordinate, GeoFloat};

/// Index of a site in the input sequence.
pub type SiteId = usize;

/// A sweep event.
///
/// The sweep proceeds from the maximal y downward; an event's priority is
/// the sweep position at which it must be processed.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Event<T: GeoFloat> {
    /// The sweep line reaches a new site.
    Site {
        /// Coordinates of the site; the event fires at `at.y`.
        at: Coordinate<T>,
        site: SiteId,
    },
    /// The arc of `mid` between the bisectors `(left, mid)` and
    /// `(mid, right)` shrinks to zero width, producing a diagram vertex.
    Vertex {
        /// Sweep position at which the arc collapses: the y at which the
        /// lowest point of the triple's circumcircle touches the sweep line.
        priority: T,
        left: SiteId,
        mid: SiteId,
        right: SiteId,
    },
}

impl<T: GeoFloat> Event<T> {
    pub fn priority(&self) -> T {
        match *self {
            Event::Site { at, .. } => at.y,
            Event::Vertex { priority, .. } => priority,
        }
    }

    fn triple(&self) -> Option<(SiteId, SiteId, SiteId)> {
        match *self {
            Event::Site { .. } => None,
            Event::Vertex {
                left, mid, right, ..
            } => Some((left, mid, right)),
        }
    }
}

/// Equality check consistent with the `PartialOrd` impl, for heap usage.
impl<T: GeoFloat> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

/// Assert total equality.
impl<T: GeoFloat> Eq for Event<T> {}

/// Ordering for use with a max-heap (`BinaryHeap`): the event that must be
/// processed next compares greatest. Higher priorities pop first; on a tie,
/// site events pop before vertex events, sites pop by ascending x (then
/// id), and vertex events by ascending id triple. This makes the processing
/// order total and stable, so reruns of one input dispatch identically.
impl<T: GeoFloat> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use Event::*;
        let by_priority = self.priority().partial_cmp(&other.priority())?;
        let tie = match (self, other) {
            (Site { .. }, Vertex { .. }) => Ordering::Greater,
            (Vertex { .. }, Site { .. }) => Ordering::Less,
            (Site { at: a, site: i }, Site { at: b, site: j }) => {
                a.x.partial_cmp(&b.x)?.then(i.cmp(j)).reverse()
            }
            (Vertex { .. }, Vertex { .. }) => self.triple().cmp(&other.triple()).reverse(),
        };
        Some(by_priority.then(tie))
    }
}

/// Derive `Ord` from `PartialOrd` and expect to not fail: events are only
/// built from finite coordinates.
impl<T: GeoFloat> Ord for Event<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other)
            .expect("event priorities are finite")
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Pending {
    live: u32,
    cancelled: u32,
}

/// Priority queue over sweep events, with out-of-order cancellation of
/// vertex events.
///
/// Cancellation is lazy: `cancel_vertex` marks one live entry of the triple
/// in an index map, and `pop` discards heap entries whose triple still
/// carries a mark, so a cancelled event is never dispatched. A vertex
/// event's priority is a pure function of its three sites, so all heap
/// instances of a triple are interchangeable and discarding any marked
/// instance is correct even when a triple is cancelled and later re-queued.
#[derive(Debug)]
pub(crate) struct EventQueue<T: GeoFloat> {
    heap: BinaryHeap<Event<T>>,
    pending: HashMap<(SiteId, SiteId, SiteId), Pending>,
}

impl<T: GeoFloat> EventQueue<T> {
    pub fn with_capacity(size: usize) -> Self {
        EventQueue {
            heap: BinaryHeap::with_capacity(size),
            pending: HashMap::new(),
        }
    }

    pub fn push_site(&mut self, site: SiteId, at: Coordinate<T>) {
        self.heap.push(Event::Site { at, site });
    }

    pub fn push_vertex(&mut self, priority: T, left: SiteId, mid: SiteId, right: SiteId) {
        self.pending.entry((left, mid, right)).or_default().live += 1;
        self.heap.push(Event::Vertex {
            priority,
            left,
            mid,
            right,
        });
    }

    /// Cancel a pending vertex event for this exact triple, if any is live.
    /// A no-op otherwise: the triple may already have been dispatched, or
    /// its bisectors may never have converged in the first place.
    pub fn cancel_vertex(&mut self, left: SiteId, mid: SiteId, right: SiteId) {
        if let Some(entry) = self.pending.get_mut(&(left, mid, right)) {
            if entry.live > 0 {
                entry.live -= 1;
                entry.cancelled += 1;
            }
        }
    }

    /// The next event to dispatch, leaving it queued.
    pub fn peek(&mut self) -> Option<&Event<T>> {
        self.discard_cancelled();
        self.heap.peek()
    }

    /// Remove and return the next event to dispatch.
    pub fn pop(&mut self) -> Option<Event<T>> {
        self.discard_cancelled();
        let event = self.heap.pop()?;
        if let Some(key) = event.triple() {
            self.settle(key, |entry| entry.live -= 1);
        }
        Some(event)
    }

    /// Drop cancelled vertex events off the top of the heap.
    fn discard_cancelled(&mut self) {
        loop {
            let key = match self.heap.peek().and_then(Event::triple) {
                Some(key) => key,
                None => return,
            };
            match self.pending.get(&key) {
                Some(entry) if entry.cancelled > 0 => {
                    self.settle(key, |entry| entry.cancelled -= 1);
                    let _ = self.heap.pop();
                }
                _ => return,
            }
        }
    }

    fn settle(&mut self, key: (SiteId, SiteId, SiteId), update: impl FnOnce(&mut Pending)) {
        let entry = self
            .pending
            .get_mut(&key)
            .expect("queued vertex events are always indexed");
        update(entry);
        if entry.live == 0 && entry.cancelled == 0 {
            self.pending.remove(&key);
        }
    }
}
