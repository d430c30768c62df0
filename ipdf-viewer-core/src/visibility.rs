//! Current-page detection from viewport intersection notifications.
//!
//! The host's layout engine is abstracted as an [`IntersectionSource`]. The
//! tracker subscribes once per surface set, keeps the set of pages currently
//! intersecting the viewport, and reports the lowest one.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::subscription::Subscription;

/// Default share of a page that must be visible before it counts.
pub const DEFAULT_VISIBILITY_THRESHOLD: f32 = 0.1;

/// One observation: how much of `page` currently overlaps the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub page: usize,
    pub intersection_ratio: f32,
}

impl IntersectionEntry {
    pub fn new(page: usize, intersection_ratio: f32) -> Self {
        Self {
            page,
            intersection_ratio,
        }
    }
}

pub type IntersectionSink = Box<dyn FnMut(&[IntersectionEntry])>;

/// Push-based intersection notifications for a set of page surfaces.
pub trait IntersectionSource {
    fn subscribe(&self, targets: &[usize], sink: IntersectionSink) -> Subscription;
}

#[derive(Debug)]
pub struct VisibilityTracker<O> {
    source: O,
    threshold: f32,
    epoch: Rc<Cell<u64>>,
    visible: Rc<RefCell<BTreeSet<usize>>>,
    subscription: Option<Subscription>,
}

impl<O: IntersectionSource> VisibilityTracker<O> {
    pub fn new(source: O, threshold: f32) -> Self {
        Self {
            source,
            threshold,
            epoch: Rc::new(Cell::new(0)),
            visible: Rc::new(RefCell::new(BTreeSet::new())),
            subscription: None,
        }
    }

    /// Start observing `pages`, replacing any previous observation.
    ///
    /// `on_change` receives the new current page whenever the lowest
    /// intersecting page changes.
    pub fn observe(&mut self, pages: &[usize], on_change: Rc<dyn Fn(usize)>) {
        self.teardown();

        let epoch = self.epoch.get();
        let live_epoch = Rc::downgrade(&self.epoch);
        let visible = self.visible.clone();
        let threshold = self.threshold;
        let mut last_reported = None;

        let sink: IntersectionSink = Box::new(move |entries: &[IntersectionEntry]| {
            if !is_live(&live_epoch, epoch) {
                trace!(epoch, "dropping notification for torn-down surfaces");
                return;
            }
            let top = {
                let mut visible = visible.borrow_mut();
                for entry in entries {
                    if entry.intersection_ratio > 0.0 && entry.intersection_ratio >= threshold {
                        visible.insert(entry.page);
                    } else {
                        visible.remove(&entry.page);
                    }
                }
                visible.first().copied()
            };
            if let Some(page) = top {
                if last_reported != Some(page) {
                    last_reported = Some(page);
                    on_change(page);
                }
            }
        });

        debug!(pages = pages.len(), epoch, "observing page surfaces");
        self.subscription = Some(self.source.subscribe(pages, sink));
    }

    /// Drop the current subscription. Notifications already queued for it are
    /// ignored.
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.epoch.set(self.epoch.get() + 1);
        self.visible.borrow_mut().clear();
    }

    pub fn is_observing(&self) -> bool {
        self.subscription.is_some()
    }

    /// Pages currently intersecting the viewport, in document order.
    pub fn visible_pages(&self) -> Vec<usize> {
        self.visible.borrow().iter().copied().collect()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

fn is_live(epoch: &Weak<Cell<u64>>, expected: u64) -> bool {
    epoch.upgrade().is_some_and(|current| current.get() == expected)
}

struct Listener {
    id: u64,
    targets: BTreeSet<usize>,
    sink: Rc<RefCell<IntersectionSink>>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    active: Vec<Listener>,
}

/// An [`IntersectionSource`] driven by hand.
///
/// Headless hosts use it to walk through a document; tests use it as a
/// deterministic stand-in for a layout engine.
#[derive(Clone, Default)]
pub struct ManualIntersections {
    listeners: Rc<RefCell<Listeners>>,
}

impl std::fmt::Debug for ManualIntersections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualIntersections")
            .field("active", &self.active_subscriptions())
            .finish()
    }
}

impl ManualIntersections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.listeners.borrow().active.len()
    }

    /// Deliver `entries` to every subscriber observing those pages.
    pub fn emit(&self, entries: &[IntersectionEntry]) {
        let deliveries: Vec<_> = self
            .listeners
            .borrow()
            .active
            .iter()
            .filter_map(|listener| {
                let relevant: Vec<_> = entries
                    .iter()
                    .filter(|e| listener.targets.contains(&e.page))
                    .copied()
                    .collect();
                (!relevant.is_empty()).then(|| (listener.sink.clone(), relevant))
            })
            .collect();

        for (sink, relevant) in deliveries {
            let mut callback = sink.borrow_mut();
            (*callback)(&relevant);
        }
    }

    /// Report exactly `pages` as fully visible and every other observed page
    /// as out of view, like a scroll that lands on those pages.
    pub fn scroll_to(&self, pages: &[usize]) {
        let observed: BTreeSet<usize> = self
            .listeners
            .borrow()
            .active
            .iter()
            .flat_map(|listener| listener.targets.iter().copied())
            .collect();
        let entries: Vec<_> = observed
            .into_iter()
            .map(|page| {
                let ratio = if pages.contains(&page) { 1.0 } else { 0.0 };
                IntersectionEntry::new(page, ratio)
            })
            .collect();
        self.emit(&entries);
    }
}

impl IntersectionSource for ManualIntersections {
    fn subscribe(&self, targets: &[usize], sink: IntersectionSink) -> Subscription {
        let id = {
            let mut listeners = self.listeners.borrow_mut();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.active.push(Listener {
                id,
                targets: targets.iter().copied().collect(),
                sink: Rc::new(RefCell::new(sink)),
            });
            id
        };

        let listeners = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.borrow_mut().active.retain(|l| l.id != id);
            }
        })
    }
}
