//! The viewer: one loader, scheduler, tracker, controller and exporter bound
//! to whichever document is currently open.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use tracing::{debug, error, info};

use crate::cancel::LoadGenerations;
use crate::config::ViewerConfig;
use crate::controller::ViewportController;
use crate::document::DocumentLoader;
use crate::error::DocumentLoadError;
use crate::export::Exporter;
use crate::fetch::Fetcher;
use crate::platform::Platform;
use crate::scheduler::{PageRenderScheduler, RenderReport};
use crate::source::DocumentSource;
use crate::surface::PageSurface;
use crate::viewport::{PresentationTransform, ViewportAction, ViewportState};
use crate::visibility::{IntersectionSource, VisibilityTracker};

/// Where the viewer is in its load/render pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Rendering { rendered: usize, total: usize },
    /// All pages were attempted. Failed pages stay blank.
    Ready { failed_pages: Vec<usize> },
    /// The document could not be opened; nothing is rendered.
    Corrupted { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    Rendered(RenderReport),
    /// A later `open` or `close` took over before this one finished.
    Superseded,
}

type ErrorCallback = Rc<dyn Fn(&DocumentLoadError)>;
type PageChangeCallback = Rc<dyn Fn(usize, usize)>;

struct Slot<D> {
    document: Option<Rc<D>>,
    surfaces: Vec<PageSurface>,
    source: Option<DocumentSource>,
    load_state: LoadState,
}

impl<D> Default for Slot<D> {
    fn default() -> Self {
        Self {
            document: None,
            surfaces: Vec::new(),
            source: None,
            load_state: LoadState::Idle,
        }
    }
}

pub struct Viewer<L: DocumentLoader, O, P, F> {
    config: ViewerConfig,
    loader: L,
    scheduler: PageRenderScheduler,
    pub(crate) exporter: Exporter<F>,
    pub(crate) controller: ViewportController<P>,
    pub(crate) platform: Rc<P>,
    tracker: RefCell<VisibilityTracker<O>>,
    generations: LoadGenerations,
    slot: RefCell<Slot<L::Document>>,
    on_error: Option<ErrorCallback>,
    on_page_change: Option<PageChangeCallback>,
}

impl<L, O, P, F> Viewer<L, O, P, F>
where
    L: DocumentLoader,
    O: IntersectionSource,
    P: Platform,
    F: Fetcher,
{
    pub fn new(config: ViewerConfig, loader: L, intersections: O, platform: Rc<P>, fetcher: F) -> Self {
        let controller = ViewportController::new(&config, platform.clone());
        let mut exporter = Exporter::new(fetcher);
        if let Some(name) = &config.file_name {
            exporter = exporter.with_fallback_name(name.clone());
        }
        Self {
            scheduler: PageRenderScheduler::new(config.base_scale),
            tracker: RefCell::new(VisibilityTracker::new(intersections, config.visibility_threshold)),
            generations: LoadGenerations::new(),
            slot: RefCell::new(Slot::default()),
            on_error: None,
            on_page_change: None,
            config,
            loader,
            exporter,
            controller,
            platform,
        }
    }

    /// Called with the cause whenever a document fails to open.
    pub fn on_error(mut self, callback: impl Fn(&DocumentLoadError) + 'static) -> Self {
        self.on_error = Some(Rc::new(callback));
        self
    }

    /// Called with `(current_page, page_count)` whenever the current page
    /// changes.
    pub fn on_page_change(mut self, callback: impl Fn(usize, usize) + 'static) -> Self {
        self.on_page_change = Some(Rc::new(callback));
        self
    }

    /// Replace the displayed document with `source`.
    ///
    /// Any open or render still running for a previous source is cancelled
    /// and its results are discarded. Zoom, rotation, theme and fullscreen
    /// carry over; the current page starts again at 1.
    pub async fn open(&self, source: impl Into<DocumentSource>) -> Result<OpenOutcome, DocumentLoadError> {
        let source = source.into();
        let mut ticket = self.generations.advance();
        info!(source = %source.label(), generation = ticket.generation(), "opening document");

        self.unmount();
        {
            let mut slot = self.slot.borrow_mut();
            slot.source = Some(source.clone());
            slot.load_state = LoadState::Loading;
        }

        let opened = self.loader.open(&source).await;
        if !ticket.is_current() {
            debug!(source = %source.label(), "discarding superseded open");
            return Ok(OpenOutcome::Superseded);
        }

        let document = match opened {
            Ok(document) => Rc::new(document),
            Err(e) => {
                error!(source = %source.label(), error = %e, "failed to open document");
                self.slot.borrow_mut().load_state = LoadState::Corrupted { reason: e.to_string() };
                if let Some(callback) = &self.on_error {
                    callback(&e);
                }
                return Err(e);
            }
        };

        let surfaces = self.scheduler.allocate(document.as_ref());
        let total = surfaces.len();
        {
            let mut slot = self.slot.borrow_mut();
            slot.document = Some(document.clone());
            slot.surfaces = surfaces;
            slot.load_state = LoadState::Rendering { rendered: 0, total };
        }
        let before = self.current_page();
        let state = self.controller.dispatch(ViewportAction::DocumentLoaded { page_count: total });
        self.report_page_change(state, before);

        let pages: Vec<usize> = (1..=total).collect();
        self.tracker.borrow_mut().observe(&pages, self.page_sink());

        let report = self
            .scheduler
            .run(document.as_ref(), &mut ticket, |surface| self.install(surface))
            .await;

        if report.cancelled || !ticket.is_current() {
            debug!(source = %source.label(), rendered = report.rendered, "render superseded");
            return Ok(OpenOutcome::Superseded);
        }

        info!(
            source = %source.label(),
            pages = report.total,
            failed = report.failed.len(),
            "document ready"
        );
        self.slot.borrow_mut().load_state = LoadState::Ready {
            failed_pages: report.failed_pages(),
        };
        Ok(OpenOutcome::Rendered(report))
    }

    /// Cancel outstanding work and drop the current document.
    pub fn close(&self) {
        self.generations.cancel();
        self.unmount();
        *self.slot.borrow_mut() = Slot::default();
        debug!("viewer closed");
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn controller(&self) -> &ViewportController<P> {
        &self.controller
    }

    pub fn viewport(&self) -> ViewportState {
        self.controller.state()
    }

    pub fn transform(&self) -> PresentationTransform {
        self.viewport().transform()
    }

    pub fn current_page(&self) -> Option<usize> {
        self.viewport().current_page
    }

    pub fn page_count(&self) -> usize {
        self.slot.borrow().surfaces.len()
    }

    pub fn load_state(&self) -> LoadState {
        self.slot.borrow().load_state.clone()
    }

    pub fn source(&self) -> Option<DocumentSource> {
        self.slot.borrow().source.clone()
    }

    pub fn has_document(&self) -> bool {
        self.slot.borrow().document.is_some()
    }

    /// Surfaces of the current document in page order. Do not hold across an
    /// `.await` on this viewer.
    pub fn surfaces(&self) -> Ref<'_, [PageSurface]> {
        Ref::map(self.slot.borrow(), |slot| slot.surfaces.as_slice())
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.borrow().is_observing()
    }

    fn unmount(&self) {
        self.tracker.borrow_mut().teardown();
        {
            let mut slot = self.slot.borrow_mut();
            slot.document = None;
            slot.surfaces.clear();
        }
        self.controller.dispatch(ViewportAction::DocumentReplaced);
    }

    fn install(&self, surface: PageSurface) {
        let mut slot = self.slot.borrow_mut();
        if let Some(target) = surface
            .index()
            .checked_sub(1)
            .and_then(|i| slot.surfaces.get_mut(i))
        {
            *target = surface;
        }
        if let LoadState::Rendering { rendered, .. } = &mut slot.load_state {
            *rendered += 1;
        }
    }

    fn page_sink(&self) -> Rc<dyn Fn(usize)> {
        let store = self.controller.store();
        let callback = self.on_page_change.clone();
        Rc::new(move |page| {
            let before = store.get().current_page;
            let state = store.dispatch(ViewportAction::PageVisible(page));
            notify_page_change(callback.as_deref(), state, before);
        })
    }

    fn report_page_change(&self, state: ViewportState, before: Option<usize>) {
        notify_page_change(self.on_page_change.as_deref(), state, before);
    }
}

fn notify_page_change(callback: Option<&dyn Fn(usize, usize)>, state: ViewportState, before: Option<usize>) {
    if state.current_page == before {
        return;
    }
    if let (Some(callback), Some(page)) = (callback, state.current_page) {
        callback(page, state.page_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::testing::{FakeDocument, FakeFetcher, FakeLoader, FakePlatform};
    use crate::visibility::ManualIntersections;
    use pretty_assertions::assert_eq;

    type TestViewer = Viewer<FakeLoader, ManualIntersections, FakePlatform, FakeFetcher>;

    fn viewer(loader: FakeLoader) -> (TestViewer, ManualIntersections) {
        let intersections = ManualIntersections::new();
        let viewer = Viewer::new(
            ViewerConfig::default(),
            loader,
            intersections.clone(),
            Rc::new(FakePlatform::default()),
            FakeFetcher::default(),
        );
        (viewer, intersections)
    }

    #[test]
    fn starts_idle_without_pages() {
        let (viewer, intersections) = viewer(FakeLoader::default());
        assert_eq!(viewer.load_state(), LoadState::Idle);
        assert_eq!(viewer.page_count(), 0);
        assert_eq!(viewer.current_page(), None);
        assert_eq!(intersections.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn ready_after_open() {
        let loader = FakeLoader::default().with_document("a.pdf", FakeDocument::with_letter_pages("a", 2));
        let (viewer, intersections) = viewer(loader);

        let outcome = viewer.open("a.pdf").await.unwrap();
        let OpenOutcome::Rendered(report) = outcome else {
            panic!("expected a completed render, got {outcome:?}");
        };
        assert!(report.is_complete());
        assert_eq!(viewer.load_state(), LoadState::Ready { failed_pages: vec![] });
        assert_eq!(viewer.current_page(), Some(1));
        assert_eq!(intersections.active_subscriptions(), 1);
        assert!(viewer.has_document());
    }

    #[tokio::test]
    async fn failed_open_is_corrupted() {
        let loader = FakeLoader::default();
        let (viewer, _) = viewer(loader);

        let err = viewer.open("missing.pdf").await.unwrap_err();
        assert_eq!(err, DocumentLoadError::Fetch(FetchError::Status(404)));
        assert!(matches!(viewer.load_state(), LoadState::Corrupted { .. }));
        assert!(!viewer.has_document());
        assert_eq!(viewer.current_page(), None);
    }

    #[tokio::test]
    async fn close_releases_everything() {
        let loader = FakeLoader::default().with_document("a.pdf", FakeDocument::with_letter_pages("a", 3));
        let (viewer, intersections) = viewer(loader);
        viewer.open("a.pdf").await.unwrap();

        viewer.close();
        assert_eq!(viewer.load_state(), LoadState::Idle);
        assert_eq!(viewer.page_count(), 0);
        assert!(viewer.source().is_none());
        assert!(!viewer.is_tracking());
        assert_eq!(intersections.active_subscriptions(), 0);
        assert_eq!(viewer.viewport().page_count, 0);
    }
}
