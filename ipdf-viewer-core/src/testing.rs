//! In-memory stand-ins for the document backend, the host platform and the
//! network. Enabled for unit tests and, through the `test-utils` feature, for
//! integration tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::{Rgba, RgbaImage};
use tokio::sync::Notify;

use crate::document::{DocumentHandle, DocumentLoader, PageHandle, PageSize};
use crate::error::{DocumentLoadError, FetchError, PageRenderError, PlatformCapabilityError};
use crate::fetch::Fetcher;
use crate::platform::Platform;
use crate::source::DocumentSource;
use crate::subscription::Subscription;
use crate::surface::PageSurface;
use crate::viewport::Theme;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Started { document: String, page: usize },
    Finished { document: String, page: usize },
}

/// Shared record of every render a [`FakeDocument`] performs.
#[derive(Debug, Clone, Default)]
pub struct RenderLog {
    events: Rc<RefCell<Vec<RenderEvent>>>,
    in_flight: Rc<Cell<usize>>,
    max_in_flight: Rc<Cell<usize>>,
}

impl RenderLog {
    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.borrow().clone()
    }

    /// Highest number of renders that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.get()
    }

    fn start(&self, document: &str, page: usize) -> InFlight {
        self.events.borrow_mut().push(RenderEvent::Started {
            document: document.to_string(),
            page,
        });
        self.in_flight.set(self.in_flight.get() + 1);
        self.max_in_flight
            .set(self.max_in_flight.get().max(self.in_flight.get()));
        InFlight {
            counter: self.in_flight.clone(),
        }
    }

    fn finish(&self, document: &str, page: usize) {
        self.events.borrow_mut().push(RenderEvent::Finished {
            document: document.to_string(),
            page,
        });
    }
}

// Decrements the in-flight counter even when a render future is dropped.
struct InFlight {
    counter: Rc<Cell<usize>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counter.set(self.counter.get() - 1);
    }
}

/// Colour a [`FakeDocument`] paints `page` with, so tests can tell which
/// document a surface came from.
pub fn fill_color(document: &str, page: usize) -> Rgba<u8> {
    let tag = document.bytes().fold(0u8, |acc, b| acc.wrapping_mul(31).wrapping_add(b));
    Rgba([tag, page as u8, 0, 255])
}

#[derive(Debug, Clone)]
pub struct FakePage {
    size: PageSize,
    fails: bool,
    yields: usize,
}

impl FakePage {
    pub fn new(size: PageSize) -> Self {
        Self {
            size,
            fails: false,
            yields: 0,
        }
    }

    pub fn letter() -> Self {
        Self::new(PageSize::new(612.0, 792.0))
    }

    pub fn failing(mut self) -> Self {
        self.fails = true;
        self
    }

    /// Suspend `yields` times before finishing, like a slow rasterizer.
    pub fn with_yields(mut self, yields: usize) -> Self {
        self.yields = yields;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeDocument {
    label: String,
    pages: Vec<FakePage>,
    log: RenderLog,
}

impl FakeDocument {
    pub fn new(label: impl Into<String>, pages: Vec<FakePage>) -> Self {
        Self {
            label: label.into(),
            pages,
            log: RenderLog::default(),
        }
    }

    pub fn with_letter_pages(label: impl Into<String>, count: usize) -> Self {
        Self::new(label, vec![FakePage::letter(); count])
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn log(&self) -> &RenderLog {
        &self.log
    }
}

impl DocumentHandle for FakeDocument {
    type Page<'a> = FakePageHandle<'a>;

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<FakePageHandle<'_>, PageRenderError> {
        index
            .checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .map(|page| FakePageHandle {
                document: self,
                index,
                page,
            })
            .ok_or(PageRenderError::MissingPage { page: index })
    }
}

pub struct FakePageHandle<'a> {
    document: &'a FakeDocument,
    index: usize,
    page: &'a FakePage,
}

impl PageHandle for FakePageHandle<'_> {
    fn size(&self) -> PageSize {
        self.page.size
    }

    async fn render(&self, surface: &mut PageSurface, _base_scale: f32) -> Result<(), PageRenderError> {
        let _in_flight = self.document.log.start(&self.document.label, self.index);
        for _ in 0..self.page.yields {
            tokio::task::yield_now().await;
        }
        if self.page.fails {
            self.document.log.finish(&self.document.label, self.index);
            return Err(PageRenderError::Rasterize {
                page: self.index,
                reason: "injected failure".into(),
            });
        }
        let color = fill_color(&self.document.label, self.index);
        surface.put_pixels(RgbaImage::from_pixel(surface.width(), surface.height(), color));
        self.document.log.finish(&self.document.label, self.index);
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Document(FakeDocument),
    Failure(DocumentLoadError),
}

/// [`DocumentLoader`] serving pre-registered documents keyed by source label.
#[derive(Debug, Clone, Default)]
pub struct FakeLoader {
    entries: Rc<RefCell<HashMap<String, Entry>>>,
    gates: Rc<RefCell<HashMap<String, Rc<Notify>>>>,
    opened: Rc<RefCell<Vec<String>>>,
}

impl FakeLoader {
    pub fn with_document(self, key: impl Into<String>, document: FakeDocument) -> Self {
        self.entries
            .borrow_mut()
            .insert(key.into(), Entry::Document(document));
        self
    }

    pub fn with_failure(self, key: impl Into<String>, error: DocumentLoadError) -> Self {
        self.entries
            .borrow_mut()
            .insert(key.into(), Entry::Failure(error));
        self
    }

    /// Hold opens of `key` until the returned gate is notified.
    pub fn gate(&self, key: impl Into<String>) -> Rc<Notify> {
        let gate = Rc::new(Notify::new());
        self.gates.borrow_mut().insert(key.into(), gate.clone());
        gate
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl DocumentLoader for FakeLoader {
    type Document = FakeDocument;

    async fn open(&self, source: &DocumentSource) -> Result<FakeDocument, DocumentLoadError> {
        let key = source.label();
        self.opened.borrow_mut().push(key.clone());

        let gate = self.gates.borrow().get(&key).cloned();
        match gate {
            Some(gate) => gate.notified().await,
            None => tokio::task::yield_now().await,
        }

        let entry = self.entries.borrow().get(&key).cloned();
        match entry {
            Some(Entry::Document(document)) => Ok(document),
            Some(Entry::Failure(error)) => Err(error),
            None => Err(DocumentLoadError::Fetch(FetchError::Status(404))),
        }
    }
}

/// [`Fetcher`] answering from a fixed table and recording every request.
#[derive(Debug, Clone, Default)]
pub struct FakeFetcher {
    responses: Rc<RefCell<HashMap<String, Result<Vec<u8>, FetchError>>>>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl FakeFetcher {
    pub fn with_body(self, url: impl Into<String>, body: Vec<u8>) -> Self {
        self.responses.borrow_mut().insert(url.into(), Ok(body));
        self
    }

    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.responses
            .borrow_mut()
            .insert(url.into(), Err(FetchError::Status(status)));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.borrow_mut().push(url.to_string());
        tokio::task::yield_now().await;
        self.responses
            .borrow()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Transport(format!("no route to {url}"))))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub staged_path: PathBuf,
}

#[derive(Default)]
struct FullscreenListeners {
    next_id: u64,
    active: Vec<(u64, Rc<dyn Fn(bool)>)>,
}

/// [`Platform`] that records every request and lets tests play the user.
#[derive(Default)]
pub struct FakePlatform {
    fullscreen: Cell<bool>,
    deny_fullscreen: Cell<bool>,
    fail_print: Cell<bool>,
    listeners: Rc<RefCell<FullscreenListeners>>,
    themes: RefCell<Vec<Theme>>,
    prints: Cell<usize>,
    saved: RefCell<Vec<SavedFile>>,
}

impl FakePlatform {
    /// Make every fullscreen request fail as if no user gesture was present.
    pub fn deny_fullscreen(&self) {
        self.deny_fullscreen.set(true);
    }

    pub fn fail_print(&self) {
        self.fail_print.set(true);
    }

    /// The user leaves fullscreen outside the viewer, e.g. with Escape.
    pub fn user_exits_fullscreen(&self) {
        self.set_fullscreen(false);
    }

    pub fn fullscreen_listeners(&self) -> usize {
        self.listeners.borrow().active.len()
    }

    pub fn applied_themes(&self) -> Vec<Theme> {
        self.themes.borrow().clone()
    }

    pub fn print_count(&self) -> usize {
        self.prints.get()
    }

    pub fn saved_files(&self) -> Vec<SavedFile> {
        self.saved.borrow().clone()
    }

    fn set_fullscreen(&self, active: bool) {
        if self.fullscreen.replace(active) == active {
            return;
        }
        let listeners: Vec<_> = self
            .listeners
            .borrow()
            .active
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(active);
        }
    }
}

impl Platform for FakePlatform {
    async fn request_fullscreen(&self) -> Result<(), PlatformCapabilityError> {
        tokio::task::yield_now().await;
        if self.deny_fullscreen.get() {
            return Err(PlatformCapabilityError::Denied(
                "fullscreen requires a user gesture".into(),
            ));
        }
        self.set_fullscreen(true);
        Ok(())
    }

    async fn exit_fullscreen(&self) -> Result<(), PlatformCapabilityError> {
        tokio::task::yield_now().await;
        if !self.fullscreen.get() {
            return Err(PlatformCapabilityError::Failed("not in fullscreen".into()));
        }
        self.set_fullscreen(false);
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen.get()
    }

    fn on_fullscreen_change(&self, listener: Rc<dyn Fn(bool)>) -> Subscription {
        let id = {
            let mut listeners = self.listeners.borrow_mut();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.active.push((id, listener));
            id
        };
        let listeners = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.borrow_mut().active.retain(|(other, _)| *other != id);
            }
        })
    }

    fn apply_theme(&self, theme: Theme) {
        self.themes.borrow_mut().push(theme);
    }

    fn print(&self) -> Result<(), PlatformCapabilityError> {
        if self.fail_print.get() {
            return Err(PlatformCapabilityError::Failed("no printer".into()));
        }
        self.prints.set(self.prints.get() + 1);
        Ok(())
    }

    async fn save(&self, staged: &Path, file_name: &str) -> Result<(), PlatformCapabilityError> {
        let bytes = std::fs::read(staged).map_err(|e| PlatformCapabilityError::Failed(e.to_string()))?;
        self.saved.borrow_mut().push(SavedFile {
            file_name: file_name.to_string(),
            bytes,
            staged_path: staged.to_path_buf(),
        });
        Ok(())
    }
}
