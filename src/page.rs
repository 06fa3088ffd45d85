use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use image::RgbaImage;
use parking_lot::RwLock;

use crate::ocr::TextRegion;

static NEXT_PAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable page identity, assigned at creation, immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId(u64);

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline state of one page. A page transitions through these exactly once
/// per run; re-processing starts the cycle over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    Pending,
    Processing,
    Completed,
    Failed(String),
}

/// One unit of work through the pipeline.
///
/// The original image is immutable for the page's lifetime. Every mutable
/// field sits behind its own lock: the page's pipeline task is the single
/// writer, and each update is atomic and independently observable (reads
/// never tear, but a regions read and a state read are not transactional).
pub struct Page {
    id: PageId,
    original: Arc<RgbaImage>,
    state: RwLock<PageState>,
    regions: RwLock<Vec<TextRegion>>,
    processed: RwLock<Option<Arc<RgbaImage>>>,
    cancelled: AtomicBool,
}

impl Page {
    pub fn new(image: RgbaImage) -> Arc<Self> {
        Arc::new(Self {
            id: PageId(NEXT_PAGE_ID.fetch_add(1, Ordering::Relaxed)),
            original: Arc::new(image),
            state: RwLock::new(PageState::Pending),
            regions: RwLock::new(Vec::new()),
            processed: RwLock::new(None),
            cancelled: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn original(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.original)
    }

    pub fn state(&self) -> PageState {
        self.state.read().clone()
    }

    pub fn regions(&self) -> Vec<TextRegion> {
        self.regions.read().clone()
    }

    pub fn processed(&self) -> Option<Arc<RgbaImage>> {
        self.processed.read().clone()
    }

    /// The processed image when available, otherwise the original.
    pub fn preview_image(&self) -> Arc<RgbaImage> {
        self.processed
            .read()
            .clone()
            .unwrap_or_else(|| self.original())
    }

    /// Requests cooperative cancellation; an in-flight run stops at its next
    /// stage boundary and commits nothing further.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub(crate) fn set_state(&self, state: PageState) {
        *self.state.write() = state;
    }

    pub(crate) fn set_regions(&self, regions: Vec<TextRegion>) {
        *self.regions.write() = regions;
    }

    pub(crate) fn set_processed(&self, image: Option<Arc<RgbaImage>>) {
        *self.processed.write() = image;
    }
}
