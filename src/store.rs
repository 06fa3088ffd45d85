use std::sync::Arc;

use image::RgbaImage;
use parking_lot::RwLock;

use crate::page::{Page, PageId};

/// Ordered collection of pages. Insertion order is significant: it drives
/// export file naming and listing order. At most one page is selected for
/// detail view; removing that page clears the selection.
#[derive(Default)]
pub struct PageStore {
    pages: RwLock<Vec<Arc<Page>>>,
    selected: RwLock<Option<PageId>>,
}

impl PageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, image: RgbaImage) -> Arc<Page> {
        let page = Page::new(image);
        self.pages.write().push(Arc::clone(&page));
        page
    }

    /// Removes a page by identity, cancelling any in-flight run. Results of
    /// work already started are discarded, not awaited.
    pub fn remove_page(&self, id: PageId) -> bool {
        let mut pages = self.pages.write();
        let Some(index) = pages.iter().position(|page| page.id() == id) else {
            return false;
        };
        let page = pages.remove(index);
        drop(pages);
        page.cancel();

        let mut selected = self.selected.write();
        if *selected == Some(id) {
            *selected = None;
        }
        true
    }

    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.pages.write());
        for page in &removed {
            page.cancel();
        }
        *self.selected.write() = None;
    }

    /// Selects a page for detail view; ignored if the id is not present.
    pub fn select(&self, id: PageId) -> bool {
        let known = self.pages.read().iter().any(|page| page.id() == id);
        if known {
            *self.selected.write() = Some(id);
        }
        known
    }

    pub fn selected_page(&self) -> Option<Arc<Page>> {
        let id = (*self.selected.read())?;
        self.pages
            .read()
            .iter()
            .find(|page| page.id() == id)
            .cloned()
    }

    /// Snapshot of the pages in insertion order.
    pub fn pages(&self) -> Vec<Arc<Page>> {
        self.pages.read().clone()
    }

    pub fn len(&self) -> usize {
        self.pages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> RgbaImage {
        RgbaImage::new(2, 2)
    }

    #[test]
    fn preserves_insertion_order() {
        let store = PageStore::new();
        let a = store.add_page(blank());
        let b = store.add_page(blank());
        let c = store.add_page(blank());
        let ids: Vec<_> = store.pages().iter().map(|page| page.id()).collect();
        assert_eq!(ids, vec![a.id(), b.id(), c.id()]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn removal_cancels_and_clears_selection() {
        let store = PageStore::new();
        let a = store.add_page(blank());
        let b = store.add_page(blank());
        assert!(store.select(b.id()));
        assert_eq!(store.selected_page().unwrap().id(), b.id());

        assert!(store.remove_page(b.id()));
        assert!(b.is_cancelled());
        assert!(store.selected_page().is_none());
        assert_eq!(store.len(), 1);
        assert!(!a.is_cancelled());

        assert!(!store.remove_page(b.id()));
    }

    #[test]
    fn selecting_an_unknown_page_is_ignored() {
        let store = PageStore::new();
        let a = store.add_page(blank());
        let ghost = {
            let other = PageStore::new();
            other.add_page(blank()).id()
        };
        assert!(!store.select(ghost));
        assert!(store.selected_page().is_none());
        assert!(store.select(a.id()));
    }

    #[test]
    fn clear_empties_and_cancels_everything() {
        let store = PageStore::new();
        let a = store.add_page(blank());
        store.select(a.id());
        store.clear();
        assert!(store.is_empty());
        assert!(a.is_cancelled());
        assert!(store.selected_page().is_none());
    }
}
