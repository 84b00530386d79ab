//! Selected location and its favorite flag.

use std::sync::Arc;

use crate::{favorites::FavoritesStore, model::Location, notify::Notifier};

#[derive(Debug)]
pub struct SelectionController {
    store: Arc<dyn FavoritesStore>,
    notifier: Arc<dyn Notifier>,
    selected: Option<Location>,
    is_favorite: bool,
}

impl SelectionController {
    pub fn new(store: Arc<dyn FavoritesStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier, selected: None, is_favorite: false }
    }

    pub fn selected(&self) -> Option<&Location> {
        self.selected.as_ref()
    }

    pub fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    /// Replace the selection and re-test membership. Keyless locations are ignored.
    pub fn select(&mut self, location: Location) -> bool {
        if !location.is_valid() {
            tracing::warn!(name = %location.name, "ignoring selection without a location key");
            return false;
        }
        self.is_favorite = self.store.contains(&location.key);
        self.selected = Some(location);
        true
    }

    pub fn clear(&mut self) {
        self.selected = None;
        self.is_favorite = false;
    }

    /// Flip membership of the current selection. Returns the new flag, or
    /// `None` when nothing valid is selected.
    pub fn toggle_favorite(&mut self) -> Option<bool> {
        let location = self.selected.as_ref().filter(|l| l.is_valid())?;

        if self.is_favorite {
            self.store.remove(&location.key);
            self.is_favorite = false;
            self.notifier.show_success(&format!("Removed {} from favorites", location.name));
        } else {
            self.store.add(location);
            self.is_favorite = true;
            self.notifier.show_success(&format!("Added {} to favorites", location.name));
        }
        tracing::info!(key = %location.key, favorite = self.is_favorite, "favorite toggled");
        Some(self.is_favorite)
    }
}
