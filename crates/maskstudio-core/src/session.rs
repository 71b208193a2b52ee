//! Ordered list of working images with an active pointer.

use crate::artifact::WorkingImage;
use crate::error::{StudioError, StudioResult};

/// The images of one editing session.
///
/// `active`, when set, is always a valid index into `images`.
#[derive(Debug, Clone, Default)]
pub struct Session {
    images: Vec<WorkingImage>,
    active: Option<usize>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn images(&self) -> &[WorkingImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WorkingImage> {
        self.images.get(index)
    }

    /// Index of the image with `id`.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.images.iter().position(|image| image.id == id)
    }

    pub fn find(&self, id: &str) -> Option<&WorkingImage> {
        self.images.iter().find(|image| image.id == id)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&WorkingImage> {
        self.active.and_then(|index| self.images.get(index))
    }

    /// Append `images` and make the first of them active.
    ///
    /// Returns the new active index, or `None` if `images` was empty (in
    /// which case nothing changes).
    pub fn add_images(&mut self, images: Vec<WorkingImage>) -> Option<usize> {
        if images.is_empty() {
            return None;
        }
        let first = self.images.len();
        self.images.extend(images);
        self.active = Some(first);
        Some(first)
    }

    /// Append `images` without moving the active pointer.
    pub fn append_images(&mut self, images: Vec<WorkingImage>) {
        self.images.extend(images);
    }

    /// Point at `index`. Returns true if the selection changed.
    pub fn select_active(&mut self, index: usize) -> StudioResult<bool> {
        if index >= self.images.len() {
            return Err(StudioError::OutOfRange {
                index,
                len: self.images.len(),
            });
        }
        let changed = self.active != Some(index);
        self.active = Some(index);
        Ok(changed)
    }

    /// Remove the image with `id`, keeping the active pointer on the same
    /// logical image. Removing the active image clears the pointer.
    pub fn remove_image(&mut self, id: &str) -> Option<WorkingImage> {
        let index = self.position(id)?;
        let removed = self.images.remove(index);

        self.active = match self.active {
            Some(active) if active == index => None,
            Some(active) if index < active => Some(active - 1),
            other => other,
        };
        Some(removed)
    }

    /// Drop every image. Persisted copies are untouched.
    pub fn clear(&mut self) {
        self.images.clear();
        self.active = None;
    }

    /// Index before the active one, if any.
    pub fn prev_index(&self) -> Option<usize> {
        self.active.and_then(|index| index.checked_sub(1))
    }

    /// Index after the active one, if any.
    pub fn next_index(&self) -> Option<usize> {
        self.active
            .map(|index| index + 1)
            .filter(|&index| index < self.images.len())
    }
}
