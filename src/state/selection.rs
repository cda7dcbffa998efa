/// Source/candidate selection for the product being reviewed
///
/// Plain clicks select a single ghost image, modifier clicks toggle
/// membership. The machine also tracks which generated image is active.

use thiserror::Error;

use super::data::ImageRef;

/// Modifier keys held at click time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierState {
    pub control: bool,
    /// Command on macOS, the Windows/Super key elsewhere
    pub meta: bool,
    pub shift: bool,
}

impl ModifierState {
    /// Any recognised modifier turns a click into a multi-select gesture.
    /// Range selection is not distinguished from toggling.
    pub fn is_multi_select(self) -> bool {
        self.control || self.meta || self.shift
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("candidate index {index} out of range for {len} candidates")]
    CandidateOutOfRange { index: usize, len: usize },
}

/// Selected ghost images plus the active candidate cursor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    product_id: Option<String>,
    sources: Vec<ImageRef>,
    /// Kept in pick order, which is the order sent to the generator
    selected: Vec<ImageRef>,
    candidate_count: usize,
    active_candidate: usize,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the machine at a product's current image lists.
    ///
    /// A different product always re-seeds to `{first source}` and candidate 0.
    /// Reloading the same product (after a generation run) keeps the picks
    /// that are still present in the refreshed list.
    pub fn load_product(&mut self, product_id: &str, sources: &[ImageRef], candidate_count: usize) {
        let same_product = self.product_id.as_deref() == Some(product_id);
        self.product_id = Some(product_id.to_string());
        self.sources = sources.to_vec();
        self.candidate_count = candidate_count;

        if same_product {
            let current = &self.sources;
            self.selected.retain(|image| current.contains(image));
            if self.active_candidate >= candidate_count {
                self.active_candidate = 0;
            }
        } else {
            self.reseed();
        }
    }

    /// Drop all picks in favour of the first source and reset the candidate cursor
    pub fn reseed(&mut self) {
        self.selected = self.sources.first().cloned().into_iter().collect();
        self.active_candidate = 0;
    }

    /// Replace the selection with exactly `image`
    pub fn select_exclusive(&mut self, image: &ImageRef) {
        debug_assert!(self.sources.contains(image), "selected image is not a source of this product");
        self.selected = vec![image.clone()];
    }

    /// Remove `image` if selected, add it otherwise. May leave the selection empty.
    pub fn toggle(&mut self, image: &ImageRef) {
        if let Some(position) = self.selected.iter().position(|s| s == image) {
            self.selected.remove(position);
        } else {
            debug_assert!(self.sources.contains(image), "toggled image is not a source of this product");
            self.selected.push(image.clone());
        }
    }

    /// Apply a thumbnail click
    pub fn pick(&mut self, image: &ImageRef, modifiers: ModifierState) {
        if modifiers.is_multi_select() {
            self.toggle(image);
        } else {
            self.select_exclusive(image);
        }
    }

    pub fn set_active_candidate(&mut self, index: usize) -> Result<(), SelectionError> {
        if index >= self.candidate_count {
            return Err(SelectionError::CandidateOutOfRange {
                index,
                len: self.candidate_count,
            });
        }
        self.active_candidate = index;
        Ok(())
    }

    pub fn selected(&self) -> &[ImageRef] {
        &self.selected
    }

    pub fn is_selected(&self, image: &ImageRef) -> bool {
        self.selected.contains(image)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn active_candidate(&self) -> usize {
        self.active_candidate
    }

    pub fn product_id(&self) -> Option<&str> {
        self.product_id.as_deref()
    }

    /// Position in the source list of the earliest-picked selected image,
    /// used to seed the comparison viewer
    pub fn primary_source_index(&self) -> Option<usize> {
        let first = self.selected.first()?;
        self.sources.iter().position(|s| s == first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(names: &[&str]) -> Vec<ImageRef> {
        names.iter().map(|n| ImageRef::new(*n)).collect()
    }

    const CMD: ModifierState = ModifierState { control: false, meta: true, shift: false };

    #[test]
    fn test_load_seeds_first_source() {
        let sources = refs(&["a", "b", "c"]);
        let mut selection = SelectionState::new();
        selection.load_product("p1", &sources, 2);

        assert_eq!(selection.selected(), &sources[..1]);
        assert_eq!(selection.active_candidate(), 0);
    }

    #[test]
    fn test_load_without_sources_is_empty() {
        let mut selection = SelectionState::new();
        selection.load_product("p1", &[], 0);
        assert!(selection.is_empty());
        assert_eq!(selection.primary_source_index(), None);
    }

    #[test]
    fn test_exclusive_select_yields_singleton() {
        let sources = refs(&["a", "b", "c"]);
        let mut selection = SelectionState::new();
        selection.load_product("p1", &sources, 0);
        selection.toggle(&sources[1]);
        selection.toggle(&sources[2]);
        assert_eq!(selection.selected().len(), 3);

        selection.select_exclusive(&sources[1]);
        assert_eq!(selection.selected(), &sources[1..2]);
    }

    #[test]
    fn test_toggle_is_its_own_inverse() {
        let sources = refs(&["a", "b", "c"]);
        let mut selection = SelectionState::new();
        selection.load_product("p1", &sources, 0);
        selection.toggle(&sources[2]);
        let before = selection.selected().to_vec();

        selection.toggle(&sources[1]);
        selection.toggle(&sources[1]);
        assert_eq!(selection.selected(), &before[..]);

        selection.toggle(&sources[0]);
        selection.toggle(&sources[0]);
        assert_eq!(selection.selected().len(), before.len());
        assert!(before.iter().all(|image| selection.is_selected(image)));
    }

    #[test]
    fn test_toggle_can_reach_empty() {
        let sources = refs(&["a"]);
        let mut selection = SelectionState::new();
        selection.load_product("p1", &sources, 0);
        selection.toggle(&sources[0]);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_click_then_command_click() {
        let sources = refs(&["a", "b", "c"]);
        let (a, b) = (&sources[0], &sources[1]);
        let mut selection = SelectionState::new();
        selection.load_product("p1", &sources, 0);

        selection.pick(a, ModifierState::default());
        selection.pick(b, CMD);
        assert_eq!(selection.selected(), &[a.clone(), b.clone()]);

        selection.pick(a, CMD);
        assert_eq!(selection.selected(), &[b.clone()]);
    }

    #[test]
    fn test_any_modifier_is_multi_select() {
        assert!(!ModifierState::default().is_multi_select());
        assert!(ModifierState { control: true, ..Default::default() }.is_multi_select());
        assert!(ModifierState { meta: true, ..Default::default() }.is_multi_select());
        assert!(ModifierState { shift: true, ..Default::default() }.is_multi_select());
    }

    #[test]
    fn test_switching_product_resets() {
        let sources = refs(&["a", "b", "c"]);
        let mut selection = SelectionState::new();
        selection.load_product("p1", &sources, 4);
        selection.toggle(&sources[1]);
        selection.toggle(&sources[2]);
        selection.set_active_candidate(3).unwrap();

        let other = refs(&["x", "b"]);
        selection.load_product("p2", &other, 1);
        assert_eq!(selection.product_id(), Some("p2"));
        assert_eq!(selection.selected(), &other[..1]);
        assert_eq!(selection.active_candidate(), 0);

        selection.load_product("p3", &[], 0);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_refresh_keeps_surviving_picks_by_value() {
        let sources = refs(&["a", "b", "c"]);
        let mut selection = SelectionState::new();
        selection.load_product("p1", &sources, 1);
        selection.pick(&sources[2], CMD);

        // Same product, list re-ordered and "a" gone
        let refreshed = refs(&["c", "b"]);
        selection.load_product("p1", &refreshed, 2);
        assert_eq!(selection.selected(), &[ImageRef::new("c")]);
        assert_eq!(selection.primary_source_index(), Some(0));
    }

    #[test]
    fn test_candidate_index_bounds() {
        let mut selection = SelectionState::new();
        selection.load_product("p1", &refs(&["a"]), 2);
        assert!(selection.set_active_candidate(1).is_ok());
        assert_eq!(selection.active_candidate(), 1);
        assert_eq!(
            selection.set_active_candidate(2),
            Err(SelectionError::CandidateOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(selection.active_candidate(), 1);
    }
}
