//! Cage vertex selection.
//!
//! Selection is an editor tag, one flag per cage vertex. Ranges are given as
//! a start index and a count; the end of the range is clamped to the last
//! vertex, and a start past the end or a zero count changes nothing.

use std::ops::RangeInclusive;

/// Per-cage-vertex selection mask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CageSelection {
    selected: Vec<bool>,
}

impl CageSelection {
    /// Empty selection for a cage with `vertex_count` vertices.
    pub fn new(vertex_count: usize) -> Self {
        Self {
            selected: vec![false; vertex_count],
        }
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.iter().filter(|&&s| s).count()
    }

    /// Indices of all selected vertices, ascending.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.selected
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
            .collect()
    }

    /// Mask view, one flag per cage vertex.
    pub fn mask(&self) -> &[bool] {
        &self.selected
    }

    /// Select `count` vertices starting at `start`. Returns whether the range was valid.
    pub fn select_range(&mut self, start: usize, count: usize) -> bool {
        self.apply_range(start, count, |_| true)
    }

    /// Unselect `count` vertices starting at `start`.
    pub fn unselect_range(&mut self, start: usize, count: usize) -> bool {
        self.apply_range(start, count, |_| false)
    }

    /// Flip `count` vertices starting at `start`.
    pub fn toggle_range(&mut self, start: usize, count: usize) -> bool {
        self.apply_range(start, count, |s| !s)
    }

    pub fn select_all(&mut self) -> bool {
        self.select_range(0, self.len())
    }

    pub fn clear(&mut self) {
        self.selected.fill(false);
    }

    /// Resize for a new cage, dropping the previous selection.
    pub fn reset(&mut self, vertex_count: usize) {
        self.selected.clear();
        self.selected.resize(vertex_count, false);
    }

    fn clamped_range(&self, start: usize, count: usize) -> Option<RangeInclusive<usize>> {
        if start >= self.selected.len() || count == 0 {
            return None;
        }
        let end = start
            .saturating_add(count - 1)
            .min(self.selected.len() - 1);
        Some(start..=end)
    }

    fn apply_range(&mut self, start: usize, count: usize, f: impl Fn(bool) -> bool) -> bool {
        let Some(range) = self.clamped_range(start, count) else {
            return false;
        };
        for flag in &mut self.selected[range] {
            *flag = f(*flag);
        }
        true
    }
}
