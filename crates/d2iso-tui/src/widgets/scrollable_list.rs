//! Generic scrollable + filterable list widget.

pub struct ScrollableList<T> {
    pub items: Vec<T>,
    pub filtered_indices: Vec<usize>,
    pub selected: usize,
    pub scroll_offset: usize,
    pub filter: String,
    filter_fn: Box<dyn Fn(&T, &str) -> bool + Send + Sync>,
}

impl<T> ScrollableList<T> {
    pub fn new(filter_fn: impl Fn(&T, &str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            items: Vec::new(),
            filtered_indices: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            filter: String::new(),
            filter_fn: Box::new(filter_fn),
        }
    }

    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.rebuild_filter();
    }

    pub fn set_filter(&mut self, query: &str) {
        self.filter = query.to_string();
        let old_idx = self.filtered_indices.get(self.selected).copied();
        self.rebuild_filter();
        // Try to keep the same item selected after filter change
        if let Some(prev) = old_idx {
            if let Some(pos) = self.filtered_indices.iter().position(|&i| i == prev) {
                self.selected = pos;
            } else {
                self.selected = 0;
            }
        }
        self.scroll_offset = 0;
    }

    pub fn rebuild_filter(&mut self) {
        if self.filter.is_empty() {
            self.filtered_indices = (0..self.items.len()).collect();
        } else {
            self.filtered_indices = self
                .items
                .iter()
                .enumerate()
                .filter(|(_, item)| (self.filter_fn)(item, &self.filter))
                .map(|(i, _)| i)
                .collect();
        }
        if self.selected >= self.filtered_indices.len() {
            self.selected = self.filtered_indices.len().saturating_sub(1);
        }
    }

    pub fn select_up(&mut self, n: usize) {
        if self.filtered_indices.is_empty() {
            return;
        }
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        if self.filtered_indices.is_empty() {
            return;
        }
        self.selected = (self.selected + n).min(self.filtered_indices.len().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.filtered_indices.len().saturating_sub(1);
    }

    pub fn selected_item(&self) -> Option<&T> {
        let idx = self.filtered_indices.get(self.selected)?;
        self.items.get(*idx)
    }

    /// Returns (original_index, &item) pairs visible in `height` rows.
    /// Call ensure_visible first to update scroll_offset.
    pub fn visible_items(&self, height: usize) -> Vec<(usize, &T)> {
        if height == 0 || self.filtered_indices.is_empty() {
            return Vec::new();
        }
        let end = (self.scroll_offset + height).min(self.filtered_indices.len());
        self.filtered_indices[self.scroll_offset..end]
            .iter()
            .map(|&i| (i, &self.items[i]))
            .collect()
    }

    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected.saturating_sub(height - 1);
        }
    }

    pub fn len(&self) -> usize {
        self.filtered_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered_indices.is_empty()
    }

    pub fn total_len(&self) -> usize {
        self.items.len()
    }

    /// Set selection by original item index (not filtered index).
    pub fn set_selected_by_original(&mut self, orig_idx: usize) {
        if let Some(pos) = self.filtered_indices.iter().position(|&i| i == orig_idx) {
            self.selected = pos;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> ScrollableList<String> {
        let mut l = ScrollableList::new(|item: &String, q: &str| {
            item.to_lowercase().contains(&q.to_lowercase())
        });
        l.set_items(vec![
            "album.iso".to_string(),
            "movie.iso".to_string(),
            "series_disc_1.iso".to_string(),
        ]);
        l
    }

    #[test]
    fn filter_narrows_and_selection_follows() {
        let mut l = list();
        l.select_down(1);
        assert_eq!(l.selected_item().map(String::as_str), Some("movie.iso"));
        l.set_filter("movie");
        assert_eq!(l.len(), 1);
        assert_eq!(l.selected_item().map(String::as_str), Some("movie.iso"));
        l.set_filter("");
        assert_eq!(l.len(), 3);
    }

    #[test]
    fn selection_clamped_to_filtered_range() {
        let mut l = list();
        l.select_last();
        l.set_filter("album");
        assert_eq!(l.selected, 0);
        l.select_down(5);
        assert_eq!(l.selected, 0);
    }
}
