//! Ordered Item List
//!
//! Keeps items partitioned into an active segment followed by a completed
//! segment, with dense positions `0..n`. Every operation consumes the list and
//! returns the next snapshot; nothing here does I/O.

use serde::{Deserialize, Serialize};

use super::{Item, ItemId};

/// Which run of the list an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Active,
    Completed,
}

impl Segment {
    pub fn of(item: &Item) -> Self {
        if item.is_completed {
            Segment::Completed
        } else {
            Segment::Active
        }
    }
}

/// View filter applied by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            ItemFilter::All => true,
            ItemFilter::Active => !item.is_completed,
            ItemFilter::Completed => item.is_completed,
        }
    }
}

/// Ordered sequence of items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemList {
    items: Vec<Item>,
}

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap items as-is, without normalizing
    pub fn from_items(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn as_slice(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn segment_of(&self, id: &ItemId) -> Option<Segment> {
        self.get(id).map(Segment::of)
    }

    /// Assign `position = index` in current order
    pub fn reindex(mut self) -> Self {
        for (index, item) in self.items.iter_mut().enumerate() {
            item.position = index;
        }
        self
    }

    /// Stable partition: incomplete items first, then completed, then reindex
    pub fn partition_by_completion(self) -> Self {
        let (active, completed) = Self::split(self.items);
        Self::assemble(active, completed)
    }

    /// Move `moved` to `target`'s slot within their shared segment
    ///
    /// Delete-then-insert, not swap. Returns the list untouched when the ids
    /// are equal, unknown, or sit in different segments: dragging across
    /// segments never changes completion state.
    pub fn reorder_within_segment(self, moved: &ItemId, target: &ItemId) -> Self {
        if moved == target {
            return self;
        }
        let (Some(moved_segment), Some(target_segment)) =
            (self.segment_of(moved), self.segment_of(target))
        else {
            return self;
        };
        if moved_segment != target_segment {
            return self;
        }

        let (mut active, mut completed) = Self::split(self.items);
        let segment = match moved_segment {
            Segment::Active => &mut active,
            Segment::Completed => &mut completed,
        };
        // Both ids were found above, so both indices exist
        if let (Some(from), Some(to)) = (
            segment.iter().position(|item| &item.id == moved),
            segment.iter().position(|item| &item.id == target),
        ) {
            let item = segment.remove(from);
            segment.insert(to, item);
        }
        Self::assemble(active, completed)
    }

    /// Append a new item at the end of its segment
    pub fn with_added(mut self, item: Item) -> Self {
        self.items.push(item);
        self.partition_by_completion()
    }

    /// Flip completion; the item lands at the end of its new segment
    pub fn with_toggled(mut self, id: &ItemId) -> Self {
        let Some(index) = self.items.iter().position(|item| &item.id == id) else {
            return self;
        };
        let mut item = self.items.remove(index);
        item.is_completed = !item.is_completed;
        self.items.push(item);
        self.partition_by_completion()
    }

    /// Replace an item's content; order is unaffected
    pub fn with_edited(mut self, id: &ItemId, content: &str) -> Self {
        if let Some(item) = self.items.iter_mut().find(|item| &item.id == id) {
            item.content = content.to_string();
        }
        self
    }

    pub fn without(mut self, id: &ItemId) -> Self {
        self.items.retain(|item| &item.id != id);
        self.reindex()
    }

    /// Swap a local id for the one the remote store assigned
    pub fn with_replaced_id(mut self, old: &ItemId, new: &ItemId) -> Self {
        if let Some(item) = self.items.iter_mut().find(|item| &item.id == old) {
            item.id = new.clone();
        }
        self
    }

    pub fn filtered(&self, filter: ItemFilter) -> Vec<Item> {
        self.items
            .iter()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_completed).count()
    }

    pub fn completed_count(&self) -> usize {
        self.items.len() - self.active_count()
    }

    /// Partitioned by completion with dense positions from zero
    pub fn is_normalized(&self) -> bool {
        let dense = self
            .items
            .iter()
            .enumerate()
            .all(|(index, item)| item.position == index);
        let partitioned = self
            .items
            .windows(2)
            .all(|pair| !(pair[0].is_completed && !pair[1].is_completed));
        dense && partitioned
    }

    fn split(items: Vec<Item>) -> (Vec<Item>, Vec<Item>) {
        items.into_iter().partition(|item| !item.is_completed)
    }

    fn assemble(mut active: Vec<Item>, completed: Vec<Item>) -> Self {
        active.extend(completed);
        Self { items: active }.reindex()
    }
}

impl FromIterator<Item> for ItemList {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self::from_items(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ItemList {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
