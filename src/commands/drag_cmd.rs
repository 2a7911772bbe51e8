//! Drag Reorder
//!
//! Receives finished gestures from [`dragdrop::DndState`] and turns a drop
//! into a reorder within the dragged item's segment.

use std::sync::{Arc, Mutex, PoisonError};

use dragdrop::DragHandler;

use crate::domain::ItemId;
use crate::store::AppStore;
use crate::sync::ReconciliationEngine;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging(ItemId),
}

pub struct DragReorderController {
    store: AppStore,
    engine: Arc<ReconciliationEngine>,
    phase: Mutex<DragPhase>,
}

impl DragReorderController {
    pub fn new(store: AppStore, engine: Arc<ReconciliationEngine>) -> Self {
        Self {
            store,
            engine,
            phase: Mutex::new(DragPhase::Idle),
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn finish(&self) -> DragPhase {
        let previous = std::mem::take(&mut *self.phase.lock().unwrap_or_else(PoisonError::into_inner));
        self.store.update_if(|state| state.dragging.take().is_some());
        previous
    }
}

impl DragHandler<ItemId> for DragReorderController {
    fn on_drag_start(&self, id: ItemId) {
        if self.store.items().get(&id).is_none() {
            return;
        }
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = DragPhase::Dragging(id.clone());
        self.store.update(|state| {
            state.editing = None;
            state.dragging = Some(id);
        });
    }

    fn on_drag_end(&self, moved: ItemId, target: ItemId) {
        if self.finish() != DragPhase::Dragging(moved.clone()) {
            return;
        }
        if self.store.snapshot().loading {
            log::debug!("Ignoring drop of {} while items load", moved);
            return;
        }
        if let Some(list) = self
            .store
            .mutate_items(|items| items.reorder_within_segment(&moved, &target))
        {
            log::debug!("Moved item {} to {}", moved, target);
            self.engine.after_change(list);
        }
    }

    fn on_drag_cancel(&self) {
        self.finish();
    }
}
