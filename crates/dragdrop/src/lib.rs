//! DragDrop Utilities
//!
//! Framework-free drag gesture recognition driven by pointer events.
//! Uses a movement threshold to distinguish click from drag, and reports the
//! outcome to a [`DragHandler`].

/// Movement threshold in pixels to start dragging
pub const DRAG_THRESHOLD_PX: i32 = 5;

/// Receiver of completed gestures
pub trait DragHandler<Id> {
    /// Pointer moved past the threshold while pressed on `id`
    fn on_drag_start(&self, id: Id);
    /// Released over `target` while dragging `moved`
    fn on_drag_end(&self, moved: Id, target: Id);
    /// Released over nothing, or aborted
    fn on_drag_cancel(&self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Gesture state for one list
#[derive(Debug, Clone)]
pub struct DndState<Id> {
    /// Pressed but not yet dragging, with start position
    pending: Option<(Id, Point)>,
    dragging: Option<Id>,
    drop_target: Option<Id>,
    /// Set when a drag finishes, so the click that follows the release is ignored
    just_ended: bool,
}

impl<Id> Default for DndState<Id> {
    fn default() -> Self {
        Self {
            pending: None,
            dragging: None,
            drop_target: None,
            just_ended: false,
        }
    }
}

impl<Id: Clone + PartialEq> DndState<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragging(&self) -> Option<&Id> {
        self.dragging.as_ref()
    }

    pub fn drop_target(&self) -> Option<&Id> {
        self.drop_target.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    /// Primary button pressed on an item
    pub fn pointer_down(&mut self, id: Id, at: Point) {
        if self.dragging.is_some() {
            return;
        }
        self.pending = Some((id, at));
        self.just_ended = false;
    }

    /// Start dragging once the pointer moved far enough
    pub fn pointer_move<H: DragHandler<Id>>(&mut self, at: Point, handler: &H) {
        if self.dragging.is_some() {
            return;
        }
        let Some((id, start)) = &self.pending else {
            return;
        };
        let dx = (at.x - start.x).abs();
        let dy = (at.y - start.y).abs();
        if dx > DRAG_THRESHOLD_PX || dy > DRAG_THRESHOLD_PX {
            let id = id.clone();
            self.dragging = Some(id.clone());
            handler.on_drag_start(id);
        }
    }

    /// Pointer entered an item while dragging
    pub fn item_enter(&mut self, id: Id) {
        match &self.dragging {
            // Don't allow dropping on self
            Some(dragging) if *dragging != id => self.drop_target = Some(id),
            _ => {}
        }
    }

    pub fn item_leave(&mut self) {
        if self.dragging.is_some() {
            self.drop_target = None;
        }
    }

    /// Pointer released anywhere
    pub fn pointer_up<H: DragHandler<Id>>(&mut self, handler: &H) {
        self.pending = None;
        let Some(dragged) = self.dragging.take() else {
            // Just a click; it fires naturally on the element
            return;
        };
        self.just_ended = true;
        match self.drop_target.take() {
            Some(target) => handler.on_drag_end(dragged, target),
            None => handler.on_drag_cancel(),
        }
    }

    /// Abort the gesture, e.g. on escape
    pub fn cancel<H: DragHandler<Id>>(&mut self, handler: &H) {
        self.pending = None;
        self.drop_target = None;
        if self.dragging.take().is_some() {
            self.just_ended = true;
            handler.on_drag_cancel();
        }
    }

    /// True once after a drag ended; the caller drops that click
    pub fn should_suppress_click(&mut self) -> bool {
        std::mem::take(&mut self.just_ended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, PartialEq)]
    enum Call {
        Start(u32),
        End(u32, u32),
        Cancel,
    }

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<Call>>,
    }

    impl DragHandler<u32> for Recorder {
        fn on_drag_start(&self, id: u32) {
            self.calls.borrow_mut().push(Call::Start(id));
        }

        fn on_drag_end(&self, moved: u32, target: u32) {
            self.calls.borrow_mut().push(Call::End(moved, target));
        }

        fn on_drag_cancel(&self) {
            self.calls.borrow_mut().push(Call::Cancel);
        }
    }

    #[test]
    fn test_small_movement_is_a_click() {
        let handler = Recorder::default();
        let mut dnd = DndState::new();

        dnd.pointer_down(1, Point::new(10, 10));
        dnd.pointer_move(Point::new(15, 14), &handler);
        dnd.pointer_up(&handler);

        assert!(handler.calls.borrow().is_empty());
        assert!(!dnd.should_suppress_click());
    }

    #[test]
    fn test_drag_and_drop_on_another_item() {
        let handler = Recorder::default();
        let mut dnd = DndState::new();

        dnd.pointer_down(1, Point::new(0, 0));
        dnd.pointer_move(Point::new(0, 6), &handler);
        assert_eq!(dnd.dragging(), Some(&1));

        dnd.item_enter(1);
        assert_eq!(dnd.drop_target(), None);
        dnd.item_enter(3);
        dnd.pointer_up(&handler);

        assert_eq!(*handler.calls.borrow(), vec![Call::Start(1), Call::End(1, 3)]);
        assert!(dnd.should_suppress_click());
        assert!(!dnd.should_suppress_click());
    }

    #[test]
    fn test_release_outside_items_cancels() {
        let handler = Recorder::default();
        let mut dnd = DndState::new();

        dnd.pointer_down(2, Point::new(0, 0));
        dnd.pointer_move(Point::new(-8, 0), &handler);
        dnd.item_enter(4);
        dnd.item_leave();
        dnd.pointer_up(&handler);

        assert_eq!(*handler.calls.borrow(), vec![Call::Start(2), Call::Cancel]);
    }

    #[test]
    fn test_escape_cancels_only_active_drag() {
        let handler = Recorder::default();
        let mut dnd = DndState::new();

        dnd.pointer_down(2, Point::new(0, 0));
        dnd.cancel(&handler);
        assert!(handler.calls.borrow().is_empty());

        dnd.pointer_down(2, Point::new(0, 0));
        dnd.pointer_move(Point::new(20, 20), &handler);
        dnd.cancel(&handler);
        assert_eq!(*handler.calls.borrow(), vec![Call::Start(2), Call::Cancel]);
        assert!(!dnd.is_dragging());
    }
}
