//! Pointer drags and key presses turned into region updates.
//!
//! A drag starts at the region's center and ends anywhere on
//! its circle. The slot it targets is whatever the
//! [`SlotSelector`] holds when the drag completes; the
//! selector is updated independently by key presses.

use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    overlay::DragPreview,
    region::{Point, RegionStore, SetOutcome, MIN_RADIUS},
};

/// The externally maintained "current slot".
#[derive(Debug)]
pub struct SlotSelector {
    current: RwLock<String>,
}

impl SlotSelector {
    pub fn new(initial: impl Into<String>) -> Self {
        SlotSelector {
            current: RwLock::new(initial.into()),
        }
    }

    pub fn select(&self, slot: impl Into<String>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = slot.into();
    }

    pub fn current(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCommand {
    Select(String),
    ClearAll,
    Quit,
    Ignore,
}

impl KeyCommand {
    /// Interprets a key press. Any character of `slot_keys`
    /// selects that slot, `c` clears and `q` quits.
    pub fn from_key(key: char, slot_keys: &str) -> Self {
        if slot_keys.contains(key) {
            return KeyCommand::Select(key.to_string());
        }
        match key {
            'c' => KeyCommand::ClearAll,
            'q' => KeyCommand::Quit,
            _ => KeyCommand::Ignore,
        }
    }

    /// Applies selection and clearing. `Quit` is left to the
    /// caller.
    pub fn apply(&self, selector: &SlotSelector, store: &RegionStore) {
        match self {
            KeyCommand::Select(slot) => selector.select(slot.as_str()),
            KeyCommand::ClearAll => store.clear_all(),
            KeyCommand::Quit | KeyCommand::Ignore => (),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Press(Point),
    Move(Point),
    Release(Point),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { start: Point, end: Point },
}

/// Press / move / release state machine of a single pointer.
#[derive(Debug, Clone)]
pub struct DragTracker {
    state: DragState,
}

impl Default for DragTracker {
    fn default() -> Self {
        DragTracker {
            state: DragState::Idle,
        }
    }
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Advances the state machine. Returns the `(start, end)`
    /// points when a drag completes.
    pub fn handle(&mut self, event: PointerEvent) -> Option<(Point, Point)> {
        match (self.state, event) {
            // a press while dragging restarts the drag
            (_, PointerEvent::Press(p)) => {
                self.state = DragState::Dragging { start: p, end: p };
                None
            }
            (DragState::Dragging { start, .. }, PointerEvent::Move(p)) => {
                self.state = DragState::Dragging { start, end: p };
                None
            }
            (DragState::Dragging { start, .. }, PointerEvent::Release(p)) => {
                self.state = DragState::Idle;
                Some((start, p))
            }
            (DragState::Idle, _) => None,
        }
    }

    /// Center and radius of the circle being dragged.
    pub fn preview(&self) -> Option<(Point, u32)> {
        match self.state {
            DragState::Dragging { start, end } => Some((start, drag_radius(start, end))),
            DragState::Idle => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionUpdate {
    pub slot: String,
    pub center: Point,
    pub radius: u32,
}

/// Distance between the drag end points, truncated.
pub fn drag_radius(start: Point, end: Point) -> u32 {
    start.distance(&end) as u32
}

/// Routes completed drags to the region store.
#[derive(Debug, Clone)]
pub struct GestureTranslator {
    store: Arc<RegionStore>,
    selector: Arc<SlotSelector>,
}

impl GestureTranslator {
    pub fn new(store: Arc<RegionStore>, selector: Arc<SlotSelector>) -> Self {
        GestureTranslator { store, selector }
    }

    /// Creates or replaces the region in the current slot,
    /// centered at `start`. Drags shorter than
    /// [`MIN_RADIUS`] are clicks and produce no update.
    pub fn on_drag_complete(&self, start: Point, end: Point) -> Option<RegionUpdate> {
        let radius = drag_radius(start, end);
        if radius < MIN_RADIUS {
            return None;
        }

        let update = RegionUpdate {
            slot: self.selector.current(),
            center: start,
            radius,
        };
        match self.store.set_region(&update.slot, update.center, update.radius) {
            SetOutcome::Applied => Some(update),
            SetOutcome::Rejected => None,
        }
    }

    /// What the overlay shows for an in-progress drag.
    pub fn preview(&self, tracker: &DragTracker) -> Option<DragPreview> {
        let (center, radius) = tracker.preview()?;
        Some(DragPreview {
            center,
            radius,
            slot: self.selector.current(),
        })
    }

    pub fn handle(&self, tracker: &mut DragTracker, event: PointerEvent) -> Option<RegionUpdate> {
        let (start, end) = tracker.handle(event)?;
        self.on_drag_complete(start, end)
    }
}
