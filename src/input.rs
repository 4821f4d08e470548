//! Interaction state machine: translates pointer and touch input into
//! geometry calls and layer mutations.
//!
//! The machine is deliberately free of any UI handles — positions arrive in
//! canvas coordinates and timestamps as plain seconds — so every transition
//! is testable without a window.

use crate::catalog::LayerKind;
use crate::constants::{DOUBLE_TAP_WINDOW, HANDLE_HIT_SIZE};
use crate::geometry::{self, Corner};
use crate::layer_state::LayerStore;
use eframe::egui::{Pos2, Vec2};

/// The current gesture. At most one layer is manipulated at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle,
    Dragging {
        kind: LayerKind,
        grab: Vec2,
    },
    Resizing {
        kind: LayerKind,
        corner: Corner,
        /// Delta origin for the next move; re-based after every step.
        last: Pos2,
    },
    Pinching {
        kind: LayerKind,
        start_distance: f32,
        start_scale: f32,
    },
}

/// What the pointer is over, for cursor feedback only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverFeedback {
    None,
    Move,
    ResizeNwSe,
    ResizeNeSw,
}

pub struct InputController {
    gesture: Gesture,
    /// Time and layer of the last body tap, for double-tap detection.
    last_tap: Option<(f64, LayerKind)>,
}

impl InputController {
    pub fn new() -> Self {
        Self {
            gesture: Gesture::Idle,
            last_tap: None,
        }
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    /// Pointer press at `pos` (canvas coordinates) at `time` seconds.
    ///
    /// Corner hits are tested before body hits, both topmost layer first. A
    /// second tap on the same layer body within the double-tap window resets
    /// that layer and swallows the press so no drag starts from it.
    pub fn pointer_down(&mut self, pos: Pos2, time: f64, store: &mut LayerStore) {
        if matches!(self.gesture, Gesture::Pinching { .. }) {
            return;
        }

        if let Some((kind, corner)) = self.corner_hit(pos, store) {
            self.last_tap = None;
            self.gesture = Gesture::Resizing {
                kind,
                corner,
                last: pos,
            };
            store.mutate(kind, |inst| {
                inst.is_resizing = true;
                inst.active_corner = Some(corner);
            });
            return;
        }

        if let Some(kind) = self.body_hit(pos, store) {
            if let Some((tap_time, tap_kind)) = self.last_tap {
                if tap_kind == kind && time - tap_time <= DOUBLE_TAP_WINDOW {
                    log::debug!("double tap resets {}", kind.name());
                    store.reset_layer(kind);
                    self.last_tap = None;
                    self.gesture = Gesture::Idle;
                    return;
                }
            }
            self.last_tap = Some((time, kind));
            let grab = pos - store.get(kind).map(|inst| inst.pos).unwrap_or(pos);
            self.gesture = Gesture::Dragging { kind, grab };
            store.mutate(kind, |inst| inst.is_dragging = true);
            return;
        }

        self.last_tap = None;
    }

    /// Pointer motion; applies the active gesture, if any.
    pub fn pointer_move(&mut self, pos: Pos2, store: &mut LayerStore) {
        match self.gesture {
            Gesture::Dragging { kind, grab } => {
                store.mutate(kind, |inst| inst.pos = geometry::drag_to(pos, grab));
            }
            Gesture::Resizing { kind, corner, last } => {
                let delta = pos - last;
                store.mutate(kind, |inst| {
                    let placement =
                        geometry::resize_from_corner(inst.rect(), inst.original_size, corner, delta);
                    inst.pos = placement.pos;
                    inst.size = placement.size;
                });
                self.gesture = Gesture::Resizing {
                    kind,
                    corner,
                    last: pos,
                };
            }
            Gesture::Pinching { .. } | Gesture::Idle => {}
        }
    }

    /// Unconditional return to `Idle`. Safe to call without a preceding
    /// press; also the handler for touch-cancel and window blur so no layer
    /// is ever stuck mid-gesture.
    pub fn pointer_up(&mut self, store: &mut LayerStore) {
        self.gesture = Gesture::Idle;
        store.clear_all_interaction();
    }

    /// Two touch points landed; enters `Pinching` if their midpoint is over
    /// a layer body (topmost first).
    pub fn pinch_start(&mut self, p0: Pos2, p1: Pos2, store: &mut LayerStore) {
        store.clear_all_interaction();
        let midpoint = midpoint(p0, p1);
        let Some(kind) = self.body_hit(midpoint, store) else {
            self.gesture = Gesture::Idle;
            return;
        };
        let Some(instance) = store.get(kind) else {
            self.gesture = Gesture::Idle;
            return;
        };
        let start_scale = if instance.original_size.x > 0.0 {
            instance.size.x / instance.original_size.x
        } else {
            1.0
        };
        self.last_tap = None;
        self.gesture = Gesture::Pinching {
            kind,
            start_distance: (p1 - p0).length().max(f32::EPSILON),
            start_scale,
        };
    }

    /// Both touch points moved.
    pub fn pinch_move(&mut self, p0: Pos2, p1: Pos2, store: &mut LayerStore) {
        let Gesture::Pinching {
            kind,
            start_distance,
            start_scale,
        } = self.gesture
        else {
            return;
        };
        let mid = midpoint(p0, p1);
        let distance = (p1 - p0).length();
        store.mutate(kind, |inst| {
            let placement =
                geometry::pinch_scale(inst.original_size, start_scale, start_distance, distance, mid);
            inst.pos = placement.pos;
            inst.size = placement.size;
        });
    }

    /// Cursor feedback for an idle pointer; never mutates.
    pub fn hover(&self, pos: Pos2, store: &LayerStore) -> HoverFeedback {
        if let Some((_, corner)) = self.corner_hit(pos, store) {
            return match corner {
                Corner::TopLeft | Corner::BottomRight => HoverFeedback::ResizeNwSe,
                Corner::TopRight | Corner::BottomLeft => HoverFeedback::ResizeNeSw,
            };
        }
        if self.body_hit(pos, store).is_some() {
            return HoverFeedback::Move;
        }
        HoverFeedback::None
    }

    fn corner_hit(&self, pos: Pos2, store: &LayerStore) -> Option<(LayerKind, Corner)> {
        for kind in store.topmost_first() {
            let instance = store.get(kind)?;
            let handle = geometry::clamp_handle(instance.size, HANDLE_HIT_SIZE);
            if let Some(corner) = geometry::hit_corner(pos, instance.rect(), handle) {
                return Some((kind, corner));
            }
        }
        None
    }

    fn body_hit(&self, pos: Pos2, store: &LayerStore) -> Option<LayerKind> {
        store
            .topmost_first()
            .find(|&kind| matches!(store.get(kind), Some(inst) if geometry::hit_body(pos, inst.rect())))
    }
}

impl Default for InputController {
    fn default() -> Self {
        Self::new()
    }
}

fn midpoint(p0: Pos2, p1: Pos2) -> Pos2 {
    Pos2::new((p0.x + p1.x) / 2.0, (p0.y + p1.y) / 2.0)
}
