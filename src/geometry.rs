//! Pure geometry for layer manipulation: hit testing, aspect-locked corner
//! resizing, dragging, and pinch scaling. No state lives here; every
//! function maps inputs to a new placement.

use crate::constants::MIN_LAYER_SIZE;
use eframe::egui::{pos2, vec2, Pos2, Rect, Vec2};

/// The four resize handles of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Hit-test order. First match wins on ties.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Canvas position of this corner of `rect`.
    pub fn of(self, rect: Rect) -> Pos2 {
        match self {
            Corner::TopLeft => rect.min,
            Corner::TopRight => pos2(rect.max.x, rect.min.y),
            Corner::BottomLeft => pos2(rect.min.x, rect.max.y),
            Corner::BottomRight => rect.max,
        }
    }

    /// The diagonally opposite corner, which stays fixed during a resize.
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }
}

/// A resolved position and size in canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub pos: Pos2,
    pub size: Vec2,
}

/// Clamp a corner hit-region size so the four regions of a layer of `size`
/// can never overlap.
pub fn clamp_handle(size: Vec2, handle: f32) -> f32 {
    handle.min(size.x.min(size.y) / 2.0)
}

/// Which corner region of `rect`, if any, contains `point`. Each region is a
/// `handle`-sized square anchored inside the corner; regions are tested in
/// `Corner::ALL` order and the first match wins.
pub fn hit_corner(point: Pos2, rect: Rect, handle: f32) -> Option<Corner> {
    for corner in Corner::ALL {
        let anchor = corner.of(rect);
        let region = match corner {
            Corner::TopLeft => Rect::from_min_size(anchor, vec2(handle, handle)),
            Corner::TopRight => Rect::from_min_size(anchor - vec2(handle, 0.0), vec2(handle, handle)),
            Corner::BottomLeft => {
                Rect::from_min_size(anchor - vec2(0.0, handle), vec2(handle, handle))
            }
            Corner::BottomRight => {
                Rect::from_min_size(anchor - vec2(handle, handle), vec2(handle, handle))
            }
        };
        if contains_inclusive(region, point) {
            return Some(corner);
        }
    }
    None
}

/// Axis-aligned containment with inclusive bounds on all four edges.
pub fn hit_body(point: Pos2, rect: Rect) -> bool {
    contains_inclusive(rect, point)
}

fn contains_inclusive(rect: Rect, point: Pos2) -> bool {
    point.x >= rect.min.x && point.x <= rect.max.x && point.y >= rect.min.y && point.y <= rect.max.y
}

/// New placement after dragging corner `corner` of `rect` by `delta`, keeping
/// the aspect ratio of `original` and holding the opposite corner fixed.
///
/// The dominant pointer axis drives the resize: a mostly-horizontal movement
/// sets the width and derives the height, and vice versa. Both dimensions are
/// floored at `MIN_LAYER_SIZE` without breaking the aspect lock.
pub fn resize_from_corner(rect: Rect, original: Vec2, corner: Corner, delta: Vec2) -> Placement {
    let aspect = aspect_ratio(original);
    let (width, height) = (rect.width(), rect.height());

    // Dragging a left corner leftwards grows the layer; mirror the sign so
    // the same formula serves all four corners.
    let x_sign = match corner {
        Corner::TopLeft | Corner::BottomLeft => -1.0,
        Corner::TopRight | Corner::BottomRight => 1.0,
    };
    let y_sign = match corner {
        Corner::TopLeft | Corner::TopRight => -1.0,
        Corner::BottomLeft | Corner::BottomRight => 1.0,
    };

    let candidate_width = if delta.x.abs() > delta.y.abs() {
        width + x_sign * delta.x
    } else {
        (height + y_sign * delta.y) * aspect
    };

    // A width of MIN*max(aspect,1) guarantees both axes clear the floor.
    let min_width = MIN_LAYER_SIZE * aspect.max(1.0);
    let new_width = if candidate_width.is_finite() {
        candidate_width.max(min_width)
    } else {
        min_width
    };
    let new_height = new_width / aspect;

    // Shift the origin on the grabbed sides so the opposite corner stays put.
    let new_x = match corner {
        Corner::TopLeft | Corner::BottomLeft => rect.min.x + (width - new_width),
        Corner::TopRight | Corner::BottomRight => rect.min.x,
    };
    let new_y = match corner {
        Corner::TopLeft | Corner::TopRight => rect.min.y + (height - new_height),
        Corner::BottomLeft | Corner::BottomRight => rect.min.y,
    };

    Placement {
        pos: pos2(new_x, new_y),
        size: vec2(new_width, new_height),
    }
}

/// New origin for a drag: the pointer position minus the grab offset recorded
/// at drag start.
pub fn drag_to(pointer: Pos2, grab: Vec2) -> Pos2 {
    pointer - grab
}

/// New placement for a pinch gesture. The scale relative to the layer's
/// original decoded size grows with the ratio of the current finger distance
/// to the distance at pinch start; the result is re-centered on the pinch
/// midpoint. Each axis is floored at `MIN_LAYER_SIZE`.
pub fn pinch_scale(
    original: Vec2,
    start_scale: f32,
    start_distance: f32,
    current_distance: f32,
    midpoint: Pos2,
) -> Placement {
    let ratio = if start_distance > f32::EPSILON {
        current_distance / start_distance
    } else {
        1.0
    };
    let scale = start_scale * ratio;
    let size = vec2(
        (original.x * scale).max(MIN_LAYER_SIZE),
        (original.y * scale).max(MIN_LAYER_SIZE),
    );
    Placement {
        pos: midpoint - size / 2.0,
        size,
    }
}

/// Initial placement for a freshly selected image: scaled down (never up) to
/// fit inside the canvas while preserving aspect ratio, then centered.
pub fn fit_to_canvas(image: Vec2, canvas: Vec2) -> Placement {
    let scale = (canvas.x / image.x.max(1.0))
        .min(canvas.y / image.y.max(1.0))
        .min(1.0);
    let size = image * scale;
    Placement {
        pos: pos2((canvas.x - size.x) / 2.0, (canvas.y - size.y) / 2.0),
        size,
    }
}

/// Placement that centers `size` on the canvas without rescaling. This is the
/// double-tap reset target.
pub fn center_on_canvas(size: Vec2, canvas: Vec2) -> Placement {
    Placement {
        pos: pos2((canvas.x - size.x) / 2.0, (canvas.y - size.y) / 2.0),
        size,
    }
}

fn aspect_ratio(original: Vec2) -> f32 {
    if original.y > 0.0 {
        original.x / original.y
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(x, y), vec2(w, h))
    }

    #[test]
    fn corner_hit_regions_are_anchored_at_each_corner() {
        let r = rect(100.0, 100.0, 200.0, 200.0);
        assert_eq!(hit_corner(pos2(105.0, 105.0), r, 40.0), Some(Corner::TopLeft));
        assert_eq!(hit_corner(pos2(295.0, 105.0), r, 40.0), Some(Corner::TopRight));
        assert_eq!(
            hit_corner(pos2(105.0, 295.0), r, 40.0),
            Some(Corner::BottomLeft)
        );
        assert_eq!(
            hit_corner(pos2(295.0, 295.0), r, 40.0),
            Some(Corner::BottomRight)
        );
        assert_eq!(hit_corner(pos2(200.0, 200.0), r, 40.0), None);
    }

    #[test]
    fn corner_ties_resolve_in_fixed_order() {
        // With an oversized handle the regions overlap in the middle; the
        // first corner in declaration order must win.
        let r = rect(0.0, 0.0, 100.0, 100.0);
        assert_eq!(hit_corner(pos2(50.0, 50.0), r, 60.0), Some(Corner::TopLeft));
    }

    #[test]
    fn clamped_handles_cannot_overlap() {
        let clamped = clamp_handle(vec2(60.0, 120.0), 40.0);
        assert_eq!(clamped, 30.0);
        let r = rect(0.0, 0.0, 60.0, 120.0);
        // Dead center of the short axis belongs to no corner once clamped.
        assert_eq!(hit_corner(pos2(30.0, 60.0), r, clamped), None);
    }

    #[test]
    fn body_hit_bounds_are_inclusive() {
        let r = rect(10.0, 10.0, 100.0, 50.0);
        assert!(hit_body(pos2(10.0, 10.0), r));
        assert!(hit_body(pos2(110.0, 60.0), r));
        assert!(!hit_body(pos2(110.1, 60.0), r));
        assert!(!hit_body(pos2(9.9, 10.0), r));
    }

    #[test]
    fn bottom_right_resize_width_dominant() {
        // |dx| > |dy|: width drives, origin stays fixed.
        let original = vec2(400.0, 200.0);
        let p = resize_from_corner(rect(100.0, 100.0, 400.0, 200.0), original, Corner::BottomRight, vec2(40.0, 10.0));
        assert!((p.size.x - 440.0).abs() < EPS);
        assert!((p.size.y - 220.0).abs() < EPS);
        assert_eq!(p.pos, pos2(100.0, 100.0));
    }

    #[test]
    fn height_dominant_resize_derives_width() {
        let original = vec2(200.0, 100.0);
        let p = resize_from_corner(rect(0.0, 0.0, 200.0, 100.0), original, Corner::BottomRight, vec2(10.0, 50.0));
        assert!((p.size.y - 150.0).abs() < EPS);
        assert!((p.size.x - 300.0).abs() < EPS);
    }

    #[test]
    fn resize_preserves_aspect_ratio_from_every_corner() {
        let original = vec2(320.0, 240.0);
        for corner in Corner::ALL {
            let p = resize_from_corner(rect(50.0, 50.0, 160.0, 120.0), original, corner, vec2(-37.0, 12.0));
            let aspect = p.size.x / p.size.y;
            assert!(
                (aspect - 320.0 / 240.0).abs() < EPS,
                "{corner:?} broke aspect: {aspect}"
            );
        }
    }

    #[test]
    fn resize_never_drops_below_minimum_on_either_axis() {
        let original = vec2(400.0, 100.0); // wide image: height is the tight axis
        for corner in Corner::ALL {
            let p = resize_from_corner(
                rect(0.0, 0.0, 400.0, 100.0),
                original,
                corner,
                vec2(-10_000.0, 9_999.0),
            );
            assert!(p.size.x >= MIN_LAYER_SIZE, "{corner:?}: width {}", p.size.x);
            assert!(p.size.y >= MIN_LAYER_SIZE, "{corner:?}: height {}", p.size.y);
        }
    }

    #[test]
    fn opposite_corner_stays_fixed_across_incremental_deltas() {
        let original = vec2(300.0, 300.0);
        for corner in Corner::ALL {
            let mut r = rect(200.0, 150.0, 150.0, 150.0);
            let anchor = corner.opposite().of(r);
            for delta in [vec2(17.0, 4.0), vec2(-9.0, -23.0), vec2(3.0, 31.0)] {
                let p = resize_from_corner(r, original, corner, delta);
                r = Rect::from_min_size(p.pos, p.size);
                let moved = corner.opposite().of(r);
                assert!(
                    (moved - anchor).length() < EPS,
                    "{corner:?}: anchor drifted from {anchor:?} to {moved:?}"
                );
            }
        }
    }

    #[test]
    fn drag_moves_origin_by_exact_delta() {
        let start = pos2(40.0, 60.0);
        let grab = vec2(12.0, 7.0);
        // Grabbing at start+grab and moving the pointer by (10, 10) moves the
        // origin by exactly (10, 10).
        let pointer = start + grab + vec2(10.0, 10.0);
        assert_eq!(drag_to(pointer, grab), pos2(50.0, 70.0));
    }

    #[test]
    fn pinch_scales_relative_to_start_and_recenters_on_midpoint() {
        let p = pinch_scale(vec2(300.0, 200.0), 1.0, 100.0, 150.0, pos2(250.0, 250.0));
        assert!((p.size.x - 450.0).abs() < EPS);
        assert!((p.size.y - 300.0).abs() < EPS);
        let center = p.pos + p.size / 2.0;
        assert!((center - pos2(250.0, 250.0)).length() < EPS);
    }

    #[test]
    fn pinch_floors_each_axis() {
        let p = pinch_scale(vec2(300.0, 200.0), 1.0, 100.0, 1.0, pos2(100.0, 100.0));
        assert!(p.size.x >= MIN_LAYER_SIZE);
        assert!(p.size.y >= MIN_LAYER_SIZE);
    }

    #[test]
    fn fit_scales_large_images_down_and_centers() {
        let p = fit_to_canvas(vec2(1200.0, 600.0), vec2(600.0, 600.0));
        assert!((p.size.x - 600.0).abs() < EPS);
        assert!((p.size.y - 300.0).abs() < EPS);
        assert_eq!(p.pos, pos2(0.0, 150.0));
    }

    #[test]
    fn fit_never_upscales_small_images() {
        let p = fit_to_canvas(vec2(200.0, 100.0), vec2(600.0, 600.0));
        assert_eq!(p.size, vec2(200.0, 100.0));
        assert_eq!(p.pos, pos2(200.0, 250.0));
    }
}
