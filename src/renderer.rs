//! On-screen composition: canvas background, layer images in draw order,
//! corner handles, placeholder labels, and the caption overlay.

use crate::constants::{
    CAPTION_FONT_SIZE, CAPTION_MARGIN, CAPTION_OUTLINE, COLOR_ACCENT, COLOR_CANVAS_BG,
    COLOR_CAPTION_FILL, COLOR_CAPTION_STROKE, COLOR_EMPTY_STATE, COLOR_HANDLE_FILL,
    HANDLE_DRAW_SIZE,
};
use crate::geometry::{self, Corner};
use crate::image_cache::ImageCache;
use crate::layer_state::LayerStore;
use eframe::egui::{
    self, epaint::RectShape, pos2, vec2, Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, Vec2,
};

/// Top and bottom caption text, already user-entered casing; rendering
/// uppercases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caption {
    pub top: String,
    pub bottom: String,
}

impl Caption {
    pub fn is_empty(&self) -> bool {
        self.top.trim().is_empty() && self.bottom.trim().is_empty()
    }
}

/// Paint the whole canvas into `canvas_rect`. `painter` must already be
/// clipped to the canvas.
pub fn draw_canvas(
    ctx: &egui::Context,
    painter: &Painter,
    canvas_rect: Rect,
    store: &LayerStore,
    cache: &mut ImageCache,
    caption: &Caption,
) {
    painter.rect_filled(canvas_rect, 0.0, COLOR_CANVAS_BG);

    if store.is_empty() {
        draw_empty_state(painter, canvas_rect);
        return;
    }

    for kind in store.active_kinds() {
        let Some(instance) = store.get(kind) else {
            continue;
        };
        let rect = instance.rect().translate(canvas_rect.min.to_vec2());

        if let Some(texture) = cache.texture(ctx, &instance.source_url) {
            let mut shape = RectShape::filled(rect, 0.0, Color32::WHITE);
            shape.fill_texture_id = texture.id();
            shape.uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
            painter.add(shape);
        } else {
            painter.rect_filled(rect, 0.0, kind.theme_color());
        }

        if instance.placeholder {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                &instance.label,
                FontId::proportional(20.0),
                Color32::WHITE,
            );
        }

        draw_handles(painter, rect, instance.size);
    }

    draw_caption(painter, canvas_rect, caption);
}

fn draw_handles(painter: &Painter, rect: Rect, size: Vec2) {
    let handle = geometry::clamp_handle(size, HANDLE_DRAW_SIZE);
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
        painter.rect_filled(region, 2.0, COLOR_HANDLE_FILL);
        painter.rect_stroke(region, 2.0, Stroke::new(2.0, COLOR_ACCENT));
    }
}

fn draw_empty_state(painter: &Painter, canvas_rect: Rect) {
    let center = canvas_rect.center();
    painter.text(
        center - vec2(0.0, 20.0),
        Align2::CENTER_CENTER,
        "Select images from the panels below",
        FontId::proportional(22.0),
        COLOR_EMPTY_STATE,
    );
    // Downward arrow pointing at the selection panel.
    let tip = center + vec2(0.0, 40.0);
    painter.add(egui::Shape::convex_polygon(
        vec![tip, tip + vec2(-14.0, -20.0), tip + vec2(14.0, -20.0)],
        COLOR_EMPTY_STATE,
        Stroke::NONE,
    ));
}

fn draw_caption(painter: &Painter, canvas_rect: Rect, caption: &Caption) {
    let font = FontId::proportional(CAPTION_FONT_SIZE);
    let top = caption.top.trim().to_uppercase();
    if !top.is_empty() {
        let anchor = pos2(canvas_rect.center().x, canvas_rect.min.y + CAPTION_MARGIN);
        draw_outlined_text(painter, anchor, Align2::CENTER_TOP, &top, &font);
    }
    let bottom = caption.bottom.trim().to_uppercase();
    if !bottom.is_empty() {
        let anchor = pos2(canvas_rect.center().x, canvas_rect.max.y - CAPTION_MARGIN);
        draw_outlined_text(painter, anchor, Align2::CENTER_BOTTOM, &bottom, &font);
    }
}

/// Classic meme lettering: a black pass at eight offsets, then the white fill.
fn draw_outlined_text(painter: &Painter, anchor: Pos2, align: Align2, text: &str, font: &FontId) {
    for dx in [-CAPTION_OUTLINE, 0.0, CAPTION_OUTLINE] {
        for dy in [-CAPTION_OUTLINE, 0.0, CAPTION_OUTLINE] {
            if dx == 0.0 && dy == 0.0 {
                continue;
            }
            painter.text(
                anchor + vec2(dx, dy),
                align,
                text,
                font.clone(),
                COLOR_CAPTION_STROKE,
            );
        }
    }
    painter.text(anchor, align, text, font.clone(), COLOR_CAPTION_FILL);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_emptiness_ignores_whitespace() {
        assert!(Caption::default().is_empty());
        assert!(Caption {
            top: "   ".into(),
            bottom: "\t".into(),
        }
        .is_empty());
        assert!(!Caption {
            top: "gm".into(),
            bottom: String::new(),
        }
        .is_empty());
    }
}
