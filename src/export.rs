//! PNG export. The composition is re-rendered on the CPU from decoded
//! pixels rather than read back from the GPU, so export works identically
//! with and without a window.

use crate::catalog::LayerKind;
use crate::constants::{CAPTION_FONT_SIZE, CAPTION_MARGIN, CAPTION_OUTLINE, EXPORT_MAX_DIMENSION};
use crate::image_cache::ImageCache;
use crate::layer_state::{LayerInstance, LayerStore};
use crate::renderer::Caption;
use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use eframe::egui::{pos2, vec2, Pos2, Rect, Vec2};
use image::{imageops, Rgba, RgbaImage};
use std::io::Cursor;

/// The caption typeface: the same bundled proportional font the live canvas
/// uses, so exports match the screen.
pub fn caption_font() -> Result<FontArc, String> {
    let definitions = eframe::egui::FontDefinitions::default();
    let data = definitions
        .font_data
        .get("Ubuntu-Light")
        .ok_or_else(|| "bundled caption font is missing".to_string())?;
    FontArc::try_from_vec(data.font.clone().into_owned())
        .map_err(|err| format!("failed to parse caption font: {err}"))
}

/// Compose the current layers onto a canvas of `canvas` points, one output
/// pixel per point. With `include_background` false the Background layer is
/// skipped and the base stays fully transparent.
pub fn compose(
    canvas: Vec2,
    store: &LayerStore,
    cache: &ImageCache,
    caption: &Caption,
    include_background: bool,
) -> Result<RgbaImage, String> {
    let width = canvas.x.round().max(1.0) as u32;
    let height = canvas.y.round().max(1.0) as u32;
    let base = if include_background {
        Rgba([255, 255, 255, 255])
    } else {
        Rgba([0, 0, 0, 0])
    };
    let mut output = RgbaImage::from_pixel(width, height, base);

    for kind in store.active_kinds() {
        if !include_background && kind == LayerKind::Background {
            continue;
        }
        let Some(instance) = store.get(kind) else {
            continue;
        };
        blit_instance(&mut output, cache, instance, Pos2::ZERO, 1.0)?;
    }

    if !caption.is_empty() {
        let font = caption_font()?;
        draw_caption(&mut output, &font, caption, 1.0);
    }
    Ok(output)
}

/// Compose at high resolution: the tight bounding box of all layers is
/// rescaled so its longest edge is `EXPORT_MAX_DIMENSION` pixels. Layers
/// keep their relative placement; captions scale with the canvas.
pub fn compose_hires(
    store: &LayerStore,
    cache: &ImageCache,
    caption: &Caption,
    include_background: bool,
) -> Result<RgbaImage, String> {
    let bounds = layer_bounds(store, include_background)
        .ok_or_else(|| "nothing to export".to_string())?;
    let longest = bounds.width().max(bounds.height()).max(1.0);
    let scale = EXPORT_MAX_DIMENSION as f32 / longest;

    let width = (bounds.width() * scale).round().max(1.0) as u32;
    let height = (bounds.height() * scale).round().max(1.0) as u32;
    let base = if include_background {
        Rgba([255, 255, 255, 255])
    } else {
        Rgba([0, 0, 0, 0])
    };
    let mut output = RgbaImage::from_pixel(width, height, base);

    for kind in store.active_kinds() {
        if !include_background && kind == LayerKind::Background {
            continue;
        }
        let Some(instance) = store.get(kind) else {
            continue;
        };
        blit_instance(&mut output, cache, instance, bounds.min, scale)?;
    }

    if !caption.is_empty() {
        let font = caption_font()?;
        draw_caption(&mut output, &font, caption, scale);
    }
    Ok(output)
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|err| format!("failed to encode PNG: {err}"))?;
    Ok(bytes)
}

/// Tight bounding box over every exported layer, in canvas points.
fn layer_bounds(store: &LayerStore, include_background: bool) -> Option<Rect> {
    let mut bounds: Option<Rect> = None;
    for kind in store.active_kinds() {
        if !include_background && kind == LayerKind::Background {
            continue;
        }
        let rect = store.get(kind)?.rect();
        bounds = Some(match bounds {
            Some(acc) => acc.union(rect),
            None => rect,
        });
    }
    bounds
}

fn blit_instance(
    output: &mut RgbaImage,
    cache: &ImageCache,
    instance: &LayerInstance,
    origin: Pos2,
    scale: f32,
) -> Result<(), String> {
    let decoded = cache
        .get(&instance.source_url)
        .ok_or_else(|| format!("image not cached: {}", instance.source_url))?;

    let target_w = (instance.size.x * scale).round().max(1.0) as u32;
    let target_h = (instance.size.y * scale).round().max(1.0) as u32;
    let resized = imageops::resize(&decoded.rgba, target_w, target_h, imageops::FilterType::Triangle);

    let x = ((instance.pos.x - origin.x) * scale).round() as i64;
    let y = ((instance.pos.y - origin.y) * scale).round() as i64;
    imageops::overlay(output, &resized, x, y);

    if instance.placeholder {
        // The label is painted live on screen; bake it in for export.
        let center = pos2(
            x as f32 + target_w as f32 / 2.0,
            y as f32 + target_h as f32 / 2.0,
        );
        let font = caption_font()?;
        let px = PxScale::from(20.0 * scale.max(1.0));
        draw_text_centered(output, &font, px, &instance.label, center, Rgba([255, 255, 255, 255]));
    }
    Ok(())
}

fn draw_caption(output: &mut RgbaImage, font: &FontArc, caption: &Caption, scale: f32) {
    let px = PxScale::from(CAPTION_FONT_SIZE * scale);
    let outline = CAPTION_OUTLINE * scale;
    let margin = CAPTION_MARGIN * scale;
    let center_x = output.width() as f32 / 2.0;
    let line_height = font.as_scaled(px).height();

    let top = caption.top.trim().to_uppercase();
    if !top.is_empty() {
        let center = pos2(center_x, margin + line_height / 2.0);
        draw_outlined_centered(output, font, px, &top, center, outline);
    }
    let bottom = caption.bottom.trim().to_uppercase();
    if !bottom.is_empty() {
        let center = pos2(center_x, output.height() as f32 - margin - line_height / 2.0);
        draw_outlined_centered(output, font, px, &bottom, center, outline);
    }
}

fn draw_outlined_centered(
    output: &mut RgbaImage,
    font: &FontArc,
    px: PxScale,
    text: &str,
    center: Pos2,
    outline: f32,
) {
    for dx in [-outline, 0.0, outline] {
        for dy in [-outline, 0.0, outline] {
            if dx == 0.0 && dy == 0.0 {
                continue;
            }
            draw_text_centered(
                output,
                font,
                px,
                text,
                center + vec2(dx, dy),
                Rgba([0, 0, 0, 255]),
            );
        }
    }
    draw_text_centered(output, font, px, text, center, Rgba([255, 255, 255, 255]));
}

/// Rasterize one line of text centered on `center`, alpha-blended over the
/// existing pixels.
fn draw_text_centered(
    output: &mut RgbaImage,
    font: &FontArc,
    px: PxScale,
    text: &str,
    center: Pos2,
    color: Rgba<u8>,
) {
    let scaled = font.as_scaled(px);
    let width = text_width(font, px, text);
    let origin_x = center.x - width / 2.0;
    let baseline = center.y + (scaled.ascent() + scaled.descent()) / 2.0;

    let mut caret = origin_x;
    let mut previous = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(px, ab_glyph::point(caret, baseline));
        caret += scaled.h_advance(id);
        previous = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let x = bounds.min.x as i64 + gx as i64;
            let y = bounds.min.y as i64 + gy as i64;
            if x < 0 || y < 0 || x >= output.width() as i64 || y >= output.height() as i64 {
                return;
            }
            let pixel = output.get_pixel_mut(x as u32, y as u32);
            blend(pixel, color, coverage);
        });
    }
}

fn text_width(font: &FontArc, px: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(px);
    let mut width = 0.0;
    let mut previous = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width
}

fn blend(pixel: &mut Rgba<u8>, color: Rgba<u8>, coverage: f32) {
    let alpha = coverage.clamp(0.0, 1.0);
    for i in 0..3 {
        pixel[i] = (color[i] as f32 * alpha + pixel[i] as f32 * (1.0 - alpha)) as u8;
    }
    pixel[3] = pixel[3].max((255.0 * alpha) as u8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::image_cache::DecodedImage;
    use eframe::egui::vec2;

    fn store_and_cache() -> (LayerStore, ImageCache) {
        let json = serde_json::json!({
            "layers": {
                "Background": [{"url": "bg.png", "label": "bg"}],
                "Pose": [{"url": "pose.png", "label": "pose"}],
            }
        });
        let catalog = Catalog::from_json(&json.to_string()).unwrap();
        let mut cache = ImageCache::new();
        cache.insert_for_test(
            "bg.png",
            DecodedImage {
                rgba: RgbaImage::from_pixel(600, 600, Rgba([10, 20, 30, 255])),
                placeholder: false,
                label: "bg".to_string(),
            },
        );
        cache.insert_for_test(
            "pose.png",
            DecodedImage {
                rgba: RgbaImage::from_pixel(100, 100, Rgba([200, 0, 0, 255])),
                placeholder: false,
                label: "pose".to_string(),
            },
        );
        let mut store = LayerStore::new(vec2(600.0, 600.0));
        store.select(LayerKind::Background, 0);
        store.select(LayerKind::Pose, 0);
        store.sync(&catalog, &cache);
        (store, cache)
    }

    #[test]
    fn compose_matches_canvas_dimensions() {
        let (store, cache) = store_and_cache();
        let image = compose(vec2(600.0, 600.0), &store, &cache, &Caption::default(), true).unwrap();
        assert_eq!(image.dimensions(), (600, 600));
        // The background covers the whole canvas.
        assert_eq!(image.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
        // The pose (100x100, centered) sits on top of it.
        assert_eq!(image.get_pixel(300, 300), &Rgba([200, 0, 0, 255]));
    }

    #[test]
    fn transparent_compose_skips_the_background_layer() {
        let (store, cache) = store_and_cache();
        let image =
            compose(vec2(600.0, 600.0), &store, &cache, &Caption::default(), false).unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(image.get_pixel(300, 300), &Rgba([200, 0, 0, 255]));
    }

    #[test]
    fn captions_change_pixels_near_the_edges() {
        let (store, cache) = store_and_cache();
        let caption = Caption {
            top: "top text".into(),
            bottom: "bottom".into(),
        };
        let plain = compose(vec2(600.0, 600.0), &store, &cache, &Caption::default(), true).unwrap();
        let titled = compose(vec2(600.0, 600.0), &store, &cache, &caption, true).unwrap();
        assert_ne!(plain.as_raw(), titled.as_raw());
    }

    #[test]
    fn hires_export_scales_the_longest_edge_to_the_cap() {
        let (store, cache) = store_and_cache();
        let image = compose_hires(&store, &cache, &Caption::default(), true).unwrap();
        // Bounding box is the 600x600 background.
        assert_eq!(
            image.width().max(image.height()),
            EXPORT_MAX_DIMENSION
        );
        assert_eq!(image.dimensions(), (EXPORT_MAX_DIMENSION, EXPORT_MAX_DIMENSION));
    }

    #[test]
    fn hires_export_with_no_layers_is_an_error() {
        let store = LayerStore::new(vec2(600.0, 600.0));
        let cache = ImageCache::new();
        assert!(compose_hires(&store, &cache, &Caption::default(), true).is_err());
    }

    #[test]
    fn png_encoding_round_trips() {
        let (store, cache) = store_and_cache();
        let image = compose(vec2(600.0, 600.0), &store, &cache, &Caption::default(), true).unwrap();
        let bytes = encode_png(&image).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), image.dimensions());
    }

    #[test]
    fn caption_font_is_available() {
        assert!(caption_font().is_ok());
    }
}
