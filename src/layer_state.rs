//! Live state of the composition: which catalog entry each layer shows and
//! where that image currently sits on the canvas.

use crate::catalog::{Catalog, LayerKind};
use crate::geometry::{self, Corner};
use crate::image_cache::ImageCache;
use eframe::egui::{Pos2, Rect, Vec2};
use std::collections::BTreeMap;

/// The positioned, sized instance of a layer's current selection.
#[derive(Debug, Clone)]
pub struct LayerInstance {
    pub source_url: String,
    pub label: String,
    pub placeholder: bool,
    pub pos: Pos2,
    pub size: Vec2,
    /// Natural decoded size; resize aspect lock and double-tap reset target.
    pub original_size: Vec2,
    pub is_dragging: bool,
    pub is_resizing: bool,
    pub active_corner: Option<Corner>,
}

impl LayerInstance {
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.pos, self.size)
    }

    pub fn clear_interaction(&mut self) {
        self.is_dragging = false;
        self.is_resizing = false;
        self.active_corner = None;
    }
}

/// Selection map plus at most one live instance per layer.
pub struct LayerStore {
    selections: BTreeMap<LayerKind, usize>,
    instances: BTreeMap<LayerKind, LayerInstance>,
    canvas: Vec2,
}

impl LayerStore {
    pub fn new(canvas: Vec2) -> Self {
        Self {
            selections: BTreeMap::new(),
            instances: BTreeMap::new(),
            canvas,
        }
    }

    pub fn canvas(&self) -> Vec2 {
        self.canvas
    }

    /// Choose catalog entry `index` for `kind`. The instance itself is
    /// (re)materialized by [`LayerStore::sync`] once the image is cached.
    pub fn select(&mut self, kind: LayerKind, index: usize) {
        self.selections.insert(kind, index);
    }

    /// Remove the selection and instance for `kind`; rendering skips it from
    /// now on.
    pub fn clear(&mut self, kind: LayerKind) {
        self.selections.remove(&kind);
        self.instances.remove(&kind);
    }

    pub fn selection(&self, kind: LayerKind) -> Option<usize> {
        self.selections.get(&kind).copied()
    }

    pub fn get(&self, kind: LayerKind) -> Option<&LayerInstance> {
        self.instances.get(&kind)
    }

    pub fn get_mut(&mut self, kind: LayerKind) -> Option<&mut LayerInstance> {
        self.instances.get_mut(&kind)
    }

    /// Apply a geometry/state transform to one instance.
    pub fn mutate(&mut self, kind: LayerKind, f: impl FnOnce(&mut LayerInstance)) {
        if let Some(instance) = self.get_mut(kind) {
            f(instance);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Present layers in fixed draw order (bottom to top), independent of the
    /// order they were selected in.
    pub fn active_kinds(&self) -> impl Iterator<Item = LayerKind> + '_ {
        LayerKind::DRAW_ORDER
            .into_iter()
            .filter(|kind| self.instances.contains_key(kind))
    }

    /// Present layers top to bottom, for hit testing where the visually top
    /// layer wins ties.
    pub fn topmost_first(&self) -> impl Iterator<Item = LayerKind> + '_ {
        LayerKind::DRAW_ORDER
            .into_iter()
            .rev()
            .filter(|kind| self.instances.contains_key(kind))
    }

    pub fn clear_all_interaction(&mut self) {
        for instance in self.instances.values_mut() {
            instance.clear_interaction();
        }
    }

    /// Reconcile instances with the selection map. Creates instances for
    /// selections whose image has arrived in the cache, replaces instances
    /// whose URL changed (auto-fit placement), drops instances whose
    /// selection points at nothing, and leaves matching instances untouched
    /// so re-selecting the same entry never moves a layer.
    ///
    /// Returns true when anything changed.
    pub fn sync(&mut self, catalog: &Catalog, cache: &ImageCache) -> bool {
        let mut changed = false;

        let stale: Vec<LayerKind> = self
            .instances
            .keys()
            .filter(|kind| !self.selections.contains_key(kind))
            .copied()
            .collect();
        for kind in stale {
            self.instances.remove(&kind);
            changed = true;
        }

        for (&kind, &index) in &self.selections {
            let Some(entry) = catalog.entry(kind, index) else {
                log::warn!("selection out of range for {}: {index}", kind.name());
                continue;
            };
            if let Some(existing) = self.instances.get(&kind) {
                if existing.source_url == entry.url {
                    continue;
                }
            }
            // Not cached yet: leave any previous instance in place until the
            // new image is ready.
            let Some(decoded) = cache.get(&entry.url) else {
                continue;
            };
            let placement = geometry::fit_to_canvas(decoded.size(), self.canvas);
            self.instances.insert(
                kind,
                LayerInstance {
                    source_url: entry.url.clone(),
                    label: decoded.label.clone(),
                    placeholder: decoded.placeholder,
                    pos: placement.pos,
                    size: placement.size,
                    original_size: decoded.size(),
                    is_dragging: false,
                    is_resizing: false,
                    active_corner: None,
                },
            );
            changed = true;
        }
        changed
    }

    /// Double-tap target: back to the natural decoded size, centered.
    pub fn reset_layer(&mut self, kind: LayerKind) {
        let canvas = self.canvas;
        if let Some(instance) = self.instances.get_mut(&kind) {
            let placement = geometry::center_on_canvas(instance.original_size, canvas);
            instance.pos = placement.pos;
            instance.size = placement.size;
            instance.clear_interaction();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_cache::DecodedImage;
    use eframe::egui::{pos2, vec2};
    use image::{Rgba, RgbaImage};

    fn cache_with(entries: &[(&str, u32, u32)]) -> ImageCache {
        let mut cache = ImageCache::new();
        for (url, w, h) in entries {
            cache.insert_for_test(
                url,
                DecodedImage {
                    rgba: RgbaImage::from_pixel(*w, *h, Rgba([0, 0, 0, 255])),
                    placeholder: false,
                    label: url.to_string(),
                },
            );
        }
        cache
    }

    fn two_background_catalog() -> Catalog {
        let json = serde_json::json!({
            "layers": {
                "Background": [
                    {"url": "bg0.png", "label": "bg0"},
                    {"url": "bg1.png", "label": "bg1"},
                ],
                "Pose": [{"url": "pose0.png", "label": "pose0"}],
            }
        });
        Catalog::from_json(&json.to_string()).unwrap()
    }

    #[test]
    fn select_then_sync_creates_a_fit_scaled_centered_instance() {
        let catalog = two_background_catalog();
        let cache = cache_with(&[("bg0.png", 1200, 600)]);
        let mut store = LayerStore::new(vec2(600.0, 600.0));

        store.select(LayerKind::Background, 0);
        assert!(store.sync(&catalog, &cache));

        let instance = store.get(LayerKind::Background).unwrap();
        assert_eq!(instance.source_url, "bg0.png");
        assert_eq!(instance.size, vec2(600.0, 300.0));
        assert_eq!(instance.pos, pos2(0.0, 150.0));
        assert_eq!(instance.original_size, vec2(1200.0, 600.0));
    }

    #[test]
    fn reselecting_the_same_entry_is_idempotent_on_geometry() {
        let catalog = two_background_catalog();
        let cache = cache_with(&[("bg0.png", 300, 300)]);
        let mut store = LayerStore::new(vec2(600.0, 600.0));

        store.select(LayerKind::Background, 0);
        store.sync(&catalog, &cache);
        store.mutate(LayerKind::Background, |inst| {
            inst.pos = pos2(13.0, 37.0);
            inst.size = vec2(120.0, 120.0);
        });

        store.select(LayerKind::Background, 0);
        assert!(!store.sync(&catalog, &cache));
        let instance = store.get(LayerKind::Background).unwrap();
        assert_eq!(instance.pos, pos2(13.0, 37.0));
        assert_eq!(instance.size, vec2(120.0, 120.0));
    }

    #[test]
    fn selecting_a_different_entry_resets_placement() {
        let catalog = two_background_catalog();
        let cache = cache_with(&[("bg0.png", 300, 300), ("bg1.png", 400, 400)]);
        let mut store = LayerStore::new(vec2(600.0, 600.0));

        store.select(LayerKind::Background, 0);
        store.sync(&catalog, &cache);
        store.mutate(LayerKind::Background, |inst| inst.pos = pos2(0.0, 0.0));

        store.select(LayerKind::Background, 1);
        assert!(store.sync(&catalog, &cache));
        let instance = store.get(LayerKind::Background).unwrap();
        assert_eq!(instance.source_url, "bg1.png");
        assert_eq!(instance.pos, pos2(100.0, 100.0));
        assert_eq!(instance.size, vec2(400.0, 400.0));
    }

    #[test]
    fn uncached_selection_waits_without_dropping_the_previous_instance() {
        let catalog = two_background_catalog();
        let cache = cache_with(&[("bg0.png", 300, 300)]);
        let mut store = LayerStore::new(vec2(600.0, 600.0));

        store.select(LayerKind::Background, 0);
        store.sync(&catalog, &cache);
        store.select(LayerKind::Background, 1); // bg1.png not cached yet
        assert!(!store.sync(&catalog, &cache));
        assert_eq!(
            store.get(LayerKind::Background).unwrap().source_url,
            "bg0.png"
        );
    }

    #[test]
    fn clear_removes_the_instance() {
        let catalog = two_background_catalog();
        let cache = cache_with(&[("bg0.png", 300, 300)]);
        let mut store = LayerStore::new(vec2(600.0, 600.0));

        store.select(LayerKind::Background, 0);
        store.sync(&catalog, &cache);
        store.clear(LayerKind::Background);
        assert!(store.get(LayerKind::Background).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn draw_order_ignores_selection_order() {
        let catalog = two_background_catalog();
        let cache = cache_with(&[("bg0.png", 300, 300), ("pose0.png", 100, 100)]);
        let mut store = LayerStore::new(vec2(600.0, 600.0));

        // Select the pose first; it must still draw above the background.
        store.select(LayerKind::Pose, 0);
        store.select(LayerKind::Background, 0);
        store.sync(&catalog, &cache);

        let order: Vec<LayerKind> = store.active_kinds().collect();
        assert_eq!(order, vec![LayerKind::Background, LayerKind::Pose]);
        let topmost: Vec<LayerKind> = store.topmost_first().collect();
        assert_eq!(topmost, vec![LayerKind::Pose, LayerKind::Background]);
    }

    #[test]
    fn reset_layer_restores_natural_size_centered() {
        let catalog = two_background_catalog();
        let cache = cache_with(&[("bg0.png", 400, 200)]);
        let mut store = LayerStore::new(vec2(600.0, 600.0));

        store.select(LayerKind::Background, 0);
        store.sync(&catalog, &cache);
        store.mutate(LayerKind::Background, |inst| {
            inst.pos = pos2(-50.0, 12.0);
            inst.size = vec2(90.0, 45.0);
            inst.is_dragging = true;
        });

        store.reset_layer(LayerKind::Background);
        let instance = store.get(LayerKind::Background).unwrap();
        assert_eq!(instance.size, vec2(400.0, 200.0));
        assert_eq!(instance.pos, pos2(100.0, 200.0));
        assert!(!instance.is_dragging);
    }
}
