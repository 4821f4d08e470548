//! Static catalog of selectable images, grouped into named layers.
//!
//! The catalog is loaded once at startup (built-in defaults or a JSON file)
//! and treated as immutable configuration from then on.

use eframe::egui::Color32;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The named layer slots, in draw order. `Ord` follows declaration order, so
/// sorted iteration is always Background first and Charm on top.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LayerKind {
    Background,
    Pose,
    Charm,
}

impl LayerKind {
    /// Every layer, bottom to top.
    pub const DRAW_ORDER: [LayerKind; 3] = [LayerKind::Background, LayerKind::Pose, LayerKind::Charm];

    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Background => "Background",
            LayerKind::Pose => "Pose",
            LayerKind::Charm => "Charm",
        }
    }

    /// Theme color used for placeholder tiles of this layer.
    pub fn theme_color(self) -> Color32 {
        match self {
            LayerKind::Background => Color32::from_rgb(0xfb, 0xd7, 0x43),
            LayerKind::Pose => Color32::from_rgb(0x9f, 0x9f, 0x9f),
            LayerKind::Charm => Color32::from_rgb(0xef, 0x6a, 0x43),
        }
    }
}

/// One selectable image: where to fetch it and how to label it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub url: String,
    pub label: String,
}

impl CatalogEntry {
    fn new(url: &str, label: &str) -> Self {
        Self {
            url: url.to_string(),
            label: label.to_string(),
        }
    }
}

/// Ordered image sets per layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    layers: BTreeMap<LayerKind, Vec<CatalogEntry>>,
}

impl Catalog {
    /// The built-in image set.
    pub fn builtin() -> Self {
        let mut layers = BTreeMap::new();
        layers.insert(
            LayerKind::Background,
            vec![
                CatalogEntry::new("backgrounds/sunset_ocean.png", "Sunset Ocean"),
                CatalogEntry::new("backgrounds/future_earth.jpg", "Future Earth"),
                CatalogEntry::new("backgrounds/tokyo_nights.jpg", "Tokyo Nights"),
                CatalogEntry::new("backgrounds/racing_circuit.jpg", "Racing Circuit"),
                CatalogEntry::new("backgrounds/tropical_beach.jpg", "Tropical Beach"),
                CatalogEntry::new("backgrounds/flower_meadow.jpg", "Flower Meadow"),
                CatalogEntry::new("backgrounds/forest_path.jpg", "Forest Path"),
                CatalogEntry::new("backgrounds/mountain_peak.jpg", "Mountain Peak"),
                CatalogEntry::new("backgrounds/vintage_war.png", "Vintage War"),
                CatalogEntry::new("backgrounds/trench_soldiers.png", "Trench Soldiers"),
            ],
        );
        layers.insert(
            LayerKind::Pose,
            vec![
                CatalogEntry::new("poses/standard.png", "Standard Pose"),
                CatalogEntry::new("poses/action.png", "Action Pose"),
                CatalogEntry::new("poses/sitting.png", "Sitting Pose"),
                CatalogEntry::new("poses/jumping.png", "Jumping Pose"),
                CatalogEntry::new("poses/running.png", "Running Pose"),
            ],
        );
        layers.insert(
            LayerKind::Charm,
            vec![
                CatalogEntry::new("charms/hat.png", "Hat"),
                CatalogEntry::new("charms/glasses.png", "Glasses"),
                CatalogEntry::new("charms/bowtie.png", "Bowtie"),
                CatalogEntry::new("charms/necklace.png", "Necklace"),
                CatalogEntry::new("charms/crown.png", "Crown"),
            ],
        );
        Self { layers }
    }

    /// Parse a catalog from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let catalog: Catalog =
            serde_json::from_str(json).map_err(|err| format!("invalid catalog JSON: {err}"))?;
        if catalog.layers.values().all(|entries| entries.is_empty()) {
            return Err("catalog contains no entries".to_string());
        }
        Ok(catalog)
    }

    pub fn entries(&self, kind: LayerKind) -> &[CatalogEntry] {
        self.layers.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entry(&self, kind: LayerKind, index: usize) -> Option<&CatalogEntry> {
        self.entries(kind).get(index)
    }

    /// Every `(kind, entry)` pair across all layers, in draw order.
    pub fn iter_all(&self) -> impl Iterator<Item = (LayerKind, &CatalogEntry)> {
        self.layers
            .iter()
            .flat_map(|(kind, entries)| entries.iter().map(move |entry| (*kind, entry)))
    }

    pub fn total_entries(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
