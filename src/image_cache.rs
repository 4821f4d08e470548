//! Loads, decodes and memoizes catalog images.
//!
//! Every URL is decoded at most once; a failed fetch or decode yields a
//! generated placeholder tile instead of an error, so a batch preload
//! always settles. Decoded pixels are kept around for export; GPU texture
//! upload happens lazily on first draw.

use crate::catalog::{Catalog, LayerKind};
use crate::constants::PLACEHOLDER_SIZE;
use crate::fetch::ImageFetcher;
use eframe::egui::{self, Vec2};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

/// One decoded (or substituted) image, keyed by URL in the cache.
pub struct DecodedImage {
    pub rgba: RgbaImage,
    /// True when this is a generated stand-in for a failed load.
    pub placeholder: bool,
    pub label: String,
}

impl DecodedImage {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.rgba.width() as f32, self.rgba.height() as f32)
    }
}

/// A single URL to load, with the metadata needed for its fallback tile.
#[derive(Clone)]
pub struct LoadJob {
    pub url: String,
    pub label: String,
    pub kind: LayerKind,
}

pub struct LoadResult {
    pub url: String,
    pub image: DecodedImage,
    pub failed: bool,
}

pub struct ImageCache {
    images: HashMap<String, DecodedImage>,
    textures: HashMap<String, egui::TextureHandle>,
    pending: Option<Receiver<LoadResult>>,
    outstanding: usize,
    total: usize,
    failed: usize,
}

impl ImageCache {
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
            textures: HashMap::new(),
            pending: None,
            outstanding: 0,
            total: 0,
            failed: 0,
        }
    }

    /// Kick off a batched preload of every catalog entry on a worker thread.
    /// Results arrive through [`ImageCache::poll`].
    pub fn preload(&mut self, catalog: &Catalog, fetcher: Arc<dyn ImageFetcher>) {
        let jobs = dedup_jobs(catalog);
        self.total = jobs.len();
        self.outstanding = jobs.len();
        self.failed = 0;

        let (tx, rx) = mpsc::channel();
        self.pending = Some(rx);
        std::thread::spawn(move || {
            for result in load_batch(fetcher.as_ref(), &jobs) {
                if tx.send(result).is_err() {
                    // Receiver dropped — app is shutting down.
                    return;
                }
            }
        });
    }

    /// Drain any finished loads into the cache. Returns true if new images
    /// arrived this call.
    pub fn poll(&mut self) -> bool {
        let Some(rx) = &self.pending else {
            return false;
        };
        let mut arrived = false;
        while let Ok(result) = rx.try_recv() {
            arrived = true;
            self.outstanding = self.outstanding.saturating_sub(1);
            if result.failed {
                self.failed += 1;
            }
            // A URL deselected while still in flight simply lands in the
            // cache unused; never an error.
            self.images.entry(result.url).or_insert(result.image);
        }
        if self.outstanding == 0 {
            self.pending = None;
        }
        arrived
    }

    pub fn is_loading(&self) -> bool {
        self.outstanding > 0
    }

    /// True only when every single catalog entry fell back to a placeholder.
    pub fn all_failed(&self) -> bool {
        !self.is_loading() && self.total > 0 && self.failed == self.total
    }

    pub fn get(&self, url: &str) -> Option<&DecodedImage> {
        self.images.get(url)
    }

    /// The GPU texture for `url`, uploading it on first use.
    pub fn texture(&mut self, ctx: &egui::Context, url: &str) -> Option<egui::TextureHandle> {
        if let Some(texture) = self.textures.get(url) {
            return Some(texture.clone());
        }
        let decoded = self.images.get(url)?;
        let size = [decoded.rgba.width() as usize, decoded.rgba.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, decoded.rgba.as_raw());
        let texture = ctx.load_texture(
            format!("layer-image-{url}"),
            color_image,
            egui::TextureOptions::LINEAR,
        );
        self.textures.insert(url.to_string(), texture.clone());
        Some(texture)
    }

    #[cfg(test)]
    pub fn insert_for_test(&mut self, url: &str, image: DecodedImage) {
        self.images.insert(url.to_string(), image);
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

/// All catalog entries as load jobs, with duplicate URLs collapsed so one
/// batch never fetches the same URL twice.
pub fn dedup_jobs(catalog: &Catalog) -> Vec<LoadJob> {
    let mut seen = HashSet::new();
    catalog
        .iter_all()
        .filter(|(_, entry)| seen.insert(entry.url.clone()))
        .map(|(kind, entry)| LoadJob {
            url: entry.url.clone(),
            label: entry.label.clone(),
            kind,
        })
        .collect()
}

/// Fetch and decode every job in parallel. Infallible by construction: a
/// failed job resolves to a placeholder tile tagged with the layer's theme
/// color and the entry's label.
pub fn load_batch(fetcher: &dyn ImageFetcher, jobs: &[LoadJob]) -> Vec<LoadResult> {
    jobs.par_iter().map(|job| load_one(fetcher, job)).collect()
}

fn load_one(fetcher: &dyn ImageFetcher, job: &LoadJob) -> LoadResult {
    match fetch_and_decode(fetcher, &job.url) {
        Ok(rgba) => LoadResult {
            url: job.url.clone(),
            image: DecodedImage {
                rgba,
                placeholder: false,
                label: job.label.clone(),
            },
            failed: false,
        },
        Err(err) => {
            log::warn!("falling back to placeholder for {}: {err}", job.url);
            LoadResult {
                url: job.url.clone(),
                image: DecodedImage {
                    rgba: placeholder_tile(job.kind),
                    placeholder: true,
                    label: job.label.clone(),
                },
                failed: true,
            }
        }
    }
}

fn fetch_and_decode(fetcher: &dyn ImageFetcher, url: &str) -> Result<RgbaImage, String> {
    let bytes = fetcher.fetch(url)?;
    let image = image::load_from_memory(&bytes)
        .map_err(|err| format!("failed to decode {url}: {err}"))?;
    Ok(image.to_rgba8())
}

fn placeholder_tile(kind: LayerKind) -> RgbaImage {
    let color = kind.theme_color();
    let pixel = Rgba([color.r(), color.g(), color.b(), 255]);
    RgbaImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, pixel)
}
