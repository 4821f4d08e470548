//! Centralized constants for canvas sizing, interaction thresholds, and colors.

use eframe::egui::Color32;

// =============================================================================
// CANVAS CONSTANTS
// =============================================================================

/// Width of the composition canvas in points.
pub const CANVAS_WIDTH: f32 = 600.0;

/// Height of the composition canvas in points.
pub const CANVAS_HEIGHT: f32 = 600.0;

// =============================================================================
// LAYER INTERACTION CONSTANTS
// =============================================================================

/// Minimum size for a layer's dimension so it remains visible and grabbable.
pub const MIN_LAYER_SIZE: f32 = 50.0;

/// Side length of the drawn corner-handle squares.
pub const HANDLE_DRAW_SIZE: f32 = 15.0;

/// Side length of the corner hit regions. Larger than the drawn handle so
/// corners are easy to grab; clamped per layer so the regions never overlap.
pub const HANDLE_HIT_SIZE: f32 = 40.0;

/// Two taps on the same layer body within this window count as a double tap.
pub const DOUBLE_TAP_WINDOW: f64 = 0.3;

// =============================================================================
// IMAGE LOADING CONSTANTS
// =============================================================================

/// Edge length of the generated placeholder tile used when an image fails
/// to fetch or decode.
pub const PLACEHOLDER_SIZE: u32 = 300;

// =============================================================================
// CAPTION CONSTANTS
// =============================================================================

/// Caption font size on the live canvas.
pub const CAPTION_FONT_SIZE: f32 = 40.0;

/// Vertical distance of the caption text from the canvas edges.
pub const CAPTION_MARGIN: f32 = 16.0;

/// Offset of the caption outline pass from the fill pass.
pub const CAPTION_OUTLINE: f32 = 2.0;

// =============================================================================
// EXPORT CONSTANTS
// =============================================================================

/// Longest edge of the high-resolution export surface.
pub const EXPORT_MAX_DIMENSION: u32 = 2048;

/// Default file name for the standard export.
pub const EXPORT_FILE_NAME: &str = "bani-meme.png";

/// Default file name for the export that skips background compositing.
pub const EXPORT_FILE_NAME_TRANSPARENT: &str = "bani-meme-transparent.png";

// =============================================================================
// WINDOW CONSTANTS
// =============================================================================

/// Initial window width when the application starts.
pub const INITIAL_WINDOW_WIDTH: f32 = 800.0;

/// Initial window height when the application starts.
pub const INITIAL_WINDOW_HEIGHT: f32 = 900.0;

// =============================================================================
// COLORS
// =============================================================================

/// Canvas background.
pub const COLOR_CANVAS_BG: Color32 = Color32::WHITE;

/// Accent used for handle strokes and highlighted controls.
pub const COLOR_ACCENT: Color32 = Color32::from_rgb(0xfb, 0xd7, 0x43);

/// Fill of the corner handles.
pub const COLOR_HANDLE_FILL: Color32 = Color32::from_rgba_premultiplied(204, 204, 204, 204);

/// Empty-state prompt text and arrow.
pub const COLOR_EMPTY_STATE: Color32 = Color32::from_black_alpha(26);

/// Caption fill.
pub const COLOR_CAPTION_FILL: Color32 = Color32::WHITE;

/// Caption outline.
pub const COLOR_CAPTION_STROKE: Color32 = Color32::BLACK;

/// Toolbar background.
pub const COLOR_TOOLBAR_BG: Color32 = Color32::from_rgb(30, 30, 30);

/// Persistent banner shown when every catalog image failed to load.
pub const COLOR_ERROR_BANNER: Color32 = Color32::from_rgb(180, 50, 50);
