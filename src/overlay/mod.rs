//! Frame Annotation Overlay
//!
//! Draws a box around every region that produced a detection and a
//! `"{label}: {text}"` caption above it. Annotation always works on a copy;
//! the frame given to detection and kept by the caller stays pristine.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect as DrawRect;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::AnnotationConfig;
use crate::vision::{clamp_region, Rect, Region};

/// Fonts probed when no `font_path` is configured
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Gap between a caption and the box below it
const LABEL_GAP: i32 = 4;

/// Colors and sizes used when drawing
#[derive(Debug, Clone)]
pub struct AnnotationStyle {
    pub box_color: Rgb<u8>,
    pub label_color: Rgb<u8>,
    pub thickness: u32,
    pub font_size: f32,
    pub min_label_y: i32,
}

impl From<&AnnotationConfig> for AnnotationStyle {
    fn from(config: &AnnotationConfig) -> Self {
        Self {
            box_color: Rgb(config.box_color),
            label_color: Rgb(config.label_color),
            thickness: config.thickness.max(1),
            font_size: config.font_size.max(1.0),
            min_label_y: config.min_label_y.max(0),
        }
    }
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self::from(&AnnotationConfig::default())
    }
}

/// Draws detections onto copies of frames
pub struct Annotator {
    style: AnnotationStyle,
    font: Option<FontVec>,
}

impl Annotator {
    /// Annotator without a font; captions are drawn as solid bars
    pub fn new(style: AnnotationStyle) -> Self {
        Self { style, font: None }
    }

    /// Build from config, loading the configured font or a system font
    pub fn from_config(config: &AnnotationConfig) -> Self {
        let style = AnnotationStyle::from(config);
        let font = match &config.font_path {
            Some(path) => match load_font(path) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to load label font");
                    None
                }
            },
            None => probe_system_font(),
        };

        if font.is_none() {
            warn!("No label font available, captions will be drawn without glyphs");
        }

        Self { style, font }
    }

    /// Return an annotated copy of `frame`
    ///
    /// Only regions with an entry in `texts` are drawn, at their clamped bounds.
    pub fn annotate(
        &self,
        frame: &RgbImage,
        regions: &[Region],
        texts: &BTreeMap<usize, String>,
    ) -> RgbImage {
        let mut canvas = frame.clone();
        let (width, height) = canvas.dimensions();

        for (index, region) in regions.iter().enumerate() {
            let Some(text) = texts.get(&index) else {
                continue;
            };
            let Some(rect) = clamp_region(region, width, height) else {
                continue;
            };

            self.draw_box(&mut canvas, rect);
            let caption = format!("{}: {}", region.display_label(index), text);
            self.draw_caption(&mut canvas, rect, &caption);
        }

        canvas
    }

    fn draw_box(&self, canvas: &mut RgbImage, rect: Rect) {
        // Nested outlines grow the stroke inwards so it never leaves the frame
        for inset in 0..self.style.thickness {
            let w = rect.width.saturating_sub(inset * 2);
            let h = rect.height.saturating_sub(inset * 2);
            if w == 0 || h == 0 {
                break;
            }
            let outline = DrawRect::at((rect.x + inset) as i32, (rect.y + inset) as i32).of_size(w, h);
            draw_hollow_rect_mut(canvas, outline, self.style.box_color);
        }
    }

    fn draw_caption(&self, canvas: &mut RgbImage, rect: Rect, caption: &str) {
        let scale = PxScale::from(self.style.font_size);
        let (text_w, text_h) = match &self.font {
            Some(font) => text_size(scale, font, caption),
            None => estimate_text_size(self.style.font_size, caption),
        };

        let y = label_top(rect.y as i32, text_h as i32, self.style.min_label_y);
        let x = rect.x as i32;

        match &self.font {
            Some(font) => draw_text_mut(canvas, self.style.label_color, x, y, scale, font, caption),
            None => {
                if text_w > 0 && text_h > 0 {
                    let bar = DrawRect::at(x, y).of_size(text_w, text_h.max(1));
                    draw_filled_rect_mut(canvas, bar, self.style.label_color);
                }
            }
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(AnnotationStyle::default())
    }
}

/// Top edge of a caption placed above a box starting at `box_top`
///
/// Captions for boxes near the top edge are floored at `min_y` instead of
/// going off-frame.
pub fn label_top(box_top: i32, text_height: i32, min_y: i32) -> i32 {
    (box_top - text_height - LABEL_GAP).max(min_y)
}

/// Rough caption size for drawing without a font
fn estimate_text_size(font_size: f32, caption: &str) -> (u32, u32) {
    let chars = caption.chars().count() as f32;
    ((chars * font_size * 0.55).ceil() as u32, font_size.ceil() as u32)
}

fn load_font(path: &Path) -> anyhow::Result<FontVec> {
    let bytes = std::fs::read(path)?;
    let font = FontVec::try_from_vec(bytes)?;
    Ok(font)
}

fn probe_system_font() -> Option<FontVec> {
    SYSTEM_FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .filter(|p| p.exists())
        .find_map(|p| match load_font(&p) {
            Ok(font) => {
                info!(path = %p.display(), "Using system font for labels");
                Some(font)
            }
            Err(_) => None,
        })
}
