//! Fixed-layout rendering of a form onto the A4 canvas.
//!
//! Text is drawn black at each anchor's top-left corner with one font and
//! one size. Nothing wraps and nothing avoids its neighbour, so long values
//! run into the next anchor's text; pixels past the canvas edge are clipped.

use crate::error::AppError;
use crate::form::{FormState, GroupKind};
use crate::layout::{Anchor, TemplateLayout};
use crate::preferences::PreferenceRecord;
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{imageops::FilterType, DynamicImage, Rgb, RgbImage, Rgba};
use log::{debug, info, warn};
use spleen_font::{PSF2Font, FONT_12X24};
use std::io::Read;
use std::path::Path;

/// Fonts tried in order when none is given. CJK faces come first so
/// Japanese registration plates print correctly.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "C:\\Windows\\Fonts\\msgothic.ttc",
    "C:\\Windows\\Fonts\\YuGothM.ttc",
    "/System/Library/Fonts/ヒラギノ角ゴシック W3.ttc",
    "/System/Library/Fonts/Hiragino Sans GB.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/fonts-japanese-gothic.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
];

/// Spleen glyph cell.
const BITMAP_GLYPH_WIDTH: usize = 12;
const BITMAP_GLYPH_HEIGHT: usize = 24;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Largest template accepted over http(s).
const MAX_TEMPLATE_BYTES: u64 = 64 * 1024 * 1024;

// ============================================================================
// Typeface
// ============================================================================

/// The single font every value is drawn with.
pub enum Typeface {
    /// TrueType/OpenType face (collections use their first face).
    Outline(FontVec),
    /// Built-in Spleen 12x24 bitmap font, scaled. Covers ASCII only;
    /// other characters print as boxes.
    Bitmap,
}

impl Typeface {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let data = std::fs::read(path)
            .map_err(|e| AppError::Font(format!("{}: {}", path.display(), e)))?;
        let font = FontVec::try_from_vec_and_index(data, 0)
            .map_err(|e| AppError::Font(format!("{}: {}", path.display(), e)))?;
        Ok(Typeface::Outline(font))
    }

    /// Use `explicit` if given, otherwise the first system font that loads,
    /// otherwise the bitmap font.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, AppError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        for candidate in SYSTEM_FONT_CANDIDATES {
            let path = Path::new(candidate);
            if !path.exists() {
                continue;
            }
            match Self::load(path) {
                Ok(face) => {
                    info!("using font {}", path.display());
                    return Ok(face);
                }
                Err(e) => debug!("skipping font: {}", e),
            }
        }

        warn!("no system font found, falling back to the built-in bitmap font (ASCII only)");
        Ok(Typeface::Bitmap)
    }

    /// Draw `text` with its top-left corner at `anchor`.
    pub fn draw_text(
        &self,
        canvas: &mut RgbImage,
        anchor: Anchor,
        text: &str,
        pixel_height: f32,
    ) -> Result<(), AppError> {
        match self {
            Typeface::Outline(font) => {
                draw_outline_text(font, canvas, anchor, text, pixel_height);
                Ok(())
            }
            Typeface::Bitmap => draw_bitmap_text(canvas, anchor, text, pixel_height),
        }
    }
}

/// Scale for an em of `em_px` pixels. `PxScale` measures ascent to
/// descent, which is taller than the em for most CJK faces.
fn em_scale(font: &FontVec, em_px: f32) -> PxScale {
    match font.units_per_em() {
        Some(units) if units > 0.0 => PxScale::from(em_px * font.height_unscaled() / units),
        _ => PxScale::from(em_px),
    }
}

fn draw_outline_text(font: &FontVec, canvas: &mut RgbImage, anchor: Anchor, text: &str, em_px: f32) {
    let scale = em_scale(font, em_px);
    let scaled = font.as_scaled(scale);
    let baseline_y = anchor.y as f32 + scaled.ascent();
    let mut caret_x = anchor.x as f32;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(caret_x, baseline_y));
        caret_x += scaled.h_advance(glyph_id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = bounds.min.x as i64 + px as i64;
                let y = bounds.min.y as i64 + py as i64;
                darken(canvas, x, y, coverage);
            });
        }
    }
}

fn draw_bitmap_text(canvas: &mut RgbImage, anchor: Anchor, text: &str, pixel_height: f32) -> Result<(), AppError> {
    let mut spleen = PSF2Font::new(FONT_12X24)
        .ok()
        .ok_or_else(|| AppError::Font("built-in bitmap font is unreadable".to_string()))?;

    let scale = pixel_height / BITMAP_GLYPH_HEIGHT as f32;
    let top = anchor.y as f32;
    let mut caret_x = anchor.x as f32;

    for ch in text.chars() {
        let utf8_bytes = ch.to_string();
        if let Some(spleen_glyph) = spleen.glyph_for_utf8(utf8_bytes.as_bytes()) {
            for (row_y, row) in spleen_glyph.enumerate() {
                for (col_x, on) in row.enumerate() {
                    if on {
                        fill_rect(
                            canvas,
                            caret_x + col_x as f32 * scale,
                            top + row_y as f32 * scale,
                            scale,
                            scale,
                        );
                    }
                }
            }
            caret_x += BITMAP_GLYPH_WIDTH as f32 * scale;
        } else {
            // Unknown characters (kana, kanji) get a full-width box.
            draw_box(canvas, caret_x, top, pixel_height, pixel_height, scale.max(1.0));
            caret_x += pixel_height;
        }
    }
    Ok(())
}

// ============================================================================
// Pixel Helpers
// ============================================================================

/// Blend black over the pixel at `(x, y)` with the given coverage.
fn darken(canvas: &mut RgbImage, x: i64, y: i64, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let keep = 1.0 - coverage.clamp(0.0, 1.0);
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for channel in pixel.0.iter_mut() {
        *channel = (*channel as f32 * keep).round() as u8;
    }
}

fn fill_rect(canvas: &mut RgbImage, x: f32, y: f32, w: f32, h: f32) {
    let (x0, y0) = (x.floor() as i64, y.floor() as i64);
    let (x1, y1) = ((x + w).ceil() as i64, (y + h).ceil() as i64);
    for py in y0..y1 {
        for px in x0..x1 {
            darken(canvas, px, py, 1.0);
        }
    }
}

fn draw_box(canvas: &mut RgbImage, x: f32, y: f32, w: f32, h: f32, stroke: f32) {
    let inset = w * 0.1;
    let (x, y, w, h) = (x + inset, y + inset, w - 2.0 * inset, h - 2.0 * inset);
    fill_rect(canvas, x, y, w, stroke);
    fill_rect(canvas, x, y + h - stroke, w, stroke);
    fill_rect(canvas, x, y, stroke, h);
    fill_rect(canvas, x + w - stroke, y, stroke, h);
}

// ============================================================================
// Template Background
// ============================================================================

/// Load a template scan from a file path or an http(s) URL.
pub fn load_template(source: &str) -> Result<DynamicImage, AppError> {
    let bytes = read_source(source).map_err(AppError::Template)?;
    image::load_from_memory(&bytes)
        .map_err(|e| AppError::Template(format!("{}: failed to decode image: {}", source, e)))
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn read_source(source: &str) -> Result<Vec<u8>, String> {
    if !is_url(source) {
        return std::fs::read(source).map_err(|e| format!("{}: {}", source, e));
    }

    debug!("fetching {}", source);
    let response = ureq::get(source)
        .call()
        .map_err(|e| format!("{}: fetch failed: {}", source, e))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_TEMPLATE_BYTES)
        .read_to_end(&mut bytes)
        .map_err(|e| format!("{}: read failed: {}", source, e))?;
    Ok(bytes)
}

/// Flatten transparency onto white so see-through areas print as paper.
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = a as f32 / 255.0;
        let over = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([over(r), over(g), over(b)])
    })
}

/// White canvas, or the template stretched to the canvas size.
pub fn blank_canvas(layout: &TemplateLayout, template: Option<&DynamicImage>) -> RgbImage {
    match template {
        None => RgbImage::from_pixel(layout.width, layout.height, WHITE),
        Some(img) => {
            let rgb = flatten_on_white(img);
            if rgb.dimensions() == (layout.width, layout.height) {
                rgb
            } else {
                debug!(
                    "scaling template from {:?} to {}x{}",
                    rgb.dimensions(),
                    layout.width,
                    layout.height
                );
                image::imageops::resize(&rgb, layout.width, layout.height, FilterType::Triangle)
            }
        }
    }
}

// ============================================================================
// Canvas Rendering
// ============================================================================

/// Draw every anchored value of the form and preferences onto the canvas.
///
/// Group slots without an anchor are skipped.
pub fn render_to_canvas(
    form: &FormState,
    prefs: &PreferenceRecord,
    layout: &TemplateLayout,
    typeface: &Typeface,
    template: Option<&DynamicImage>,
) -> Result<RgbImage, AppError> {
    let mut canvas = blank_canvas(layout, template);
    let size = layout.font_size;

    for anchor in &layout.fields {
        let text = form.field(anchor.field);
        draw_value(typeface, &mut canvas, Anchor { x: anchor.x, y: anchor.y }, text, size)?;
    }

    for kind in GroupKind::ALL {
        let anchors = layout.group_anchors(kind);
        for (index, value) in form.group(kind).visible_slots() {
            match anchors.get(index) {
                Some(&anchor) => draw_value(typeface, &mut canvas, anchor, value, size)?,
                None => debug!("no anchor for {}, not drawn", kind.slot_label(index)),
            }
        }
    }

    for anchor in &layout.preferences {
        let text = prefs.get(anchor.field);
        draw_value(typeface, &mut canvas, Anchor { x: anchor.x, y: anchor.y }, text, size)?;
    }

    Ok(canvas)
}

fn draw_value(
    typeface: &Typeface,
    canvas: &mut RgbImage,
    anchor: Anchor,
    text: &str,
    size: f32,
) -> Result<(), AppError> {
    if text.is_empty() {
        return Ok(());
    }
    typeface.draw_text(canvas, anchor, text, size)
}
