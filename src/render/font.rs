//! Glyph resources for dot labels.
//!
//! The compositor only needs to measure a short string and fill it at an integer origin.
//! [`BitmapFont`] is always available; [`OutlineFont`] shapes real font bytes with Parley.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use vello_cpu::kurbo::{Affine, Rect};

use crate::foundation::{
    core::Rgb8,
    error::{DotlinkError, DotlinkResult},
};

/// Common install locations worth trying before falling back to [`BitmapFont`].
pub const WELL_KNOWN_FONT_PATHS: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/Library/Fonts/Arial.ttf",
];

/// Pixel extent of a laid-out string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextExtent {
    pub width: u32,
    pub height: u32,
}

/// Measure and draw label text.
///
/// Metrics must be deterministic for a given `(text, size_px)`; frames are compared
/// pixel-for-pixel across renders.
pub trait LabelFont {
    fn measure(&mut self, text: &str, size_px: u32) -> DotlinkResult<TextExtent>;

    /// Fill `text` with its top-left corner at `origin`.
    fn draw(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        size_px: u32,
        origin: (i32, i32),
        color: Rgb8,
    ) -> DotlinkResult<()>;
}

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

// One byte per row, low five bits, MSB of those five is the leftmost column.
const DIGITS: [[u8; GLYPH_H as usize]; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];

/// Built-in 5x7 digit font drawn as axis-aligned cells.
///
/// Characters other than ASCII digits advance like a digit but draw nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct BitmapFont;

impl BitmapFont {
    /// Side length of one glyph cell for a nominal font size.
    pub fn cell_px(size_px: u32) -> u32 {
        (size_px / 8).max(1)
    }
}

impl LabelFont for BitmapFont {
    fn measure(&mut self, text: &str, size_px: u32) -> DotlinkResult<TextExtent> {
        let cell = Self::cell_px(size_px);
        let n = text.chars().count() as u32;
        if n == 0 {
            return Ok(TextExtent {
                width: 0,
                height: 0,
            });
        }
        Ok(TextExtent {
            width: n * GLYPH_W * cell + (n - 1) * cell,
            height: GLYPH_H * cell,
        })
    }

    fn draw(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        size_px: u32,
        origin: (i32, i32),
        color: Rgb8,
    ) -> DotlinkResult<()> {
        let cell = f64::from(Self::cell_px(size_px));
        ctx.set_transform(Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(color.r, color.g, color.b, 255));

        let mut pen_x = f64::from(origin.0);
        let top = f64::from(origin.1);
        for ch in text.chars() {
            if let Some(rows) = ch.to_digit(10).map(|d| &DIGITS[d as usize]) {
                for (ry, bits) in rows.iter().enumerate() {
                    let y0 = top + ry as f64 * cell;
                    let mut col = 0;
                    while col < GLYPH_W {
                        if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                            col += 1;
                            continue;
                        }
                        let run_start = col;
                        while col < GLYPH_W && bits & (1 << (GLYPH_W - 1 - col)) != 0 {
                            col += 1;
                        }
                        let x0 = pen_x + f64::from(run_start) * cell;
                        let x1 = pen_x + f64::from(col) * cell;
                        ctx.fill_rect(&Rect::new(x0, y0, x1, y0 + cell));
                    }
                }
            }
            pen_x += f64::from(GLYPH_W + 1) * cell;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct GlyphBrush;

/// Outline font shaped with Parley and filled through `vello_cpu` glyph runs.
pub struct OutlineFont {
    source: Option<PathBuf>,
    family: String,
    font: vello_cpu::peniko::FontData,
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<GlyphBrush>,
    layouts: HashMap<(String, u32), parley::Layout<GlyphBrush>>,
}

impl std::fmt::Debug for OutlineFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineFont")
            .field("source", &self.source)
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

impl OutlineFont {
    pub fn from_bytes(bytes: Vec<u8>) -> DotlinkResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            DotlinkError::validation("no font families registered from font bytes")
        })?;
        let family = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| DotlinkError::validation("registered font family has no name"))?
            .to_string();

        Ok(Self {
            source: None,
            family,
            font: vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0),
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            layouts: HashMap::new(),
        })
    }

    pub fn from_path(path: &Path) -> DotlinkResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        let mut font = Self::from_bytes(bytes)?;
        font.source = Some(path.to_path_buf());
        Ok(font)
    }

    /// First font in `paths` that exists and parses.
    pub fn probe<P: AsRef<Path>>(paths: &[P]) -> Option<Self> {
        paths.iter().find_map(|p| {
            let p = p.as_ref();
            if !p.is_file() {
                return None;
            }
            match Self::from_path(p) {
                Ok(font) => Some(font),
                Err(err) => {
                    tracing::debug!(path = %p.display(), %err, "font candidate rejected");
                    None
                }
            }
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    fn ensure_layout(&mut self, text: &str, size_px: u32) -> DotlinkResult<(String, u32)> {
        let key = (text.to_string(), size_px);
        if self.layouts.contains_key(&key) {
            return Ok(key);
        }
        if size_px == 0 {
            return Err(DotlinkError::validation("label size must be > 0"));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px as f32));
        builder.push_default(parley::style::StyleProperty::Brush(GlyphBrush));

        let mut layout: parley::Layout<GlyphBrush> = builder.build(text);
        layout.break_all_lines(None);
        self.layouts.insert(key.clone(), layout);
        Ok(key)
    }
}

impl LabelFont for OutlineFont {
    fn measure(&mut self, text: &str, size_px: u32) -> DotlinkResult<TextExtent> {
        let key = self.ensure_layout(text, size_px)?;
        let layout = &self.layouts[&key];
        Ok(TextExtent {
            width: layout.width().ceil().max(0.0) as u32,
            height: layout.height().ceil().max(0.0) as u32,
        })
    }

    fn draw(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        size_px: u32,
        origin: (i32, i32),
        color: Rgb8,
    ) -> DotlinkResult<()> {
        let key = self.ensure_layout(text, size_px)?;
        let layout = &self.layouts[&key];

        ctx.set_transform(Affine::translate((f64::from(origin.0), f64::from(origin.1))));
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(color.r, color.g, color.b, 255));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                // Layout-space positions: run offset, advances and baseline already applied.
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&self.font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        ctx.set_transform(Affine::IDENTITY);
        Ok(())
    }
}

/// Outline font from `paths` when one loads, otherwise the built-in bitmap digits.
pub fn default_font<P: AsRef<Path>>(paths: &[P]) -> Box<dyn LabelFont> {
    match OutlineFont::probe(paths) {
        Some(font) => {
            tracing::debug!(family = font.family(), "using outline label font");
            Box::new(font)
        }
        None => {
            tracing::warn!("no usable label font found, using built-in bitmap digits");
            Box::new(BitmapFont)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_metrics_scale_with_size() {
        let mut f = BitmapFont;
        assert_eq!(
            f.measure("7", 16).unwrap(),
            TextExtent {
                width: 10,
                height: 14
            }
        );
        assert_eq!(
            f.measure("12", 16).unwrap(),
            TextExtent {
                width: 22,
                height: 14
            }
        );
        assert_eq!(f.measure("3", 40).unwrap().height, 35);
        assert_eq!(f.measure("", 16).unwrap().width, 0);
    }

    #[test]
    fn tiny_sizes_keep_one_pixel_cells() {
        assert_eq!(BitmapFont::cell_px(3), 1);
    }

    #[test]
    fn every_digit_has_ink() {
        for rows in DIGITS {
            assert!(rows.iter().any(|r| *r != 0));
            assert!(rows.iter().all(|r| *r < (1 << GLYPH_W)));
        }
    }

    /// Draw `text` centered on the middle of a white 96x64 canvas. Returns the RGBA bytes and
    /// the box the label was centered in.
    fn render_centered(
        font: &mut dyn LabelFont,
        text: &str,
    ) -> (Vec<u8>, TextExtent, (i32, i32)) {
        let (w, h) = (96u16, 64u16);
        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
        ctx.fill_rect(&Rect::new(0.0, 0.0, f64::from(w), f64::from(h)));

        let extent = font.measure(text, 16).unwrap();
        let origin = (
            i32::from(w / 2) - (extent.width / 2) as i32,
            i32::from(h / 2) - (extent.height / 2) as i32,
        );
        font.draw(&mut ctx, text, 16, origin, Rgb8::BLACK).unwrap();
        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        (pixmap.data_as_u8_slice().to_vec(), extent, origin)
    }

    fn ink(data: &[u8], width: usize) -> Vec<(i32, i32)> {
        data.chunks_exact(4)
            .enumerate()
            .filter(|(_, px)| px[0] < 128)
            .map(|(i, _)| ((i % width) as i32, (i / width) as i32))
            .collect()
    }

    #[test]
    fn outline_labels_stay_inside_their_measured_box() {
        let Some(mut font) = OutlineFont::probe(WELL_KNOWN_FONT_PATHS) else {
            eprintln!("no system font found, skipping");
            return;
        };
        let (data, extent, (ox, oy)) = render_centered(&mut font, "12");
        let ink = ink(&data, 96);
        assert!(!ink.is_empty(), "label drew nothing");

        let (w, h) = (extent.width as i32, extent.height as i32);
        for &(x, y) in &ink {
            assert!(
                (ox - 1..=ox + w + 1).contains(&x) && (oy - 1..=oy + h + 1).contains(&y),
                "ink at ({x}, {y}) outside {w}x{h} box at ({ox}, {oy})"
            );
        }
        // Both digits are laid out side by side, not stacked on the first one.
        let mid = ox + w / 2;
        assert!(ink.iter().any(|&(x, _)| x < mid));
        assert!(ink.iter().any(|&(x, _)| x > mid));
    }

    #[test]
    fn bitmap_labels_fill_their_measured_box() {
        let (data, extent, (ox, oy)) = render_centered(&mut BitmapFont, "12");
        let ink = ink(&data, 96);
        let (w, h) = (extent.width as i32, extent.height as i32);
        assert!(
            ink.iter()
                .all(|&(x, y)| (ox..ox + w).contains(&x) && (oy..oy + h).contains(&y))
        );
        assert!(ink.iter().any(|&(_, y)| y == oy));
        assert!(ink.iter().any(|&(_, y)| y == oy + h - 1));
        assert!(ink.iter().any(|&(x, _)| x == ox + w - 1));
    }

    #[test]
    fn garbage_bytes_are_not_a_font() {
        assert!(OutlineFont::from_bytes(vec![0, 1, 2, 3]).is_err());
    }

    #[test]
    fn probing_missing_paths_falls_back() {
        assert!(OutlineFont::probe(&["/definitely/not/here.ttf"]).is_none());
        let mut font = default_font(&["/definitely/not/here.ttf"]);
        assert_eq!(font.measure("5", 16).unwrap().height, 14);
    }
}
