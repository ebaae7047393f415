use std::path::Path;

use anyhow::Context as _;

use crate::{
    config::TaskConfig,
    encode::ffmpeg::ensure_parent_dir,
    foundation::core::{Canvas, Rgb8},
    foundation::error::{DotlinkError, DotlinkResult},
};

pub mod compositor;
pub mod font;

/// A rendered frame as RGBA8 pixels.
///
/// Frames start from an opaque background fill, so premultiplied and straight bytes coincide.
/// The flag is kept to make the convention explicit at encoder boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn to_rgba_image(&self) -> DotlinkResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            DotlinkError::render(format!(
                "frame buffer of {} bytes does not match {}x{}",
                self.data.len(),
                self.width,
                self.height
            ))
        })
    }

    pub fn save_png(&self, path: &Path) -> DotlinkResult<()> {
        ensure_parent_dir(path)?;
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

/// Visual parameters shared by every frame of a task.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderStyle {
    pub canvas: Canvas,
    pub dot_radius: u32,
    pub line_width: u32,
    pub show_numbers: bool,
    pub label_size: u32,
    pub dot_color: Rgb8,
    pub line_color: Rgb8,
    pub background: Rgb8,
}

impl RenderStyle {
    pub fn from_config(cfg: &TaskConfig) -> Self {
        Self {
            canvas: cfg.canvas,
            dot_radius: cfg.dot_radius,
            line_width: cfg.line_width,
            show_numbers: cfg.show_numbers,
            label_size: cfg.label_size(),
            dot_color: cfg.dot_color,
            line_color: cfg.line_color,
            background: cfg.background_color,
        }
    }
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::from_config(&TaskConfig::default())
    }
}
