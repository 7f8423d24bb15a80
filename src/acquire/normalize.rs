//! Приведение кадра к 8-битной яркости и минимальной ширине.

use image::imageops::{self, FilterType};
use image::GrayImage;
use tracing::{debug, warn};

use crate::core::types::{Frame, PixelLayout};

/// Ширина, ниже которой 1D-декодеры теряют модуль штриха.
pub const DEFAULT_MIN_WIDTH: u32 = 640;

/// Во сколько раз кадр может вырасти по каждой стороне.
pub const DEFAULT_MAX_UPSCALE: f32 = 4.0;

#[derive(Clone, Copy, Debug)]
pub struct FrameNormalizer {
    min_width: u32,
    max_upscale: f32,
}

impl Default for FrameNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_WIDTH)
    }
}

impl FrameNormalizer {
    #[inline]
    pub const fn new(min_width: u32) -> Self {
        Self { min_width, max_upscale: DEFAULT_MAX_UPSCALE }
    }

    /// Потолок коэффициента увеличения; значения меньше 1 трактуются как 1.
    #[must_use]
    #[inline]
    pub fn with_max_upscale(mut self, max_upscale: f32) -> Self {
        self.max_upscale = max_upscale.max(1.0);
        self
    }

    #[inline]
    pub fn max_upscale(&self) -> f32 {
        self.max_upscale
    }

    pub fn normalize(&self, frame: &Frame<'_>) -> GrayImage {
        let luma = to_luma(frame);
        let (w, h) = luma.dimensions();
        if w >= self.min_width {
            return luma;
        }
        let wanted = f64::from(self.min_width) / f64::from(w);
        let cap = f64::from(self.max_upscale);
        let scale = if wanted > cap {
            warn!(
                from = ?(w, h),
                wanted,
                cap,
                "frame too narrow, upscale clamped"
            );
            cap
        } else {
            wanted
        };
        let new_w = ((f64::from(w) * scale).round() as u32).clamp(w, self.min_width);
        let new_h = ((f64::from(h) * scale).round() as u32).max(1);
        if new_w == w {
            return luma;
        }
        debug!(from = ?(w, h), to = ?(new_w, new_h), "upscaling narrow frame");
        imageops::resize(&luma, new_w, new_h, FilterType::Triangle)
    }
}

/// BT.601: 0.299 R + 0.587 G + 0.114 B, альфа игнорируется.
fn to_luma(frame: &Frame<'_>) -> GrayImage {
    let (w, h) = (frame.width() as u32, frame.height() as u32);
    let data = frame.data();
    let layout = frame.layout();
    if layout == PixelLayout::Gray {
        // длина буфера проверена конструктором Frame
        return GrayImage::from_vec(w, h, data.to_vec()).unwrap_or_else(|| GrayImage::new(w, h));
    }
    let ch = layout.channels();
    let pixels = data
        .chunks_exact(ch)
        .map(|px| match layout {
            PixelLayout::Gray | PixelLayout::GrayAlpha => px[0],
            PixelLayout::Rgb | PixelLayout::Rgba => weigh(px[0], px[1], px[2]),
            PixelLayout::Bgr | PixelLayout::Bgra => weigh(px[2], px[1], px[0]),
        })
        .collect();
    GrayImage::from_vec(w, h, pixels).unwrap_or_else(|| GrayImage::new(w, h))
}

#[inline]
fn weigh(r: u8, g: u8, b: u8) -> u8 {
    let y = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    ((y + 500) / 1000) as u8
}
