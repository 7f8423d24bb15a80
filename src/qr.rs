//! QR-примитив на базе `rqrr`.

use image::GrayImage;
use tracing::debug;

use crate::core::types::{BoundingBox, Symbology};
use crate::decode::{DecodePrimitive, RawSymbol};

#[derive(Clone, Copy, Debug, Default)]
pub struct QrDecoder;

impl QrDecoder {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl DecodePrimitive for QrDecoder {
    fn decode(&self, image: &GrayImage) -> Vec<RawSymbol> {
        let (w, h) = (image.width() as usize, image.height() as usize);
        if w == 0 || h == 0 {
            return Vec::new();
        }
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| {
            image.get_pixel(x as u32, y as u32)[0]
        });

        prepared
            .detect_grids()
            .into_iter()
            .filter_map(|grid| {
                let bbox = bounds_to_box(&grid.bounds, w, h);
                match grid.decode() {
                    Ok((_meta, content)) => {
                        Some(RawSymbol::new(Some(Symbology::QrCode), content.into_bytes(), bbox))
                    }
                    Err(e) => {
                        debug!(error = %e, "qr grid found but not decoded");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Описывающий прямоугольник четырёх углов сетки, обрезанный по кадру.
fn bounds_to_box(points: &[rqrr::Point; 4], w: usize, h: usize) -> BoundingBox {
    let clamp_x = |v: i32| v.clamp(0, w as i32) as u32;
    let clamp_y = |v: i32| v.clamp(0, h as i32) as u32;
    let x0 = points.iter().map(|p| clamp_x(p.x)).min().unwrap_or(0);
    let x1 = points.iter().map(|p| clamp_x(p.x)).max().unwrap_or(0);
    let y0 = points.iter().map(|p| clamp_y(p.y)).min().unwrap_or(0);
    let y1 = points.iter().map(|p| clamp_y(p.y)).max().unwrap_or(0);
    BoundingBox::new(x0, y0, x1 - x0, y1 - y0)
}
