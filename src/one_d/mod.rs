//! 1D-декодеры (EAN-13/UPC-A, Code 128) поверх сканирования строк.
//!
//! `ScanlineDecoder` равномерно выбирает строки по высоте, декодирует каждую
//! и сводит совпавшие попадания в один символ с общей рамкой.

pub mod code128;
pub mod ean13;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::{BoundingBox, Symbology};
use crate::decode::{DecodePrimitive, RawSymbol};

/// Попадание в одной строке: текст и x-диапазон `[x0, x1)` от старт- до стоп-guard'а.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowHit {
    pub text: String,
    pub x0: usize,
    pub x1: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Сколько строк сканировать (равномерно по высоте).
    pub scan_rows: usize,
    /// Строки короче этого числа пикселей не декодируются.
    pub min_modules: usize,
    pub ean13_upca: bool,
    pub code128: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            scan_rows: 15,
            min_modules: 30,
            ean13_upca: true,
            code128: true,
        }
    }
}

/// Встроенный 1D-примитив.
#[derive(Clone, Debug, Default)]
pub struct ScanlineDecoder {
    opts: DecodeOptions,
}

/// Накопитель попаданий одного текста по разным строкам.
struct Track {
    symbology: Symbology,
    text: String,
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
}

impl ScanlineDecoder {
    #[inline]
    pub fn new(opts: DecodeOptions) -> Self {
        Self { opts }
    }

    #[inline]
    pub fn options(&self) -> &DecodeOptions {
        &self.opts
    }

    /// y-координаты сканируемых строк и шаг между ними.
    fn sample_rows(&self, height: usize) -> (Vec<usize>, usize) {
        let rows = self.opts.scan_rows.max(1).min(height);
        let step = if rows > 1 { (height - 1) / (rows - 1) } else { height };
        let ys = (0..rows)
            .map(|i| (i * (height - 1)) / (rows - 1).max(1))
            .collect();
        (ys, step.max(1))
    }

    fn decode_line(&self, row: &[u8]) -> Option<(Symbology, RowHit)> {
        if self.opts.ean13_upca {
            if let Some(hit) = ean13::decode_row(row, &self.opts) {
                let sym = if hit.text.len() == 12 {
                    Symbology::UpcA
                } else {
                    Symbology::Ean13
                };
                return Some((sym, hit));
            }
        }
        if self.opts.code128 {
            if let Some(hit) = code128::decode_row(row, &self.opts) {
                return Some((Symbology::Code128, hit));
            }
        }
        None
    }
}

impl DecodePrimitive for ScanlineDecoder {
    fn decode(&self, image: &GrayImage) -> Vec<RawSymbol> {
        let width = image.width() as usize;
        let height = image.height() as usize;
        if width == 0 || height == 0 {
            return Vec::new();
        }
        let raw = image.as_raw();
        let (ys, step) = self.sample_rows(height);

        let mut tracks: Vec<Track> = Vec::new();
        for y in ys {
            let row = &raw[y * width..(y + 1) * width];
            let Some((symbology, hit)) = self.decode_line(row) else {
                continue;
            };
            match tracks
                .iter_mut()
                .find(|t| t.symbology == symbology && t.text == hit.text)
            {
                Some(t) => {
                    t.x0 = t.x0.min(hit.x0);
                    t.x1 = t.x1.max(hit.x1);
                    t.y1 = y;
                }
                None => tracks.push(Track {
                    symbology,
                    text: hit.text,
                    x0: hit.x0,
                    x1: hit.x1,
                    y0: y,
                    y1: y,
                }),
            }
        }

        tracks
            .into_iter()
            .map(|t| {
                // строка «представляет» полосу высотой в шаг выборки
                let h = (t.y1 - t.y0 + step).min(height - t.y0);
                let bbox = BoundingBox::new(t.x0 as u32, t.y0 as u32, (t.x1 - t.x0) as u32, h as u32);
                debug!(symbology = %t.symbology, text = %t.text, ?bbox, "scanline hit");
                RawSymbol::new(Some(t.symbology), t.text.into_bytes(), bbox)
            })
            .collect()
    }
}
