// src/core/types.rs
//
// Общие типы, независимые от конкретных декодеров и каталогов.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Раскладка пикселей во входном буфере. Число каналов выводится из неё.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelLayout {
    Gray,
    GrayAlpha,
    Rgb,
    Bgr,
    Rgba,
    Bgra,
}

impl PixelLayout {
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::GrayAlpha => 2,
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }
}

/// Кадр от источника (камера, файл). Буфер принадлежит вызывающему,
/// ядро только читает его в пределах одного вызова `acquire`.
/// `data` — построчно (row-major), `channels()` байт на пиксель.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    layout: PixelLayout,
}

impl<'a> Frame<'a> {
    /// Проверяет размеры и длину буфера.
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        layout: PixelLayout,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty { width, height });
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(layout.channels()))
            .ok_or(FrameError::TooLarge { width, height })?;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            layout,
        })
    }

    #[inline]
    pub fn gray(data: &'a [u8], width: usize, height: usize) -> Result<Self, FrameError> {
        Self::new(data, width, height, PixelLayout::Gray)
    }

    #[inline]
    pub fn from_luma(img: &'a image::GrayImage) -> Self {
        Self {
            data: img.as_raw(),
            width: img.width() as usize,
            height: img.height() as usize,
            layout: PixelLayout::Gray,
        }
    }

    #[inline]
    pub fn from_rgb(img: &'a image::RgbImage) -> Self {
        Self {
            data: img.as_raw(),
            width: img.width() as usize,
            height: img.height() as usize,
            layout: PixelLayout::Rgb,
        }
    }

    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }
    #[inline]
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Строка `y` как срез байтов (все каналы); `None` за пределами кадра.
    #[inline]
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let stride = self.width * self.layout.channels();
        let start = y * stride;
        self.data.get(start..start + stride)
    }
}

/// Прямоугольник в координатах буфера, на котором сработал декодер.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    #[inline]
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn min_side(&self) -> u32 {
        self.w.min(self.h)
    }
}

/// Поворот по часовой стрелке перед вызовом декодера.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    Rot0,
    Rot90,
    Rot180,
    Rot270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Self::Rot0, Self::Rot90, Self::Rot180, Self::Rot270];

    #[inline]
    pub const fn degrees(self) -> u16 {
        match self {
            Self::Rot0 => 0,
            Self::Rot90 => 90,
            Self::Rot180 => 180,
            Self::Rot270 => 270,
        }
    }
}

/// Полярность: как есть или побитовая инверсия (светлые штрихи на тёмном фоне).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Normal,
    Inverted,
}

/// Тип штрих-кода.
///
/// Строковые имена совпадают с теми, что отдают распространённые декодеры
/// (`EAN13`, `UPC_A`, `CODE128`, `CODE39`, `QRCODE`); всё прочее попадает
/// в `Other` и при разрешении даёт `UnsupportedSymbology`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Symbology {
    Ean13,
    UpcA,
    Code39,
    Code128,
    QrCode,
    Other(String),
}

impl Symbology {
    /// Набор, для которого есть стратегия разрешения.
    pub const SUPPORTED: [Symbology; 5] = [
        Self::Ean13,
        Self::UpcA,
        Self::Code128,
        Self::QrCode,
        Self::Code39,
    ];

    pub fn name(&self) -> &str {
        match self {
            Self::Ean13 => "EAN13",
            Self::UpcA => "UPC_A",
            Self::Code39 => "CODE39",
            Self::Code128 => "CODE128",
            Self::QrCode => "QRCODE",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Symbology {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_uppercase();
        Ok(match norm.as_str() {
            "EAN13" => Self::Ean13,
            "UPCA" => Self::UpcA,
            "CODE39" => Self::Code39,
            "CODE128" => Self::Code128,
            "QR" | "QRCODE" => Self::QrCode,
            _ => Self::Other(s.trim().to_ascii_uppercase()),
        })
    }
}

impl From<String> for Symbology {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(sym) => sym,
            Err(never) => match never {},
        }
    }
}

impl From<Symbology> for String {
    fn from(s: Symbology) -> Self {
        s.to_string()
    }
}

/// Откуда взялся кандидат: вариант обработки + геометрия.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CandidateSource {
    pub variant: String,
    pub rotation: Rotation,
    pub polarity: Polarity,
}

/// Сырой результат декодера с привязкой к ячейке поиска.
/// Живёт только внутри одного вызова `acquire`.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeCandidate {
    pub symbology: Option<Symbology>,
    pub payload: Vec<u8>,
    pub bbox: BoundingBox,
    pub source: CandidateSource,
}

/// Проверенный штрих-код: `payload` удовлетворяет правилу своей `symbology`.
/// Создаётся только валидатором.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ValidatedBarcode {
    payload: String,
    symbology: Symbology,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<CandidateSource>,
}

impl ValidatedBarcode {
    #[inline]
    pub(crate) fn new(payload: String, symbology: Symbology) -> Self {
        Self {
            payload,
            symbology,
            source: None,
        }
    }

    #[inline]
    pub(crate) fn with_source(mut self, source: CandidateSource) -> Self {
        self.source = Some(source);
        self
    }

    #[inline]
    pub fn payload(&self) -> &str {
        &self.payload
    }
    #[inline]
    pub fn symbology(&self) -> &Symbology {
        &self.symbology
    }
    #[inline]
    pub fn source(&self) -> Option<&CandidateSource> {
        self.source.as_ref()
    }
}

/// Единственное состояние между вызовами: когда был последний удачный скан.
/// Хранится у вызывающего и передаётся в `Scanner::acquire_paced` явно.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScanCadence {
    pub interval: Duration,
    pub last_scan: Option<Instant>,
}

impl ScanCadence {
    #[inline]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_scan: None,
        }
    }

    /// Можно ли начинать новый цикл в момент `now`.
    #[inline]
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_scan {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    #[inline]
    #[must_use]
    pub fn scanned_at(self, now: Instant) -> Self {
        Self {
            last_scan: Some(now),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_wrong_buffer() {
        let buf = vec![0u8; 10];
        assert!(matches!(
            Frame::new(&buf, 4, 4, PixelLayout::Gray),
            Err(FrameError::BufferSize { expected: 16, actual: 10 })
        ));
        assert!(matches!(
            Frame::gray(&buf, 0, 4),
            Err(FrameError::Empty { .. })
        ));
        let rgb = vec![0u8; 2 * 3 * 3];
        let f = Frame::new(&rgb, 2, 3, PixelLayout::Bgr).unwrap();
        assert_eq!(f.row(1).map(<[u8]>::len), Some(6));
        assert_eq!(f.row(2).map(<[u8]>::len), Some(6));
        assert!(f.row(3).is_none());
        assert!(f.row(usize::MAX).is_none());
    }

    #[test]
    fn symbology_names_round_trip_through_strings() {
        assert_eq!("ean-13".parse::<Symbology>().unwrap(), Symbology::Ean13);
        assert_eq!("UPC_A".parse::<Symbology>().unwrap(), Symbology::UpcA);
        assert_eq!("qr".parse::<Symbology>().unwrap(), Symbology::QrCode);
        assert_eq!(
            "pdf417".parse::<Symbology>().unwrap(),
            Symbology::Other("PDF417".into())
        );
        let json = serde_json::to_string(&Symbology::Code128).unwrap();
        assert_eq!(json, "\"CODE128\"");
    }

    #[test]
    fn cadence_gates_until_interval_passes() {
        let t0 = Instant::now();
        let c = ScanCadence::new(Duration::from_secs(2));
        assert!(c.is_due(t0));
        let c = c.scanned_at(t0);
        assert!(!c.is_due(t0 + Duration::from_millis(1500)));
        assert!(c.is_due(t0 + Duration::from_secs(2)));
    }
}
