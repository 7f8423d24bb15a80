#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Публичные модули
pub mod api;      // Scanner: acquire / resolve
pub mod core;     // общие типы (кадр, символика, проверенный штрих-код)
pub mod prelude;  // удобные re-export'ы

pub mod acquire;  // нормализация, варианты предобработки, поиск по сетке
pub mod binarize; // бинаризация строк для 1D
pub mod config;
pub mod contrast; // CLAHE
pub mod decode;   // трейт примитива декодирования
pub mod error;
pub mod one_d;    // 1D декодеры (ean13, code128)
pub mod pace;     // ожидание и отмена
pub mod qr;       // QR через rqrr
pub mod resolve;  // штрих-код → товар
pub mod synth;    // синтетические штрих-коды для тестов и демо
pub mod transport;
pub mod validate;

pub use crate::api::{AcquireOutcome, Scanner, ScannerBuilder};
pub use crate::config::ScannerConfig;
pub use crate::core::types::{Frame, PixelLayout, ScanCadence, Symbology, ValidatedBarcode};
pub use crate::error::{ConfigError, FrameError, ResolutionError};
pub use crate::resolve::{ProductRecord, QrContent, Resolution};
