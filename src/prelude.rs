// src/prelude.rs
//
// `use ultrascan::prelude::*;` — всё, что нужно для типичного цикла
// «кадр → штрих-код → товар».

pub use crate::api::{AcquireOutcome, Scanner, ScannerBuilder};
pub use crate::config::{Code128Fallback, ScannerConfig};
pub use crate::core::types::{
    BoundingBox, Frame, PixelLayout, Polarity, Rotation, ScanCadence, Symbology, ValidatedBarcode,
};
pub use crate::decode::{CompositeDecoder, DecodePrimitive, RawSymbol};
pub use crate::error::{ConfigError, FrameError, ResolutionError};
pub use crate::pace::{CancelFlag, Sleeper};
pub use crate::resolve::{InventoryLookup, InventoryStatus, ProductRecord, QrContent, Resolution};
pub use crate::transport::{HttpFault, HttpGet, HttpReply};
