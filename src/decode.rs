// src/decode.rs
//
// Примитив декодирования: внешняя способность, от которой зависит поиск.
// Ядро не знает, как именно декодер находит символы, — только вызывает его
// на каждом подготовленном буфере.

use image::GrayImage;

use crate::core::types::{BoundingBox, Symbology};

/// Сырой символ от декодера. `symbology == None` — декодер не знает тип.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSymbol {
    pub symbology: Option<Symbology>,
    pub payload: Vec<u8>,
    pub bbox: BoundingBox,
}

impl RawSymbol {
    #[inline]
    pub fn new(symbology: Option<Symbology>, payload: impl Into<Vec<u8>>, bbox: BoundingBox) -> Self {
        Self {
            symbology,
            payload: payload.into(),
            bbox,
        }
    }
}

/// Декодер штрих-кодов на одном 8-битном буфере.
///
/// Вызывается для каждой комбинации поворота и полярности, поэтому не должен
/// иметь побочных эффектов. `Send + Sync` — ячейки сетки могут
/// декодироваться параллельно.
pub trait DecodePrimitive: Send + Sync {
    fn decode(&self, image: &GrayImage) -> Vec<RawSymbol>;
}

impl<T: DecodePrimitive + ?Sized> DecodePrimitive for Box<T> {
    #[inline]
    fn decode(&self, image: &GrayImage) -> Vec<RawSymbol> {
        (**self).decode(image)
    }
}

impl<T: DecodePrimitive + ?Sized> DecodePrimitive for std::sync::Arc<T> {
    #[inline]
    fn decode(&self, image: &GrayImage) -> Vec<RawSymbol> {
        (**self).decode(image)
    }
}

/// Несколько декодеров по очереди; результаты склеиваются в порядке регистрации.
#[derive(Default)]
pub struct CompositeDecoder {
    decoders: Vec<Box<dyn DecodePrimitive>>,
}

impl CompositeDecoder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, decoder: impl DecodePrimitive + 'static) -> Self {
        self.decoders.push(Box::new(decoder));
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl DecodePrimitive for CompositeDecoder {
    fn decode(&self, image: &GrayImage) -> Vec<RawSymbol> {
        self.decoders.iter().flat_map(|d| d.decode(image)).collect()
    }
}
