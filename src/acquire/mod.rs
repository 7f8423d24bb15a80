// src/acquire/mod.rs
//
// Получение штрих-кода из кадра: нормализация → варианты → поиск по сетке.

pub mod condition;
pub mod normalize;
pub mod search;

pub use condition::{Conditioned, ConditioningPlan, ConditioningVariant};
pub use normalize::FrameNormalizer;
pub use search::{orient, GeometricSearch, GRID};
