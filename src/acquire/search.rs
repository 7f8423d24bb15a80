//! Геометрический поиск: вариант × поворот × полярность.
//!
//! Для каждого варианта собираются кандидаты со всех 8 ячеек сетки
//! (повороты 0/90/180/270, для каждого — прямая и инвертированная полярность),
//! затем первый валидный в порядке сетки побеждает. Если вариант ничего не
//! дал, ждём фиксированную паузу и переходим к следующему.

use std::time::Duration;

use image::imageops;
use image::GrayImage;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::acquire::condition::ConditioningPlan;
use crate::core::types::{
    CandidateSource, DecodeCandidate, Polarity, Rotation, ValidatedBarcode,
};
use crate::decode::DecodePrimitive;
use crate::pace::{CancelFlag, Sleeper};
use crate::validate::BarcodeValidator;

/// Порядок ячеек сетки: сначала поворот, внутри — полярность.
pub const GRID: [(Rotation, Polarity); 8] = [
    (Rotation::Rot0, Polarity::Normal),
    (Rotation::Rot0, Polarity::Inverted),
    (Rotation::Rot90, Polarity::Normal),
    (Rotation::Rot90, Polarity::Inverted),
    (Rotation::Rot180, Polarity::Normal),
    (Rotation::Rot180, Polarity::Inverted),
    (Rotation::Rot270, Polarity::Normal),
    (Rotation::Rot270, Polarity::Inverted),
];

pub struct GeometricSearch<'a> {
    pub decoder: &'a dyn DecodePrimitive,
    pub validator: &'a BarcodeValidator,
    pub sleeper: &'a dyn Sleeper,
    pub inter_attempt_delay: Duration,
    pub parallel: bool,
    pub cancel: Option<&'a CancelFlag>,
}

impl GeometricSearch<'_> {
    /// Перебрать план до первого валидного штрих-кода.
    pub fn run(&self, frame: &GrayImage, plan: &ConditioningPlan) -> Option<ValidatedBarcode> {
        let total = plan.len();
        for (attempt, conditioned) in plan.variants(frame).enumerate() {
            if self.cancelled() {
                debug!(attempt, "acquisition cancelled");
                return None;
            }
            let candidates = self.scan_variant(&conditioned.image, conditioned.variant);
            debug!(
                variant = conditioned.variant,
                degraded = conditioned.degraded,
                candidates = candidates.len(),
                "variant scanned"
            );
            if let Some(found) = candidates.iter().find_map(|c| self.validator.validate(c)) {
                info!(
                    payload = found.payload(),
                    symbology = %found.symbology(),
                    variant = conditioned.variant,
                    "barcode acquired"
                );
                return Some(found);
            }
            if attempt + 1 < total {
                self.sleeper.sleep(self.inter_attempt_delay);
            }
        }
        None
    }

    /// Все кандидаты одного варианта в порядке сетки.
    pub fn scan_variant(&self, image: &GrayImage, variant: &'static str) -> Vec<DecodeCandidate> {
        let cell = |&(rotation, polarity): &(Rotation, Polarity)| {
            let buffer = orient(image, rotation, polarity);
            self.decoder
                .decode(&buffer)
                .into_iter()
                .map(|raw| DecodeCandidate {
                    symbology: raw.symbology,
                    payload: raw.payload,
                    bbox: raw.bbox,
                    source: CandidateSource {
                        variant: variant.to_owned(),
                        rotation,
                        polarity,
                    },
                })
                .collect::<Vec<_>>()
        };
        let per_cell: Vec<Vec<DecodeCandidate>> = if self.parallel {
            // collect() у индексированного par_iter сохраняет порядок ячеек
            GRID.par_iter().map(cell).collect()
        } else {
            GRID.iter().map(cell).collect()
        };
        per_cell.into_iter().flatten().collect()
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelFlag::is_cancelled)
    }
}

/// Повернуть по часовой и при необходимости инвертировать.
pub fn orient(image: &GrayImage, rotation: Rotation, polarity: Polarity) -> GrayImage {
    let mut out = match rotation {
        Rotation::Rot0 => image.clone(),
        Rotation::Rot90 => imageops::rotate90(image),
        Rotation::Rot180 => imageops::rotate180(image),
        Rotation::Rot270 => imageops::rotate270(image),
    };
    if polarity == Polarity::Inverted {
        imageops::invert(&mut out);
    }
    out
}
