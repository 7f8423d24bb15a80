//! Варианты предобработки кадра перед декодированием.
//!
//! План — упорядоченный конечный набор вариантов. Порядок задаёт приоритет
//! поиска и одинаков от запуска к запуску; `ConditioningPlan::variants`
//! можно вызывать повторно, каждый раз с начала.

use image::GrayImage;
use imageproc::contrast::{adaptive_threshold, otsu_level, threshold_mut, ThresholdType};
use imageproc::filter::{gaussian_blur_f32, median_filter};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::contrast::clahe;
use crate::error::ConditioningError;

/// Один детерминированный вариант обработки.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditioningVariant {
    /// Адаптивный порог → медианное шумоподавление → CLAHE.
    AdaptiveContrast {
        block_radius: u32,
        median_radius: u32,
        clip_limit: f32,
        tile_grid: u32,
    },
    /// Глобальный порог Оцу.
    Otsu,
    /// Гауссово размытие → адаптивный порог.
    BlurAdaptive { sigma: f32, block_radius: u32 },
    /// Без изменений.
    Identity,
}

impl ConditioningVariant {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AdaptiveContrast { .. } => "adaptive_contrast",
            Self::Otsu => "otsu",
            Self::BlurAdaptive { .. } => "blur_adaptive",
            Self::Identity => "identity",
        }
    }

    /// Чистое преобразование; входной буфер не меняется.
    pub fn apply(&self, img: &GrayImage) -> Result<GrayImage, ConditioningError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(ConditioningError::EmptyImage { width, height });
        }
        match *self {
            Self::AdaptiveContrast {
                block_radius,
                median_radius,
                clip_limit,
                tile_grid,
            } => {
                positive("block_radius", block_radius as f32)?;
                positive("clip_limit", clip_limit)?;
                positive("tile_grid", tile_grid as f32)?;
                let thresholded = adaptive_threshold(img, block_radius);
                let denoised = if median_radius > 0 {
                    median_filter(&thresholded, median_radius, median_radius)
                } else {
                    thresholded
                };
                Ok(clahe(&denoised, clip_limit, tile_grid))
            }
            Self::Otsu => {
                let mut out = img.clone();
                let level = otsu_level(&out);
                threshold_mut(&mut out, level, ThresholdType::Binary);
                Ok(out)
            }
            Self::BlurAdaptive { sigma, block_radius } => {
                positive("sigma", sigma)?;
                positive("block_radius", block_radius as f32)?;
                let blurred = gaussian_blur_f32(img, sigma);
                Ok(adaptive_threshold(&blurred, block_radius))
            }
            Self::Identity => Ok(img.clone()),
        }
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConditioningError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConditioningError::InvalidParameter { name, value })
    }
}

/// Результат одного варианта. `degraded` — преобразование не удалось и
/// `image` — это исходный кадр.
#[derive(Clone, Debug)]
pub struct Conditioned {
    pub variant: &'static str,
    pub image: GrayImage,
    pub degraded: bool,
}

/// Упорядоченный набор вариантов.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditioningPlan {
    variants: Vec<ConditioningVariant>,
}

impl Default for ConditioningPlan {
    fn default() -> Self {
        Self::new(vec![
            ConditioningVariant::AdaptiveContrast {
                block_radius: 5,
                median_radius: 1,
                clip_limit: 2.0,
                tile_grid: 8,
            },
            ConditioningVariant::Otsu,
            ConditioningVariant::BlurAdaptive {
                sigma: 1.0,
                block_radius: 5,
            },
        ])
    }
}

impl ConditioningPlan {
    #[inline]
    pub fn new(variants: Vec<ConditioningVariant>) -> Self {
        Self { variants }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[ConditioningVariant] {
        &self.variants
    }

    /// Ленивая последовательность буферов в порядке приоритета.
    /// Сбой варианта — предупреждение и исходный кадр вместо результата.
    pub fn variants<'a>(&'a self, frame: &'a GrayImage) -> impl Iterator<Item = Conditioned> + 'a {
        self.variants.iter().map(move |v| match v.apply(frame) {
            Ok(image) => Conditioned {
                variant: v.name(),
                image,
                degraded: false,
            },
            Err(e) => {
                warn!(variant = v.name(), error = %e, "conditioning failed, using unmodified frame");
                Conditioned {
                    variant: v.name(),
                    image: frame.clone(),
                    degraded: true,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient() -> GrayImage {
        GrayImage::from_fn(40, 30, |x, y| Luma([(x * 5 + y) as u8]))
    }

    #[test]
    fn default_plan_is_three_ordered_variants() {
        let plan = ConditioningPlan::default();
        let img = gradient();
        let names: Vec<_> = plan.variants(&img).map(|c| c.variant).collect();
        assert_eq!(names, ["adaptive_contrast", "otsu", "blur_adaptive"]);
        // повторный проход начинается сначала
        assert_eq!(plan.variants(&img).count(), 3);
    }

    #[test]
    fn otsu_output_is_binary() {
        let out = ConditioningVariant::Otsu.apply(&gradient()).unwrap();
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn bad_parameters_degrade_to_original() {
        let plan = ConditioningPlan::new(vec![
            ConditioningVariant::BlurAdaptive {
                sigma: 0.0,
                block_radius: 5,
            },
            ConditioningVariant::Identity,
        ]);
        let img = gradient();
        let out: Vec<_> = plan.variants(&img).collect();
        assert!(out[0].degraded);
        assert_eq!(out[0].image, img);
        assert!(!out[1].degraded);
    }

    #[test]
    fn empty_image_is_an_error() {
        let img = GrayImage::new(0, 0);
        assert!(matches!(
            ConditioningVariant::Otsu.apply(&img),
            Err(ConditioningError::EmptyImage { .. })
        ));
    }

    #[test]
    fn plan_round_trips_through_json() {
        let json = r#"[{"kind":"otsu"},{"kind":"blur_adaptive","sigma":1.5,"block_radius":7}]"#;
        let plan: ConditioningPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.as_slice()[1].name(), "blur_adaptive");
    }
}
