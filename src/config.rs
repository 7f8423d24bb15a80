// src/config.rs
//
// Конфигурация сканера. Все поля необязательны в JSON: пропущенное берётся
// из значений по умолчанию.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::acquire::condition::ConditioningPlan;
use crate::error::ConfigError;
use crate::one_d::DecodeOptions;
use crate::resolve::catalog::Provider;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub acquisition: AcquisitionConfig,
    pub decoder: DecodeOptions,
    pub transport: TransportConfig,
    pub catalog: CatalogConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Минимальный интервал между удачными сканами, мс.
    pub scan_interval_ms: u64,
    /// Пауза между вариантами предобработки, мс.
    pub inter_attempt_delay_ms: u64,
    /// Кадры уже этого апскейлятся, px.
    pub min_frame_width: u32,
    /// Потолок увеличения узкого кадра, раз.
    pub max_upscale: f32,
    /// Минимальная сторона рамки кандидата, px.
    pub min_box_size: u32,
    /// Декодировать 8 ячеек сетки параллельно (rayon).
    pub parallel_grid: bool,
    pub plan: ConditioningPlan,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 2_000,
            inter_attempt_delay_ms: 1_000,
            min_frame_width: crate::acquire::normalize::DEFAULT_MIN_WIDTH,
            max_upscale: crate::acquire::normalize::DEFAULT_MAX_UPSCALE,
            min_box_size: crate::validate::DEFAULT_MIN_BOX_SIZE,
            parallel_grid: false,
            plan: ConditioningPlan::default(),
        }
    }
}

impl AcquisitionConfig {
    #[inline]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    #[inline]
    pub fn inter_attempt_delay(&self) -> Duration {
        Duration::from_millis(self.inter_attempt_delay_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub max_attempts: u32,
    pub timeout_ms: u64,
    /// Пауза перед повтором, если сервер не прислал `Retry-After`.
    pub retry_delay_ms: u64,
    /// Больший `Retry-After` не ждём: сразу `RateLimited`.
    pub max_retry_after_ms: u64,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout_ms: 5_000,
            retry_delay_ms: 1_000,
            max_retry_after_ms: 60_000,
            user_agent: concat!("ultrascan/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl TransportConfig {
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[inline]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    #[inline]
    pub fn max_retry_after(&self) -> Duration {
        Duration::from_millis(self.max_retry_after_ms)
    }
}

/// Что делать в цепочке CODE128, когда источник окончательно упал
/// (таймаут, соединение, 429, неожиданный статус).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code128Fallback {
    /// Дальше идём только после «не найдено»; сбой возвращается сразу.
    #[default]
    NotFoundOnly,
    /// Идём дальше после любой неудачи; если никто не ответил товаром,
    /// возвращается первый сбой (или NotFound, если сбоев не было).
    AnyFailure,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub ean13_providers: Vec<Provider>,
    pub code128_providers: Vec<Provider>,
    pub code128_fallback: Code128Fallback,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ean13_providers: vec![Provider::open_food_facts()],
            code128_providers: vec![Provider::open_food_facts(), Provider::open_products_facts()],
            code128_fallback: Code128Fallback::default(),
        }
    }
}

impl ScannerConfig {
    /// Прочитать JSON-файл и проверить значения.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.max_attempts == 0 {
            return Err(ConfigError::Invalid("transport.max_attempts must be at least 1".into()));
        }
        if self.transport.timeout_ms == 0 {
            return Err(ConfigError::Invalid("transport.timeout_ms must be positive".into()));
        }
        if self.acquisition.plan.is_empty() {
            return Err(ConfigError::Invalid("acquisition.plan must not be empty".into()));
        }
        if self.acquisition.min_frame_width == 0 {
            return Err(ConfigError::Invalid("acquisition.min_frame_width must be positive".into()));
        }
        let cap = self.acquisition.max_upscale;
        if cap.is_nan() || cap < 1.0 {
            return Err(ConfigError::Invalid("acquisition.max_upscale must be at least 1".into()));
        }
        let catalog = &self.catalog;
        for (section, list) in [
            ("catalog.ean13_providers", &catalog.ean13_providers),
            ("catalog.code128_providers", &catalog.code128_providers),
        ] {
            if list.is_empty() {
                return Err(ConfigError::Invalid(format!("{section} must not be empty")));
            }
            if let Some(p) = list.iter().find(|p| !p.url_template.contains("{barcode}")) {
                return Err(ConfigError::Invalid(format!(
                    "{section}: url_template of {} has no {{barcode}} placeholder",
                    p.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ScannerConfig::default();
        assert_eq!(c.acquisition.scan_interval(), Duration::from_secs(2));
        assert_eq!(c.acquisition.min_box_size, 100);
        assert_eq!(c.transport.max_attempts, 3);
        assert_eq!(c.transport.timeout(), Duration::from_secs(5));
        assert_eq!(c.transport.max_retry_after(), Duration::from_secs(60));
        assert_eq!(c.acquisition.max_upscale, 4.0);
        assert_eq!(c.catalog.code128_providers.len(), 2);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{"transport":{"max_attempts":5},"catalog":{"code128_fallback":"any_failure"}}"#;
        let c: ScannerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.transport.max_attempts, 5);
        assert_eq!(c.transport.retry_delay_ms, 1_000);
        assert_eq!(c.catalog.code128_fallback, Code128Fallback::AnyFailure);
        assert_eq!(c.catalog.ean13_providers, vec![Provider::open_food_facts()]);
    }

    #[test]
    fn rejects_bad_values() {
        let mut c = ScannerConfig::default();
        c.catalog.ean13_providers = vec![Provider::new("x", "https://x/api")];
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));

        let mut c = ScannerConfig::default();
        c.transport.max_attempts = 0;
        assert!(c.validate().is_err());

        let mut c = ScannerConfig::default();
        c.acquisition.max_upscale = 0.5;
        assert!(c.validate().is_err());
        c.acquisition.max_upscale = f32::NAN;
        assert!(c.validate().is_err());
    }

    #[test]
    fn load_reports_path_on_failure() {
        let err = ScannerConfig::load(Path::new("/nonexistent/ultrascan.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ultrascan.json"));
    }
}
