// src/api.rs
//
// Верхнеуровневый API: кадр → штрих-код → товар.
// `Scanner` собирается билдером; любой шов (декодер, HTTP, ожидание,
// склад) можно подменить, остальное берётся из конфигурации.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::acquire::{FrameNormalizer, GeometricSearch};
use crate::config::ScannerConfig;
use crate::core::types::{Frame, ScanCadence, Symbology, ValidatedBarcode};
use crate::decode::{CompositeDecoder, DecodePrimitive};
use crate::error::{ConfigError, ResolutionError};
use crate::one_d::ScanlineDecoder;
use crate::pace::{CancelFlag, Sleeper, ThreadSleeper};
use crate::qr::QrDecoder;
use crate::resolve::{InventoryLookup, ProductResolver, Resolution, UnimplementedInventory};
use crate::transport::{HttpGet, ReqwestHttp, ResilientTransport, RetryPolicy};
use crate::validate::BarcodeValidator;

/// Итог `acquire_paced`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// С прошлого удачного скана не прошёл интервал; кадр не смотрели.
    Throttled,
    NothingFound,
    Found(ValidatedBarcode),
}

pub struct Scanner {
    config: ScannerConfig,
    normalizer: FrameNormalizer,
    validator: BarcodeValidator,
    decoder: Box<dyn DecodePrimitive>,
    sleeper: Arc<dyn Sleeper>,
    resolver: ProductResolver,
    cancel: CancelFlag,
}

impl Scanner {
    #[inline]
    pub fn builder(config: ScannerConfig) -> ScannerBuilder {
        ScannerBuilder::new(config)
    }

    /// Сканер со встроенными декодерами и HTTP-клиентом reqwest.
    pub fn new(config: ScannerConfig) -> Result<Self, ConfigError> {
        ScannerBuilder::new(config).build()
    }

    #[inline]
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Флаг отмены, общий для поиска и сетевых повторов.
    #[inline]
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Пустая каденция с интервалом из конфигурации.
    #[inline]
    pub fn cadence(&self) -> ScanCadence {
        ScanCadence::new(self.config.acquisition.scan_interval())
    }

    /// Найти один проверенный штрих-код на кадре. `None` — все варианты
    /// предобработки исчерпаны (или поиск отменён).
    pub fn acquire(&self, frame: &Frame<'_>) -> Option<ValidatedBarcode> {
        let acq = &self.config.acquisition;
        let image = self.normalizer.normalize(frame);
        let search = GeometricSearch {
            decoder: self.decoder.as_ref(),
            validator: &self.validator,
            sleeper: self.sleeper.as_ref(),
            inter_attempt_delay: acq.inter_attempt_delay(),
            parallel: acq.parallel_grid,
            cancel: Some(&self.cancel),
        };
        let found = search.run(&image, &acq.plan);
        if found.is_none() {
            warn!(
                width = frame.width(),
                height = frame.height(),
                variants = acq.plan.len(),
                "no barcode found in frame"
            );
        }
        found
    }

    /// `acquire` с учётом интервала между сканами. Каденция обновляется
    /// только после удачи.
    pub fn acquire_paced(
        &self,
        frame: &Frame<'_>,
        cadence: ScanCadence,
        now: Instant,
    ) -> (AcquireOutcome, ScanCadence) {
        if !cadence.is_due(now) {
            debug!("scan interval not elapsed, frame skipped");
            return (AcquireOutcome::Throttled, cadence);
        }
        match self.acquire(frame) {
            Some(found) => (AcquireOutcome::Found(found), cadence.scanned_at(now)),
            None => (AcquireOutcome::NothingFound, cadence),
        }
    }

    /// Разрешить строку; `declared` — символика, если её сообщил источник.
    pub fn resolve(
        &self,
        payload: &str,
        declared: Option<Symbology>,
    ) -> Result<Resolution, ResolutionError> {
        self.resolver.resolve_payload(payload, declared)
    }

    pub fn resolve_barcode(&self, barcode: &ValidatedBarcode) -> Result<Resolution, ResolutionError> {
        self.resolver.resolve(barcode)
    }
}

pub struct ScannerBuilder {
    config: ScannerConfig,
    decoder: Option<Box<dyn DecodePrimitive>>,
    http: Option<Arc<dyn HttpGet>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    inventory: Option<Arc<dyn InventoryLookup>>,
    cancel: Option<CancelFlag>,
}

impl ScannerBuilder {
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            decoder: None,
            http: None,
            sleeper: None,
            inventory: None,
            cancel: None,
        }
    }

    #[must_use]
    pub fn decoder(mut self, decoder: impl DecodePrimitive + 'static) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    #[must_use]
    pub fn http(mut self, http: Arc<dyn HttpGet>) -> Self {
        self.http = Some(http);
        self
    }

    #[must_use]
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    #[must_use]
    pub fn inventory(mut self, inventory: Arc<dyn InventoryLookup>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    #[must_use]
    pub fn cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn build(self) -> Result<Scanner, ConfigError> {
        let config = self.config;
        config.validate()?;

        let decoder = self.decoder.unwrap_or_else(|| {
            Box::new(
                CompositeDecoder::new()
                    .with(ScanlineDecoder::new(config.decoder.clone()))
                    .with(QrDecoder::new()),
            )
        });
        let http = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttp::new(&config.transport.user_agent).map_err(ConfigError::HttpClient)?),
        };
        let sleeper = self.sleeper.unwrap_or_else(|| Arc::new(ThreadSleeper));
        let inventory = self
            .inventory
            .unwrap_or_else(|| Arc::new(UnimplementedInventory));
        let cancel = self.cancel.unwrap_or_default();

        let transport = ResilientTransport::new(
            http,
            sleeper.clone(),
            RetryPolicy::new(config.transport.max_attempts, config.transport.retry_delay())
                .with_max_retry_after(config.transport.max_retry_after()),
            config.transport.timeout(),
        )
        .with_cancel(cancel.clone());
        let resolver = ProductResolver::new(transport, config.catalog.clone(), inventory);

        Ok(Scanner {
            normalizer: FrameNormalizer::new(config.acquisition.min_frame_width)
                .with_max_upscale(config.acquisition.max_upscale),
            validator: BarcodeValidator::new(config.acquisition.min_box_size),
            decoder,
            sleeper,
            resolver,
            cancel,
            config,
        })
    }
}
