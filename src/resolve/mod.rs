// src/resolve/mod.rs
//
// Разрешение штрих-кода в товар. Каждой символике соответствует одна
// стратегия из закрытого набора; выбор — исчерпывающий `match`.

pub mod catalog;
pub mod inventory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{CatalogConfig, Code128Fallback};
use crate::core::types::{Symbology, ValidatedBarcode};
use crate::error::ResolutionError;
use crate::transport::{FetchFailure, ResilientTransport};
use crate::validate::validate_payload;

pub use catalog::{ProductRecord, Provider, UNKNOWN};
pub use inventory::{InventoryLookup, InventoryState, InventoryStatus, UnimplementedInventory};

/// Стратегия разрешения.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Один запрос к каталогу EAN-13.
    Ean13,
    /// Дописать ведущий `0` и разрешать как EAN-13.
    UpcA,
    /// Цепочка каталогов по порядку.
    Code128,
    /// Без сети: ссылка или текст.
    QrCode,
    /// Складской учёт.
    Code39,
    Unsupported,
}

impl Strategy {
    pub fn for_symbology(symbology: &Symbology) -> Self {
        match symbology {
            Symbology::Ean13 => Self::Ean13,
            Symbology::UpcA => Self::UpcA,
            Symbology::Code128 => Self::Code128,
            Symbology::QrCode => Self::QrCode,
            Symbology::Code39 => Self::Code39,
            Symbology::Other(_) => Self::Unsupported,
        }
    }
}

/// Содержимое QR-кода.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QrContent {
    Url { url: String, protocol: String },
    Text { text: String },
}

impl QrContent {
    /// `http://` и `https://` (без учёта регистра) — ссылка, прочее — текст.
    pub fn from_payload(payload: &str) -> Self {
        for protocol in ["https", "http"] {
            let prefix_len = protocol.len() + 3;
            let is_url = payload
                .get(..prefix_len)
                .is_some_and(|p| p.eq_ignore_ascii_case(&format!("{protocol}://")));
            if is_url {
                return Self::Url {
                    url: payload.to_owned(),
                    protocol: protocol.to_owned(),
                };
            }
        }
        Self::Text {
            text: payload.to_owned(),
        }
    }
}

/// Успешный ответ `resolve`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    Product(ProductRecord),
    Content(QrContent),
    Inventory(InventoryStatus),
}

pub struct ProductResolver {
    transport: ResilientTransport,
    catalog: CatalogConfig,
    inventory: Arc<dyn InventoryLookup>,
}

impl ProductResolver {
    pub fn new(
        transport: ResilientTransport,
        catalog: CatalogConfig,
        inventory: Arc<dyn InventoryLookup>,
    ) -> Self {
        Self {
            transport,
            catalog,
            inventory,
        }
    }

    /// Строгая проверка строки, затем разрешение.
    pub fn resolve_payload(
        &self,
        payload: &str,
        declared: Option<Symbology>,
    ) -> Result<Resolution, ResolutionError> {
        let barcode = validate_payload(payload, declared)?;
        self.resolve(&barcode)
    }

    pub fn resolve(&self, barcode: &ValidatedBarcode) -> Result<Resolution, ResolutionError> {
        let payload = barcode.payload();
        let strategy = Strategy::for_symbology(barcode.symbology());
        debug!(payload, symbology = %barcode.symbology(), ?strategy, "resolving");
        match strategy {
            Strategy::Ean13 => self.lookup_chain(
                payload,
                Symbology::Ean13,
                &self.catalog.ean13_providers,
                Code128Fallback::NotFoundOnly,
            ),
            Strategy::UpcA => {
                let ean = format!("0{payload}");
                self.lookup_chain(
                    &ean,
                    Symbology::Ean13,
                    &self.catalog.ean13_providers,
                    Code128Fallback::NotFoundOnly,
                )
            }
            Strategy::Code128 => self.lookup_chain(
                payload,
                Symbology::Code128,
                &self.catalog.code128_providers,
                self.catalog.code128_fallback,
            ),
            Strategy::QrCode => Ok(Resolution::Content(QrContent::from_payload(payload))),
            Strategy::Code39 => self.inventory.lookup(barcode).map(Resolution::Inventory),
            Strategy::Unsupported => Err(ResolutionError::UnsupportedSymbology {
                barcode: payload.to_owned(),
                symbology: barcode.symbology().clone(),
                supported: Symbology::SUPPORTED.to_vec(),
            }),
        }
    }

    /// Опросить источники по порядку до первого ответа, отличного от «не найдено».
    fn lookup_chain(
        &self,
        barcode: &str,
        symbology: Symbology,
        providers: &[Provider],
        fallback: Code128Fallback,
    ) -> Result<Resolution, ResolutionError> {
        let mut tried = Vec::with_capacity(providers.len());
        let mut first_failure = None;
        for provider in providers {
            tried.push(provider.name.clone());
            let url = provider.url_for(barcode);
            debug!(provider = %provider.name, %url, "querying catalog");
            let failure = match self.transport.request(&url) {
                Ok(product) => {
                    let record = ProductRecord::from_catalog(barcode, symbology.clone(), &provider.name, product);
                    info!(barcode, provider = %provider.name, product = %record.product_name, "product resolved");
                    return Ok(Resolution::Product(record));
                }
                Err(FetchFailure::NotFound) => {
                    debug!(barcode, provider = %provider.name, "not in catalog");
                    continue;
                }
                Err(failure) => failure,
            };
            let err = fetch_error(barcode, &symbology, &provider.name, failure);
            if matches!(err, ResolutionError::Cancelled { .. }) {
                return Err(err);
            }
            match fallback {
                Code128Fallback::NotFoundOnly => return Err(err),
                Code128Fallback::AnyFailure => {
                    warn!(barcode, provider = %provider.name, error = %err, "provider failed, trying next");
                    first_failure.get_or_insert(err);
                }
            }
        }
        Err(first_failure.unwrap_or(ResolutionError::NotFound {
            barcode: barcode.to_owned(),
            symbology,
            providers: tried,
        }))
    }
}

fn fetch_error(barcode: &str, symbology: &Symbology, provider: &str, failure: FetchFailure) -> ResolutionError {
    let barcode = barcode.to_owned();
    let symbology = symbology.clone();
    let provider = provider.to_owned();
    match failure {
        FetchFailure::NotFound => ResolutionError::NotFound {
            barcode,
            symbology,
            providers: vec![provider],
        },
        FetchFailure::Timeout { attempts } => ResolutionError::Timeout {
            barcode,
            symbology,
            provider,
            attempts,
        },
        FetchFailure::Connection { attempts, message } => ResolutionError::ConnectionFailure {
            barcode,
            symbology,
            provider,
            attempts,
            reason: message,
        },
        FetchFailure::RateLimited { attempts } => ResolutionError::RateLimited {
            barcode,
            symbology,
            provider,
            attempts,
        },
        FetchFailure::UnexpectedStatus { status, attempts } => ResolutionError::UnexpectedStatus {
            barcode,
            symbology,
            provider,
            status,
            attempts,
        },
        FetchFailure::Cancelled => ResolutionError::Cancelled { barcode, symbology },
    }
}
