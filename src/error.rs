// src/error.rs
//
// Ошибки верхнего уровня. Всё, что может вернуться из `acquire`/`resolve`,
// описано здесь; сырые ошибки транспорта наружу не выходят.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::Symbology;

/// Некорректный входной кадр.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum FrameError {
    #[error("frame has empty dimensions {width}x{height}")]
    Empty { width: usize, height: usize },

    #[error("frame {width}x{height} is too large to address")]
    TooLarge { width: usize, height: usize },

    #[error("invalid buffer size: expected {expected}, got {actual}")]
    BufferSize { expected: usize, actual: usize },
}

/// Сбой одного варианта предобработки. Не фатален: поиск берёт исходный кадр.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConditioningError {
    #[error("cannot condition an empty {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },

    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f32 },
}

/// Ошибки загрузки конфигурации.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Типизированная ошибка разрешения штрих-кода в товар.
///
/// Каждый вариант несёт штрих-код и символику, чтобы вызывающий мог
/// показать точное сообщение без дополнительного контекста.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ResolutionError {
    #[error("{symbology} {barcode}: product not found (tried: {})", .providers.join(", "))]
    NotFound {
        barcode: String,
        symbology: Symbology,
        providers: Vec<String>,
    },

    #[error("{symbology} {barcode}: symbology is not supported (supported: {})", list(.supported))]
    UnsupportedSymbology {
        barcode: String,
        symbology: Symbology,
        supported: Vec<Symbology>,
    },

    #[error("{symbology} {barcode}: {provider} timed out after {attempts} attempt(s)")]
    Timeout {
        barcode: String,
        symbology: Symbology,
        provider: String,
        attempts: u32,
    },

    #[error("{symbology} {barcode}: connection to {provider} failed after {attempts} attempt(s): {reason}")]
    ConnectionFailure {
        barcode: String,
        symbology: Symbology,
        provider: String,
        attempts: u32,
        reason: String,
    },

    #[error("{symbology} {barcode}: {provider} kept rate limiting after {attempts} attempt(s)")]
    RateLimited {
        barcode: String,
        symbology: Symbology,
        provider: String,
        attempts: u32,
    },

    #[error("{symbology} {barcode}: {provider} answered HTTP {status} after {attempts} attempt(s)")]
    UnexpectedStatus {
        barcode: String,
        symbology: Symbology,
        provider: String,
        status: u16,
        attempts: u32,
    },

    #[error("invalid barcode {barcode:?} ({}): {reason}", opt(.symbology.as_ref()))]
    InvalidInput {
        barcode: String,
        symbology: Option<Symbology>,
        reason: String,
    },

    #[error("{symbology} {barcode}: resolution cancelled")]
    Cancelled { barcode: String, symbology: Symbology },
}

impl ResolutionError {
    pub fn barcode(&self) -> &str {
        match self {
            Self::NotFound { barcode, .. }
            | Self::UnsupportedSymbology { barcode, .. }
            | Self::Timeout { barcode, .. }
            | Self::ConnectionFailure { barcode, .. }
            | Self::RateLimited { barcode, .. }
            | Self::UnexpectedStatus { barcode, .. }
            | Self::InvalidInput { barcode, .. }
            | Self::Cancelled { barcode, .. } => barcode,
        }
    }

    /// Временный сбой сети (после исчерпания повторов).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::ConnectionFailure { .. }
                | Self::RateLimited { .. }
                | Self::UnexpectedStatus { .. }
        )
    }
}

fn list(items: &[Symbology]) -> String {
    items
        .iter()
        .map(Symbology::name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn opt(s: Option<&Symbology>) -> &str {
    s.map_or("unclassified", Symbology::name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let e = ResolutionError::NotFound {
            barcode: "abc123".into(),
            symbology: Symbology::Code128,
            providers: vec!["openfoodfacts".into(), "openproductsfacts".into()],
        };
        assert_eq!(
            e.to_string(),
            "CODE128 abc123: product not found (tried: openfoodfacts, openproductsfacts)"
        );

        let e = ResolutionError::UnsupportedSymbology {
            barcode: "x".into(),
            symbology: Symbology::Other("PDF417".into()),
            supported: Symbology::SUPPORTED.to_vec(),
        };
        assert!(e.to_string().contains("EAN13, UPC_A, CODE128, QRCODE, CODE39"));
        assert!(!e.is_transient());
    }
}
