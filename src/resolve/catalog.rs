// src/resolve/catalog.rs
//
// Источники каталога и итоговая запись о товаре.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::core::types::Symbology;
use crate::transport::CatalogProduct;

/// Значение для отсутствующих полей каталога.
pub const UNKNOWN: &str = "Unknown";

/// Непечатаемое и всё кроме unreserved (RFC 3986) кодируется.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Источник: имя для сообщений и шаблон URL с `{barcode}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub url_template: String,
}

impl Provider {
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
        }
    }

    pub fn open_food_facts() -> Self {
        Self::new(
            "openfoodfacts",
            "https://world.openfoodfacts.org/api/v0/product/{barcode}.json",
        )
    }

    pub fn open_products_facts() -> Self {
        Self::new(
            "openproductsfacts",
            "https://world.openproductsfacts.org/api/v0/product/{barcode}.json",
        )
    }

    /// URL запроса; штрих-код кодируется как сегмент пути.
    pub fn url_for(&self, barcode: &str) -> String {
        let encoded = utf8_percent_encode(barcode, PATH_SEGMENT).to_string();
        self.url_template.replace("{barcode}", &encoded)
    }
}

/// Найденный товар.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub barcode: String,
    pub symbology: Symbology,
    pub company: String,
    pub product_name: String,
    pub category: String,
    pub image_url: Option<String>,
    pub provider: String,
}

impl ProductRecord {
    pub fn from_catalog(
        barcode: &str,
        symbology: Symbology,
        provider: &str,
        product: CatalogProduct,
    ) -> Self {
        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_owned());
        Self {
            barcode: barcode.to_owned(),
            symbology,
            company: or_unknown(product.brands),
            product_name: or_unknown(product.product_name),
            category: or_unknown(product.categories),
            image_url: product.image_url,
            provider: provider.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barcode_is_percent_encoded_into_path() {
        let p = Provider::new("t", "https://h/api/{barcode}.json");
        assert_eq!(p.url_for("5901234123457"), "https://h/api/5901234123457.json");
        assert_eq!(p.url_for("A B/1"), "https://h/api/A%20B%2F1.json");
        assert_eq!(p.url_for("x-1._~"), "https://h/api/x-1._~.json");
    }

    #[test]
    fn missing_fields_become_unknown() {
        let r = ProductRecord::from_catalog(
            "abc123",
            Symbology::Code128,
            "openproductsfacts",
            CatalogProduct {
                brands: Some("Acme".into()),
                ..CatalogProduct::default()
            },
        );
        assert_eq!(r.company, "Acme");
        assert_eq!(r.product_name, UNKNOWN);
        assert_eq!(r.category, UNKNOWN);
        assert_eq!(r.image_url, None);
    }
}
