// src/transport/payload.rs
//
// Распознавание ответа каталога (формат Open Food Facts v0):
// `{"status": 1, "product": {"brands": .., "product_name": .., ..}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Поля товара, которые нас интересуют. Пустые строки и `null` — `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub brands: Option<String>,
    pub product_name: Option<String>,
    pub categories: Option<String>,
    pub image_url: Option<String>,
}

/// Товар, если тело — JSON с объектом `product` и «истинным» (или
/// отсутствующим) `status`. Всё прочее — «не найдено».
pub fn recognize_product(body: &[u8]) -> Option<CatalogProduct> {
    let doc: Value = serde_json::from_slice(body).ok()?;
    if !status_ok(doc.get("status")) {
        return None;
    }
    let product = doc.get("product")?.as_object()?;
    let field = |key: &str| {
        product
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    };
    Some(CatalogProduct {
        brands: field("brands"),
        product_name: field("product_name"),
        categories: field("categories"),
        image_url: field("image_url"),
    })
}

fn status_ok(status: Option<&Value>) -> bool {
    match status {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s == "1" || s.eq_ignore_ascii_case("success") || s.eq_ignore_ascii_case("product_found")
        }
        Some(_) => false,
    }
}
