// src/validate.rs
//
// Проверка кандидатов и классификация по форме строки.
//
// Приоритет символик: правило «13 цифр → EAN13, 12 цифр → UPC_A» сильнее
// тега, который сообщил декодер. Строгий тег (EAN13, UPC_A, CODE39), не
// прошедший своё правило, отбрасывает кандидата; переклассифицируются только
// строки без тега или с нестрогим тегом.

use tracing::debug;

use crate::core::types::{DecodeCandidate, Symbology, ValidatedBarcode};
use crate::error::ResolutionError;

/// Минимальная сторона рамки по умолчанию, px.
pub const DEFAULT_MIN_BOX_SIZE: u32 = 100;

/// Тип по форме строки: EAN13 → UPC_A → CODE39 → CODE128 (фоллбэк).
pub fn classify(payload: &str) -> Symbology {
    if is_digits(payload, 13) {
        Symbology::Ean13
    } else if is_digits(payload, 12) {
        Symbology::UpcA
    } else if !payload.is_empty() && payload.chars().all(is_code39_char) {
        Symbology::Code39
    } else {
        Symbology::Code128
    }
}

/// Структурное правило символики.
pub fn satisfies(symbology: &Symbology, payload: &str) -> bool {
    match symbology {
        Symbology::Ean13 => is_digits(payload, 13),
        Symbology::UpcA => is_digits(payload, 12),
        Symbology::Code39 => !payload.is_empty() && payload.chars().all(is_code39_char),
        Symbology::Code128 | Symbology::QrCode | Symbology::Other(_) => !payload.is_empty(),
    }
}

/// Итоговая символика для полученной строки и (возможно) тега декодера.
pub fn effective_symbology(declared: Option<&Symbology>, payload: &str) -> Symbology {
    match classify(payload) {
        digits @ (Symbology::Ean13 | Symbology::UpcA) => digits,
        shape => match declared {
            Some(tag) if satisfies(tag, payload) => tag.clone(),
            _ => shape,
        },
    }
}

/// Тег со структурным правилом, нарушение которого — брак декодирования.
fn is_strict(symbology: &Symbology) -> bool {
    matches!(symbology, Symbology::Ean13 | Symbology::UpcA | Symbology::Code39)
}

/// Строгая проверка для входа `resolve`: явный тег, не прошедший своё
/// правило, — ошибка ввода, а не повод угадывать.
pub fn validate_payload(
    payload: &str,
    declared: Option<Symbology>,
) -> Result<ValidatedBarcode, ResolutionError> {
    let invalid = |reason: &str| ResolutionError::InvalidInput {
        barcode: payload.to_owned(),
        symbology: declared.clone(),
        reason: reason.to_owned(),
    };
    if payload.trim().is_empty() {
        return Err(invalid("empty payload"));
    }
    if let Some(tag) = &declared {
        if !satisfies(tag, payload) && !matches!(classify(payload), Symbology::Ean13 | Symbology::UpcA) {
            return Err(invalid(rule_text(tag)));
        }
    }
    let symbology = effective_symbology(declared.as_ref(), payload);
    Ok(ValidatedBarcode::new(payload.to_owned(), symbology))
}

fn rule_text(symbology: &Symbology) -> &'static str {
    match symbology {
        Symbology::Ean13 => "EAN13 requires exactly 13 decimal digits",
        Symbology::UpcA => "UPC_A requires exactly 12 decimal digits",
        Symbology::Code39 => "CODE39 allows only 0-9, A-Z, space and - . $ / + %",
        _ => "payload must not be empty",
    }
}

#[inline]
fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

#[inline]
fn is_code39_char(c: char) -> bool {
    c.is_ascii_digit()
        || c.is_ascii_uppercase()
        || c.is_ascii_whitespace()
        || matches!(c, '-' | '.' | '$' | '/' | '+' | '%')
}

/// Фильтр кандидатов поиска по размеру рамки и структуре.
#[derive(Clone, Copy, Debug)]
pub struct BarcodeValidator {
    min_box_size: u32,
}

impl Default for BarcodeValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BOX_SIZE)
    }
}

impl BarcodeValidator {
    #[inline]
    pub const fn new(min_box_size: u32) -> Self {
        Self { min_box_size }
    }

    #[inline]
    pub fn min_box_size(&self) -> u32 {
        self.min_box_size
    }

    pub fn validate(&self, candidate: &DecodeCandidate) -> Option<ValidatedBarcode> {
        if candidate.bbox.min_side() < self.min_box_size {
            debug!(bbox = ?candidate.bbox, floor = self.min_box_size, "candidate too small");
            return None;
        }
        let Ok(payload) = std::str::from_utf8(&candidate.payload) else {
            debug!("candidate payload is not UTF-8");
            return None;
        };
        if payload.trim().is_empty() {
            return None;
        }
        if let Some(tag) = candidate.symbology.as_ref().filter(|t| is_strict(t)) {
            let digit_shape = matches!(classify(payload), Symbology::Ean13 | Symbology::UpcA);
            if !digit_shape && !satisfies(tag, payload) {
                debug!(declared = %tag, "candidate breaks declared symbology rule");
                return None;
            }
        }
        let symbology = effective_symbology(candidate.symbology.as_ref(), payload);
        if !satisfies(&symbology, payload) {
            return None;
        }
        Some(ValidatedBarcode::new(payload.to_owned(), symbology).with_source(candidate.source.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BoundingBox, CandidateSource, Polarity, Rotation};

    fn candidate(sym: Option<Symbology>, payload: &str, w: u32, h: u32) -> DecodeCandidate {
        DecodeCandidate {
            symbology: sym,
            payload: payload.as_bytes().to_vec(),
            bbox: BoundingBox::new(0, 0, w, h),
            source: CandidateSource {
                variant: "otsu".into(),
                rotation: Rotation::Rot0,
                polarity: Polarity::Normal,
            },
        }
    }

    #[test]
    fn classify_by_shape() {
        assert_eq!(classify("5901234123457"), Symbology::Ean13);
        assert_eq!(classify("036000291452"), Symbology::UpcA);
        assert_eq!(classify("ABC-123 $/+%."), Symbology::Code39);
        assert_eq!(classify("12345678"), Symbology::Code39);
        assert_eq!(classify("abc123"), Symbology::Code128);
        assert_eq!(classify("ABC_1"), Symbology::Code128);
        assert_eq!(classify(""), Symbology::Code128);
    }

    #[test]
    fn every_13_digit_string_is_ean13() {
        let mut x: u64 = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..500 {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            let payload = format!("{:013}", x % 10_000_000_000_000);
            let c = candidate(None, &payload, 120, 120);
            let v = BarcodeValidator::default().validate(&c).expect("accepted");
            assert_eq!(v.symbology(), &Symbology::Ean13);
        }
    }

    #[test]
    fn non_code39_non_digit_falls_to_code128() {
        for p in ["abc", "A_B", "Ünï", "12a", "x/y", "TAB\u{7f}"] {
            assert_eq!(classify(p), Symbology::Code128, "{p}");
        }
    }

    #[test]
    fn digit_shape_beats_decoder_tag() {
        let c = candidate(Some(Symbology::Code128), "5901234123457", 150, 150);
        let v = BarcodeValidator::default().validate(&c).unwrap();
        assert_eq!(v.symbology(), &Symbology::Ean13);
    }

    #[test]
    fn loose_or_missing_tag_is_reclassified() {
        let v = BarcodeValidator::default();
        let c = candidate(Some(Symbology::QrCode), "hello", 150, 150);
        assert_eq!(v.validate(&c).unwrap().symbology(), &Symbology::QrCode);

        let c = candidate(Some(Symbology::Code128), "ABC-1", 150, 150);
        assert_eq!(v.validate(&c).unwrap().symbology(), &Symbology::Code128);

        let c = candidate(None, "ABC-1", 150, 150);
        assert_eq!(v.validate(&c).unwrap().symbology(), &Symbology::Code39);

        let c = candidate(Some(Symbology::Other("PDF417".into())), "lower", 150, 150);
        assert_eq!(
            v.validate(&c).unwrap().symbology(),
            &Symbology::Other("PDF417".into())
        );
    }

    #[test]
    fn strict_tag_that_breaks_its_rule_is_rejected() {
        let v = BarcodeValidator::default();
        assert!(v.validate(&candidate(Some(Symbology::Ean13), "ABC-1", 200, 200)).is_none());
        assert!(v.validate(&candidate(Some(Symbology::UpcA), "12345", 200, 200)).is_none());
        assert!(v.validate(&candidate(Some(Symbology::Code39), "lower", 200, 200)).is_none());

        // тот же вход на пути resolve — ошибка ввода
        assert!(matches!(
            validate_payload("ABC-1", Some(Symbology::Ean13)),
            Err(ResolutionError::InvalidInput { .. })
        ));

        // правило цифр по-прежнему сильнее тега
        let ok = v.validate(&candidate(Some(Symbology::Ean13), "036000291452", 200, 200));
        assert_eq!(ok.unwrap().symbology(), &Symbology::UpcA);
    }

    #[test]
    fn small_or_garbage_candidates_are_dropped() {
        let v = BarcodeValidator::default();
        assert!(v.validate(&candidate(None, "5901234123457", 300, 40)).is_none());
        assert!(v.validate(&candidate(None, "   ", 300, 300)).is_none());
        let mut bad = candidate(None, "x", 300, 300);
        bad.payload = vec![0xff, 0xfe];
        assert!(v.validate(&bad).is_none());
    }

    #[test]
    fn strict_validation_for_resolve() {
        let ok = validate_payload("036000291452", None).unwrap();
        assert_eq!(ok.symbology(), &Symbology::UpcA);

        let err = validate_payload("12AB", Some(Symbology::Ean13)).unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidInput { .. }));

        let err = validate_payload("", None).unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidInput { symbology: None, .. }));

        // тег CODE128 у 13 цифр не ошибка: побеждает форма
        let v = validate_payload("5901234123457", Some(Symbology::Code128)).unwrap();
        assert_eq!(v.symbology(), &Symbology::Ean13);
    }
}
