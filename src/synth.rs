//! Синтетические штрих-коды для тестов, бенчмарков и демо-бинарей.
//!
//! Идеальные строки пикселей (чёрный = 0, белый = 255), начиная с белой тихой зоны.
//! Кадр получается повторением строки `height` раз.

use image::GrayImage;
use thiserror::Error;

use crate::one_d::code128::{self, START_A, START_B, START_C, STOP};
use crate::one_d::ean13::{self, A_PATTERNS, B_PATTERNS, C_PATTERNS, FIRST_DIGIT_MASKS};

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SynthError {
    #[error("EAN-13/UPC-A needs 12 or 13 digits, got {0:?}")]
    BadDigits(String),
    #[error("character {ch:?} cannot be encoded in Code 128 set {set}")]
    BadChar { ch: char, set: char },
    #[error("Code 128 set C needs an even number of digits")]
    OddDigits,
    #[error("module width must be at least 1 pixel")]
    ZeroUnit,
}

/// Строка EAN-13 (13 цифр) или UPC-A (12 цифр, кодируется как EAN-13 с ведущим 0).
/// Контрольная цифра пересчитывается.
pub fn ean13_row(code: &str, unit: usize) -> Result<Vec<u8>, SynthError> {
    if unit == 0 {
        return Err(SynthError::ZeroUnit);
    }
    let digits: Vec<u8> = code
        .bytes()
        .map(|c| c.is_ascii_digit().then(|| c - b'0'))
        .collect::<Option<_>>()
        .ok_or_else(|| SynthError::BadDigits(code.to_owned()))?;

    let mut full = [0u8; 13];
    match digits.len() {
        12 => full[1..].copy_from_slice(&digits),
        13 => full.copy_from_slice(&digits),
        _ => return Err(SynthError::BadDigits(code.to_owned())),
    }
    full[12] = ean13::ean13_check_digit(&full[..12]);

    let mask = FIRST_DIGIT_MASKS[usize::from(full[0])];
    let mut modules: Vec<u8> = vec![9, 1, 1, 1];
    for (i, &d) in full[1..7].iter().enumerate() {
        let table = if mask[i] { &B_PATTERNS } else { &A_PATTERNS };
        modules.extend_from_slice(&table[usize::from(d)]);
    }
    modules.extend_from_slice(&[1, 1, 1, 1, 1]);
    for &d in &full[7..] {
        modules.extend_from_slice(&C_PATTERNS[usize::from(d)]);
    }
    modules.extend_from_slice(&[1, 1, 1, 9]);
    Ok(render(&modules, unit))
}

/// Строка Code 128 в наборе `'A'`, `'B'` или `'C'`.
pub fn code128_row(text: &str, set: char, unit: usize) -> Result<Vec<u8>, SynthError> {
    if unit == 0 {
        return Err(SynthError::ZeroUnit);
    }
    let set = set.to_ascii_uppercase();
    let mut codes: Vec<usize> = Vec::with_capacity(text.len() + 2);
    match set {
        'A' => {
            codes.push(START_A);
            for ch in text.chars() {
                let v = match ch as u32 {
                    b @ 32..=95 => b - 32,
                    b @ 0..=31 => b + 64,
                    _ => return Err(SynthError::BadChar { ch, set }),
                };
                codes.push(v as usize);
            }
        }
        'C' => {
            codes.push(START_C);
            let bytes = text.as_bytes();
            if bytes.len() % 2 != 0 {
                return Err(SynthError::OddDigits);
            }
            for pair in bytes.chunks(2) {
                if !pair.iter().all(u8::is_ascii_digit) {
                    let ch = char::from(pair[0]);
                    return Err(SynthError::BadChar { ch, set });
                }
                codes.push(usize::from(pair[0] - b'0') * 10 + usize::from(pair[1] - b'0'));
            }
        }
        _ => {
            codes.push(START_B);
            for ch in text.chars() {
                let v = match ch as u32 {
                    b @ 32..=127 => b - 32,
                    _ => return Err(SynthError::BadChar { ch, set: 'B' }),
                };
                codes.push(v as usize);
            }
        }
    }

    let check = codes
        .iter()
        .enumerate()
        .skip(1)
        .fold(codes[0], |acc, (i, &v)| acc + v * i)
        % 103;
    codes.push(check);

    let table = code128::patterns();
    let mut modules: Vec<u8> = vec![10];
    for &c in &codes {
        modules.extend_from_slice(&table[c]);
    }
    modules.extend_from_slice(&STOP);
    modules.push(10);
    Ok(render(&modules, unit))
}

/// Кадр из повторённой строки.
pub fn image_from_row(row: &[u8], height: u32) -> GrayImage {
    let width = row.len() as u32;
    GrayImage::from_fn(width, height, |x, _| image::Luma([row[x as usize]]))
}

pub fn ean13_image(code: &str, unit: usize, height: u32) -> Result<GrayImage, SynthError> {
    Ok(image_from_row(&ean13_row(code, unit)?, height))
}

pub fn code128_image(text: &str, set: char, unit: usize, height: u32) -> Result<GrayImage, SynthError> {
    Ok(image_from_row(&code128_row(text, set, unit)?, height))
}

/// Модули -> пиксели; первый run белый.
fn render(modules: &[u8], unit: usize) -> Vec<u8> {
    let mut pix = Vec::with_capacity(modules.iter().map(|&m| usize::from(m)).sum::<usize>() * unit);
    for (i, &m) in modules.iter().enumerate() {
        let val = if i % 2 == 0 { 255u8 } else { 0u8 };
        pix.extend(std::iter::repeat(val).take(usize::from(m) * unit));
    }
    pix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ean13_row_has_expected_width() {
        let row = ean13_row("5901234123457", 3).unwrap();
        assert_eq!(row.len(), 113 * 3);
        assert_eq!(row[0], 255);
        assert_eq!(row[27], 0);
    }

    #[test]
    fn rejects_unencodable_input() {
        assert_eq!(ean13_row("12ab", 2), Err(SynthError::BadDigits("12ab".into())));
        assert_eq!(code128_row("123", 'C', 2), Err(SynthError::OddDigits));
        assert!(matches!(code128_row("é", 'B', 2), Err(SynthError::BadChar { .. })));
        assert_eq!(ean13_row("5901234123457", 0), Err(SynthError::ZeroUnit));
    }
}
