//! Декодер EAN-13/UPC-A по одной строке.
//!
//! 1) Строим run-профиль строки (адаптивно, с фоллбэком на глобальный порог).
//! 2) Нормализуем run'ы в модули (1..4).
//! 3) Ищем стартовый guard (101), затем центральный (01010) и финальный (101).
//! 4) Левую половину декодируем с учётом A/B (B = реверс A), правую — C.
//! 5) Первая цифра — по маске A/B, затем контрольная сумма.

use crate::binarize::RowProfile;
use crate::one_d::{DecodeOptions, RowHit};

// A (L) — ширины bars/spaces, сумма = 7 модулей
pub(crate) const A_PATTERNS: [[u8; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

// B (G) — реверс A
pub(crate) const B_PATTERNS: [[u8; 4]; 10] = [
    [1, 1, 2, 3],
    [1, 2, 2, 2],
    [2, 2, 1, 2],
    [1, 1, 4, 1],
    [2, 3, 1, 1],
    [1, 3, 2, 1],
    [4, 1, 1, 1],
    [2, 1, 3, 1],
    [3, 1, 2, 1],
    [2, 1, 1, 3],
];

// C (R) — по ширинам совпадает с A
pub(crate) const C_PATTERNS: [[u8; 4]; 10] = A_PATTERNS;

/// Типы шести левых цифр по первой цифре; true = B.
pub(crate) const FIRST_DIGIT_MASKS: [[bool; 6]; 10] = [
    [false, false, false, false, false, false],
    [false, false, true, false, true, true],
    [false, false, true, true, false, true],
    [false, false, true, true, true, false],
    [false, true, false, false, true, true],
    [false, true, true, false, false, true],
    [false, true, true, true, false, false],
    [false, true, false, true, false, true],
    [false, true, false, true, true, false],
    [false, true, true, false, true, false],
];

/// Минимум run'ов в строке: 3 + 24 + 5 + 24 + 3 плюс тихие зоны.
const MIN_RUNS: usize = 40;

/// Декодировать одну строку. Текст: 13 цифр (EAN-13) или 12 (UPC-A, ведущий 0 снят).
pub fn decode_row(row: &[u8], opts: &DecodeOptions) -> Option<RowHit> {
    if row.len() < opts.min_modules {
        return None;
    }
    let profile = RowProfile::best_of(row, MIN_RUNS)?;
    let modules = profile.modules();

    let start = find_guard_start(&modules)?;
    let mut idx = start + 3;

    let mut digits = [0u8; 13];
    let mut left_is_b = [false; 6];
    for d in 0..6 {
        let pat = quad_at(&modules, idx)?;
        let (digit_a, dist_a) = best_match(pat, &A_PATTERNS);
        let (digit_b, dist_b) = best_match(pat, &B_PATTERNS);
        if dist_a <= dist_b {
            digits[1 + d] = digit_a;
        } else {
            digits[1 + d] = digit_b;
            left_is_b[d] = true;
        }
        idx += 4;
    }

    if !is_guard(&modules, idx, 5) {
        return None;
    }
    idx += 5;

    for d in 0..6 {
        let pat = quad_at(&modules, idx)?;
        digits[7 + d] = best_match(pat, &C_PATTERNS).0;
        idx += 4;
    }

    if !is_guard(&modules, idx, 3) {
        return None;
    }
    let end = idx + 3;

    digits[0] = deduce_first_digit(&left_is_b)?;
    if !ean13_checksum_ok(&digits) {
        return None;
    }

    // UPC-A — это EAN-13 с ведущим 0.
    let skip = usize::from(digits[0] == 0);
    let text = digits[skip..].iter().map(|d| char::from(b'0' + d)).collect();
    let (x0, x1) = profile.span(start, end);
    Some(RowHit { text, x0, x1 })
}

#[inline]
fn quad_at(m: &[u8], i: usize) -> Option<[u8; 4]> {
    m.get(i..i + 4).map(|s| [s[0], s[1], s[2], s[3]])
}

fn find_guard_start(m: &[u8]) -> Option<usize> {
    m.windows(3).position(|w| w == [1, 1, 1])
}

fn is_guard(m: &[u8], i: usize, len: usize) -> bool {
    m.get(i..i + len).is_some_and(|s| s.iter().all(|&v| v == 1))
}

/// Ближайшая цифра по манхэттенскому расстоянию ширин.
fn best_match(pat: [u8; 4], dict: &[[u8; 4]; 10]) -> (u8, u32) {
    let mut best = (0u8, u32::MAX);
    for (i, q) in dict.iter().enumerate() {
        let d: u32 = pat
            .iter()
            .zip(q)
            .map(|(&a, &b)| u32::from(a.abs_diff(b)))
            .sum();
        if d < best.1 {
            best = (i as u8, d);
        }
    }
    best
}

fn deduce_first_digit(mask_b: &[bool; 6]) -> Option<u8> {
    FIRST_DIGIT_MASKS
        .iter()
        .position(|m| m == mask_b)
        .map(|d| d as u8)
}

/// Контрольная сумма EAN-13 (веса 1,3,1,3...).
pub(crate) fn ean13_check_digit(first12: &[u8]) -> u8 {
    let sum: u32 = first12
        .iter()
        .enumerate()
        .map(|(i, &d)| u32::from(d) * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    ((10 - (sum % 10)) % 10) as u8
}

fn ean13_checksum_ok(d: &[u8; 13]) -> bool {
    ean13_check_digit(&d[..12]) == d[12]
}
