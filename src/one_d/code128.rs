//! Code 128: декодер по одной строке.
//!
//! Поддержка:
//! - наборы A/B/C, переключения CODE A/B/C, SHIFT, FNC1 (ASCII 29, GS);
//! - проверка checksum (mod 103);
//! - все три старт-кода + STOP.
//!
//! Ищем STOP-паттерн (7 run'ов, сумма 13), затем идём НАЗАД по 6-run
//! символам до старт-кода. Так поток выравнивается без догадок о том,
//! с какого run'а начинать.

use crate::binarize::RowProfile;
use crate::one_d::{DecodeOptions, RowHit};

/// Паттерны 0..=105: по 6 ширин (bars/spaces), сумма 11.
const PATTERNS_STR: [&str; 106] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214",
    "211232", // 103..105 = Start A/B/C
];

/// STOP (7 ширин, сумма 13).
pub(crate) const STOP: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

pub(crate) const START_A: usize = 103;
pub(crate) const START_B: usize = 104;
pub(crate) const START_C: usize = 105;

const MIN_RUNS: usize = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CodeSet {
    A,
    B,
    C,
}

impl CodeSet {
    fn from_start(val: usize) -> Option<Self> {
        match val {
            START_A => Some(Self::A),
            START_B => Some(Self::B),
            START_C => Some(Self::C),
            _ => None,
        }
    }
}

/// Таблица ширин в числовом виде.
pub(crate) fn patterns() -> [[u8; 6]; 106] {
    let mut out = [[0u8; 6]; 106];
    for (dst, s) in out.iter_mut().zip(PATTERNS_STR.iter()) {
        for (d, b) in dst.iter_mut().zip(s.bytes()) {
            *d = b - b'0';
        }
    }
    out
}

/// Декодировать одну строку как Code 128.
pub fn decode_row(row: &[u8], opts: &DecodeOptions) -> Option<RowHit> {
    if row.len() < opts.min_modules {
        return None;
    }
    let profile = RowProfile::best_of(row, MIN_RUNS)?;
    let rl = &profile.runs;
    let table = patterns();

    // STOP: окно из 7 run'ов, нормализованное к сумме 13. Ложное совпадение
    // внутри данных не фатально — пробуем следующее.
    (0..=rl.len().saturating_sub(7))
        .filter(|&i| distance(&normalize::<7>(&rl[i..i + 7], 13), &STOP) <= 1)
        .find_map(|stop_i| decode_from_stop(&profile, stop_i, &table))
}

fn decode_from_stop(profile: &RowProfile, stop_i: usize, table: &[[u8; 6]; 106]) -> Option<RowHit> {
    let rl = &profile.runs;

    // назад по 6-run символам до Start A/B/C
    let mut idx = stop_i;
    let mut values_rev: Vec<u8> = Vec::new();
    let (start_set, start_i) = loop {
        if idx < 6 {
            return None;
        }
        let pat = normalize::<6>(&rl[idx - 6..idx], 11);
        let (val, dist) = best_code_match(&pat, table);
        if dist > 1 {
            return None;
        }
        if let Some(set) = CodeSet::from_start(val) {
            break (set, idx - 6);
        }
        values_rev.push(val as u8);
        idx -= 6;
    };

    // нет даже checksum
    let (&check, payload_rev) = values_rev.split_first()?;
    let payload: Vec<u8> = payload_rev.iter().rev().copied().collect();

    // checksum считается по payload, без последнего символа
    let start_value = match start_set {
        CodeSet::A => START_A,
        CodeSet::B => START_B,
        CodeSet::C => START_C,
    } as u32;
    let sum = payload
        .iter()
        .enumerate()
        .fold(start_value, |acc, (i, &v)| acc + u32::from(v) * (i as u32 + 1));
    if sum % 103 != u32::from(check) {
        return None;
    }

    let text = values_to_text(&payload, start_set)?;
    if text.is_empty() {
        return None;
    }
    let (x0, x1) = profile.span(start_i, stop_i + 7);
    Some(RowHit { text, x0, x1 })
}

/// Привести ширины к модулям 1..4 с заданной суммой.
fn normalize<const N: usize>(slice: &[usize], target: u32) -> [u8; N] {
    let sum: usize = slice.iter().sum();
    let scale = sum as f32 / target as f32;
    let mut out = [0u8; N];
    for (o, &w) in out.iter_mut().zip(slice) {
        *o = ((w as f32 / scale).round() as i32).clamp(1, 4) as u8;
    }
    adjust_sum(&mut out, target);
    out
}

fn adjust_sum(v: &mut [u8], target: u32) {
    let mut sum: u32 = v.iter().map(|&x| u32::from(x)).sum();
    while sum != target {
        if sum > target {
            // самый широкий (с конца), если его ещё можно сузить
            let Some((i, _)) = v.iter().enumerate().rev().max_by_key(|(_, &x)| x) else {
                break;
            };
            if v[i] <= 1 {
                break;
            }
            v[i] -= 1;
            sum -= 1;
        } else {
            let Some((i, _)) = v.iter().enumerate().min_by_key(|(_, &x)| x) else {
                break;
            };
            if v[i] >= 4 {
                break;
            }
            v[i] += 1;
            sum += 1;
        }
    }
}

#[inline]
fn distance(p: &[u8], q: &[u8]) -> u32 {
    p.iter().zip(q).map(|(&a, &b)| u32::from(a.abs_diff(b))).sum()
}

fn best_code_match(pat: &[u8; 6], table: &[[u8; 6]; 106]) -> (usize, u32) {
    let mut best = (0usize, u32::MAX);
    for (i, q) in table.iter().enumerate() {
        let d = distance(pat, q);
        if d < best.1 {
            best = (i, d);
            if d == 0 {
                break;
            }
        }
    }
    best
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum Shift {
    None,
    A,
    B,
}

/// Код-значения в текст, начиная с набора старт-кода.
fn values_to_text(vals: &[u8], mut set: CodeSet) -> Option<String> {
    let mut out = String::new();
    let mut shift = Shift::None;

    for &raw in vals {
        let v = u32::from(raw);

        // SHIFT действует на один следующий символ
        let effective = match (set, shift) {
            (CodeSet::A, Shift::B) => CodeSet::B,
            (CodeSet::B, Shift::A) => CodeSet::A,
            _ => set,
        };

        match effective {
            CodeSet::A => match v {
                0..=63 => out.push(char::from(raw + 32)),
                64..=95 => out.push(char::from(raw - 64)),
                96 | 97 | 98 | 101 => {}
                99 => set = CodeSet::C,
                100 => set = CodeSet::B,
                102 => out.push('\u{1d}'),
                _ => return None,
            },
            CodeSet::B => match v {
                0..=95 => out.push(char::from(raw + 32)),
                96 | 97 | 98 | 100 => {}
                99 => set = CodeSet::C,
                101 => set = CodeSet::A,
                102 => out.push('\u{1d}'),
                _ => return None,
            },
            CodeSet::C => match v {
                0..=98 => {
                    out.push(char::from(b'0' + raw / 10));
                    out.push(char::from(b'0' + raw % 10));
                }
                99 => {}
                100 => set = CodeSet::B,
                101 => set = CodeSet::A,
                102 => out.push('\u{1d}'),
                _ => return None,
            },
        }

        shift = if shift != Shift::None {
            Shift::None
        } else if v == 98 && effective != CodeSet::C {
            match set {
                CodeSet::A => Shift::B,
                CodeSet::B => Shift::A,
                CodeSet::C => Shift::None,
            }
        } else {
            Shift::None
        };
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth;

    fn decode(text: &str, set: char) -> Option<RowHit> {
        let row = synth::code128_row(text, set, 2).expect("encodable");
        decode_row(&row, &DecodeOptions::default())
    }

    #[test]
    fn set_b_text() {
        assert_eq!(decode("HELLO-128", 'B').unwrap().text, "HELLO-128");
        assert_eq!(decode("abc123", 'B').unwrap().text, "abc123");
    }

    #[test]
    fn set_c_digits() {
        assert_eq!(decode("0123456789", 'C').unwrap().text, "0123456789");
    }

    #[test]
    fn set_a_uppercase() {
        assert_eq!(decode("CODE-A 42", 'A').unwrap().text, "CODE-A 42");
    }

    #[test]
    fn span_covers_start_to_stop() {
        let hit = decode("ABcd[]", 'B').unwrap();
        assert_eq!(hit.text, "ABcd[]");
        // тихая зона 10 модулей; start + 6 символов + checksum = 8 * 11, STOP = 13
        assert_eq!(hit.x0, 20);
        assert_eq!(hit.x1 - hit.x0, (8 * 11 + 13) * 2);
    }

    #[test]
    fn flat_row_is_rejected() {
        let row = vec![200u8; 300];
        assert!(decode_row(&row, &DecodeOptions::default()).is_none());
    }
}
