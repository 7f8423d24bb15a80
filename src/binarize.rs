//! Бинаризация строки и измерение ширин баров для 1D-декодеров.
//!
//! Строка пикселей превращается в `RowProfile`: последовательность run'ов
//! (чередующихся чёрных/белых отрезков) вместе с их пиксельными смещениями,
//! чтобы декодер мог вернуть не только текст, но и положение кода в строке.
//!
//! Два режима:
//! - адаптивный порог по скользящему среднему, устойчив к неравномерной засветке;
//! - глобальный порог (смесь среднего и середины min/max) как фоллбэк.

/// Простой глобальный порог: смесь среднего и середины между min/max.
#[inline]
pub fn otsu_like_threshold(row: &[u8]) -> u8 {
    if row.is_empty() {
        return 128;
    }
    let (mut min_v, mut max_v) = (u8::MAX, 0u8);
    let mut sum: u64 = 0;
    for &v in row {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
        sum += u64::from(v);
    }
    let mean = (sum / row.len() as u64) as u16;
    let mid = (u16::from(min_v) + u16::from(max_v)) / 2;
    ((mean + mid) / 2) as u8
}

/// Глобальная бинаризация строки: true = чёрный.
pub fn binarize_row(row: &[u8]) -> Vec<bool> {
    let t = otsu_like_threshold(row);
    row.iter().map(|&v| v < t).collect()
}

/// Адаптивная бинаризация: окно width/32 в диапазоне [8..64], смещение 5 к чёрному.
pub fn binarize_row_adaptive(row: &[u8]) -> Vec<bool> {
    let n = row.len();
    if n == 0 {
        return Vec::new();
    }
    let win = (n / 32).clamp(8, 64);
    let bias: i32 = 5;

    // префиксные суммы для среднего по окну
    let mut pref: Vec<u32> = Vec::with_capacity(n + 1);
    let mut acc = 0u32;
    pref.push(0);
    for &v in row {
        acc += u32::from(v);
        pref.push(acc);
    }

    (0..n)
        .map(|i| {
            let left = i.saturating_sub(win);
            let right = (i + win).min(n - 1);
            let len = (right - left + 1) as u32;
            let mean = ((pref[right + 1] - pref[left]) / len) as i32;
            i32::from(row[i]) < mean - bias
        })
        .collect()
}

/// Run-length профиль бинарной строки.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowProfile {
    /// Ширины run'ов слева направо.
    pub runs: Vec<usize>,
    /// `offsets[i]` — x первого пикселя run'а `i`; `offsets[runs.len()]` = ширина строки.
    pub offsets: Vec<usize>,
    /// Первый run чёрный.
    pub starts_black: bool,
}

impl RowProfile {
    pub fn from_bits(bits: &[bool]) -> Self {
        let mut runs = Vec::new();
        let mut offsets = Vec::new();
        let Some(&first) = bits.first() else {
            return Self::default();
        };
        let mut cur = first;
        let mut start = 0usize;
        for (x, &b) in bits.iter().enumerate().skip(1) {
            if b != cur {
                offsets.push(start);
                runs.push(x - start);
                start = x;
                cur = b;
            }
        }
        offsets.push(start);
        runs.push(bits.len() - start);
        offsets.push(bits.len());
        Self {
            runs,
            offsets,
            starts_black: first,
        }
    }

    /// Адаптивный профиль; если run'ов меньше `min_runs`, пробуем глобальный порог.
    pub fn best_of(row: &[u8], min_runs: usize) -> Option<Self> {
        let adaptive = Self::from_bits(&binarize_row_adaptive(row));
        if adaptive.runs.len() >= min_runs {
            return Some(adaptive);
        }
        let global = Self::from_bits(&binarize_row(row));
        (global.runs.len() >= min_runs).then_some(global)
    }

    /// x-диапазон пикселей run'ов `[first, last_exclusive)`.
    #[inline]
    pub fn span(&self, first: usize, last_exclusive: usize) -> (usize, usize) {
        (self.offsets[first], self.offsets[last_exclusive])
    }

    /// Ширины run'ов в «модулях» 1..4; базовый модуль — нижний квартиль ширин
    /// (устойчиво к толстым тихим зонам по краям).
    pub fn modules(&self) -> Vec<u8> {
        if self.runs.is_empty() {
            return Vec::new();
        }
        let mut sorted = self.runs.clone();
        sorted.sort_unstable();
        let base = sorted[sorted.len() / 4].max(1);
        self.runs
            .iter()
            .map(|&w| ((w + base / 2) / base).clamp(1, 4) as u8)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_tracks_offsets() {
        let bits = [false, false, true, true, true, false, true];
        let p = RowProfile::from_bits(&bits);
        assert_eq!(p.runs, vec![2, 3, 1, 1]);
        assert_eq!(p.offsets, vec![0, 2, 5, 6, 7]);
        assert!(!p.starts_black);
        assert_eq!(p.span(1, 3), (2, 6));
    }

    #[test]
    fn adaptive_handles_gradient() {
        // полосы 4px поверх линейного градиента яркости
        let row: Vec<u8> = (0..256)
            .map(|x| {
                let base = 60 + (x as u32 * 120 / 256) as u8;
                if (x / 4) % 2 == 0 {
                    base.saturating_add(60)
                } else {
                    base.saturating_sub(50)
                }
            })
            .collect();
        let p = RowProfile::best_of(&row, 40).expect("enough runs");
        assert!(p.runs.len() >= 60);
    }

    #[test]
    fn empty_row_is_empty_profile() {
        assert_eq!(RowProfile::from_bits(&[]), RowProfile::default());
        assert!(binarize_row_adaptive(&[]).is_empty());
        assert_eq!(otsu_like_threshold(&[]), 128);
    }
}
