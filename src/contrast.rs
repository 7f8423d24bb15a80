//! CLAHE — адаптивное выравнивание гистограммы с ограничением контраста.
//!
//! В `imageproc` есть только глобальное выравнивание, поэтому здесь своя
//! реализация: гистограмма по тайлам сетки, обрезка пиков с равномерным
//! перераспределением излишка, билинейная интерполяция LUT соседних тайлов.

use image::{GrayImage, Luma};

/// `clip_limit` — во сколько раз бин может превышать среднюю высоту гистограммы
/// тайла; `grid` — число тайлов по каждой оси.
pub fn clahe(img: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    let tile_w = w.div_ceil(grid.clamp(1, w));
    let tile_h = h.div_ceil(grid.clamp(1, h));
    let tiles_x = w.div_ceil(tile_w);
    let tiles_y = h.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);
            luts.push(tile_lut(img, (x0, y0, x1, y1), clip_limit));
        }
    }
    let lut = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

    GrayImage::from_fn(w, h, |x, y| {
        let v = usize::from(img.get_pixel(x, y)[0]);
        let (tx0, tx1, fx) = neighbours(x, tile_w, tiles_x);
        let (ty0, ty1, fy) = neighbours(y, tile_h, tiles_y);
        let top = f32::from(lut(tx0, ty0)[v]) * (1.0 - fx) + f32::from(lut(tx1, ty0)[v]) * fx;
        let bottom = f32::from(lut(tx0, ty1)[v]) * (1.0 - fx) + f32::from(lut(tx1, ty1)[v]) * fx;
        let out = top * (1.0 - fy) + bottom * fy;
        Luma([out.round().clamp(0.0, 255.0) as u8])
    })
}

/// Два соседних центра тайлов вдоль оси и вес второго.
fn neighbours(p: u32, tile: u32, tiles: u32) -> (u32, u32, f32) {
    let pos = (p as f32 + 0.5) / tile as f32 - 0.5;
    let i0 = pos.floor().clamp(0.0, (tiles - 1) as f32) as u32;
    let i1 = (i0 + 1).min(tiles - 1);
    let frac = if i1 == i0 { 0.0 } else { (pos - i0 as f32).clamp(0.0, 1.0) };
    (i0, i1, frac)
}

fn tile_lut(img: &GrayImage, (x0, y0, x1, y1): (u32, u32, u32, u32), clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[usize::from(img.get_pixel(x, y)[0])] += 1;
        }
    }
    let area = (x1 - x0) * (y1 - y0);

    let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in &mut hist {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let share = excess / 256;
    let rest = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += share + u32::from(i < rest);
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (dst, &count) in lut.iter_mut().zip(hist.iter()) {
        cdf += count;
        *dst = ((u64::from(cdf) * 255 + u64::from(area) / 2) / u64::from(area)).min(255) as u8;
    }
    lut
}
