//! Contrast Limited Adaptive Histogram Equalization on an 8-bit plane.

use crate::enhance::lab::saturate_u8;

const BINS: usize = 256;

/// Mirror an index into `0..len` without repeating the edge sample
/// (`gfedcb|abcdefgh|gfedcba`).
fn reflect_101(i: usize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let m = i % period;
    if m < len { m } else { period - m }
}

/// Clip a histogram at `limit` and spread the excess over all bins.
fn clip_histogram(hist: &mut [u32; BINS], limit: u32) {
    let mut clipped = 0u32;
    for h in hist.iter_mut() {
        if *h > limit {
            clipped += *h - limit;
            *h = limit;
        }
    }

    let batch = clipped / BINS as u32;
    let mut residual = clipped - batch * BINS as u32;
    for h in hist.iter_mut() {
        *h += batch;
    }

    if residual != 0 {
        let step = (BINS / residual as usize).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            i += step;
            residual -= 1;
        }
    }
}

/// Equalize `plane` (row-major, `width × height`) tile by tile.
///
/// `tiles` is the grid as (columns, rows). Tiles that would not divide the
/// image evenly are completed by reflecting the bottom and right borders.
/// `clip_limit` is relative to a uniform histogram; the absolute per-bin limit
/// is `max(floor(clip_limit * tile_area / 256), 1)`.
#[must_use]
pub fn apply(
    plane: &[u8],
    width: usize,
    height: usize,
    clip_limit: f64,
    tiles: (usize, usize),
) -> Vec<u8> {
    assert_eq!(plane.len(), width * height);
    let (tiles_x, tiles_y) = tiles;

    let (ext_w, ext_h) = if width % tiles_x == 0 && height % tiles_y == 0 {
        (width, height)
    } else {
        (
            width + tiles_x - width % tiles_x,
            height + tiles_y - height % tiles_y,
        )
    };
    let tile_w = ext_w / tiles_x;
    let tile_h = ext_h / tiles_y;
    let tile_area = tile_w * tile_h;

    let limit = ((clip_limit * tile_area as f64 / BINS as f64) as u32).max(1);
    let lut_scale = 255.0 / tile_area as f32;

    let sample = |x: usize, y: usize| plane[reflect_101(y, height) * width + reflect_101(x, width)];

    let mut luts = vec![[0u8; BINS]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0u32; BINS];
            for y in ty * tile_h..(ty + 1) * tile_h {
                for x in tx * tile_w..(tx + 1) * tile_w {
                    hist[usize::from(sample(x, y))] += 1;
                }
            }

            clip_histogram(&mut hist, limit);

            let lut = &mut luts[ty * tiles_x + tx];
            let mut sum = 0u32;
            for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
                sum += count;
                *entry = saturate_u8(sum as f32 * lut_scale);
            }
        }
    }

    interpolate(plane, width, height, &luts, tiles, (tile_w, tile_h))
}

/// Blend the four nearest tile mappings for every pixel.
fn interpolate(
    plane: &[u8],
    width: usize,
    height: usize,
    luts: &[[u8; BINS]],
    (tiles_x, tiles_y): (usize, usize),
    (tile_w, tile_h): (usize, usize),
) -> Vec<u8> {
    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;

    // Horizontal neighbours and weights are the same for every row.
    let columns: Vec<(usize, usize, f32)> = (0..width)
        .map(|x| {
            let txf = x as f32 * inv_tw - 0.5;
            let tx1 = txf.floor();
            let xa = txf - tx1;
            let tx2 = ((tx1 as isize + 1) as usize).min(tiles_x - 1);
            (tx1.max(0.0) as usize, tx2, xa)
        })
        .collect();

    let mut out = vec![0u8; plane.len()];
    for y in 0..height {
        let tyf = y as f32 * inv_th - 0.5;
        let ty1f = tyf.floor();
        let ya = tyf - ty1f;
        let ty1 = ty1f.max(0.0) as usize;
        let ty2 = ((ty1f as isize + 1) as usize).min(tiles_y - 1);

        let top = &luts[ty1 * tiles_x..(ty1 + 1) * tiles_x];
        let bottom = &luts[ty2 * tiles_x..(ty2 + 1) * tiles_x];

        for (x, &(tx1, tx2, xa)) in columns.iter().enumerate() {
            let v = usize::from(plane[y * width + x]);
            let xa1 = 1.0 - xa;
            let upper = f32::from(top[tx1][v]) * xa1 + f32::from(top[tx2][v]) * xa;
            let lower = f32::from(bottom[tx1][v]) * xa1 + f32::from(bottom[tx2][v]) * xa;
            out[y * width + x] = saturate_u8(upper * (1.0 - ya) + lower * ya);
        }
    }
    out
}
