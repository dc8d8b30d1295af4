//! Bloom and ACES tone mapping over a finished color buffer

use rayon::prelude::*;

use crate::rasterizer::Color;

const ACES_A: f32 = 2.51;
const ACES_B: f32 = 0.03;
const ACES_C: f32 = 2.43;
const ACES_D: f32 = 0.59;
const ACES_E: f32 = 0.14;

/// Pixels brighter than this (by luma) feed the bloom
pub const BLOOM_THRESHOLD: f32 = 1.0;

/// Center tap followed by the taps 1..=4 pixels away on each side
pub const BLOOM_KERNEL: [f32; 5] = [0.227, 0.195, 0.122, 0.054, 0.016];

/// ACES filmic curve for one channel, limited to [0, 1]
#[inline]
pub fn aces(x: f32) -> f32 {
    let x = x.max(0.0);
    (x * (ACES_A * x + ACES_B) / (x * (ACES_C * x + ACES_D) + ACES_E)).min(1.0)
}

/// Tone map one linear color to RGB bytes, weighted by alpha
#[inline]
pub fn tone_map(color: Color) -> [u8; 3] {
    let alpha = color.a.clamp(0.0, 1.0);
    let channel = |v: f32| (aces(v) * alpha * 255.0).clamp(0.0, 255.0) as u8;
    [channel(color.r), channel(color.g), channel(color.b)]
}

/// Tone map a whole buffer into packed RGB bytes (3 per pixel)
pub fn tone_map_into(colors: &[Color], bytes: &mut [u8]) {
    bytes
        .par_chunks_mut(3)
        .zip(colors.par_iter())
        .for_each(|(out, &color)| out.copy_from_slice(&tone_map(color)));
}

/// Threshold, blur with the fixed separable kernel, and add the glow back.
///
/// Taps past an edge are clamped to that row or column, never wrapped.
pub fn apply_bloom(colors: &mut [Color], width: usize, height: usize) {
    if width == 0 || height == 0 || colors.len() < width * height {
        return;
    }
    let len = width * height;

    let bright: Vec<Color> = colors[..len]
        .par_iter()
        .map(|&c| if c.luma() > BLOOM_THRESHOLD { c } else { Color::ZERO })
        .collect();

    let mut horizontal = vec![Color::ZERO; len];
    horizontal
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let src = &bright[y * width..(y + 1) * width];
            for (x, out) in row.iter_mut().enumerate() {
                *out = blur_tap(|offset| src[clamp_index(x, offset, width)]);
            }
        });

    let mut glow = vec![Color::ZERO; len];
    glow.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            *out = blur_tap(|offset| horizontal[clamp_index(y, offset, height) * width + x]);
        }
    });

    colors[..len]
        .par_iter_mut()
        .zip(glow.par_iter())
        .for_each(|(c, &g)| {
            if g.r > 0.0 || g.g > 0.0 || g.b > 0.0 {
                *c += g;
                // glow spilling onto empty background is visible
                c.a = 1.0;
            }
        });
}

#[inline]
fn clamp_index(center: usize, offset: isize, len: usize) -> usize {
    (center as isize + offset).clamp(0, len as isize - 1) as usize
}

#[inline]
fn blur_tap(sample: impl Fn(isize) -> Color) -> Color {
    let mut sum = sample(0) * BLOOM_KERNEL[0];
    for (k, &w) in BLOOM_KERNEL.iter().enumerate().skip(1) {
        let k = k as isize;
        sum += (sample(-k) + sample(k)) * w;
    }
    sum
}
