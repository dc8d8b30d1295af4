//! Shared color + depth target for one render pass
//!
//! Many polygons are rasterized concurrently, so every pixel carries its own
//! tiny spin lock. The depth is stored as `f32` bits in an `AtomicU32`
//! (non-negative floats order the same as their bit patterns), which allows a
//! lock-free early reject; the winning write re-tests under the lock so the
//! depth and the color of a pixel always belong to the same polygon.

use std::hint;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::types::Color;

/// Depth of a pixel nothing has been written to
pub const EMPTY_DEPTH: f32 = f32::INFINITY;

struct PixelCell {
    lock: AtomicBool,
    depth: AtomicU32,
    rgba: [AtomicU32; 4],
}

impl PixelCell {
    fn new() -> Self {
        Self {
            lock: AtomicBool::new(false),
            depth: AtomicU32::new(EMPTY_DEPTH.to_bits()),
            rgba: [
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
            ],
        }
    }

    fn acquire(&self) {
        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.lock.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
    }

    fn release(&self) {
        self.lock.store(false, Ordering::Release);
    }

    fn color(&self) -> Color {
        Color::with_alpha(
            f32::from_bits(self.rgba[0].load(Ordering::Relaxed)),
            f32::from_bits(self.rgba[1].load(Ordering::Relaxed)),
            f32::from_bits(self.rgba[2].load(Ordering::Relaxed)),
            f32::from_bits(self.rgba[3].load(Ordering::Relaxed)),
        )
    }

    fn store_color(&self, c: Color) {
        self.rgba[0].store(c.r.to_bits(), Ordering::Relaxed);
        self.rgba[1].store(c.g.to_bits(), Ordering::Relaxed);
        self.rgba[2].store(c.b.to_bits(), Ordering::Relaxed);
        self.rgba[3].store(c.a.to_bits(), Ordering::Relaxed);
    }

    fn clear(&self) {
        self.depth.store(EMPTY_DEPTH.to_bits(), Ordering::Relaxed);
        self.store_color(Color::ZERO);
    }
}

/// Color accumulation + depth buffer shared by all workers of a pass
pub struct FrameTarget {
    width: usize,
    height: usize,
    cells: Vec<PixelCell>,
}

impl FrameTarget {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: (0..width * height).map(|_| PixelCell::new()).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reallocate only when the dimensions change; contents are cleared either way
    pub fn resize(&mut self, width: usize, height: usize) {
        if width != self.width || height != self.height {
            *self = Self::new(width, height);
        } else {
            self.clear();
        }
    }

    pub fn clear(&mut self) {
        for cell in &self.cells {
            cell.clear();
        }
    }

    /// Depth-test and write one pixel.
    ///
    /// Accepts only `0 < depth < 1` and depths strictly closer than what is
    /// stored. Returns whether the pixel was written.
    pub fn test_and_set(&self, x: usize, y: usize, depth: f32, color: Color) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        if !(depth > 0.0 && depth < 1.0) {
            return false;
        }
        let cell = &self.cells[y * self.width + x];
        let bits = depth.to_bits();

        if bits >= cell.depth.load(Ordering::Relaxed) {
            return false;
        }

        cell.acquire();
        let written = if bits < cell.depth.load(Ordering::Relaxed) {
            cell.depth.store(bits, Ordering::Relaxed);
            cell.store_color(color);
            true
        } else {
            false
        };
        cell.release();
        written
    }

    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        f32::from_bits(self.cells[y * self.width + x].depth.load(Ordering::Acquire))
    }

    pub fn color_at(&self, x: usize, y: usize) -> Color {
        self.cells[y * self.width + x].color()
    }

    pub fn is_empty_at(&self, x: usize, y: usize) -> bool {
        self.depth_at(x, y) == EMPTY_DEPTH
    }

    /// Copy the accumulated colors out, row-major.
    ///
    /// Takes `&mut self` so it can only run once every worker has let go.
    pub fn snapshot_colors(&mut self, out: &mut Vec<Color>) {
        out.clear();
        out.extend(self.cells.iter().map(PixelCell::color));
    }

    pub fn covered_pixels(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| f32::from_bits(c.depth.load(Ordering::Relaxed)) != EMPTY_DEPTH)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_nearer_wins_regardless_of_order() {
        let target = FrameTarget::new(4, 4);
        assert!(target.test_and_set(1, 1, 0.6, Color::gray(0.6)));
        assert!(target.test_and_set(1, 1, 0.3, Color::gray(0.3)));
        assert!(!target.test_and_set(1, 1, 0.5, Color::gray(0.5)));
        assert_eq!(target.color_at(1, 1), Color::gray(0.3));
        assert_eq!(target.depth_at(1, 1), 0.3);
    }

    #[test]
    fn test_rejects_out_of_range_depth_and_bounds() {
        let target = FrameTarget::new(2, 2);
        assert!(!target.test_and_set(0, 0, 0.0, Color::WHITE));
        assert!(!target.test_and_set(0, 0, 1.0, Color::WHITE));
        assert!(!target.test_and_set(0, 0, f32::NAN, Color::WHITE));
        assert!(!target.test_and_set(5, 0, 0.5, Color::WHITE));
        assert!(target.is_empty_at(0, 0));
    }

    #[test]
    fn test_resize_and_clear() {
        let mut target = FrameTarget::new(2, 2);
        target.test_and_set(0, 0, 0.5, Color::WHITE);
        target.resize(2, 2);
        assert!(target.is_empty_at(0, 0));
        assert_eq!(target.color_at(0, 0), Color::ZERO);
        target.resize(3, 1);
        assert_eq!((target.width(), target.height()), (3, 1));
    }

    #[test]
    fn test_concurrent_writes_keep_depth_and_color_paired() {
        // Each writer encodes its depth in its color; whoever wins must leave both.
        let mut target = FrameTarget::new(8, 8);
        (0..2000u32).into_par_iter().for_each(|i| {
            let depth = 0.001 + (i as f32 * 7919.0 % 997.0) / 1000.0;
            for y in 0..8 {
                for x in 0..8 {
                    target.test_and_set(x, y, depth, Color::gray(depth));
                }
            }
        });
        let mut colors = Vec::new();
        target.snapshot_colors(&mut colors);
        let min_depth = (0..2000u32)
            .map(|i| 0.001 + (i as f32 * 7919.0 % 997.0) / 1000.0)
            .fold(f32::INFINITY, f32::min);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(target.depth_at(x, y), min_depth);
                assert_eq!(colors[y * 8 + x].r, min_depth);
            }
        }
    }
}
