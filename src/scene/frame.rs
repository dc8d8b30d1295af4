//! Finished frames handed to the presentation surface

use std::time::Duration;

use crate::rasterizer::RasterStats;

/// Packed RGB image, row-major, top-left origin, stride `width * 3`
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub stats: RasterStats,
}

impl Frame {
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 3],
            stats: RasterStats::default(),
        }
    }

    pub fn stride(&self) -> usize {
        self.width as usize * 3
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.stride() + x as usize * 3;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }

    /// Expand to opaque RGBA (for surfaces that only take 4 channels)
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect()
    }

    pub fn is_black(&self) -> bool {
        self.pixels.iter().all(|&b| b == 0)
    }
}

/// Sent once after every completed render pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameEvent {
    /// 1-based pass counter
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub elapsed: Duration,
    pub pixels_written: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_addressing() {
        let mut frame = Frame::black(3, 2);
        assert!(frame.is_black());
        let i = frame.stride() + 2 * 3;
        frame.pixels[i..i + 3].copy_from_slice(&[1, 2, 3]);
        assert_eq!(frame.pixel(2, 1), Some([1, 2, 3]));
        assert_eq!(frame.pixel(3, 0), None);
        assert!(!frame.is_black());
    }

    #[test]
    fn test_to_rgba() {
        let frame = Frame {
            width: 1,
            height: 1,
            pixels: vec![10, 20, 30],
            stats: RasterStats::default(),
        };
        assert_eq!(frame.to_rgba(), vec![10, 20, 30, 255]);
    }
}
