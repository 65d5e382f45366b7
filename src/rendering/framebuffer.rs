/// Framebuffer for software rendering
/// Colour-only ARGB pixels; the painter's algorithm needs no depth buffer.
///
/// Columns are rendered into their own buffers and copied back here
/// sequentially, so the framebuffer itself is never shared between threads.
use crate::viewport::ScreenRect;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::{_mm256_set1_epi32, _mm256_storeu_si256, _mm_set1_epi32, _mm_storeu_si128};
use glam::IVec2;

pub struct Framebuffer {
    pub width: usize,
    pub height: usize,
    pub color_buffer: Vec<u32>, // ARGB format
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            color_buffer: vec![0; width * height],
        }
    }

    /// Size in pixels as a vector, for clipping against viewports
    #[inline]
    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width as i32, self.height as i32)
    }

    #[inline]
    pub fn rect(&self) -> ScreenRect {
        ScreenRect::from_pos_size(IVec2::ZERO, self.size())
    }

    pub fn clear(&mut self, clear_color: u32) {
        #[cfg(target_arch = "x86_64")]
        {
            // AVX writes 8 pixels per store, SSE2 4
            if std::arch::is_x86_feature_detected!("avx") {
                unsafe {
                    return self.clear_simd_avx(clear_color);
                }
            }
            if std::arch::is_x86_feature_detected!("sse2") {
                unsafe {
                    return self.clear_simd_sse2(clear_color);
                }
            }
        }

        self.color_buffer.fill(clear_color);
    }

    #[cfg(target_arch = "x86_64")]
    #[target_feature(enable = "sse2")]
    unsafe fn clear_simd_sse2(&mut self, clear_color: u32) {
        let len = self.color_buffer.len();
        let mut i = 0usize;
        let color_vec = _mm_set1_epi32(clear_color as i32);
        while i + 4 <= len {
            let ptr = self.color_buffer.as_mut_ptr().add(i) as *mut _;
            _mm_storeu_si128(ptr, color_vec);
            i += 4;
        }
        self.color_buffer[i..].fill(clear_color);
    }

    #[cfg(target_arch = "x86_64")]
    #[target_feature(enable = "avx")]
    unsafe fn clear_simd_avx(&mut self, clear_color: u32) {
        let len = self.color_buffer.len();
        let mut i = 0usize;
        let color_vec = _mm256_set1_epi32(clear_color as i32);
        while i + 8 <= len {
            let ptr = self.color_buffer.as_mut_ptr().add(i) as *mut _;
            _mm256_storeu_si256(ptr, color_vec);
            i += 8;
        }
        self.color_buffer[i..].fill(clear_color);
    }

    /// Fill a rectangle, clipped to the buffer
    pub fn fill_rect(&mut self, rect: ScreenRect, color: u32) {
        let Some(r) = rect.intersect(&self.rect()) else {
            return;
        };
        for y in r.top..r.bottom {
            let row = y as usize * self.width;
            self.color_buffer[row + r.left as usize..row + r.right as usize].fill(color);
        }
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, color: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.color_buffer[y * self.width + x] = color;
        true
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.color_buffer[y * self.width + x])
    }

    pub fn color_buffer_slice(&self) -> &[u32] {
        &self.color_buffer
    }

    /// Resize, keeping existing pixels where they still fit in the flat buffer
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.color_buffer.resize(width * height, 0);
    }
}

/// Convert RGB to ARGB u32
#[inline]
pub const fn rgb_to_u32(r: u8, g: u8, b: u8) -> u32 {
    0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_covers_odd_sizes() {
        let mut fb = Framebuffer::new(13, 7);
        fb.clear(0xFF12_3456);
        assert!(fb.color_buffer_slice().iter().all(|&c| c == 0xFF12_3456));
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut fb = Framebuffer::new(8, 8);
        fb.fill_rect(ScreenRect::new(-4, 6, 3, 20), 7);
        assert_eq!(fb.pixel(0, 6), Some(7));
        assert_eq!(fb.pixel(2, 7), Some(7));
        assert_eq!(fb.pixel(3, 7), Some(0));
        assert_eq!(fb.pixel(0, 5), Some(0));
        assert_eq!(fb.pixel(8, 0), None);
    }

    #[test]
    fn test_set_pixel_bounds() {
        let mut fb = Framebuffer::new(4, 4);
        assert!(fb.set_pixel(3, 3, rgb_to_u32(1, 2, 3)));
        assert!(!fb.set_pixel(4, 0, 0));
        assert_eq!(fb.pixel(3, 3), Some(0xFF01_0203));
        fb.resize(2, 2);
        assert_eq!(fb.size(), IVec2::new(2, 2));
    }
}
