//! RGBA frame buffers.

use clipforge_common::{ClipforgeError, ClipforgeResult};

/// A packed RGBA8 image with straight (non-premultiplied) alpha.
///
/// Rows are stored top to bottom with no padding, so `data.len()` is always
/// `width * height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Source or timeline timestamp this frame represents.
    pub timestamp_ms: i64,
}

impl FrameBuffer {
    /// Allocate a fully transparent frame.
    ///
    /// Fails with `OutOfMemory` when the buffer size overflows or cannot be
    /// reserved, and with `InvalidParameter` for zero dimensions.
    pub fn try_new(width: u32, height: u32) -> ClipforgeResult<Self> {
        let len = Self::byte_len(width, height)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            ClipforgeError::out_of_memory(format!("{width}x{height} frame: {e}"))
        })?;
        data.resize(len, 0);
        Ok(Self {
            width,
            height,
            data,
            timestamp_ms: 0,
        })
    }

    /// Allocate a frame filled with one color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> ClipforgeResult<Self> {
        let mut frame = Self::try_new(width, height)?;
        frame.fill(rgba);
        Ok(frame)
    }

    /// Wrap existing RGBA bytes, checking the length.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> ClipforgeResult<Self> {
        let expected = Self::byte_len(width, height)?;
        if data.len() != expected {
            return Err(ClipforgeError::invalid_parameter(format!(
                "RGBA buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            timestamp_ms: 0,
        })
    }

    /// Byte length of a `width x height` RGBA buffer.
    pub fn byte_len(width: u32, height: u32) -> ClipforgeResult<usize> {
        if width == 0 || height == 0 {
            return Err(ClipforgeError::invalid_parameter(format!(
                "frame dimensions must be non-zero, got {width}x{height}"
            )));
        }
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(4))
            .ok_or_else(|| {
                ClipforgeError::out_of_memory(format!("{width}x{height} frame overflows usize"))
            })
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Overwrite the pixel at `(x, y)`; ignored outside the frame.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    pub fn same_size(&self, other: &FrameBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_transparent() {
        let frame = FrameBuffer::try_new(4, 3).unwrap();
        assert_eq!(frame.data.len(), 48);
        assert!(frame.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            FrameBuffer::try_new(0, 10),
            Err(ClipforgeError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_pixel_access() {
        let mut frame = FrameBuffer::filled(2, 2, [1, 2, 3, 4]).unwrap();
        frame.set_pixel(1, 1, [9, 9, 9, 255]);
        assert_eq!(frame.pixel(0, 0), Some([1, 2, 3, 4]));
        assert_eq!(frame.pixel(1, 1), Some([9, 9, 9, 255]));
        assert_eq!(frame.pixel(2, 0), None);
    }

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(FrameBuffer::from_rgba(2, 2, vec![0; 16]).is_ok());
        assert!(FrameBuffer::from_rgba(2, 2, vec![0; 15]).is_err());
    }
}
