//! Pixel format conversion for encoder input.
//!
//! Output frames are flattened over opaque black before conversion since
//! encoders have no alpha channel.

use clipforge_common::{ClipforgeError, ClipforgeResult};

use crate::encode::PixelFormat;
use crate::frame::FrameBuffer;

/// Luma of the dark placeholder frame (BT.601 limited-range black).
pub const PLACEHOLDER_Y: u8 = 16;
/// Chroma of the dark placeholder frame (neutral).
pub const PLACEHOLDER_UV: u8 = 128;

/// Convert an RGBA frame into the bytes an encoder expects.
pub fn convert_frame(frame: &FrameBuffer, format: PixelFormat) -> ClipforgeResult<Vec<u8>> {
    match format {
        PixelFormat::Rgba => Ok(flatten_over_black(frame)),
        PixelFormat::Yuv420p => rgba_to_yuv420p(frame),
    }
}

/// A solid dark frame in the given format.
pub fn placeholder_frame(format: PixelFormat, width: u32, height: u32) -> Vec<u8> {
    match format {
        PixelFormat::Rgba => {
            let mut data = vec![0u8; PixelFormat::Rgba.frame_len(width, height)];
            for px in data.chunks_exact_mut(4) {
                px[3] = 255;
            }
            data
        }
        PixelFormat::Yuv420p => yuv420p_placeholder(width, height),
    }
}

/// Planar Y, U, V buffer with Y=16 and U=V=128.
pub fn yuv420p_placeholder(width: u32, height: u32) -> Vec<u8> {
    let luma = width as usize * height as usize;
    let total = PixelFormat::Yuv420p.frame_len(width, height);
    let mut data = vec![PLACEHOLDER_UV; total];
    data[..luma].fill(PLACEHOLDER_Y);
    data
}

/// BT.601 limited-range RGBA to planar YUV420P. Dimensions must be even.
pub fn rgba_to_yuv420p(frame: &FrameBuffer) -> ClipforgeResult<Vec<u8>> {
    let (w, h) = (frame.width as usize, frame.height as usize);
    if w % 2 != 0 || h % 2 != 0 {
        return Err(ClipforgeError::invalid_parameter(format!(
            "yuv420p conversion needs even dimensions, got {w}x{h}"
        )));
    }

    let (uv_w, uv_h) = (w / 2, h / 2);
    let mut out = vec![0u8; w * h + 2 * uv_w * uv_h];
    let (y_plane, chroma) = out.split_at_mut(w * h);
    let (u_plane, v_plane) = chroma.split_at_mut(uv_w * uv_h);

    let rgb_at = |x: usize, y: usize| -> (i32, i32, i32) {
        let i = (y * w + x) * 4;
        let a = frame.data[i + 3] as i32;
        let r = frame.data[i] as i32 * a / 255;
        let g = frame.data[i + 1] as i32 * a / 255;
        let b = frame.data[i + 2] as i32 * a / 255;
        (r, g, b)
    };

    for y in 0..h {
        for x in 0..w {
            let (r, g, b) = rgb_at(x, y);
            y_plane[y * w + x] = (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16) as u8;
        }
    }

    for cy in 0..uv_h {
        for cx in 0..uv_w {
            let (mut r, mut g, mut b) = (0, 0, 0);
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (pr, pg, pb) = rgb_at(cx * 2 + dx, cy * 2 + dy);
                r += pr;
                g += pg;
                b += pb;
            }
            let (r, g, b) = (r / 4, g / 4, b / 4);
            let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
            let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
            u_plane[cy * uv_w + cx] = u.clamp(0, 255) as u8;
            v_plane[cy * uv_w + cx] = v.clamp(0, 255) as u8;
        }
    }

    Ok(out)
}

fn flatten_over_black(frame: &FrameBuffer) -> Vec<u8> {
    let mut out = frame.data.clone();
    for px in out.chunks_exact_mut(4) {
        let a = px[3] as u16;
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
        px[3] = 255;
    }
    out
}
