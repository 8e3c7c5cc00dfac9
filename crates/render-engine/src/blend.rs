//! Frame buffer operations: straight-alpha blending, placement and scaling.

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_media_core::FrameBuffer;

/// Blend one byte toward `top` at `alpha` in [0, 1].
#[inline]
pub fn blend_byte(bottom: u8, top: u8, alpha: f32) -> u8 {
    ((1.0 - alpha) * bottom as f32 + alpha * top as f32)
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Composite `top` over `bottom` with straight (non-premultiplied) alpha.
///
/// `out.rgb = bottom.rgb * (1 - a) + top.rgb * a` where `a = top.a * opacity`,
/// and `out.a = max(bottom.a, top.a * opacity)`.
#[inline]
pub fn blend_pixel(bottom: [u8; 4], top: [u8; 4], opacity: f32) -> [u8; 4] {
    let opacity = opacity.clamp(0.0, 1.0);
    let a = top[3] as f32 / 255.0 * opacity;
    if a <= 0.0 {
        return bottom;
    }
    let top_alpha = (top[3] as f32 * opacity).round() as u8;
    [
        blend_byte(bottom[0], top[0], a),
        blend_byte(bottom[1], top[1], a),
        blend_byte(bottom[2], top[2], a),
        bottom[3].max(top_alpha),
    ]
}

/// Blend a same-sized frame over `dst`.
pub fn blend_in_place(dst: &mut FrameBuffer, src: &FrameBuffer, opacity: f32) -> ClipforgeResult<()> {
    if !dst.same_size(src) {
        return Err(ClipforgeError::invalid_parameter(format!(
            "blend size mismatch: {}x{} onto {}x{}",
            src.width, src.height, dst.width, dst.height
        )));
    }
    for (d, s) in dst.data.chunks_exact_mut(4).zip(src.data.chunks_exact(4)) {
        let out = blend_pixel([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Blend `src` over `dst` with its top-left corner at `(x, y)`.
///
/// The offset may be negative; whatever falls outside `dst` is dropped.
pub fn blend_at(dst: &mut FrameBuffer, src: &FrameBuffer, x: i64, y: i64, opacity: f32) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + src.width as i64).min(dst.width as i64);
    let y1 = (y + src.height as i64).min(dst.height as i64);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let dst_stride = dst.width as usize * 4;
    let src_stride = src.width as usize * 4;
    let span = (x1 - x0) as usize * 4;
    for dy in y0..y1 {
        let sy = (dy - y) as usize;
        let sx = (x0 - x) as usize;
        let d_off = dy as usize * dst_stride + x0 as usize * 4;
        let s_off = sy * src_stride + sx * 4;
        let d_row = &mut dst.data[d_off..d_off + span];
        let s_row = &src.data[s_off..s_off + span];
        for (d, s) in d_row.chunks_exact_mut(4).zip(s_row.chunks_exact(4)) {
            let out = blend_pixel([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
            d.copy_from_slice(&out);
        }
    }
}

/// Blend a solid rectangle, clipped to the frame.
pub fn fill_rect(dst: &mut FrameBuffer, x: i64, y: i64, width: i64, height: i64, rgba: [u8; 4]) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + width).min(dst.width as i64);
    let y1 = (y + height).min(dst.height as i64);
    for py in y0..y1 {
        for px in x0..x1 {
            let (px, py) = (px as u32, py as u32);
            if let Some(bottom) = dst.pixel(px, py) {
                dst.set_pixel(px, py, blend_pixel(bottom, rgba, 1.0));
            }
        }
    }
}

/// Bilinear resample of `src` to `width`x`height`.
pub fn scale_bilinear(src: &FrameBuffer, width: u32, height: u32) -> ClipforgeResult<FrameBuffer> {
    let mut out = FrameBuffer::try_new(width, height)?;
    if src.width == width && src.height == height {
        out.data.copy_from_slice(&src.data);
        out.timestamp_ms = src.timestamp_ms;
        return Ok(out);
    }

    let sx_ratio = src.width as f32 / width as f32;
    let sy_ratio = src.height as f32 / height as f32;
    let max_x = src.width as usize - 1;
    let max_y = src.height as usize - 1;
    let stride = src.width as usize * 4;

    for y in 0..height as usize {
        let fy = ((y as f32 + 0.5) * sy_ratio - 0.5).max(0.0);
        let y0 = (fy as usize).min(max_y);
        let y1 = (y0 + 1).min(max_y);
        let ty = fy - y0 as f32;
        for x in 0..width as usize {
            let fx = ((x as f32 + 0.5) * sx_ratio - 0.5).max(0.0);
            let x0 = (fx as usize).min(max_x);
            let x1 = (x0 + 1).min(max_x);
            let tx = fx - x0 as f32;

            let o = (y * width as usize + x) * 4;
            for c in 0..4 {
                let p00 = src.data[y0 * stride + x0 * 4 + c] as f32;
                let p10 = src.data[y0 * stride + x1 * 4 + c] as f32;
                let p01 = src.data[y1 * stride + x0 * 4 + c] as f32;
                let p11 = src.data[y1 * stride + x1 * 4 + c] as f32;
                let top = p00 + (p10 - p00) * tx;
                let bottom = p01 + (p11 - p01) * tx;
                out.data[o + c] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out.timestamp_ms = src.timestamp_ms;
    Ok(out)
}
