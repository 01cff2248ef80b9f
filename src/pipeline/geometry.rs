//! Pixel geometry and compositing primitives shared by the strategies.

use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgba, RgbaImage};

/// Pixel rectangle inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Rectangle expressed as fractions of the image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RelRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn to_pixels(self, width: u32, height: u32) -> Rect {
        let w = width as f32;
        let h = height as f32;
        Rect {
            x: (self.x * w).round() as u32,
            y: (self.y * h).round() as u32,
            width: ((self.width * w).round() as u32).max(1),
            height: ((self.height * h).round() as u32).max(1),
        }
    }
}

/// Largest size with the source aspect ratio that fits inside `max`.
pub fn fit_inside(src: (u32, u32), max: (u32, u32), allow_enlarge: bool) -> (u32, u32) {
    let (sw, sh) = (src.0.max(1) as f64, src.1.max(1) as f64);
    let mut scale = (max.0 as f64 / sw).min(max.1 as f64 / sh);
    if !allow_enlarge {
        scale = scale.min(1.0);
    }
    (
        ((sw * scale).round() as u32).max(1),
        ((sh * scale).round() as u32).max(1),
    )
}

/// Top-left corner that centers `size` inside `outer`.
pub fn center_in(size: (u32, u32), outer: Rect) -> (i64, i64) {
    (
        outer.x as i64 + (outer.width as i64 - size.0 as i64) / 2,
        outer.y as i64 + (outer.height as i64 - size.1 as i64) / 2,
    )
}

pub fn resize_logo(logo: &DynamicImage, size: (u32, u32)) -> RgbaImage {
    if logo.dimensions() == size {
        return logo.to_rgba8();
    }
    logo.resize_exact(size.0, size.1, FilterType::Lanczos3).to_rgba8()
}

/// Source-over compositing of `top` onto `base` at (x, y), with `top`'s alpha
/// scaled by `opacity`. Pixels outside `base` are clipped.
pub fn draw_over(base: &mut RgbaImage, top: &RgbaImage, x: i64, y: i64, opacity: f32) {
    blend_onto(base, top, x, y, opacity, |_, top| top);
}

/// Like [`draw_over`] but the colour written is `blend(base_rgb, top_rgb)`.
pub fn blend_onto<F>(base: &mut RgbaImage, top: &RgbaImage, x: i64, y: i64, opacity: f32, blend: F)
where
    F: Fn([f32; 3], [f32; 3]) -> [f32; 3],
{
    let (bw, bh) = base.dimensions();
    for (tx, ty, top_px) in top.enumerate_pixels() {
        let px = x + tx as i64;
        let py = y + ty as i64;
        if px < 0 || py < 0 || px >= bw as i64 || py >= bh as i64 {
            continue;
        }
        let ta = top_px.0[3] as f32 / 255.0 * opacity;
        if ta <= 0.0 {
            continue;
        }

        let base_px = base.get_pixel_mut(px as u32, py as u32);
        let ba = base_px.0[3] as f32 / 255.0;
        let b = unit_rgb(base_px);
        let t = unit_rgb(top_px);

        // On transparent base pixels there is nothing to blend against.
        let blended = blend(b, t);
        let colour: [f32; 3] = std::array::from_fn(|i| t[i] + (blended[i] - t[i]) * ba);

        let out_a = ta + ba * (1.0 - ta);
        let mut out = [0u8; 4];
        for i in 0..3 {
            let c = (colour[i] * ta + b[i] * ba * (1.0 - ta)) / out_a.max(f32::EPSILON);
            out[i] = to_byte(c);
        }
        out[3] = to_byte(out_a);
        *base_px = Rgba(out);
    }
}

/// Overlay blend per channel, all values in 0..=1.
pub fn overlay(base: [f32; 3], top: [f32; 3]) -> [f32; 3] {
    std::array::from_fn(|i| {
        let (b, t) = (base[i], top[i]);
        if b < 0.5 {
            2.0 * b * t
        } else {
            1.0 - 2.0 * (1.0 - b) * (1.0 - t)
        }
    })
}

pub fn multiply(base: [f32; 3], top: [f32; 3]) -> [f32; 3] {
    std::array::from_fn(|i| base[i] * top[i])
}

/// Scales brightness and pulls saturation toward the pixel's luma.
pub fn tone_down(img: &mut RgbaImage, brightness: f32, saturation: f32) {
    for px in img.pixels_mut() {
        let [r, g, b] = unit_rgb(px);
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        for (i, c) in [r, g, b].into_iter().enumerate() {
            let saturated = luma + (c - luma) * saturation;
            px.0[i] = to_byte(saturated * brightness);
        }
    }
}

/// Edit mask in the "transparent = editable" convention: opaque black
/// everywhere except a hole over `hole` whose edge fades over `feather` px.
pub fn feathered_mask(width: u32, height: u32, hole: Rect, feather: f32) -> RgbaImage {
    let half_w = hole.width as f32 / 2.0;
    let half_h = hole.height as f32 / 2.0;
    let cx = hole.x as f32 + half_w;
    let cy = hole.y as f32 + half_h;
    let feather = feather.max(0.0);

    RgbaImage::from_fn(width, height, |x, y| {
        let qx = (x as f32 + 0.5 - cx).abs() - half_w;
        let qy = (y as f32 + 0.5 - cy).abs() - half_h;
        let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
        let inside = qx.max(qy).min(0.0);
        let distance = outside + inside;

        let alpha = if feather == 0.0 {
            if distance > 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            smoothstep(-feather, feather, distance)
        };
        Rgba([0, 0, 0, to_byte(alpha)])
    })
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn unit_rgb(px: &Rgba<u8>) -> [f32; 3] {
    [
        px.0[0] as f32 / 255.0,
        px.0[1] as f32 / 255.0,
        px.0[2] as f32 / 255.0,
    ]
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}
