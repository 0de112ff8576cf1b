//! # Raster Canvas
//!
//! An RGBA drawing surface with a save/restore transform stack, used by the
//! label renderer to composite elements. The transform model mirrors a
//! conventional 2-D graphics context: drawing happens in *user space*, the
//! current affine transform maps user space to device pixels, and
//! `save()`/`restore()` scope a transform change to one element.
//!
//! All primitives go through one inverse-mapping paint path, so rotation
//! applies uniformly to rectangles, glyph runs, and stretched image blits
//! without leaving sampling holes.

use image::{Rgba, RgbaImage};

/// Opaque white, the canvas background.
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Opaque black, the only ink the print head knows.
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Row-major 2×3 affine transform.
///
/// ```text
/// | a  b  c |   x' = a*x + b*y + c
/// | d  e  f |   y' = d*x + e*y + f
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 0.0,
        e: 1.0,
        f: 0.0,
    };

    /// Rotation by `degrees` around the pivot `(cx, cy)`:
    /// translate(cx, cy) · rotate(θ) · translate(-cx, -cy).
    pub fn rotation_about(cx: f32, cy: f32, degrees: f32) -> Self {
        let radians = degrees.to_radians();
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: -sin,
            c: cx - cos * cx + sin * cy,
            d: sin,
            e: cos,
            f: cy - sin * cx - cos * cy,
        }
    }

    /// Map a user-space point to device space.
    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.b * y + self.c,
            self.d * x + self.e * y + self.f,
        )
    }

    /// Compose with `inner` applied first: `(self ∘ inner)(p) = self(inner(p))`.
    pub fn compose(&self, inner: &Transform) -> Self {
        Self {
            a: self.a * inner.a + self.b * inner.d,
            b: self.a * inner.b + self.b * inner.e,
            c: self.a * inner.c + self.b * inner.f + self.c,
            d: self.d * inner.a + self.e * inner.d,
            e: self.d * inner.b + self.e * inner.e,
            f: self.d * inner.c + self.e * inner.f + self.f,
        }
    }

    /// Inverse transform, or `None` for a degenerate matrix.
    pub fn invert(&self) -> Option<Self> {
        let det = self.a * self.e - self.b * self.d;
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Self {
            a: self.e * inv_det,
            b: -self.b * inv_det,
            c: (self.b * self.f - self.e * self.c) * inv_det,
            d: -self.d * inv_det,
            e: self.a * inv_det,
            f: (self.d * self.c - self.a * self.f) * inv_det,
        })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// RGBA surface plus the current transform and its save stack.
pub struct Canvas {
    image: RgbaImage,
    transform: Transform,
    stack: Vec<Transform>,
}

impl Canvas {
    /// A white canvas of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, WHITE),
            transform: Transform::IDENTITY,
            stack: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the canvas, yielding the finished raster.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Push the current transform. Pair with [`Canvas::restore`].
    pub fn save(&mut self) {
        self.stack.push(self.transform);
    }

    /// Pop back to the previously saved transform. Unbalanced restores
    /// reset to identity rather than panicking.
    pub fn restore(&mut self) {
        self.transform = self.stack.pop().unwrap_or(Transform::IDENTITY);
    }

    /// Apply a rotation around `(cx, cy)` in user space, in front of the
    /// current transform (the same prepend semantics as a GDI/skia
    /// context).
    pub fn rotate_about(&mut self, cx: f32, cy: f32, degrees: f32) {
        let rotation = Transform::rotation_about(cx, cy, degrees);
        self.transform = self.transform.compose(&rotation);
    }

    /// Fill the axis-aligned user-space rect with a solid color.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba<u8>) {
        self.paint(x, y, w, h, |_, _| Some(color));
    }

    /// Outline the user-space rect with strokes of `thickness` drawn
    /// inward from each edge.
    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, thickness: f32, color: Rgba<u8>) {
        let t = thickness.min(w / 2.0).min(h / 2.0);
        self.fill_rect(x, y, w, t, color);
        self.fill_rect(x, y + h - t, w, t, color);
        self.fill_rect(x, y, t, h, color);
        self.fill_rect(x + w - t, y, t, h, color);
    }

    /// Draw `src` stretched to exactly fill the user-space box, nearest
    /// neighbor sampled. Aspect ratio is NOT preserved.
    pub fn blit_stretched(&mut self, src: &RgbaImage, x: f32, y: f32, w: f32, h: f32) {
        let (src_w, src_h) = (src.width(), src.height());
        if src_w == 0 || src_h == 0 {
            return;
        }
        self.paint(x, y, w, h, |u, v| {
            let sx = ((u / w) * src_w as f32) as u32;
            let sy = ((v / h) * src_h as f32) as u32;
            Some(*src.get_pixel(sx.min(src_w - 1), sy.min(src_h - 1)))
        });
    }

    /// Draw a 1-byte-per-pixel mask (non-zero = ink) at 1:1 scale with its
    /// top-left corner at `(x, y)`, in `color`. Zero mask pixels leave the
    /// canvas untouched.
    pub fn blit_mask(
        &mut self,
        mask: &[u8],
        mask_w: usize,
        mask_h: usize,
        x: f32,
        y: f32,
        color: Rgba<u8>,
    ) {
        if mask_w == 0 || mask_h == 0 {
            return;
        }
        debug_assert_eq!(mask.len(), mask_w * mask_h);
        self.paint(x, y, mask_w as f32, mask_h as f32, |u, v| {
            let mx = u as usize;
            let my = v as usize;
            if mx < mask_w && my < mask_h && mask[my * mask_w + mx] != 0 {
                Some(color)
            } else {
                None
            }
        });
    }

    /// Shared paint path: rasterize the user-space box `(x, y, w, h)`
    /// through the current transform. `sample` receives box-local
    /// coordinates `(u, v)` in `[0, w) × [0, h)` and returns the color for
    /// that spot, or `None` to leave the pixel alone.
    ///
    /// Device pixels are tested at their centers against the inverse
    /// transform, so rotated shapes rasterize without holes.
    fn paint<F>(&mut self, x: f32, y: f32, w: f32, h: f32, sample: F)
    where
        F: Fn(f32, f32) -> Option<Rgba<u8>>,
    {
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let Some(inverse) = self.transform.invert() else {
            return;
        };

        // Device-space bounding box of the transformed corners.
        let corners = [
            self.transform.apply(x, y),
            self.transform.apply(x + w, y),
            self.transform.apply(x, y + h),
            self.transform.apply(x + w, y + h),
        ];
        let min_x = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max);

        let x0 = (min_x.floor().max(0.0)) as u32;
        let y0 = (min_y.floor().max(0.0)) as u32;
        let x1 = (max_x.ceil().min(self.image.width() as f32)) as u32;
        let y1 = (max_y.ceil().min(self.image.height() as f32)) as u32;

        for py in y0..y1 {
            for px in x0..x1 {
                let (ux, uy) = inverse.apply(px as f32 + 0.5, py as f32 + 0.5);
                let (u, v) = (ux - x, uy - y);
                if u < 0.0 || v < 0.0 || u >= w || v >= h {
                    continue;
                }
                if let Some(color) = sample(u, v) {
                    self.image.put_pixel(px, py, color);
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
