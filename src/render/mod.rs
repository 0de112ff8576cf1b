//! # Label Renderer
//!
//! Turns a [`PrintTemplate`](crate::template::PrintTemplate) plus a
//! per-job substitution map into a finished raster canvas. The renderer is
//! a pure, single-pass, order-dependent compositor: elements draw in
//! sequence, later elements paint over earlier ones, and each element's
//! rotation is scoped to its own draw calls by the canvas transform stack.
//!
//! The renderer performs no printer I/O. Its output feeds the line
//! protocol packer (see [`crate::protocol`]) via the transport.
//!
//! ## Degradation Policy
//!
//! A missing or undecodable image asset never aborts a render: the element
//! degrades to a black-bordered placeholder box with an "Img Missing"
//! label, and the remaining elements still draw. Only structurally
//! invalid templates (zero-sized canvas) and unencodable QR payloads fail
//! the render call.

pub mod canvas;
pub mod font;

pub use canvas::{BLACK, Canvas, WHITE};

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::warn;
use qrcode::{EcLevel, QrCode};

use crate::error::RenderError;
use crate::protocol::LINE_WIDTH_DOTS;
use crate::template::{Element, ElementKind, PrintTemplate};

/// Rotations smaller than this (degrees) are treated as none.
const ROTATION_EPSILON_DEG: f32 = 0.1;

/// Stroke width of the missing-image placeholder border.
const PLACEHOLDER_BORDER: f32 = 2.0;

/// Font size of the "Img Missing" placeholder label.
const PLACEHOLDER_FONT_SIZE: f32 = 8.0;

/// QR size (dots) and top margin of the quick card layout.
const CARD_QR_SIZE: f32 = 250.0;
const CARD_QR_TOP: f32 = 10.0;
const CARD_TEXT_GAP: f32 = 20.0;
const CARD_FONT_SIZE: f32 = 24.0;

/// Renders label templates against a static-assets root directory.
pub struct LabelRenderer {
    assets_root: PathBuf,
}

impl LabelRenderer {
    pub fn new(assets_root: impl Into<PathBuf>) -> Self {
        Self {
            assets_root: assets_root.into(),
        }
    }

    pub fn assets_root(&self) -> &Path {
        &self.assets_root
    }

    /// Render a template with the given substitution map.
    ///
    /// The template record is read-only here; the canvas is created fresh
    /// for this job and handed to the caller by value.
    pub fn render(
        &self,
        template: &PrintTemplate,
        data: &HashMap<String, String>,
    ) -> Result<RgbaImage, RenderError> {
        template.validate().map_err(RenderError::InvalidTemplate)?;

        let mut canvas = Canvas::new(template.canvas_width, template.canvas_height);
        for element in &template.elements {
            self.draw_element(&mut canvas, element, data)?;
        }
        Ok(canvas.into_image())
    }

    fn draw_element(
        &self,
        canvas: &mut Canvas,
        element: &Element,
        data: &HashMap<String, String>,
    ) -> Result<(), RenderError> {
        let (x, y, w, h) = (element.x, element.y, element.width, element.height);

        canvas.save();
        if element.rotation.abs() > ROTATION_EPSILON_DEG {
            canvas.rotate_about(x + w / 2.0, y + h / 2.0, element.rotation);
        }

        let value = element.resolve(data);
        let result = match element.kind {
            ElementKind::Text => {
                font::draw_text(canvas, &element.content, x, y, element.font_size, true, BLACK);
                Ok(())
            }
            ElementKind::DynamicString => {
                font::draw_text(canvas, value, x, y, element.font_size, true, BLACK);
                Ok(())
            }
            ElementKind::Image => {
                self.draw_image(canvas, element);
                Ok(())
            }
            ElementKind::QRCode => draw_qr(canvas, &element.content, x, y, w, h),
            ElementKind::DynamicQRCode => draw_qr(canvas, value, x, y, w, h),
        };

        canvas.restore();
        result
    }

    /// Draw an image asset stretched to the element box. Asset problems
    /// degrade to a visible placeholder; they never fail the render.
    fn draw_image(&self, canvas: &mut Canvas, element: &Element) {
        // An element with no path configured draws nothing at all.
        if element.content.is_empty() {
            return;
        }

        let relative = element.content.trim_start_matches(['/', '\\']);
        let path = self.assets_root.join(relative);

        match image::open(&path) {
            Ok(decoded) => {
                // Normalize whatever was on disk to a plain RGBA raster
                // before compositing.
                let raster = decoded.to_rgba8();
                canvas.blit_stretched(&raster, element.x, element.y, element.width, element.height);
            }
            Err(e) => {
                warn!("image asset failed to load, path: {}: {}", path.display(), e);
                canvas.stroke_rect(
                    element.x,
                    element.y,
                    element.width,
                    element.height,
                    PLACEHOLDER_BORDER,
                    BLACK,
                );
                font::draw_text(
                    canvas,
                    "Img Missing",
                    element.x + PLACEHOLDER_BORDER + 1.0,
                    element.y + PLACEHOLDER_BORDER + 1.0,
                    PLACEHOLDER_FONT_SIZE,
                    false,
                    BLACK,
                );
            }
        }
    }
}

/// Render the fixed quick-print card: a centered QR symbol above a line of
/// centered bold text, at the print head's native width.
///
/// ```text
/// ┌───────── 384 ─────────┐
/// │       ┌───────┐       │
/// │       │  QR   │ 250px │
/// │       └───────┘       │
/// │      BOLD TEXT        │
/// └───────────────────────┘
/// ```
pub fn render_card(text: &str, qr_content: &str) -> Result<RgbaImage, RenderError> {
    let width = LINE_WIDTH_DOTS;
    let height = width;
    let mut canvas = Canvas::new(width, height);

    let qr_x = (width as f32 - CARD_QR_SIZE) / 2.0;
    draw_qr(&mut canvas, qr_content, qr_x, CARD_QR_TOP, CARD_QR_SIZE, CARD_QR_SIZE)?;

    let (text_width, _) = font::measure(text, CARD_FONT_SIZE);
    let text_x = (width as f32 - text_width) / 2.0;
    let text_y = CARD_QR_TOP + CARD_QR_SIZE + CARD_TEXT_GAP;
    font::draw_text(&mut canvas, text, text_x, text_y, CARD_FONT_SIZE, true, BLACK);

    Ok(canvas.into_image())
}

/// Generate a QR symbol and draw it stretched to the given box.
///
/// Empty content is encoded as a single space: the symbol generator
/// rejects empty payloads, and a label with a blank dynamic field should
/// still print.
fn draw_qr(
    canvas: &mut Canvas,
    content: &str,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
) -> Result<(), RenderError> {
    let payload = if content.is_empty() { " " } else { content };
    let symbol = qr_symbol(payload)?;
    canvas.blit_stretched(&symbol, x, y, w, h);
    Ok(())
}

/// Build the module matrix for a payload at error-correction level Q,
/// one pixel per module plus the standard 4-module quiet zone.
fn qr_symbol(payload: &str) -> Result<RgbaImage, RenderError> {
    const QUIET_ZONE: u32 = 4;

    let code = QrCode::with_error_correction_level(payload, EcLevel::Q)
        .map_err(|e| RenderError::Qr(e.to_string()))?;

    let modules = code.width() as u32;
    let size = modules + 2 * QUIET_ZONE;
    let mut symbol = RgbaImage::from_pixel(size, size, WHITE);
    for qy in 0..modules {
        for qx in 0..modules {
            if code[(qx as usize, qy as usize)] == qrcode::Color::Dark {
                symbol.put_pixel(qx + QUIET_ZONE, qy + QUIET_ZONE, BLACK);
            }
        }
    }
    Ok(symbol)
}

/// Encode a finished canvas as PNG, for previews and the render endpoint.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(bytes)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Element, PrintTemplate};

    fn renderer() -> LabelRenderer {
        // Tests never hit the filesystem unless they want a decode failure.
        LabelRenderer::new("/nonexistent/assets")
    }

    fn data(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn has_black(image: &RgbaImage) -> bool {
        image.pixels().any(|p| *p == BLACK)
    }

    #[test]
    fn test_empty_template_renders_white_canvas() {
        let template = PrintTemplate::new(64, 32);
        let image = renderer().render(&template, &HashMap::new()).unwrap();
        assert_eq!(image.dimensions(), (64, 32));
        assert!(!has_black(&image));
    }

    #[test]
    fn test_invalid_template_is_fatal() {
        let template = PrintTemplate::new(0, 32);
        assert!(matches!(
            renderer().render(&template, &HashMap::new()),
            Err(RenderError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_substitution_hit_renders_mapped_value() {
        // DynamicString with a mapping draws the same pixels as a literal
        // Text element with the mapped value.
        let dynamic = PrintTemplate::new(200, 40)
            .with_element(Element::dynamic_string("NAME", 4.0, 4.0, 24.0));
        let literal =
            PrintTemplate::new(200, 40).with_element(Element::text("Alice", 4.0, 4.0, 24.0));

        let rendered = renderer()
            .render(&dynamic, &data(&[("NAME", "Alice")]))
            .unwrap();
        let expected = renderer().render(&literal, &HashMap::new()).unwrap();
        assert_eq!(rendered.as_raw(), expected.as_raw());
        assert!(has_black(&rendered));
    }

    #[test]
    fn test_substitution_miss_renders_key_verbatim() {
        let dynamic = PrintTemplate::new(200, 40)
            .with_element(Element::dynamic_string("NAME", 4.0, 4.0, 24.0));
        let literal =
            PrintTemplate::new(200, 40).with_element(Element::text("NAME", 4.0, 4.0, 24.0));

        let rendered = renderer().render(&dynamic, &HashMap::new()).unwrap();
        let expected = renderer().render(&literal, &HashMap::new()).unwrap();
        assert_eq!(rendered.as_raw(), expected.as_raw());
    }

    #[test]
    fn test_missing_image_degrades_to_placeholder() {
        let template = PrintTemplate::new(120, 120)
            .with_element(Element::image("no/such/file.png", 10.0, 10.0, 100.0, 100.0));

        let image = renderer().render(&template, &HashMap::new()).unwrap();

        // Border pixels of the placeholder box are black.
        assert_eq!(*image.get_pixel(10, 10), BLACK);
        assert_eq!(*image.get_pixel(109, 10), BLACK);
        assert_eq!(*image.get_pixel(10, 109), BLACK);
        // Box center (clear of border and label) stays white.
        assert_eq!(*image.get_pixel(60, 80), WHITE);
    }

    #[test]
    fn test_image_with_empty_path_draws_nothing() {
        let template =
            PrintTemplate::new(64, 64).with_element(Element::image("", 0.0, 0.0, 64.0, 64.0));
        let image = renderer().render(&template, &HashMap::new()).unwrap();
        assert!(!has_black(&image));
    }

    #[test]
    fn test_leading_separators_stripped_from_asset_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut asset = RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255]));
        asset.put_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        asset.save(dir.path().join("logo.png")).unwrap();

        let renderer = LabelRenderer::new(dir.path());
        let template = PrintTemplate::new(32, 32)
            .with_element(Element::image("/logo.png", 0.0, 0.0, 32.0, 32.0));
        let image = renderer.render(&template, &HashMap::new()).unwrap();

        // The asset resolved and was stretched over the box, no border
        // placeholder, top-left quadrant black.
        assert_eq!(*image.get_pixel(2, 2), BLACK);
        assert_eq!(*image.get_pixel(30, 30), WHITE);
    }

    #[test]
    fn test_rotated_element_does_not_disturb_next_element() {
        // Property: a rotated element followed by an unrotated one leaves
        // the second element's pixels identical to rendering it alone.
        let second = Element::text("OK", 200.0, 200.0, 24.0);

        let both = PrintTemplate::new(300, 260)
            .with_element(Element::qr_code("rotated", 10.0, 10.0, 80.0).rotated(45.0))
            .with_element(second.clone());
        let alone = PrintTemplate::new(300, 260).with_element(second);

        let rendered_both = renderer().render(&both, &HashMap::new()).unwrap();
        let rendered_alone = renderer().render(&alone, &HashMap::new()).unwrap();

        // The rotated QR (box center (50,50), half-diagonal ~57) cannot
        // reach x,y >= 150; compare everything from there on.
        for y in 150..260 {
            for x in 150..300 {
                assert_eq!(
                    rendered_both.get_pixel(x, y),
                    rendered_alone.get_pixel(x, y),
                    "pixel mismatch at ({x},{y})"
                );
            }
        }
    }

    #[test]
    fn test_qr_empty_content_encodes_as_space() {
        let template =
            PrintTemplate::new(100, 100).with_element(Element::qr_code("", 10.0, 10.0, 80.0));
        let image = renderer().render(&template, &HashMap::new()).unwrap();
        assert!(has_black(&image));
    }

    #[test]
    fn test_dynamic_qr_uses_substituted_payload() {
        let template = PrintTemplate::new(100, 100).with_element(Element {
            kind: crate::template::ElementKind::DynamicQRCode,
            ..Element::qr_code("ORDER", 10.0, 10.0, 80.0)
        });

        let with_value = renderer()
            .render(&template, &data(&[("ORDER", "A-1234")]))
            .unwrap();
        let without = renderer().render(&template, &HashMap::new()).unwrap();
        // Different payloads produce different symbols.
        assert_ne!(with_value.as_raw(), without.as_raw());
    }

    #[test]
    fn test_elements_paint_in_sequence_order() {
        // A white-on-white check: later element overwrites earlier pixels.
        let dir = tempfile::tempdir().unwrap();
        let white = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        white.save(dir.path().join("white.png")).unwrap();

        let renderer = LabelRenderer::new(dir.path());
        let template = PrintTemplate::new(60, 60)
            .with_element(Element::qr_code("under", 0.0, 0.0, 60.0))
            .with_element(Element::image("white.png", 0.0, 0.0, 60.0, 60.0));

        let image = renderer.render(&template, &HashMap::new()).unwrap();
        assert!(!has_black(&image));
    }

    #[test]
    fn test_card_layout() {
        let image = render_card("hello", "https://example.com").unwrap();
        assert_eq!(image.dimensions(), (384, 384));

        // QR modules land inside the centered 250px box.
        let qr_region_black = (0..250u32).any(|dy| {
            (0..250u32).any(|dx| *image.get_pixel(67 + dx, 10 + dy) == BLACK)
        });
        assert!(qr_region_black);

        // Text row below the QR has ink; area left of the QR stays white.
        let text_band_black =
            image.enumerate_pixels().any(|(_, y, p)| y >= 280 && *p == BLACK);
        assert!(text_band_black);
        assert_eq!(*image.get_pixel(5, 5), WHITE);
    }

    #[test]
    fn test_encode_png_round_trip() {
        let template =
            PrintTemplate::new(40, 20).with_element(Element::text("x", 2.0, 2.0, 12.0));
        let image = renderer().render(&template, &HashMap::new()).unwrap();
        let png = encode_png(&image).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), image.as_raw());
    }
}
