//! # Pipeline Tests
//!
//! End-to-end coverage of the render → pack pipeline using the same JSON
//! template shape the HTTP API accepts: deserialize a template, render it
//! with substitutions, and inspect the packed line frames.

use std::collections::HashMap;

use minilabel::protocol::{self, LINE_WIDTH_BYTES, LINE_WIDTH_DOTS};
use minilabel::render::LabelRenderer;
use minilabel::template::PrintTemplate;

fn pack(image: &image::RgbaImage) -> Vec<[u8; LINE_WIDTH_BYTES]> {
    (0..image.height())
        .map(|y| protocol::pack_row((0..image.width()).map(|x| *image.get_pixel(x, y))))
        .collect()
}

fn substitutions(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn json_template_renders_and_packs() {
    let json = format!(
        r#"{{
            "id": "shelf-label",
            "canvas_width": {LINE_WIDTH_DOTS},
            "canvas_height": 120,
            "elements": [
                {{"type": "text", "x": 8, "y": 8, "content": "SKU", "font_size": 24}},
                {{"type": "dynamic_string", "x": 8, "y": 40, "content": "SKU_CODE", "font_size": 32}},
                {{"type": "dynamic_qr_code", "x": 260, "y": 8, "width": 100, "height": 100, "content": "SKU_CODE"}}
            ]
        }}"#
    );
    let template: PrintTemplate = serde_json::from_str(&json).unwrap();

    let renderer = LabelRenderer::new("/nonexistent/assets");
    let image = renderer
        .render(&template, &substitutions(&[("SKU_CODE", "A-1234")]))
        .unwrap();

    assert_eq!(image.width(), LINE_WIDTH_DOTS);
    assert_eq!(image.height(), 120);

    let frames = pack(&image);
    assert_eq!(frames.len(), 120);
    assert!(frames.iter().all(|f| f.len() == LINE_WIDTH_BYTES));
    // Text rows and QR rows both produced ink.
    assert!(frames[10].iter().any(|&b| b != 0));
    assert!(frames[50].iter().any(|&b| b != 0));
}

#[test]
fn oversized_canvas_rows_truncate_to_head_width() {
    // A 500 px wide template still packs to 48-byte frames; ink beyond
    // x = 383 is dropped.
    let json = r#"{
        "id": "wide",
        "canvas_width": 500,
        "canvas_height": 60,
        "elements": [
            {"type": "qr_code", "x": 400, "y": 2, "width": 56, "height": 56, "content": "offscreen"}
        ]
    }"#;
    let template: PrintTemplate = serde_json::from_str(json).unwrap();

    let renderer = LabelRenderer::new("/nonexistent/assets");
    let image = renderer.render(&template, &HashMap::new()).unwrap();
    assert_eq!(image.width(), 500);

    // The symbol rendered right of the print head: every frame is blank.
    let frames = pack(&image);
    assert!(
        frames.iter().all(|f| f.iter().all(|&b| b == 0)),
        "ink past the head width must not reach the wire"
    );
}

#[test]
fn substitution_changes_the_wire_frames() {
    let json = format!(
        r#"{{
            "id": "name-tag",
            "canvas_width": {LINE_WIDTH_DOTS},
            "canvas_height": 48,
            "elements": [
                {{"type": "dynamic_string", "x": 4, "y": 4, "content": "NAME", "font_size": 32}}
            ]
        }}"#
    );
    let template: PrintTemplate = serde_json::from_str(&json).unwrap();
    let renderer = LabelRenderer::new("/nonexistent/assets");

    let with_map = renderer
        .render(&template, &substitutions(&[("NAME", "Alice")]))
        .unwrap();
    let without_map = renderer.render(&template, &HashMap::new()).unwrap();

    assert_ne!(
        pack(&with_map),
        pack(&without_map),
        "substituted and fallback output must differ on the wire"
    );
}
