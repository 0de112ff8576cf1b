//! # Label Templates
//!
//! A single type hierarchy that is both the Rust API and the JSON API.
//! [`PrintTemplate`] is constructible in Rust and deserializable from the
//! JSON records the template store keeps on disk.
//!
//! ```
//! use minilabel::template::{Element, ElementKind, PrintTemplate};
//!
//! // Rust construction
//! let template = PrintTemplate::new(384, 200)
//!     .with_element(Element::text("Hello", 10.0, 10.0, 24.0))
//!     .with_element(Element::qr_code("https://example.com", 240.0, 10.0, 120.0));
//!
//! // JSON deserialization
//! let json = r#"{
//!     "id": "demo",
//!     "canvas_width": 384,
//!     "canvas_height": 200,
//!     "elements": [
//!         {"type": "dynamic_string", "x": 10, "y": 10, "content": "NAME", "font_size": 24}
//!     ]
//! }"#;
//! let template: PrintTemplate = serde_json::from_str(json).unwrap();
//! assert_eq!(template.elements[0].kind, ElementKind::DynamicString);
//! ```
//!
//! ## Dynamic Elements
//!
//! For `DynamicString` and `DynamicQRCode` the element's `content` is a
//! *lookup key* into the per-job substitution map. A key that is missing
//! from the map is not an error: the content string itself is rendered
//! verbatim, so a template prints something sensible with partial data.

pub mod store;

pub use store::TemplateStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upper bound on canvas edge length. Rejects absurd records before a
/// multi-gigabyte allocation, not a hardware limit.
pub const MAX_CANVAS_DIM: u32 = 4096;

fn default_font_size() -> f32 {
    24.0
}

/// What an [`Element`] draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Literal text, drawn bold at the element's font size.
    Text,
    /// A raster asset, `content` is a path under the static-assets root.
    Image,
    /// A QR symbol encoding `content` literally.
    #[serde(rename = "qr_code")]
    QRCode,
    /// Text whose content is resolved through the substitution map.
    DynamicString,
    /// A QR symbol whose payload is resolved through the substitution map.
    #[serde(rename = "dynamic_qr_code")]
    DynamicQRCode,
}

impl ElementKind {
    /// Whether `content` is a substitution-map lookup key.
    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::DynamicString | Self::DynamicQRCode)
    }
}

/// One positioned item on a label.
///
/// `x`/`y` are canvas-space coordinates of the top-left corner of the
/// layout box; `width`/`height` describe the box that images and QR
/// symbols are stretched to fill (text ignores the box extent and draws
/// unclipped from the corner). `rotation` is degrees around the box
/// center.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    /// Degrees, pivot = box center. Applied per element only.
    #[serde(default)]
    pub rotation: f32,
    /// Literal text, asset path, or substitution key depending on `kind`.
    #[serde(default)]
    pub content: String,
    /// Pixel height of drawn text. Used by Text and DynamicString only.
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

impl Element {
    pub fn text(content: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        Self {
            kind: ElementKind::Text,
            x,
            y,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            content: content.into(),
            font_size,
        }
    }

    pub fn dynamic_string(key: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        Self {
            kind: ElementKind::DynamicString,
            ..Self::text(key, x, y, font_size)
        }
    }

    pub fn qr_code(content: impl Into<String>, x: f32, y: f32, size: f32) -> Self {
        Self {
            kind: ElementKind::QRCode,
            x,
            y,
            width: size,
            height: size,
            rotation: 0.0,
            content: content.into(),
            font_size: default_font_size(),
        }
    }

    pub fn image(path: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            kind: ElementKind::Image,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            content: path.into(),
            font_size: default_font_size(),
        }
    }

    /// Rotation in degrees around the box center.
    pub fn rotated(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    /// The string this element renders, after substitution.
    ///
    /// Dynamic kinds look `content` up in `data` and fall back to the
    /// content itself when the key is absent. Static kinds always render
    /// their content verbatim.
    pub fn resolve<'a>(&'a self, data: &'a HashMap<String, String>) -> &'a str {
        if self.kind.is_dynamic() {
            if let Some(value) = data.get(&self.content) {
                return value;
            }
        }
        &self.content
    }
}

/// A persisted label template: canvas dimensions plus an ordered element
/// list. Z-order is sequence order: later elements paint over earlier
/// ones where they overlap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintTemplate {
    /// Unique id, assigned at creation, immutable afterwards.
    #[serde(default)]
    pub id: String,
    /// Refreshed whenever the record is updated.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    pub canvas_width: u32,
    pub canvas_height: u32,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl PrintTemplate {
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            id: String::new(),
            created_at: Utc::now(),
            canvas_width,
            canvas_height,
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// Structural validation. A failing record is fatal for the render
    /// call that received it, never for the process.
    pub fn validate(&self) -> Result<(), String> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(format!(
                "canvas dimensions must be positive, got {}x{}",
                self.canvas_width, self.canvas_height
            ));
        }
        if self.canvas_width > MAX_CANVAS_DIM || self.canvas_height > MAX_CANVAS_DIM {
            return Err(format!(
                "canvas dimensions {}x{} exceed the {} px limit",
                self.canvas_width, self.canvas_height, MAX_CANVAS_DIM
            ));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
