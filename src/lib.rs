//! # Minilabel - BLE Label Printer Library
//!
//! Minilabel is a Rust library for rendering and printing labels on
//! "Mini-Printer" BLE thermal printers. It provides:
//!
//! - **Connection management**: name-filtered BLE discovery with bounded
//!   retry and explicit session teardown
//! - **Line protocol**: 48-byte MSB-first monochrome rows plus the
//!   end-of-image sentinel
//! - **Label rendering**: declarative templates (text, images, QR codes,
//!   runtime-substituted dynamic fields) composited onto a raster canvas
//! - **Transport**: paced write-without-response delivery, row by row
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::collections::HashMap;
//! use minilabel::{
//!     printer::{PrinterConfig, PrinterService},
//!     template::{Element, PrintTemplate},
//! };
//!
//! # async fn example() -> Result<(), minilabel::MiniLabelError> {
//! // Connect via the host's Bluetooth adapter
//! let printer = PrinterService::with_system_ble(
//!     PrinterConfig::MINI_PRINTER,
//!     "assets",
//! ).await?;
//!
//! // A label with one dynamic field
//! let template = PrintTemplate::new(384, 200)
//!     .with_element(Element::text("Hello", 10.0, 10.0, 24.0))
//!     .with_element(Element::dynamic_string("NAME", 10.0, 40.0, 24.0));
//!
//! let mut data = HashMap::new();
//! data.insert("NAME".to_string(), "Alice".to_string());
//!
//! // Ensure-connected → render → transmit, serialized internally
//! printer.print_template(&template, &data).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`ble`] | Discovery/connection state machine and GATT backend |
//! | [`protocol`] | Line packing and the end-of-image sentinel |
//! | [`render`] | Template → raster compositor |
//! | [`template`] | Template model and JSON-file store |
//! | [`transport`] | Paced row-by-row delivery |
//! | [`printer`] | Facade and printer configuration |
//! | [`server`] | HTTP API over the facade |
//! | [`error`] | Error types |

pub mod ble;
pub mod error;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod server;
pub mod template;
pub mod transport;

// Re-exports for convenience
pub use error::MiniLabelError;
pub use printer::{PrinterConfig, PrinterService};
pub use render::LabelRenderer;
pub use template::PrintTemplate;
