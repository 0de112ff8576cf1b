//! # Error Types
//!
//! This module defines error types used throughout the minilabel library.
//!
//! The taxonomy is deliberately small: transient conditions (a scan that
//! finds nothing, a dropped row write, a missing image asset) are absorbed
//! where they occur; only terminal conditions surface through these types.

use thiserror::Error;

/// Terminal connection failures surfaced by the connection manager.
///
/// Individual scan/connect steps that fail inside the retry loop are
/// represented by [`AttemptError`] and never escape it.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No usable Bluetooth adapter on this host.
    #[error("no usable Bluetooth adapter: {0}")]
    Adapter(String),

    /// Every connect attempt failed; the printer stays disconnected.
    #[error("could not connect to printer after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

/// One failed step inside a single connect attempt.
///
/// These are recoverable by definition: the retry loop logs them, disposes
/// any partially-acquired handles, and tries again.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The device found by the scan vanished before it could be opened.
    #[error("device {0} is no longer available")]
    Gone(String),

    /// The fixed GATT service was not present on the device.
    #[error("printer GATT service not found")]
    ServiceMissing,

    /// The write characteristic was not present in the service.
    #[error("write characteristic not found")]
    CharacteristicMissing,

    /// A native scan/connect call failed.
    #[error("{0}")]
    Backend(String),
}

/// Transmission failures.
#[derive(Debug, Error)]
pub enum PrintError {
    /// A write was attempted without an established link.
    #[error("printer link is not connected")]
    NotConnected,

    /// A characteristic write failed. Only surfaced when the transport is
    /// configured to abort on write failure; the default policy logs and
    /// continues.
    #[error("characteristic write failed: {0}")]
    Write(String),

    #[error(transparent)]
    Connect(#[from] ConnectError),
}

/// Rendering failures. Fatal for the render call, never for the process.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Structurally invalid template record (zero/oversized canvas, ...).
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// QR symbol generation failed (payload too long for the symbol).
    #[error("QR encoding failed: {0}")]
    Qr(String),

    /// PNG encoding of a finished canvas failed.
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Template store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("template {0} not found")]
    NotFound(String),

    /// Save/update/delete with an empty template id.
    #[error("template id must not be empty")]
    EmptyId,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error for the CLI and HTTP surfaces.
#[derive(Debug, Error)]
pub enum MiniLabelError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Print(#[from] PrintError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Image payload decode failure (HTTP print endpoint).
    #[error("image error: {0}")]
    Image(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
