//! # Printer Configuration
//!
//! Hardware and protocol constants for supported mini printers.
//!
//! ## Supported Printers
//!
//! | Model | Width (dots) | Line (bytes) | Link |
//! |-------|--------------|--------------|------|
//! | Mini-Printer | 384 | 48 | BLE GATT |
//!
//! ## Usage
//!
//! ```
//! use minilabel::printer::PrinterConfig;
//!
//! let config = PrinterConfig::MINI_PRINTER;
//! assert_eq!(config.width_dots(), 384);
//! ```

use std::time::Duration;

use uuid::{Uuid, uuid};

use crate::ble::ConnectionSettings;
use crate::protocol::LINE_WIDTH_BYTES;

/// # Printer Configuration
///
/// Identity and tuning for one printer model: the GATT identifiers it
/// exposes, the advertised-name fragment that picks it out of a scan, the
/// print head geometry, and the connect-loop timing.
#[derive(Debug, Clone)]
pub struct PrinterConfig {
    /// Human-readable model name.
    pub model: &'static str,

    /// Substring of the advertised BLE name (case-sensitive match).
    pub name_fragment: &'static str,

    /// The single GATT service the printer exposes.
    pub service_uuid: Uuid,

    /// One characteristic serving both the write and notify roles.
    pub characteristic_uuid: Uuid,

    /// Print head width in bytes.
    pub line_bytes: usize,

    /// Connect attempts per job.
    pub max_connect_attempts: u32,

    /// Hard deadline for one discovery scan.
    pub scan_timeout: Duration,

    /// Pause between failed connect attempts.
    pub retry_delay: Duration,
}

impl PrinterConfig {
    /// # Mini-Printer
    ///
    /// The 384-dot BLE thermal label printer this crate ships support for.
    ///
    /// | Property | Value |
    /// |----------|-------|
    /// | Print width | 384 dots (48 bytes) |
    /// | Advertised name | contains "Mini-Printer" |
    /// | Scan window | 5 s |
    /// | Connect retries | 5, 2 s apart |
    pub const MINI_PRINTER: Self = Self {
        model: "Mini-Printer",
        name_fragment: "Mini-Printer",
        service_uuid: uuid!("4fafc201-1fb5-459e-8fcc-c5c9c331914b"),
        characteristic_uuid: uuid!("beb5483e-36e1-4688-b7f5-ea07361b26a8"),
        line_bytes: LINE_WIDTH_BYTES,
        max_connect_attempts: 5,
        scan_timeout: Duration::from_secs(5),
        retry_delay: Duration::from_secs(2),
    };

    /// Print head width in dots.
    #[inline]
    pub fn width_dots(&self) -> u32 {
        (self.line_bytes * 8) as u32
    }

    /// Connection-manager settings derived from this config.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            name_fragment: self.name_fragment.to_string(),
            max_attempts: self.max_connect_attempts,
            scan_timeout: self.scan_timeout,
            retry_delay: self.retry_delay,
        }
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::MINI_PRINTER
    }
}

// ============================================================================
// TESTS
// ============================================================================
