//! # BLE Connection Management
//!
//! The connection manager owns the printer's BLE session: it scans for a
//! device whose advertised name contains the configured fragment, opens it,
//! resolves the GATT write path, and keeps the resulting link until a
//! failure or an explicit disconnect tears it down.
//!
//! ## State Machine
//!
//! ```text
//!             scan ok           open ok
//! Disconnected ──► Scanning ──► Connecting ──► Connected
//!      ▲              │              │             │
//!      │   no match / │    any step  │             │ write failure /
//!      │   timeout    │    fails     │             │ explicit disconnect
//!      └──────────────┴──────────────┴─────────────┘
//!            (dispose handles, sleep, retry ≤ 5×)
//! ```
//!
//! Every failure path disposes partially-acquired device and characteristic
//! handles before the state returns to `Disconnected`: no dangling handles
//! survive a failed attempt.
//!
//! ## Capability Seams
//!
//! Discovery and GATT access sit behind [`DeviceScanner`] and
//! [`DeviceConnector`] so the retry logic is testable without radio
//! hardware. The production implementation is [`gatt::BleCentral`].
//!
//! The manager is built for one caller at a time: the facade serializes
//! whole print jobs, so `ensure_connected` only needs to be re-entrant for
//! sequential calls.

pub mod gatt;

pub use gatt::BleCentral;

use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};

use crate::error::{AttemptError, ConnectError, PrintError};

/// Connection lifecycle, owned exclusively by [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Scanning,
    Connecting,
    Connected,
}

/// Bounded device discovery.
#[async_trait]
pub trait DeviceScanner: Send {
    /// Scan until a device whose advertised name contains `fragment`
    /// (case-sensitive) appears, or until `timeout` elapses. The scan
    /// stops as soon as the first match is seen. Returns an opaque device
    /// token for [`DeviceConnector::open`].
    async fn scan_for(
        &mut self,
        fragment: &str,
        timeout: Duration,
    ) -> Result<Option<String>, AttemptError>;
}

/// GATT session establishment.
#[async_trait]
pub trait DeviceConnector: Send {
    /// Open the device behind a token from the scanner: connect, resolve
    /// the fixed service and write characteristic, best-effort subscribe
    /// to notifications. Implementations dispose any partially-acquired
    /// handles before returning an error.
    async fn open(&mut self, device: &str) -> Result<Box<dyn PrinterLink>, AttemptError>;
}

/// The two capabilities the manager needs, usually one backend object.
pub trait DeviceBackend: DeviceScanner + DeviceConnector + Send {}

impl<T: DeviceScanner + DeviceConnector + Send> DeviceBackend for T {}

/// An established write channel to the printer.
///
/// `Sync` as well as `Send` so a `&dyn PrinterLink` can be held across an
/// await point inside the (Send) print-job futures the HTTP server spawns.
#[async_trait]
pub trait PrinterLink: Send + Sync {
    /// One characteristic write in write-without-response mode.
    async fn write_frame(&self, frame: &[u8]) -> Result<(), PrintError>;

    /// Whether the underlying link still reports healthy.
    async fn is_healthy(&self) -> bool;

    /// Release the device and characteristic handles. Idempotent.
    async fn close(&mut self);
}

/// Retry-loop tuning. [`ConnectionSettings::default`] matches the printer's
/// shipped firmware expectations; tests shrink the durations.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Substring matched against advertised device names.
    pub name_fragment: String,
    /// Maximum connect attempts per `ensure_connected` call.
    pub max_attempts: u32,
    /// Hard deadline for a single discovery scan.
    pub scan_timeout: Duration,
    /// Pause between failed attempts.
    pub retry_delay: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            name_fragment: "Mini-Printer".to_string(),
            max_attempts: 5,
            scan_timeout: Duration::from_secs(5),
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Scan/connect/retry state machine over a [`DeviceBackend`].
pub struct ConnectionManager {
    backend: Box<dyn DeviceBackend>,
    settings: ConnectionSettings,
    state: ConnectionState,
    link: Option<Box<dyn PrinterLink>>,
}

impl ConnectionManager {
    pub fn new(backend: Box<dyn DeviceBackend>, settings: ConnectionSettings) -> Self {
        Self {
            backend,
            settings,
            state: ConnectionState::Disconnected,
            link: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The established link, present exactly while state is `Connected`.
    pub fn link(&self) -> Option<&dyn PrinterLink> {
        self.link.as_deref()
    }

    /// Establish a connection if one is not already healthy.
    ///
    /// Already connected with a healthy link: immediate no-op. Otherwise
    /// runs up to `max_attempts` scan+connect rounds, sleeping
    /// `retry_delay` between failures, and returns
    /// [`ConnectError::RetriesExhausted`] once the budget is spent.
    pub async fn ensure_connected(&mut self) -> Result<(), ConnectError> {
        if self.state == ConnectionState::Connected {
            if let Some(link) = &self.link {
                if link.is_healthy().await {
                    return Ok(());
                }
            }
            // The device dropped us since the last job; start over clean.
            warn!("existing link is no longer healthy, reconnecting");
            self.drop_link().await;
            self.state = ConnectionState::Disconnected;
        }

        let attempts = self.settings.max_attempts;
        for attempt in 1..=attempts {
            info!(
                "[attempt {attempt}/{attempts}] scanning for '{}'",
                self.settings.name_fragment
            );
            self.state = ConnectionState::Scanning;
            let found = self
                .backend
                .scan_for(&self.settings.name_fragment, self.settings.scan_timeout)
                .await;

            let device = match found {
                Ok(Some(device)) => device,
                Ok(None) => {
                    warn!("no matching device found");
                    self.fail_attempt(attempt).await;
                    continue;
                }
                Err(fault) => {
                    warn!("scan failed: {fault}");
                    self.fail_attempt(attempt).await;
                    continue;
                }
            };

            info!("device located: {device}");
            self.state = ConnectionState::Connecting;
            match self.backend.open(&device).await {
                Ok(link) => {
                    self.link = Some(link);
                    self.state = ConnectionState::Connected;
                    info!("printer connected");
                    return Ok(());
                }
                Err(fault) => {
                    warn!("connect failed: {fault}");
                    self.fail_attempt(attempt).await;
                }
            }
        }

        self.state = ConnectionState::Disconnected;
        Err(ConnectError::RetriesExhausted { attempts })
    }

    /// Tear down the current link, if any, and return to `Disconnected`.
    pub async fn disconnect(&mut self) {
        self.drop_link().await;
        self.state = ConnectionState::Disconnected;
    }

    /// Close out one failed attempt: dispose handles, go `Disconnected`,
    /// and wait out the retry delay (skipped after the final attempt).
    async fn fail_attempt(&mut self, attempt: u32) {
        self.drop_link().await;
        self.state = ConnectionState::Disconnected;
        if attempt < self.settings.max_attempts {
            tokio::time::sleep(self.settings.retry_delay).await;
        }
    }

    async fn drop_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close().await;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
