//! # btleplug GATT Backend
//!
//! Production implementation of the [`DeviceScanner`]/[`DeviceConnector`]
//! capabilities on top of `btleplug`'s central role.
//!
//! ## Discovery Model
//!
//! The platform's callback-driven watcher is wrapped into one bounded
//! call: subscribe to the adapter's event stream, start a scan, and race
//! the stream against a timeout. The first advertisement whose name
//! contains the target fragment wins and the scan stops immediately;
//! a timeout yields `None` rather than an error so the retry loop treats
//! it as an ordinary failed attempt.
//!
//! ## Handle Ownership
//!
//! A successful `open` moves the peripheral and its write characteristic
//! into a [`BleLink`]. Failures inside `open` disconnect the half-open
//! peripheral before returning, so no session outlives its attempt.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use log::{debug, info};
use uuid::Uuid;

use crate::ble::{DeviceConnector, DeviceScanner, PrinterLink};
use crate::error::{AttemptError, ConnectError, PrintError};

/// Case-sensitive advertised-name filter.
fn name_matches(advertised: &str, fragment: &str) -> bool {
    advertised.contains(fragment)
}

/// BLE central backed by the first system adapter.
pub struct BleCentral {
    adapter: Adapter,
    service_uuid: Uuid,
    characteristic_uuid: Uuid,
    /// Peripherals found by the last scan, keyed by address token.
    discovered: HashMap<String, Peripheral>,
}

impl BleCentral {
    /// Acquire the first Bluetooth adapter on the host.
    pub async fn new(service_uuid: Uuid, characteristic_uuid: Uuid) -> Result<Self, ConnectError> {
        let manager = Manager::new()
            .await
            .map_err(|e| ConnectError::Adapter(e.to_string()))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|e| ConnectError::Adapter(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| ConnectError::Adapter("no Bluetooth adapter present".to_string()))?;

        Ok(Self {
            adapter,
            service_uuid,
            characteristic_uuid,
            discovered: HashMap::new(),
        })
    }
}

#[async_trait]
impl DeviceScanner for BleCentral {
    async fn scan_for(
        &mut self,
        fragment: &str,
        timeout: Duration,
    ) -> Result<Option<String>, AttemptError> {
        // Subscribe before starting the scan so no early event is missed.
        let mut events = self
            .adapter
            .events()
            .await
            .map_err(|e| AttemptError::Backend(e.to_string()))?;
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| AttemptError::Backend(e.to_string()))?;

        let adapter = &self.adapter;
        let found = tokio::time::timeout(timeout, async {
            while let Some(event) = events.next().await {
                // Names often arrive in a follow-up update, so watch both.
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => continue,
                };
                let Ok(peripheral) = adapter.peripheral(&id).await else {
                    continue;
                };
                let Ok(Some(properties)) = peripheral.properties().await else {
                    continue;
                };
                let Some(name) = properties.local_name else {
                    continue;
                };
                if name_matches(&name, fragment) {
                    return Some((properties.address.to_string(), name, peripheral));
                }
            }
            None
        })
        .await
        .ok()
        .flatten();

        // First match wins; the scan never outlives the call.
        let _ = self.adapter.stop_scan().await;

        Ok(found.map(|(token, name, peripheral)| {
            info!("matched '{name}' at {token}");
            self.discovered.insert(token.clone(), peripheral);
            token
        }))
    }
}

#[async_trait]
impl DeviceConnector for BleCentral {
    async fn open(&mut self, device: &str) -> Result<Box<dyn PrinterLink>, AttemptError> {
        let peripheral = self
            .discovered
            .get(device)
            .cloned()
            .ok_or_else(|| AttemptError::Gone(device.to_string()))?;

        peripheral
            .connect()
            .await
            .map_err(|e| AttemptError::Backend(format!("connect failed: {e}")))?;

        match resolve_link(&peripheral, self.service_uuid, self.characteristic_uuid).await {
            Ok(link) => Ok(Box::new(link)),
            Err(fault) => {
                // Never leave a half-open session behind a failed attempt.
                let _ = peripheral.disconnect().await;
                Err(fault)
            }
        }
    }
}

/// Resolve the service and write characteristic, subscribing to the notify
/// role when the characteristic advertises it.
async fn resolve_link(
    peripheral: &Peripheral,
    service_uuid: Uuid,
    characteristic_uuid: Uuid,
) -> Result<BleLink, AttemptError> {
    peripheral
        .discover_services()
        .await
        .map_err(|e| AttemptError::Backend(format!("service discovery failed: {e}")))?;

    if !peripheral.services().iter().any(|s| s.uuid == service_uuid) {
        return Err(AttemptError::ServiceMissing);
    }

    let characteristic = peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.service_uuid == service_uuid && c.uuid == characteristic_uuid)
        .ok_or(AttemptError::CharacteristicMissing)?;

    // The same characteristic carries the notify role. Printing only needs
    // the write path, so a failed subscription is not a failed attempt.
    if characteristic.properties.contains(CharPropFlags::NOTIFY) {
        if let Err(e) = peripheral.subscribe(&characteristic).await {
            debug!("notify subscription failed (continuing without): {e}");
        }
    }

    Ok(BleLink {
        peripheral: peripheral.clone(),
        characteristic,
    })
}

/// An open GATT session: the peripheral plus its write characteristic.
pub struct BleLink {
    peripheral: Peripheral,
    characteristic: Characteristic,
}

#[async_trait]
impl PrinterLink for BleLink {
    async fn write_frame(&self, frame: &[u8]) -> Result<(), PrintError> {
        self.peripheral
            .write(&self.characteristic, frame, WriteType::WithoutResponse)
            .await
            .map_err(|e| PrintError::Write(e.to_string()))
    }

    async fn is_healthy(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn close(&mut self) {
        let _ = self.peripheral.disconnect().await;
    }
}

// ============================================================================
// TESTS
// ============================================================================

// Scan/connect behavior against real hardware is exercised manually; the
// state machine around this backend is covered with mocks in `ble::tests`.
