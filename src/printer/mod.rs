//! # Printer Facade
//!
//! [`PrinterService`] is the single entry point external callers use:
//! ensure-connected → render (template or card mode) → transmit, all under
//! one lock so a second job can never interleave with an in-flight one.
//!
//! The service owns the connection manager and the transport; callers own
//! nothing but the handle. A job that sees row-write failures tears the
//! link down on its way out, so the next job starts from a clean
//! reconnect instead of a half-dead session.

pub mod config;

pub use config::PrinterConfig;

use std::collections::HashMap;
use std::path::PathBuf;

use image::RgbaImage;
use log::{info, warn};
use tokio::sync::Mutex;

use crate::ble::{BleCentral, ConnectionManager, ConnectionState, DeviceBackend};
use crate::error::{ConnectError, MiniLabelError, PrintError};
use crate::render::{self, LabelRenderer};
use crate::template::PrintTemplate;
use crate::transport::PrintTransport;

/// Everything a print job touches, guarded by one async mutex.
struct PrinterInner {
    manager: ConnectionManager,
    transport: PrintTransport,
}

/// Orchestrates rendering and delivery for one logical printer.
pub struct PrinterService {
    inner: Mutex<PrinterInner>,
    renderer: LabelRenderer,
}

impl PrinterService {
    /// Build a service over an explicit backend. Tests inject mocks here.
    pub fn new(
        backend: Box<dyn DeviceBackend>,
        config: PrinterConfig,
        assets_root: impl Into<PathBuf>,
    ) -> Self {
        let manager = ConnectionManager::new(backend, config.connection_settings());
        Self {
            inner: Mutex::new(PrinterInner {
                manager,
                transport: PrintTransport::new(),
            }),
            renderer: LabelRenderer::new(assets_root),
        }
    }

    /// Build a service over the host's Bluetooth adapter.
    pub async fn with_system_ble(
        config: PrinterConfig,
        assets_root: impl Into<PathBuf>,
    ) -> Result<Self, ConnectError> {
        let backend = BleCentral::new(config.service_uuid, config.characteristic_uuid).await?;
        Ok(Self::new(Box::new(backend), config, assets_root))
    }

    /// The renderer this service prints with, for preview paths that
    /// want identical output without a device.
    pub fn renderer(&self) -> &LabelRenderer {
        &self.renderer
    }

    /// Current connection state (diagnostics only).
    pub async fn connection_state(&self) -> ConnectionState {
        self.inner.lock().await.manager.state()
    }

    /// Print an already-rendered raster.
    pub async fn print_image(&self, image: &RgbaImage) -> Result<(), MiniLabelError> {
        let mut inner = self.inner.lock().await;
        inner.manager.ensure_connected().await?;
        Self::deliver(&mut inner, image).await
    }

    /// Render a template with substitutions and print the result.
    ///
    /// The whole sequence runs under the job lock, and connection comes
    /// first: when retries are exhausted the job fails without rendering.
    pub async fn print_template(
        &self,
        template: &PrintTemplate,
        data: &HashMap<String, String>,
    ) -> Result<(), MiniLabelError> {
        let mut inner = self.inner.lock().await;
        inner.manager.ensure_connected().await?;
        let image = self.renderer.render(template, data)?;
        Self::deliver(&mut inner, &image).await
    }

    /// Print the quick card: centered QR over centered bold text.
    pub async fn print_card(&self, text: &str, qr_content: &str) -> Result<(), MiniLabelError> {
        let mut inner = self.inner.lock().await;
        inner.manager.ensure_connected().await?;
        let image = render::render_card(text, qr_content)?;
        Self::deliver(&mut inner, &image).await
    }

    /// Release the device session. The next job reconnects from scratch.
    pub async fn shutdown(&self) {
        self.inner.lock().await.manager.disconnect().await;
    }

    /// Transmit under the held lock; the manager is already connected.
    async fn deliver(inner: &mut PrinterInner, image: &RgbaImage) -> Result<(), MiniLabelError> {
        let link = inner.manager.link().ok_or(PrintError::NotConnected)?;

        info!("sending {} rows to printer", image.height());
        let report = inner.transport.transmit(link, image).await?;

        if !report.is_clean() {
            // A failed write means the link can no longer be trusted;
            // dispose it so the next job reconnects.
            warn!(
                "transmission incomplete ({} of {} rows failed), dropping connection",
                report.rows_failed,
                report.rows_failed + report.rows_sent
            );
            inner.manager.disconnect().await;
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::{DeviceConnector, DeviceScanner, PrinterLink};
    use crate::error::{AttemptError, PrintError};
    use crate::template::Element;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Backend whose link records frames into a shared buffer.
    struct LoopbackBackend {
        frames: Arc<StdMutex<Vec<Vec<u8>>>>,
        fail_rows: bool,
        scans: Arc<AtomicU32>,
    }

    struct LoopbackLink {
        frames: Arc<StdMutex<Vec<Vec<u8>>>>,
        fail_rows: bool,
    }

    #[async_trait]
    impl PrinterLink for LoopbackLink {
        async fn write_frame(&self, frame: &[u8]) -> Result<(), PrintError> {
            if self.fail_rows && frame.len() != 5 {
                return Err(PrintError::Write("loopback row failure".to_string()));
            }
            self.frames.lock().unwrap().push(frame.to_vec());
            Ok(())
        }

        async fn is_healthy(&self) -> bool {
            true
        }

        async fn close(&mut self) {}
    }

    #[async_trait]
    impl DeviceScanner for LoopbackBackend {
        async fn scan_for(
            &mut self,
            _fragment: &str,
            _timeout: Duration,
        ) -> Result<Option<String>, AttemptError> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            Ok(Some("loopback".to_string()))
        }
    }

    #[async_trait]
    impl DeviceConnector for LoopbackBackend {
        async fn open(&mut self, _device: &str) -> Result<Box<dyn PrinterLink>, AttemptError> {
            Ok(Box::new(LoopbackLink {
                frames: self.frames.clone(),
                fail_rows: self.fail_rows,
            }))
        }
    }

    fn service(
        fail_rows: bool,
    ) -> (PrinterService, Arc<StdMutex<Vec<Vec<u8>>>>, Arc<AtomicU32>) {
        let frames = Arc::new(StdMutex::new(Vec::new()));
        let scans = Arc::new(AtomicU32::new(0));
        let backend = LoopbackBackend {
            frames: frames.clone(),
            fail_rows,
            scans: scans.clone(),
        };
        let service = PrinterService::new(
            Box::new(backend),
            PrinterConfig::MINI_PRINTER,
            "/nonexistent/assets",
        );
        // Strip the pacing delay for tests.
        {
            let inner = service.inner.try_lock();
            let mut inner = inner.unwrap();
            inner.transport = PrintTransport::new().frame_delay(Duration::ZERO);
        }
        (service, frames, scans)
    }

    #[tokio::test]
    async fn test_print_template_connects_and_transmits() {
        let (service, frames, scans) = service(false);
        let template = PrintTemplate::new(384, 4)
            .with_element(Element::text("x", 0.0, 0.0, 24.0));

        service
            .print_template(&template, &HashMap::new())
            .await
            .unwrap();

        assert_eq!(scans.load(Ordering::SeqCst), 1);
        let frames = frames.lock().unwrap();
        // 4 rows + sentinel.
        assert_eq!(frames.len(), 5);
        assert_eq!(frames.last().unwrap(), &crate::protocol::END_OF_IMAGE.to_vec());
    }

    #[tokio::test]
    async fn test_connection_reused_across_jobs() {
        let (service, _frames, scans) = service(false);
        let image = RgbaImage::from_pixel(384, 2, image::Rgba([255, 255, 255, 255]));

        service.print_image(&image).await.unwrap();
        service.print_image(&image).await.unwrap();

        assert_eq!(scans.load(Ordering::SeqCst), 1);
        assert_eq!(service.connection_state().await, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_dirty_transmission_drops_connection() {
        let (service, frames, _scans) = service(true);
        let image = RgbaImage::from_pixel(384, 3, image::Rgba([255, 255, 255, 255]));

        // Best-effort transport: the job itself still succeeds.
        service.print_image(&image).await.unwrap();

        // Every row failed, only the sentinel landed...
        assert_eq!(frames.lock().unwrap().len(), 1);
        // ...and the service dropped the link afterwards.
        assert_eq!(
            service.connection_state().await,
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_invalid_template_fails_after_connect_without_frames() {
        let (service, frames, scans) = service(false);
        let template = PrintTemplate::new(0, 0);

        let result = service.print_template(&template, &HashMap::new()).await;
        assert!(matches!(result, Err(MiniLabelError::Render(_))));
        // Connection comes first, but nothing was transmitted.
        assert_eq!(scans.load(Ordering::SeqCst), 1);
        assert!(frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_releases_session() {
        let (service, _frames, _scans) = service(false);
        let image = RgbaImage::from_pixel(384, 1, image::Rgba([255, 255, 255, 255]));
        service.print_image(&image).await.unwrap();

        service.shutdown().await;
        assert_eq!(
            service.connection_state().await,
            ConnectionState::Disconnected
        );
    }
}
