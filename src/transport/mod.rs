//! # Print Transport
//!
//! Feeds a finished raster to the printer one line frame at a time over an
//! established [`PrinterLink`](crate::ble::PrinterLink), then terminates
//! the image with the sentinel frame.
//!
//! ## Pacing
//!
//! The device exposes no flow-control signal back to the host, so a fixed
//! 5 ms pause after every frame is the only guard against overrunning its
//! input buffer. Writes are strictly sequential: no frame is issued before
//! the previous write call has completed.
//!
//! ## Best-Effort Delivery
//!
//! A failed row write is logged and the loop moves on; the sentinel is
//! still sent so the head terminates the image instead of waiting forever.
//! Callers that need stronger guarantees can flip
//! [`PrintTransport::abort_on_write_failure`], which turns the first
//! failed row into a hard error instead.

use std::time::Duration;

use image::RgbaImage;
use log::{debug, warn};

use crate::ble::PrinterLink;
use crate::error::PrintError;
use crate::protocol::{END_OF_IMAGE, LINE_WIDTH_DOTS, pack_row};

/// Pause after each frame write.
const FRAME_DELAY: Duration = Duration::from_millis(5);

/// What a transmission actually delivered.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransmitReport {
    pub rows_sent: u32,
    pub rows_failed: u32,
    pub sentinel_sent: bool,
}

impl TransmitReport {
    /// Whether every frame, sentinel included, went out.
    pub fn is_clean(&self) -> bool {
        self.rows_failed == 0 && self.sentinel_sent
    }
}

/// Row-by-row line-protocol transmitter.
#[derive(Debug, Clone)]
pub struct PrintTransport {
    frame_delay: Duration,
    abort_on_write_failure: bool,
}

impl Default for PrintTransport {
    fn default() -> Self {
        Self {
            frame_delay: FRAME_DELAY,
            abort_on_write_failure: false,
        }
    }
}

impl PrintTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the job on the first failed row write instead of continuing
    /// best-effort. Off by default.
    pub fn abort_on_write_failure(mut self, abort: bool) -> Self {
        self.abort_on_write_failure = abort;
        self
    }

    /// Override the inter-frame pacing delay. Tests use zero.
    pub fn frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    /// Transmit a raster: every row as one packed 48-byte frame, top to
    /// bottom, then the end-of-image sentinel.
    ///
    /// The caller is responsible for having called `ensure_connected`
    /// first; the transport only sees the established link.
    pub async fn transmit(
        &self,
        link: &dyn PrinterLink,
        image: &RgbaImage,
    ) -> Result<TransmitReport, PrintError> {
        if image.width() != LINE_WIDTH_DOTS {
            // No implicit rescale: producing a correctly-sized canvas is
            // the renderer's job, and a mismatched one still prints
            // (truncated or padded) rather than failing the job.
            warn!(
                "canvas width {} does not match the {} dot print head, output may be misaligned",
                image.width(),
                LINE_WIDTH_DOTS
            );
        }

        let mut report = TransmitReport::default();

        for y in 0..image.height() {
            let frame = pack_row((0..image.width()).map(|x| *image.get_pixel(x, y)));
            match link.write_frame(&frame).await {
                Ok(()) => report.rows_sent += 1,
                Err(e) => {
                    report.rows_failed += 1;
                    if self.abort_on_write_failure {
                        return Err(e);
                    }
                    warn!("row {y} write failed (continuing): {e}");
                }
            }
            self.pace().await;
        }

        match link.write_frame(&END_OF_IMAGE).await {
            Ok(()) => report.sentinel_sent = true,
            Err(e) => {
                if self.abort_on_write_failure {
                    return Err(e);
                }
                warn!("end-of-image write failed: {e}");
            }
        }
        self.pace().await;

        debug!(
            "transmitted {} rows ({} failed), sentinel: {}",
            report.rows_sent, report.rows_failed, report.sentinel_sent
        );
        Ok(report)
    }

    async fn pace(&self) {
        if !self.frame_delay.is_zero() {
            tokio::time::sleep(self.frame_delay).await;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrintError;
    use crate::protocol::LINE_WIDTH_BYTES;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every frame; optionally fails a scripted set of writes.
    #[derive(Default)]
    struct RecordingLink {
        frames: Mutex<Vec<Vec<u8>>>,
        fail_on_calls: Vec<usize>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl crate::ble::PrinterLink for RecordingLink {
        async fn write_frame(&self, frame: &[u8]) -> Result<(), PrintError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if self.fail_on_calls.contains(&call) {
                return Err(PrintError::Write("simulated".to_string()));
            }
            self.frames.lock().unwrap().push(frame.to_vec());
            Ok(())
        }

        async fn is_healthy(&self) -> bool {
            true
        }

        async fn close(&mut self) {}
    }

    fn transport() -> PrintTransport {
        PrintTransport::new().frame_delay(Duration::ZERO)
    }

    fn white_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]))
    }

    #[tokio::test]
    async fn test_rows_then_sentinel_in_order() {
        let link = RecordingLink::default();
        let image = white_image(384, 7);

        let report = transport().transmit(&link, &image).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.rows_sent, 7);

        let frames = link.frames.lock().unwrap();
        // Exactly N row frames followed by exactly one sentinel.
        assert_eq!(frames.len(), 8);
        for frame in &frames[..7] {
            assert_eq!(frame.len(), LINE_WIDTH_BYTES);
        }
        assert_eq!(frames[7], END_OF_IMAGE.to_vec());
    }

    #[tokio::test]
    async fn test_row_content_is_packed_pixels() {
        let link = RecordingLink::default();
        let mut image = white_image(384, 2);
        image.put_pixel(0, 1, image::Rgba([0, 0, 0, 255]));

        transport().transmit(&link, &image).await.unwrap();

        let frames = link.frames.lock().unwrap();
        assert!(frames[0].iter().all(|&b| b == 0));
        assert_eq!(frames[1][0], 0x80);
    }

    #[tokio::test]
    async fn test_width_mismatch_still_transmits() {
        let link = RecordingLink::default();
        // 500 px wide: right edge truncated, but frames still go out at 48 bytes.
        let image = white_image(500, 3);

        let report = transport().transmit(&link, &image).await.unwrap();
        assert!(report.is_clean());

        let frames = link.frames.lock().unwrap();
        assert_eq!(frames.len(), 4);
        assert!(frames.iter().take(3).all(|f| f.len() == LINE_WIDTH_BYTES));
    }

    #[tokio::test]
    async fn test_row_failure_is_best_effort_by_default() {
        let link = RecordingLink {
            fail_on_calls: vec![2],
            ..Default::default()
        };
        let image = white_image(384, 3);

        let report = transport().transmit(&link, &image).await.unwrap();
        assert_eq!(report.rows_sent, 2);
        assert_eq!(report.rows_failed, 1);
        assert!(report.sentinel_sent);
        assert!(!report.is_clean());

        // Remaining rows and the sentinel were still attempted.
        let frames = link.frames.lock().unwrap();
        assert_eq!(frames.len(), 3); // rows 0 and 2 + sentinel
        assert_eq!(*frames.last().unwrap(), END_OF_IMAGE.to_vec());
    }

    #[tokio::test]
    async fn test_abort_mode_surfaces_first_failure() {
        let link = RecordingLink {
            fail_on_calls: vec![2],
            ..Default::default()
        };
        let image = white_image(384, 3);

        let result = transport()
            .abort_on_write_failure(true)
            .transmit(&link, &image)
            .await;
        assert!(matches!(result, Err(PrintError::Write(_))));

        // Nothing after the failed row, sentinel included.
        assert_eq!(link.frames.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_height_image_sends_only_sentinel() {
        let link = RecordingLink::default();
        let image = white_image(384, 0);

        let report = transport().transmit(&link, &image).await.unwrap();
        assert_eq!(report.rows_sent, 0);
        assert!(report.sentinel_sent);
        assert_eq!(link.frames.lock().unwrap().len(), 1);
    }
}
