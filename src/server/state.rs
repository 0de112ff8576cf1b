//! Server state and configuration.

use std::path::PathBuf;

use crate::printer::PrinterService;
use crate::template::TemplateStore;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:12134").
    pub listen_addr: String,
    /// Directory holding template JSON records.
    pub templates_dir: PathBuf,
    /// Root directory Image elements resolve their paths against.
    pub assets_root: PathBuf,
}

/// Application state shared across handlers.
pub struct AppState {
    pub printer: PrinterService,
    pub store: TemplateStore,
}
