//! # Minilabel CLI
//!
//! Command-line interface for BLE label printing.
//!
//! ## Usage
//!
//! ```bash
//! # Run the HTTP server
//! minilabel serve --listen 0.0.0.0:12134
//!
//! # Print a quick card (QR over text)
//! minilabel print --text "Hello" --qr "https://example.com"
//!
//! # Print a stored template with substitutions
//! minilabel print-template 3fa2... --data NAME=Alice --data ORDER=A-17
//!
//! # Preview a template as PNG without a printer
//! minilabel print-template 3fa2... --data NAME=Alice --png preview.png
//! ```

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

use minilabel::{
    MiniLabelError,
    printer::{PrinterConfig, PrinterService},
    render,
    server::{self, ServerConfig},
    template::TemplateStore,
};

/// Minilabel - BLE label printer utility
#[derive(Parser, Debug)]
#[command(name = "minilabel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:12134")]
        listen: String,

        /// Template storage directory
        #[arg(long, default_value = "templates")]
        templates: PathBuf,

        /// Static assets root for Image elements
        #[arg(long, default_value = "assets")]
        assets: PathBuf,
    },

    /// Print a quick card: a QR code above a line of text
    Print {
        /// Text under the QR code
        #[arg(long)]
        text: String,

        /// QR payload
        #[arg(long)]
        qr: String,
    },

    /// Print (or preview) a stored template
    PrintTemplate {
        /// Template id
        id: String,

        /// Substitution entries, KEY=VALUE (repeatable)
        #[arg(long = "data", value_parser = parse_key_val)]
        data: Vec<(String, String)>,

        /// Write a PNG preview instead of printing
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,

        /// Template storage directory
        #[arg(long, default_value = "templates")]
        templates: PathBuf,

        /// Static assets root for Image elements
        #[arg(long, default_value = "assets")]
        assets: PathBuf,
    },
}

/// Parse a KEY=VALUE substitution argument.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), MiniLabelError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            templates,
            assets,
        } => {
            server::serve(ServerConfig {
                listen_addr: listen,
                templates_dir: templates,
                assets_root: assets,
            })
            .await
        }

        Commands::Print { text, qr } => {
            let printer =
                PrinterService::with_system_ble(PrinterConfig::MINI_PRINTER, "assets").await?;
            printer.print_card(&text, &qr).await?;
            println!("Card sent to printer.");
            printer.shutdown().await;
            Ok(())
        }

        Commands::PrintTemplate {
            id,
            data,
            png,
            templates,
            assets,
        } => {
            let store = TemplateStore::open(&templates)?;
            let template = store.load(&id)?;
            let substitutions: HashMap<String, String> = data.into_iter().collect();

            if let Some(path) = png {
                // Preview mode: render with the same pipeline, no device.
                let renderer = minilabel::LabelRenderer::new(&assets);
                let image = renderer.render(&template, &substitutions)?;
                let bytes = render::encode_png(&image)?;
                std::fs::write(&path, bytes)?;
                println!("Preview written to {}", path.display());
                return Ok(());
            }

            let printer =
                PrinterService::with_system_ble(PrinterConfig::MINI_PRINTER, assets).await?;
            printer.print_template(&template, &substitutions).await?;
            println!("Template '{id}' sent to printer.");
            printer.shutdown().await;
            Ok(())
        }
    }
}
