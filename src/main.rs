//! # Folio CLI (`folio`)
//!
//! ## Usage
//!
//! ```bash
//! folio --config ./config/folio.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `folio extract <image>...` | Preprocess, OCR and correct page images |
//! | `folio ask "<question>" --doc <page>[,<page>...]...` | Ingest documents and answer one question |
//! | `folio chat --doc <page>[,<page>...]...` | Ingest documents and answer questions from stdin |
//!
//! ## Examples
//!
//! ```bash
//! # Corrected text plus bounding boxes
//! folio extract certificate.jpg --json
//!
//! # Keep the preprocessed page for inspection
//! folio extract certificate.jpg --save-prepared ./prepared
//!
//! # Ask with the three closest passages
//! folio ask "Which university issued the degree?" --doc certificate.jpg --k 3
//!
//! # A two-page document
//! folio ask "Who signed the deed?" --doc deed-1.png,deed-2.png
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use folio::config::{self, Config};
use folio::{ask, extract, logging};

/// Folio — question answering over scanned documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file at the default location falls back to built-in
/// defaults.
#[derive(Parser)]
#[command(
    name = "folio",
    about = "Folio — question answering over scanned documents",
    version,
    long_about = "Folio cleans up scanned page images, runs OCR, corrects the text, indexes it \
    in memory, and answers questions grounded on the closest passages."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/folio.toml")]
    config: PathBuf,

    /// Enable debug logging (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preprocess, OCR and correct page images.
    ///
    /// Prints the corrected text of each page. PDFs must be rendered to
    /// one image per page beforehand.
    Extract {
        /// Page images (png, jpg, jpeg, tif, tiff, bmp).
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Print raw text, corrected text and bounding boxes as JSON.
        #[arg(long)]
        json: bool,

        /// Write each preprocessed page as PNG into this directory.
        #[arg(long)]
        save_prepared: Option<PathBuf>,
    },

    /// Ingest documents and answer a question about them.
    Ask {
        /// The question.
        question: String,

        /// Document pages, comma-separated (`p1.png,p2.png`); repeat for
        /// several documents.
        #[arg(long = "doc", required = true)]
        docs: Vec<String>,

        /// Number of passages to retrieve (defaults to `retrieval.top_k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Ingest documents, then answer questions read line by line from stdin.
    Chat {
        /// Document pages, comma-separated (`p1.png,p2.png`); repeat for
        /// several documents.
        #[arg(long = "doc", required = true)]
        docs: Vec<String>,

        /// Number of passages to retrieve (defaults to `retrieval.top_k`).
        #[arg(long)]
        k: Option<usize>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let default_path = PathBuf::from("./config/folio.toml");
    if cli.config == default_path && !cli.config.exists() {
        let cfg = Config::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    config::load_config(&cli.config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let cfg = load_config(&cli)?;

    match cli.command {
        Commands::Extract {
            images,
            json,
            save_prepared,
        } => {
            extract::run_extract(&cfg, &images, json, save_prepared).await?;
        }
        Commands::Ask { question, docs, k } => {
            ask::run_ask(&cfg, &question, &docs, k).await?;
        }
        Commands::Chat { docs, k } => {
            ask::run_chat(&cfg, &docs, k).await?;
        }
    }

    Ok(())
}
