//! # Folio
//!
//! Question answering over scanned documents.
//!
//! Folio cleans up page images, runs OCR on them, corrects the recognised
//! text, embeds it into an in-memory vector index, and answers questions
//! with a language model grounded on the closest passages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌─────────────┐
//! │ Page images │──▶│ Preprocess + OCR │──▶│  Correct +  │
//! │ PNG/JPG/TIF │   │    (tesseract)   │   │    Embed    │
//! └─────────────┘   └──────────────────┘   └──────┬──────┘
//!                                                 ▼
//!                 ┌──────────┐   ┌──────────┐   ┌──────────┐
//!   question ────▶│  Embed   │──▶│  Search  │◀──│  Index   │
//!                 └──────────┘   └────┬─────┘   └──────────┘
//!                                     ▼
//!                              ┌─────────────┐
//!                              │ Assemble +  │──▶ answer
//!                              │  Generate   │
//!                              └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! folio extract scan.png                       # corrected OCR text
//! folio ask "Who issued this?" --doc scan.png  # grounded answer
//! folio chat --doc page1.png,page2.png         # one two-page document
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`app`] | Engine construction and page file checks |
//! | [`ocr`] | Tesseract OCR backend |
//! | [`embedding`] | Embedding backends |
//! | [`generation`] | Answer generation backends |
//! | [`http`] | JSON POST with retry and backoff |
//! | [`extract`] | `folio extract` command |
//! | [`ask`] | `folio ask` / `folio chat` commands |
//! | [`logging`] | tracing subscriber setup |

pub mod app;
pub mod ask;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod http;
pub mod logging;
pub mod ocr;
