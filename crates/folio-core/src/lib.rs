//! # Folio Core
//!
//! Runtime-agnostic logic for Folio: page preprocessing, OCR text
//! correction, passage chunking, the vector index, prompt assembly, the
//! capability traits for OCR, embedding and generation backends, and the
//! [`Engine`](engine::Engine) that ties them together.
//!
//! This crate contains no tokio, network, or filesystem I/O. Concrete
//! backends live in the `folio` app crate.

pub mod assemble;
pub mod chunk;
pub mod correct;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod generation;
pub mod models;
pub mod ocr;
pub mod preprocess;
pub mod store;

pub use engine::{Engine, EngineBuilder, ProcessedPage};
pub use error::{Error, Result};
