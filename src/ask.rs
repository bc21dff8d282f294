//! `folio ask` and `folio chat`: ingest page images, then answer questions.
//!
//! Each `--doc` is one document: a single page image, or several pages
//! joined by commas (`--doc deed-1.png,deed-2.png`). Its label is the first
//! page's file name. Documents go into a fresh in-memory index owned by the
//! command.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use folio_core::models::Answer;
use folio_core::Engine;

use crate::app::{self, DocumentPages};
use crate::config::Config;

/// Ingest every document, returning how many succeeded.
///
/// All pages of a document go through one ingest call. A document that
/// fails to ingest is reported and skipped.
pub async fn ingest_documents(engine: &Engine, docs: &[DocumentPages]) -> Result<usize> {
    let mut ingested = 0;
    for doc in docs {
        let pages = doc
            .pages
            .iter()
            .map(|path| app::read_page(path))
            .collect::<Result<Vec<_>>>()?;
        match engine.ingest(&pages, &doc.label).await {
            Ok(receipt) => {
                let decoded = pages.len() - receipt.skipped_pages.len();
                eprintln!(
                    "ingested {} ({} page{}, {} record{})",
                    receipt.label,
                    decoded,
                    if decoded == 1 { "" } else { "s" },
                    receipt.records_inserted,
                    if receipt.records_inserted == 1 { "" } else { "s" }
                );
                for skipped in &receipt.skipped_pages {
                    if let Some(path) = doc.pages.get(skipped.page) {
                        eprintln!("  skipped {}: {}", path.display(), skipped.reason);
                    }
                }
                ingested += 1;
            }
            Err(e) => warn!(document = %doc.label, error = %e, "ingest failed"),
        }
    }
    Ok(ingested)
}

pub fn print_answer(answer: &Answer) {
    println!("{}", answer.answer);
    println!();
    println!("Sources:");
    for (i, hit) in answer.passages.iter().enumerate() {
        let excerpt: String = hit.metadata.text.chars().take(160).collect();
        println!(
            "{}. [{:.4}] {} #{}",
            i + 1,
            hit.distance,
            hit.metadata.filename,
            hit.metadata.chunk_index
        );
        println!("    excerpt: \"{}\"", excerpt.replace('\n', " ").trim());
    }
}

async fn prepare_engine(config: &Config, docs: &[String]) -> Result<Engine> {
    let docs = docs
        .iter()
        .map(|arg| app::parse_document(arg))
        .collect::<Result<Vec<_>>>()?;
    let engine = app::build_engine(config)?;
    let ingested = ingest_documents(&engine, &docs).await?;
    if ingested == 0 {
        anyhow::bail!("No documents could be ingested");
    }
    Ok(engine)
}

pub async fn run_ask(
    config: &Config,
    question: &str,
    docs: &[String],
    k: Option<usize>,
) -> Result<()> {
    let engine = prepare_engine(config, docs).await?;
    let k = k.unwrap_or(config.retrieval.top_k);
    let answer = engine.retrieve_and_answer(question, k).await?;
    print_answer(&answer);
    Ok(())
}

pub async fn run_chat(config: &Config, docs: &[String], k: Option<usize>) -> Result<()> {
    let engine = prepare_engine(config, docs).await?;
    let k = k.unwrap_or(config.retrieval.top_k);

    eprintln!("Ask a question (Ctrl-D to quit).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        match engine.retrieve_and_answer(question, k).await {
            Ok(answer) => print_answer(&answer),
            Err(e) => eprintln!("error: {}", e),
        }
        println!();
    }
    Ok(())
}
