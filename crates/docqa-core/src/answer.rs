//! Query pipeline: embed question → top-K search → stuff context → generate.

use anyhow::{Context, Result};

use crate::embedding::{prepare_for_embedding, Embedder};
use crate::generation::Generator;
use crate::models::QueryMatch;
use crate::store::{QueryRequest, VectorIndex};

/// Default number of matches retrieved per question.
pub const DEFAULT_TOP_K: usize = 10;

/// Answers `question` from the `top_k` nearest chunks.
///
/// Returns `Ok(None)` when the index has no matches; the generator is not
/// called in that case.
pub async fn answer_question(
    index: &dyn VectorIndex,
    embedder: &dyn Embedder,
    generator: &dyn Generator,
    question: &str,
    top_k: usize,
) -> Result<Option<String>> {
    // Same normalisation as ingested chunks; the prompt keeps the raw text.
    let query_vec = embedder
        .embed_query(&prepare_for_embedding(question))
        .await
        .context("embedding question")?;

    let matches = index
        .query(&QueryRequest {
            vector: query_vec,
            top_k,
            include_metadata: true,
            include_values: true,
        })
        .await
        .with_context(|| format!("querying index {}", index.name()))?;

    tracing::info!(matches = matches.len(), question, "similarity search done");

    let Some(top) = matches.first() else {
        tracing::info!("no matches found, skipping generation");
        return Ok(None);
    };
    tracing::info!(
        source = top.metadata.as_ref().map(|m| m.text_path.as_str()).unwrap_or(""),
        score = top.score,
        "top match"
    );

    let context = build_context(&matches);
    let answer = generator
        .generate(&context, question)
        .await
        .with_context(|| format!("generating answer with {}", generator.model_name()))?;

    tracing::info!(chars = answer.len(), "answer generated");
    Ok(Some(answer))
}

/// Space-joins the stored chunk text of every match, in store order.
///
/// Matches without metadata contribute nothing.
pub fn build_context(matches: &[QueryMatch]) -> String {
    matches
        .iter()
        .filter_map(|m| m.metadata.as_ref())
        .map(|m| m.page_content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
