use crate::error::PipelineError;
use crate::models::{Filter, SearchHit};
use crate::ollama::Embedder;
use crate::store::ChunkStore;

pub const DEFAULT_TOP_K: usize = 5;

/// A grounded prompt plus the chunks it was grounded on, so callers can
/// surface provenance.
#[derive(Debug, Clone)]
pub struct GroundedPrompt {
    pub prompt: String,
    pub used_chunks: Vec<SearchHit>,
}

/// Assembles a retrieval-augmented prompt: embed the question, search the
/// store within the given scope, and wrap the retrieved chunk contents in a
/// fixed template. Failures propagate as typed errors; falling back to an
/// ungrounded prompt is the caller's policy, never decided here.
pub struct PromptBuilder<'a, E, S> {
    embedder: &'a E,
    store: &'a S,
}

impl<'a, E, S> PromptBuilder<'a, E, S>
where
    E: Embedder + Sync,
    S: ChunkStore + Sync,
{
    pub fn new(embedder: &'a E, store: &'a S) -> Self {
        Self { embedder, store }
    }

    pub async fn build_prompt(
        &self,
        question: &str,
        scope: &Filter,
        top_k: usize,
    ) -> Result<GroundedPrompt, PipelineError> {
        let query_vector = self.embedder.embed(question).await?;
        let hits = self.store.search(&query_vector, top_k, scope).await?;

        let context = hits
            .iter()
            .map(|hit| hit.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Answer the question based on the following context:\n\n{context}\n\nQuestion: {question}"
        );

        Ok(GroundedPrompt {
            prompt,
            used_chunks: hits,
        })
    }
}
