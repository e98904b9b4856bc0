use crate::error::StoreError;
use crate::models::{DocumentChunk, Filter, InsertSummary, LogicalDocument, SearchHit};
use async_trait::async_trait;

/// Storage adapter over a single fixed chunk collection. Implementations
/// must make every write path queryable (load before write) and may not
/// swallow failures except where deletion of zero rows counts as success.
#[async_trait]
pub trait ChunkStore {
    /// Idempotent: creates the collection and its similarity index only when
    /// absent.
    async fn ensure_collection(&self) -> Result<(), StoreError>;

    async fn insert(&self, chunks: &[DocumentChunk]) -> Result<InsertSummary, StoreError>;

    /// Similarity search, optionally scoped by a structured filter. Fails
    /// with `DimensionMismatch` before any network call when the query
    /// vector's length differs from the collection dimension.
    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        scope: &Filter,
    ) -> Result<Vec<SearchHit>, StoreError>;

    /// Removes all chunks of one logical document. Deleting an id with no
    /// rows is still a success.
    async fn delete_by_file_id(&self, file_id: &str) -> Result<(), StoreError>;

    /// Removes every row, leaving the schema intact.
    async fn clear_all(&self) -> Result<(), StoreError>;

    async fn list_latest_per_document(
        &self,
        limit: usize,
    ) -> Result<Vec<LogicalDocument>, StoreError>;
}
