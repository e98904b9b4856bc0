use crate::error::StoreError;
use crate::models::{ChunkMetadata, DocumentChunk, Filter, InsertSummary, LogicalDocument, SearchHit};
use crate::recency;
use crate::store::ChunkStore;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_COLLECTION: &str = "document_embeddings";
pub const DEFAULT_EMBEDDING_DIM: usize = 1024;

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Bounded window for the listing query; listing dedups over this window
/// rather than scanning a capped set of distinct file ids first.
const LIST_WINDOW: usize = 16384;

/// Adapter over the Milvus RESTful v2 API. Holds its own HTTP client and the
/// collection's configured embedding dimension; constructed once at process
/// start and passed into callers, never a module-level singleton.
pub struct MilvusStore {
    endpoint: String,
    collection: String,
    dimension: usize,
    client: Client,
}

impl MilvusStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            dimension,
            client: Client::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub async fn is_available(&self) -> bool {
        self.has_collection().await.is_ok()
    }

    async fn has_collection(&self) -> Result<bool, StoreError> {
        let parsed = self
            .post(
                "collections/has",
                json!({ "collectionName": self.collection }),
            )
            .await?;

        Ok(parsed
            .pointer("/data/has")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn load_collection(&self) -> Result<(), StoreError> {
        self.post(
            "collections/load",
            json!({ "collectionName": self.collection }),
        )
        .await?;
        Ok(())
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, StoreError> {
        let url = format!("{}/v2/vectordb/{}", self.endpoint, path);
        let mut last_failure = String::new();

        for attempt in 1..=RETRY_ATTEMPTS {
            match self.client.post(&url).json(&body).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(StoreError::Backend {
                            code: i64::from(status.as_u16()),
                            message: response.text().await.unwrap_or_default(),
                        });
                    }

                    let parsed: Value = response.json().await?;
                    let code = parsed
                        .pointer("/code")
                        .and_then(Value::as_i64)
                        .unwrap_or(0);
                    if code != 0 {
                        return Err(StoreError::Backend {
                            code,
                            message: parsed
                                .pointer("/message")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                        });
                    }

                    return Ok(parsed);
                }
                Err(error) if error.is_connect() || error.is_timeout() => {
                    last_failure = error.to_string();
                    if attempt < RETRY_ATTEMPTS {
                        sleep(RETRY_DELAY).await;
                    }
                }
                Err(error) => return Err(StoreError::Http(error)),
            }
        }

        Err(StoreError::Unavailable {
            attempts: RETRY_ATTEMPTS,
            details: last_failure,
        })
    }
}

#[async_trait]
impl ChunkStore for MilvusStore {
    async fn ensure_collection(&self) -> Result<(), StoreError> {
        if self.has_collection().await? {
            return Ok(());
        }

        self.post(
            "collections/create",
            json!({
                "collectionName": self.collection,
                "schema": {
                    "autoId": true,
                    "fields": [
                        {
                            "fieldName": "id",
                            "dataType": "Int64",
                            "isPrimary": true,
                        },
                        {
                            "fieldName": "file_id",
                            "dataType": "VarChar",
                            "elementTypeParams": { "max_length": 100 },
                        },
                        {
                            "fieldName": "content",
                            "dataType": "VarChar",
                            "elementTypeParams": { "max_length": 65535 },
                        },
                        {
                            "fieldName": "metadata",
                            "dataType": "VarChar",
                            "elementTypeParams": { "max_length": 1024 },
                        },
                        {
                            "fieldName": "embedding",
                            "dataType": "FloatVector",
                            "elementTypeParams": { "dim": self.dimension },
                        },
                    ],
                },
                "indexParams": [
                    {
                        "fieldName": "embedding",
                        "indexName": "embedding_index",
                        "metricType": "COSINE",
                        "params": {
                            "index_type": "HNSW",
                            "M": 8,
                            "efConstruction": 64,
                        },
                    },
                ],
            }),
        )
        .await?;

        Ok(())
    }

    async fn insert(&self, chunks: &[DocumentChunk]) -> Result<InsertSummary, StoreError> {
        if chunks.is_empty() {
            return Err(StoreError::Validation(
                "insert requires at least one chunk".to_string(),
            ));
        }

        let mut rows = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if chunk.file_id.is_empty() {
                return Err(StoreError::Validation(
                    "chunk is missing its file_id".to_string(),
                ));
            }
            if chunk.content.is_empty() {
                return Err(StoreError::Validation(format!(
                    "chunk {} of {} has empty content",
                    chunk.metadata.chunk_index, chunk.file_id
                )));
            }
            if chunk.embedding.is_empty() {
                return Err(StoreError::Validation(format!(
                    "chunk {} of {} has no embedding",
                    chunk.metadata.chunk_index, chunk.file_id
                )));
            }
            if chunk.embedding.len() != self.dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: chunk.embedding.len(),
                });
            }

            rows.push(json!({
                "file_id": chunk.file_id,
                "content": chunk.content,
                "metadata": serde_json::to_string(&chunk.metadata)?,
                "embedding": chunk.embedding,
            }));
        }

        self.load_collection().await?;

        let parsed = self
            .post(
                "entities/insert",
                json!({
                    "collectionName": self.collection,
                    "data": rows,
                }),
            )
            .await?;

        let insert_count = parsed
            .pointer("/data/insertCount")
            .and_then(Value::as_u64)
            .unwrap_or(chunks.len() as u64);

        Ok(InsertSummary { insert_count })
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        scope: &Filter,
    ) -> Result<Vec<SearchHit>, StoreError> {
        if query_vector.is_empty() {
            return Err(StoreError::Validation(
                "query vector must not be empty".to_string(),
            ));
        }
        if query_vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }

        self.load_collection().await?;

        let mut body = json!({
            "collectionName": self.collection,
            "data": [query_vector],
            "annsField": "embedding",
            "limit": top_k,
            "outputFields": ["file_id", "content", "metadata"],
            "searchParams": {
                "metricType": "COSINE",
                "params": { "ef": 64 },
            },
        });
        if let Some(expression) = filter_expression(scope) {
            body["filter"] = Value::String(expression);
        }

        let parsed = self.post("entities/search", body).await?;
        let rows = parsed
            .pointer("/data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let metadata: ChunkMetadata = serde_json::from_str(
                row.pointer("/metadata")
                    .and_then(Value::as_str)
                    .unwrap_or("{}"),
            )?;

            hits.push(SearchHit {
                id: row
                    .pointer("/id")
                    .map(stringify_id)
                    .unwrap_or_default(),
                score: row
                    .pointer("/distance")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0),
                file_id: row
                    .pointer("/file_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                content: row
                    .pointer("/content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                metadata,
            });
        }

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn delete_by_file_id(&self, file_id: &str) -> Result<(), StoreError> {
        let scope = Filter::equals("file_id", file_id);
        let expression = filter_expression(&scope).unwrap_or_default();

        // Zero matched rows is still a success; the backend does not
        // distinguish.
        self.post(
            "entities/delete",
            json!({
                "collectionName": self.collection,
                "filter": expression,
            }),
        )
        .await?;

        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.post(
            "entities/delete",
            json!({
                "collectionName": self.collection,
                "filter": "id >= 0",
            }),
        )
        .await?;

        Ok(())
    }

    async fn list_latest_per_document(
        &self,
        limit: usize,
    ) -> Result<Vec<LogicalDocument>, StoreError> {
        self.load_collection().await?;

        let parsed = self
            .post(
                "entities/query",
                json!({
                    "collectionName": self.collection,
                    "filter": "id >= 0",
                    "outputFields": ["file_id", "metadata"],
                    "limit": LIST_WINDOW,
                }),
            )
            .await?;

        let rows = parsed
            .pointer("/data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let file_id = row
                .pointer("/file_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let metadata: ChunkMetadata = serde_json::from_str(
                row.pointer("/metadata")
                    .and_then(Value::as_str)
                    .unwrap_or("{}"),
            )?;
            records.push((file_id, metadata));
        }

        Ok(recency::latest_per_file(&records, limit))
    }
}

/// Translates a structured filter into a Milvus boolean expression. `All`
/// yields no expression. String literals are escaped so identifiers never
/// leak into the expression grammar.
fn filter_expression(filter: &Filter) -> Option<String> {
    match filter {
        Filter::All => None,
        Filter::Equals { field, value } => {
            Some(format!("{field} == \"{}\"", escape_literal(value)))
        }
        Filter::In { field, values } => {
            let list = values
                .iter()
                .map(|value| format!("\"{}\"", escape_literal(value)))
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("{field} in [{list}]"))
        }
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn stringify_id(id: &Value) -> String {
    match id {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store() -> MilvusStore {
        // Nothing listens here; tests below must fail before any request.
        MilvusStore::new("http://127.0.0.1:1", DEFAULT_COLLECTION, 1024)
    }

    fn chunk(file_id: &str, embedding: Vec<f32>) -> DocumentChunk {
        DocumentChunk {
            file_id: file_id.to_string(),
            content: "content".to_string(),
            metadata: ChunkMetadata {
                file_name: "a.txt".to_string(),
                file_type: "text/plain".to_string(),
                file_size: 7,
                description: String::new(),
                doc_type: "document".to_string(),
                chunk_index: 0,
                total_chunks: 1,
                timestamp: Utc::now(),
            },
            embedding,
        }
    }

    #[tokio::test]
    async fn search_rejects_mismatched_dimension_before_any_request() {
        let result = store().search(&vec![0.1; 512], 5, &Filter::All).await;

        match result {
            Err(StoreError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 1024);
                assert_eq!(actual, 512);
            }
            other => panic!("expected dimension mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn search_rejects_empty_query_vector() {
        let result = store().search(&[], 5, &Filter::All).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn insert_rejects_empty_batch() {
        let result = store().insert(&[]).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn insert_rejects_chunk_without_file_id() {
        let result = store().insert(&[chunk("", vec![0.0; 1024])]).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn insert_rejects_chunk_with_wrong_embedding_dimension() {
        let result = store().insert(&[chunk("a", vec![0.0; 8])]).await;
        assert!(matches!(
            result,
            Err(StoreError::DimensionMismatch {
                expected: 1024,
                actual: 8
            })
        ));
    }

    #[test]
    fn unscoped_filter_has_no_expression() {
        assert_eq!(filter_expression(&Filter::All), None);
    }

    #[test]
    fn equals_filter_translates_to_quoted_comparison() {
        let expression = filter_expression(&Filter::equals("file_id", "abc"));
        assert_eq!(expression.as_deref(), Some("file_id == \"abc\""));
    }

    #[test]
    fn in_filter_translates_to_membership_list() {
        let scope = Filter::file_scope(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            filter_expression(&scope).as_deref(),
            Some("file_id in [\"a\", \"b\"]")
        );
    }

    #[test]
    fn literals_with_quotes_are_escaped() {
        let expression = filter_expression(&Filter::equals("file_id", "a\"b\\c"));
        assert_eq!(
            expression.as_deref(),
            Some("file_id == \"a\\\"b\\\\c\"")
        );
    }
}
