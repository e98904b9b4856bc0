use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-chunk metadata. Serialized to a JSON string only at the store
/// boundary; the camelCase field names are the stored wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub timestamp: DateTime<Utc>,
}

/// One stored unit of content: a bounded slice of a document's text plus
/// its embedding. All chunks of one upload share a `file_id`.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub file_id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// One row per distinct `file_id`, synthesized on each listing request from
/// the most recent chunk by timestamp. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct LogicalDocument {
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub description: String,
    pub status: String,
    pub upload_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f64,
    pub file_id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Copy)]
pub struct InsertSummary {
    pub insert_count: u64,
}

/// Structured query filter, translated to the store's expression language
/// only at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    Equals { field: String, value: String },
    In { field: String, values: Vec<String> },
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Scope a search to a set of file ids; an empty set means unscoped.
    pub fn file_scope(file_ids: Vec<String>) -> Self {
        if file_ids.is_empty() {
            Self::All
        } else {
            Self::In {
                field: "file_id".to_string(),
                values: file_ids,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// Transient conversation message, held only by the interactive session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn metadata_round_trips_through_camel_case_json() {
        let metadata = ChunkMetadata {
            file_name: "notes.txt".to_string(),
            file_type: "text/plain".to_string(),
            file_size: 42,
            description: "meeting notes".to_string(),
            doc_type: "document".to_string(),
            chunk_index: 0,
            total_chunks: 3,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };

        let serialized = serde_json::to_string(&metadata).unwrap();
        assert!(serialized.contains("\"fileName\""));
        assert!(serialized.contains("\"chunkIndex\""));
        assert!(serialized.contains("\"totalChunks\""));
        assert!(serialized.contains("\"type\""));

        let parsed: ChunkMetadata = serde_json::from_str(&serialized).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn empty_file_scope_is_unscoped() {
        assert_eq!(Filter::file_scope(Vec::new()), Filter::All);
        assert_eq!(
            Filter::file_scope(vec!["a".to_string()]),
            Filter::In {
                field: "file_id".to_string(),
                values: vec!["a".to_string()],
            }
        );
    }
}
