use crate::chunking::{split_into_chunks, DEFAULT_MAX_CHUNK_SIZE};
use crate::error::{ExtractError, PipelineError};
use crate::extractor;
use crate::models::{ChunkMetadata, DocumentChunk};
use crate::ollama::Embedder;
use crate::store::ChunkStore;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Caller-supplied upload attributes. `file_id` overrides the default
/// name-derived id; leaving it unset keeps re-uploads of the same file name
/// under one logical document.
#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    pub file_id: Option<String>,
    pub description: String,
    pub doc_type: String,
}

#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub file_id: String,
    pub chunk_count: usize,
    pub insert_count: u64,
}

pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestReport {
    pub processed: Vec<ProcessReport>,
    pub skipped: Vec<SkippedFile>,
}

/// Stable logical-document id for a file name.
pub fn file_id_for(file_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Full upload path for one document: extract text, chunk it, embed every
/// chunk sequentially, and insert the assembled chunk rows. The collection is
/// ensured before writing. A failure mid-batch surfaces as-is; no partial
/// success is synthesized.
pub async fn process_and_store<E, S>(
    embedder: &E,
    store: &S,
    path: &Path,
    upload: &UploadMetadata,
) -> Result<ProcessReport, PipelineError>
where
    E: Embedder + Sync,
    S: ChunkStore + Sync,
{
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            ExtractError::MissingFileName(format!("path missing filename: {}", path.display()))
        })?
        .to_string();

    let text = extractor::extract_text(path)?;
    let chunks = split_into_chunks(&text, DEFAULT_MAX_CHUNK_SIZE);
    let embeddings = embedder.embed_batch(&chunks).await?;

    let file_id = upload
        .file_id
        .clone()
        .unwrap_or_else(|| file_id_for(&file_name));
    let file_size = std::fs::metadata(path).map_err(ExtractError::Io)?.len();
    let file_type = extractor::file_type_tag(path);
    let timestamp = Utc::now();
    let total_chunks = chunks.len();

    let documents: Vec<DocumentChunk> = chunks
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(index, (content, embedding))| DocumentChunk {
            file_id: file_id.clone(),
            content,
            metadata: ChunkMetadata {
                file_name: file_name.clone(),
                file_type: file_type.clone(),
                file_size,
                description: upload.description.clone(),
                doc_type: upload.doc_type.clone(),
                chunk_index: index,
                total_chunks,
                timestamp,
            },
            embedding,
        })
        .collect();

    store.ensure_collection().await?;
    let summary = store.insert(&documents).await?;

    Ok(ProcessReport {
        file_id,
        chunk_count: total_chunks,
        insert_count: summary.insert_count,
    })
}

pub fn discover_document_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if entry.file_type().is_file() && extractor::is_supported(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Ingests every supported file under a folder, one at a time. Files that
/// fail extraction, embedding, or insertion are reported, not fatal.
pub async fn ingest_folder_best_effort<E, S>(
    embedder: &E,
    store: &S,
    folder: &Path,
    upload: &UploadMetadata,
) -> Result<IngestReport, PipelineError>
where
    E: Embedder + Sync,
    S: ChunkStore + Sync,
{
    let files = discover_document_files(folder);

    if files.is_empty() {
        return Err(PipelineError::InvalidArgument(format!(
            "no ingestible files found in {}",
            folder.display()
        )));
    }

    let mut processed = Vec::new();
    let mut skipped = Vec::new();

    for path in files {
        // Per-file ids only; an explicit override would collapse the whole
        // folder into one logical document.
        let per_file = UploadMetadata {
            file_id: None,
            description: upload.description.clone(),
            doc_type: upload.doc_type.clone(),
        };

        match process_and_store(embedder, store, &path, &per_file).await {
            Ok(report) => processed.push(report),
            Err(error) => skipped.push(SkippedFile {
                path,
                reason: error.to_string(),
            }),
        }
    }

    Ok(IngestReport { processed, skipped })
}
