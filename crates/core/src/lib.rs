pub mod chunking;
pub mod error;
pub mod extractor;
pub mod models;
pub mod ollama;
pub mod pipeline;
pub mod rag;
pub mod recency;
pub mod store;
pub mod stores;

pub use chunking::{split_into_chunks, DEFAULT_MAX_CHUNK_SIZE};
pub use error::{ExtractError, ModelError, PipelineError, StoreError};
pub use extractor::{extract_pdf_text, extract_text, file_type_tag, is_supported};
pub use models::{
    ChatMessage, ChunkMetadata, DocumentChunk, Filter, InsertSummary, LogicalDocument, Role,
    SearchHit,
};
pub use ollama::{Embedder, OllamaClient, DEFAULT_EMBED_MODEL};
pub use pipeline::{
    discover_document_files, file_id_for, ingest_folder_best_effort, process_and_store,
    IngestReport, ProcessReport, SkippedFile, UploadMetadata,
};
pub use rag::{GroundedPrompt, PromptBuilder, DEFAULT_TOP_K};
pub use recency::{latest_per_file, DEFAULT_LIST_LIMIT};
pub use store::ChunkStore;
pub use stores::{MilvusStore, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIM};
