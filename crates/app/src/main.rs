use chrono::Utc;
use clap::{Parser, Subcommand};
use docqa_core::{
    ingest_folder_best_effort, process_and_store, ChatMessage, ChunkStore, Embedder, Filter,
    MilvusStore, OllamaClient, PromptBuilder, UploadMetadata, DEFAULT_COLLECTION,
    DEFAULT_EMBEDDING_DIM, DEFAULT_EMBED_MODEL,
};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Milvus HTTP endpoint
    #[arg(long, env = "DOCQA_MILVUS_URL", default_value = "http://localhost:19530")]
    milvus_url: String,

    /// Milvus collection name
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Embedding dimension the collection is created with
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIM)]
    embedding_dim: usize,

    /// Ollama endpoint
    #[arg(long, env = "DOCQA_OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Embedding model name
    #[arg(long, default_value = DEFAULT_EMBED_MODEL)]
    embed_model: String,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk, embed, and store a file (or every supported file in a
    /// folder).
    Ingest {
        /// File or folder to ingest.
        path: String,
        /// Free-form description stored with each chunk.
        #[arg(long, default_value = "")]
        description: String,
        /// Document type tag.
        #[arg(long, default_value = "document")]
        doc_type: String,
        /// Override the logical document id (single files only).
        #[arg(long)]
        file_id: Option<String>,
    },
    /// Ask a question grounded in stored documents.
    Ask {
        question: String,
        /// Chat model name.
        #[arg(long, default_value = "llama3")]
        model: String,
        /// Restrict retrieval to these file ids (repeatable).
        #[arg(long = "scope")]
        scope: Vec<String>,
        /// Number of chunks to retrieve.
        #[arg(long, default_value = "5")]
        top_k: usize,
    },
    /// Similarity-search stored chunks without invoking the chat model.
    Search {
        query: String,
        #[arg(long, default_value = "5")]
        top_k: usize,
        /// Restrict search to these file ids (repeatable).
        #[arg(long = "scope")]
        scope: Vec<String>,
    },
    /// List the most recently uploaded documents, one row per file id.
    List {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Delete every chunk of one logical document.
    Delete { file_id: String },
    /// Delete every stored chunk, keeping the collection schema.
    Clear,
    /// Report whether the vector store and the model service are reachable.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let ollama = OllamaClient::new(&cli.ollama_url, &cli.embed_model);
    let store = MilvusStore::new(&cli.milvus_url, &cli.collection, cli.embedding_dim);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "docqa boot"
    );

    match cli.command {
        Command::Ingest {
            path,
            description,
            doc_type,
            file_id,
        } => {
            let target = Path::new(&path);
            let upload = UploadMetadata {
                file_id,
                description,
                doc_type,
            };

            if target.is_dir() {
                let report = ingest_folder_best_effort(&ollama, &store, target, &upload).await?;

                for skipped in &report.skipped {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
                }
                for processed in &report.processed {
                    println!(
                        "{} chunks stored (file_id={})",
                        processed.chunk_count, processed.file_id
                    );
                }
                println!(
                    "{} file(s) ingested, {} skipped",
                    report.processed.len(),
                    report.skipped.len()
                );
            } else {
                let report = process_and_store(&ollama, &store, target, &upload).await?;
                println!(
                    "{} chunks stored at {} (file_id={})",
                    report.chunk_count,
                    Utc::now().to_rfc3339(),
                    report.file_id
                );
            }
        }
        Command::Ask {
            question,
            model,
            scope,
            top_k,
        } => {
            let builder = PromptBuilder::new(&ollama, &store);
            let scope = Filter::file_scope(scope);

            // Retrieval failure falls back to an ungrounded prompt; that
            // policy lives here, not in the builder.
            let (prompt, used_chunks) =
                match builder.build_prompt(&question, &scope, top_k).await {
                    Ok(grounded) => (grounded.prompt, grounded.used_chunks),
                    Err(error) => {
                        warn!(%error, "retrieval failed, answering without context");
                        (question.clone(), Vec::new())
                    }
                };

            let answer = ollama.chat(&[ChatMessage::user(prompt)], &model).await?;
            println!("{answer}");

            if !used_chunks.is_empty() {
                let mut sources = HashSet::new();
                let mut source_order = Vec::new();
                for chunk in &used_chunks {
                    if sources.insert(chunk.metadata.file_name.clone()) {
                        source_order.push(chunk.metadata.file_name.clone());
                    }
                }
                println!("\nsources: {}", source_order.join(", "));
            }
        }
        Command::Search {
            query,
            top_k,
            scope,
        } => {
            let query_vector = ollama.embed(&query).await?;
            let hits = store
                .search(&query_vector, top_k, &Filter::file_scope(scope))
                .await?;

            for hit in hits {
                println!(
                    "score={:.4} file_id={} file={} chunk={}/{}",
                    hit.score,
                    hit.file_id,
                    hit.metadata.file_name,
                    hit.metadata.chunk_index + 1,
                    hit.metadata.total_chunks
                );
                println!("{}", hit.content);
            }
        }
        Command::List { limit } => {
            let documents = store.list_latest_per_document(limit).await?;

            for document in documents {
                println!(
                    "{}\t{}\t{}\t{}",
                    document.uid,
                    document.name,
                    document.upload_time.to_rfc3339(),
                    document.status
                );
            }
        }
        Command::Delete { file_id } => {
            store.delete_by_file_id(&file_id).await?;
            println!("deleted all chunks of {file_id}");
        }
        Command::Clear => {
            store.clear_all().await?;
            println!("collection cleared");
        }
        Command::Status => {
            let model_up = ollama.is_available().await;
            let store_up = store.is_available().await;
            println!(
                "ollama: {}",
                if model_up { "available" } else { "unreachable" }
            );
            println!(
                "milvus: {}",
                if store_up { "available" } else { "unreachable" }
            );
        }
    }

    Ok(())
}
