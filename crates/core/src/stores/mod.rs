mod milvus;

pub use milvus::{MilvusStore, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIM};
