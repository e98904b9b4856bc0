use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding response is missing the embedding vector")]
    MissingEmbedding,

    #[error("model backend returned {status}: {details}")]
    Backend { status: u16, details: String },

    #[error("model service unreachable after {attempts} attempts: {details}")]
    Unavailable { attempts: u32, details: String },

    #[error("malformed stream frame: {0}")]
    MalformedStream(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("query vector dimension {actual} does not match collection dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector store responded with error {code}: {message}")]
    Backend { code: i64, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("vector store unreachable after {attempts} attempts: {details}")]
    Unavailable { attempts: u32, details: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
