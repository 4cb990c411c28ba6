use thiserror::Error;

#[derive(Error, Debug)]
pub enum FloatChatError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Lexicon error: {0}")]
    Lexicon(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("SQL error: {0}")]
    Sql(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FloatChatError>;
