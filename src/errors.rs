use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Story generation failed: {0}")]
    StoryGeneration(String),

    #[error("Image generation failed: {0}")]
    ImageGeneration(String),

    #[error("Speech synthesis failed: {0}")]
    SpeechSynthesis(String),

    #[error("Animation generation failed: {0}")]
    AnimationGeneration(String),

    #[error("Story processing produced no usable content")]
    NoContent,

    #[error("Story {0} not found")]
    StoryNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;
