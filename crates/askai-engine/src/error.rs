use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Engine is missing a component: {0}")]
    MissingComponent(&'static str),
}

pub type Result<T> = std::result::Result<T, EngineError>;
