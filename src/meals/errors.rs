use serde::Serialize;
use thiserror::Error;

use super::types::MealPlan;

/// Why a generation did not produce a meal plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("could not reach the meal generator: {0}")]
    Transport(String),

    #[error("reply is not valid JSON: {0}")]
    Parse(String),

    #[error("reply contains no meal: {0}")]
    Empty(String),

    #[error("reply does not match the meal plan contract: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TransportError,
    ParseError,
    EmptyError,
    ValidationError,
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Transport(_) => ErrorKind::TransportError,
            GenerationError::Parse(_) => ErrorKind::ParseError,
            GenerationError::Empty(_) => ErrorKind::EmptyError,
            GenerationError::Validation(_) => ErrorKind::ValidationError,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            GenerationError::Transport(m)
            | GenerationError::Parse(m)
            | GenerationError::Empty(m)
            | GenerationError::Validation(m) => m,
        }
    }
}

/// The only value handed to the display layer: a whole meal or a typed failure.
pub type GenerationResult = Result<MealPlan, GenerationError>;
