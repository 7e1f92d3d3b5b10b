use thiserror::Error;

/// Errors produced when constructing or validating model values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("identifier must not be empty")]
    EmptyId,

    #[error("container name must not be empty")]
    EmptyName,

    #[error("invalid calendar date: {0}")]
    InvalidDate(String),

    #[error("reading value must be a finite number, got {0}")]
    NonFiniteReading(String),

    #[error("a stats entry needs at least one measurement")]
    EmptyStats,
}

pub type TypeResult<T> = Result<T, TypeError>;
