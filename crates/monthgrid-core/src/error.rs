use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid event: {0}")]
    Validation(String),
}

impl CalendarError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type CalendarResult<T> = Result<T, CalendarError>;
