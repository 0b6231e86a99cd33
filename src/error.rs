use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum NegotiationError {
    #[error("illegal `{action}` from state {state}")]
    Validation { action: &'static str, state: String },

    #[error("date conflict on {date}: already booked via {with}")]
    Conflict { date: NaiveDate, with: String },

    #[error("entity {0} not found or changed, refresh and retry")]
    Stale(Uuid),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl NegotiationError {
    pub fn validation(action: &'static str, state: impl std::fmt::Display) -> Self {
        NegotiationError::Validation {
            action,
            state: state.to_string(),
        }
    }

    /// True when the caller should refetch and retry rather than give up.
    pub fn is_stale(&self) -> bool {
        matches!(self, NegotiationError::Stale(_))
    }
}

pub type Result<T> = std::result::Result<T, NegotiationError>;
