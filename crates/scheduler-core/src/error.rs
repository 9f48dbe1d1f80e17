//! Typed error kinds for the scheduling core.
//!
//! The HTTP layer maps each variant to a status code exhaustively (see
//! `SPEC_FULL.md` §7); nothing here carries an HTTP concept itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("task {0:?} already exists")]
    AlreadyExists(String),

    #[error("dependency {0:?} does not exist")]
    MissingDependency(String),

    #[error("submission would create a dependency cycle")]
    CycleDetected,

    #[error("task {0:?} not found")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] anyhow::Error),

    #[error("internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl From<scheduler_db::queries::tasks::StoreError> for SchedulerError {
    fn from(err: scheduler_db::queries::tasks::StoreError) -> Self {
        use scheduler_db::queries::tasks::StoreError as E;
        match err {
            E::AlreadyExists(id) => Self::AlreadyExists(id),
            E::MissingDependency(id) => Self::MissingDependency(id),
            E::Sqlx(e) => Self::Internal(e.into()),
        }
    }
}

impl From<sqlx::Error> for SchedulerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}
