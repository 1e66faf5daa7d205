//! Error classification shared across layers.
//!
//! Every error type in the crate exposes `kind()`, so boundary adapters can
//! map failures to transport statuses by switching on [`ErrorKind`] instead
//! of matching individual variants.

use crate::db::DbError;
use crate::model::validation::DomainError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input breaks a business rule (400-equivalent).
    Validation,
    /// Actor is not the owner (403-equivalent).
    Unauthorized,
    /// Live references block the change (409-equivalent).
    Conflict,
    /// Entity lookup missed (404-equivalent).
    NotFound,
    /// Identifier is malformed for the store.
    InvalidId,
    /// Caller cancelled the request.
    Cancelled,
    /// Storage or consistency failure, surfaced as-is.
    Infrastructure,
}

impl ErrorKind {
    /// Stable lowercase name used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Unauthorized => "unauthorized",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::InvalidId => "invalid_id",
            Self::Cancelled => "cancelled",
            Self::Infrastructure => "infrastructure",
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error returned by the orchestration layer.
#[derive(Debug)]
pub enum ServiceError {
    Domain(DomainError),
    NotFound { entity: &'static str, id: String },
    InvalidId { entity: &'static str, value: String },
    Cancelled,
    Repo(RepoError),
    /// Write succeeded but the read-back disagrees.
    InconsistentState(&'static str),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => err.kind(),
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidId { .. } => ErrorKind::InvalidId,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Repo(err) => err.kind(),
            Self::InconsistentState(_) => ErrorKind::Infrastructure,
        }
    }

    /// Returns the business-rule violation, if this is one.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Domain(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidId { entity, value } => write!(f, "invalid {entity} id: `{value}`"),
            Self::Cancelled => write!(f, "request cancelled"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Domain(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        Self::Domain(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::InvalidId { entity, value } => Self::InvalidId { entity, value },
            RepoError::Db(DbError::Cancelled) => Self::Cancelled,
            other => Self::Repo(other),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(value: DbError) -> Self {
        RepoError::from(value).into()
    }
}
