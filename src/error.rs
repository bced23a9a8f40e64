//! The error type shared by all modules of this crate.

use derive_more::Display;
use thiserror::Error;

use crate::solver::SolverError;
use crate::time::Deadline;

/// Coarse classification of an [Error], independent of the context
/// it carries.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// Out-of-range or inconsistent constructor or setter parameters.
    #[display(fmt = "invalid argument")]
    InvalidArgument,
    /// The operation requires state that is not present (no solver,
    /// no deadlines, wrong periodic/aperiodic accessor, ...).
    #[display(fmt = "precondition violation")]
    PreconditionViolation,
    /// An unregistered deadline or an unknown registry type name.
    #[display(fmt = "not found")]
    NotFound,
    /// A deadline was registered twice.
    #[display(fmt = "duplicate entry")]
    DuplicateEntry,
    /// A parameter bundle was handed to the wrong builder.
    #[display(fmt = "type mismatch")]
    TypeMismatch,
    /// A required configuration field is absent.
    #[display(fmt = "missing field")]
    MissingField,
    /// A configuration document or field is malformed.
    #[display(fmt = "configuration error")]
    Configuration,
    /// The external probability solver failed.
    #[display(fmt = "solver failure")]
    SolverFailure,
}

/// Error type returned by all fallible operations of this crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("invalid argument for {context}: {reason}")]
    InvalidArgument { context: String, reason: String },

    #[error("precondition violated for {context}: {reason}")]
    PreconditionViolation { context: String, reason: String },

    #[error("deadline {deadline} does not exist for task {task}")]
    DeadlineNotFound { task: String, deadline: Deadline },

    #[error("deadline {deadline} already registered for task {task}")]
    DuplicateDeadline { task: String, deadline: Deadline },

    #[error("unknown {family} type `{name}`")]
    UnknownType { family: &'static str, name: String },

    #[error("wrong parameter type for {family} builder `{expected}`")]
    TypeMismatch {
        family: &'static str,
        expected: &'static str,
    },

    #[error("required field `{path}` is undefined")]
    MissingField { path: String },

    #[error("field `{path}` is not {expected}")]
    InvalidField { path: String, expected: &'static str },

    #[error("malformed configuration document: {0}")]
    MalformedDocument(String),

    #[error("probability solver failed for task {task}")]
    Solver {
        task: String,
        #[source]
        source: SolverError,
    },
}

impl Error {
    pub(crate) fn invalid_argument(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn precondition(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::PreconditionViolation {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Classify the error according to the crate's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Error::PreconditionViolation { .. } => ErrorKind::PreconditionViolation,
            Error::DeadlineNotFound { .. } | Error::UnknownType { .. } => ErrorKind::NotFound,
            Error::DuplicateDeadline { .. } => ErrorKind::DuplicateEntry,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::MissingField { .. } => ErrorKind::MissingField,
            Error::InvalidField { .. } | Error::MalformedDocument(_) => ErrorKind::Configuration,
            Error::Solver { .. } => ErrorKind::SolverFailure,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
