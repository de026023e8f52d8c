//! Canonical fault classification shared by every layer.
//!
//! A [`Fault`] carries a [`Status`] from a fixed, closed set, a short
//! machine-readable code, a human message and the chain of errors that caused
//! it. HTTP status codes are translated into statuses exclusively through
//! [`Status::from_http_status`].

use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Shared, cloneable error cause.
pub type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// Fault status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Canceled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    Conflict,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Status {
    pub const ALL: [Self; 16] = [
        Self::Canceled,
        Self::Unknown,
        Self::InvalidArgument,
        Self::DeadlineExceeded,
        Self::NotFound,
        Self::Conflict,
        Self::PermissionDenied,
        Self::ResourceExhausted,
        Self::FailedPrecondition,
        Self::Aborted,
        Self::OutOfRange,
        Self::Unimplemented,
        Self::Internal,
        Self::Unavailable,
        Self::DataLoss,
        Self::Unauthenticated,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
            Self::InvalidArgument => "invalid_argument",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::PermissionDenied => "permission_denied",
            Self::ResourceExhausted => "resource_exhausted",
            Self::FailedPrecondition => "failed_precondition",
            Self::Aborted => "aborted",
            Self::OutOfRange => "out_of_range",
            Self::Unimplemented => "unimplemented",
            Self::Internal => "internal",
            Self::Unavailable => "unavailable",
            Self::DataLoss => "data_loss",
            Self::Unauthenticated => "unauthenticated",
        }
    }

    /// Classifies an HTTP response status that did not match expectations.
    ///
    /// Only 404, 403, 400 and 401 have dedicated statuses; every other code
    /// is [`Status::Unknown`].
    pub const fn from_http_status(code: u16) -> Self {
        match code {
            404 => Self::NotFound,
            403 => Self::PermissionDenied,
            400 => Self::InvalidArgument,
            401 => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }

    /// Whether `code` has a dedicated entry in the HTTP classification table.
    pub const fn is_mapped_http_status(code: u16) -> bool {
        !matches!(Self::from_http_status(code), Self::Unknown)
    }

    /// Conventional HTTP status for reporting a fault with this status.
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Canceled => 408,
            Self::Unknown | Self::Internal | Self::DataLoss => 500,
            Self::InvalidArgument | Self::OutOfRange => 400,
            Self::DeadlineExceeded => 504,
            Self::NotFound => 404,
            Self::Conflict | Self::Aborted => 409,
            Self::PermissionDenied => 403,
            Self::ResourceExhausted => 429,
            Self::FailedPrecondition => 412,
            Self::Unimplemented => 501,
            Self::Unavailable => 503,
            Self::Unauthenticated => 401,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified error with a cause chain.
#[derive(Debug, Clone)]
pub struct Fault {
    status: Status,
    code: String,
    message: String,
    causes: Vec<Cause>,
}

impl Fault {
    pub fn new(status: Status, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Builds a fault that wraps `cause`.
    pub fn new_from<E>(
        cause: E,
        status: Status,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::new(status, code, message).caused_by(cause)
    }

    pub fn caused_by<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.causes.push(Arc::new(cause));
        self
    }

    fn with_causes(status: Status, code: &str, message: &str, causes: Vec<Cause>) -> Self {
        Self {
            status,
            code: code.to_owned(),
            message: message.to_owned(),
            causes,
        }
    }

    pub const fn status(&self) -> Status {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn causes(&self) -> &[Cause] {
        &self.causes
    }

    /// Unwraps one level of the cause chain.
    ///
    /// With several causes the result is a new fault holding the remaining
    /// ones. It takes its status, code and message from the first cause when
    /// that cause is itself a [`Fault`].
    pub fn orig_err(&self) -> Option<Cause> {
        match self.causes.as_slice() {
            [] => None,
            [only] => Some(Arc::clone(only)),
            [first, rest @ ..] => {
                let unwrapped = match first.downcast_ref::<Fault>() {
                    Some(fault) => {
                        Self::with_causes(fault.status, &fault.code, &fault.message, rest.to_vec())
                    }
                    None => Self::with_causes(
                        Status::Unknown,
                        "unknown",
                        "multiple errors occurred",
                        self.causes.clone(),
                    ),
                };
                Some(Arc::new(unwrapped))
            }
        }
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.status)?;
        if !self.code.is_empty() {
            write!(f, " {} -", self.code)?;
        }
        write!(f, " {}", self.message)?;

        if !self.causes.is_empty() {
            f.write_str("\ncaused by: ")?;
            for (index, cause) in self.causes.iter().enumerate() {
                if index > 0 {
                    f.write_str("\n")?;
                }
                write!(f, "{cause}")?;
            }
        }

        Ok(())
    }
}

impl StdError for Fault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.causes
            .first()
            .map(|cause| cause.as_ref() as &(dyn StdError + 'static))
    }
}
