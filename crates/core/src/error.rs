//! Domain error model.
//!
//! Every failure the account core can produce is one of the [`DomainError`]
//! kinds below. Layers return the first error they detect and stop; nothing
//! aggregates multiple failures.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Missing or invalid credentials / token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the policy denies the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Malformed, missing or out-of-range input (including unresolved references).
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The addressed resource does not exist where its absence is itself the failure.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness rule or a dependent association blocks the operation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Opaque failure from the persistence collaborator.
    #[error("store failure: {0}")]
    Store(String),
}

impl DomainError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Unauthorized(_) => "unauthorized",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::Validation(v) => v.code(),
            DomainError::NotFound(_) => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::Store(_) => "store_error",
        }
    }

    /// Short human-readable message (the `message` field of an error body).
    pub fn message(&self) -> String {
        match self {
            DomainError::Unauthorized(msg)
            | DomainError::Forbidden(msg)
            | DomainError::NotFound(msg)
            | DomainError::Conflict(msg) => msg.clone(),
            DomainError::Validation(v) => v.message(),
            DomainError::Store(_) => "An internal error occurred while accessing storage.".to_string(),
        }
    }

    /// Optional longer explanation (the `description` field of an error body).
    pub fn description(&self) -> Option<String> {
        match self {
            DomainError::Validation(v) => v.description(),
            DomainError::Forbidden(_) => {
                Some("The authenticated account does not have permission for this operation.".to_string())
            }
            _ => None,
        }
    }
}

/// A single input validation failure (HTTP 400 class).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required field '{0}' was not provided")]
    MissingField(String),

    #[error("field '{field}' does not have a valid id format: '{value}'")]
    InvalidIdFormat { field: String, value: String },

    #[error("field '{field}' could not be cast to {expected}")]
    Cast { field: String, expected: String },

    #[error("field '{field}' is invalid: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("field '{0}' cannot be updated through this operation")]
    ReadOnlyField(String),

    #[error("institution {0} is not registered")]
    InstitutionNotRegistered(String),

    #[error("children not registered: {}", .0.join(", "))]
    ChildrenNotRegistered(Vec<String>),

    #[error("invalid children ids: {}", .0.join(", "))]
    InvalidChildrenIds(Vec<String>),

    #[error("old password was not provided")]
    OldPasswordNotProvided,

    #[error("new password was not provided")]
    NewPasswordNotProvided,

    #[error("old password does not match")]
    PasswordMismatch,

    #[error("invalid query parameter '{param}': {reason}")]
    InvalidQuery { param: String, reason: String },

    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn invalid_id(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidIdFormat {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn cast(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::Cast {
            field: field.into(),
            expected: expected.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::InvalidIdFormat { .. } => "invalid_id_format",
            ValidationError::Cast { .. } => "cast_error",
            ValidationError::InvalidValue { .. } => "invalid_value",
            ValidationError::ReadOnlyField(_) => "read_only_field",
            ValidationError::InstitutionNotRegistered(_) => "institution_not_registered",
            ValidationError::ChildrenNotRegistered(_) => "children_not_registered",
            ValidationError::InvalidChildrenIds(_) => "invalid_children_ids",
            ValidationError::OldPasswordNotProvided => "old_password_not_provided",
            ValidationError::NewPasswordNotProvided => "new_password_not_provided",
            ValidationError::PasswordMismatch => "password_mismatch",
            ValidationError::InvalidQuery { .. } => "invalid_query",
            ValidationError::MalformedBody(_) => "invalid_json",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ValidationError::MissingField(field) => {
                format!("Required field was not provided: {field}")
            }
            ValidationError::InvalidIdFormat { .. } => {
                "Some ID provided does not have a valid format!".to_string()
            }
            ValidationError::Cast { field, .. } => format!("Value provided for {field} is not valid."),
            ValidationError::InvalidValue { field, .. } => format!("Value provided for {field} is not valid."),
            ValidationError::ReadOnlyField(field) => format!("The {field} field cannot be updated here."),
            ValidationError::InstitutionNotRegistered(_) => {
                "The institution provided is not registered!".to_string()
            }
            ValidationError::ChildrenNotRegistered(_) => {
                "It is necessary for children to be registered before proceeding.".to_string()
            }
            ValidationError::InvalidChildrenIds(_) => {
                "One or more children ids provided are invalid.".to_string()
            }
            ValidationError::OldPasswordNotProvided => "Old password was not provided.".to_string(),
            ValidationError::NewPasswordNotProvided => "New password was not provided.".to_string(),
            ValidationError::PasswordMismatch => "Password does not match.".to_string(),
            ValidationError::InvalidQuery { param, .. } => format!("Query parameter {param} is not valid."),
            ValidationError::MalformedBody(_) => "The request body is not valid JSON.".to_string(),
        }
    }

    pub fn description(&self) -> Option<String> {
        match self {
            ValidationError::MissingField(_) => None,
            ValidationError::InvalidIdFormat { field, value } => Some(format!(
                "'{value}' given for {field} is not a UUID. A value similar to this is expected: 0191d2a8-4c1b-7c9e-8a44-3f1d2e6b9a10"
            )),
            ValidationError::Cast { expected, .. } => Some(format!("A {expected} value is expected.")),
            ValidationError::InvalidValue { reason, .. } => Some(reason.clone()),
            ValidationError::ReadOnlyField(field) if field == "password" => Some(
                "A specific route to update the user password already exists. Use PATCH /users/:id/password."
                    .to_string(),
            ),
            ValidationError::ReadOnlyField(_) => None,
            ValidationError::InstitutionNotRegistered(id) => {
                Some(format!("Please register the institution {id} and try again."))
            }
            ValidationError::ChildrenNotRegistered(ids) => Some(format!(
                "The following IDs were verified without registration: {}",
                ids.join(", ")
            )),
            ValidationError::InvalidChildrenIds(ids) => Some(format!(
                "The following IDs do not belong to registered children: {}",
                ids.join(", ")
            )),
            ValidationError::OldPasswordNotProvided | ValidationError::NewPasswordNotProvided => None,
            ValidationError::PasswordMismatch => {
                Some("The old password provided does not match the current password.".to_string())
            }
            ValidationError::InvalidQuery { reason, .. } | ValidationError::MalformedBody(reason) => {
                Some(reason.clone())
            }
        }
    }
}
