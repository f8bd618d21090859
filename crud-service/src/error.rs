//! Structured errors and HTTP response conversion
//!
//! Every layer reports failures as a [`StructuredError`]: a classified value
//! carrying the layer that produced it, a severity, the HTTP status the
//! transport should answer with, the function that observed it and an optional
//! underlying cause. Errors are built through one factory per kind, so no error
//! value is ever shared and mutated between calls.
//!
//! # Example
//!
//! ```rust
//! use crud_service::error::{ErrorKind, Layer, StructuredError};
//!
//! let error = StructuredError::not_found("role", "b6d5c0f2").with_function("RoleUseCase::update");
//! assert_eq!(error.kind(), ErrorKind::NotFound);
//! assert_eq!(error.code(), "NOT_FOUND");
//! assert_eq!(error.http_status().as_u16(), 404);
//! assert_eq!(error.layer(), Layer::UseCase);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Classification
// ============================================================================

/// Architectural layer in which an error was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Entity rules and field validation
    Domain,
    /// Storage adapters and other outbound collaborators
    Infrastructure,
    /// Transport handlers (HTTP binding, headers)
    Interface,
    /// Use-case orchestration
    UseCase,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain => write!(f, "domain"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Interface => write!(f, "interface"),
            Self::UseCase => write!(f, "use_case"),
        }
    }
}

/// Severity of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// Expected client mistake
    Info,
    /// Precondition not met
    Warning,
    /// Operation failed
    Error,
    /// Programming error recovered at an operation boundary
    Fatal,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// Category of structured error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Target row does not exist (or is soft-deleted)
    NotFound,
    /// A live row already holds the unique key
    AlreadyExists,
    /// Target row was already soft-deleted
    AlreadyDeleted,
    /// Field validation failed
    ValidationFailed,
    /// Malformed request at the transport boundary
    BadRequest,
    /// Deadline elapsed or the caller cancelled
    Timeout,
    /// Storage or another collaborator failed
    Infrastructure,
    /// Unclassified failure
    Unknown,
    /// Recovered panic
    Fatal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::AlreadyDeleted => write!(f, "already_deleted"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::Timeout => write!(f, "timeout"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Unknown => write!(f, "unknown"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

impl ErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::AlreadyDeleted => StatusCode::GONE,
            Self::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Infrastructure => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unknown | Self::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error kind
    #[must_use]
    pub fn error_code(&self) -> String {
        self.to_string().to_uppercase()
    }

    /// Default severity for this error kind
    #[must_use]
    pub const fn level(&self) -> Level {
        match self {
            Self::ValidationFailed | Self::BadRequest => Level::Info,
            Self::NotFound | Self::AlreadyExists | Self::AlreadyDeleted => Level::Warning,
            Self::Timeout | Self::Infrastructure | Self::Unknown => Level::Error,
            Self::Fatal => Level::Fatal,
        }
    }
}

/// Underlying cause retained for diagnostics
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

// ============================================================================
// Structured error
// ============================================================================

/// Classified error shared by the repository, use-case and transport layers
///
/// The identity of an error (kind, code, description, HTTP status, layer and
/// level) is fixed when it is built. Call sites may only change the observing
/// `function`, the `messages` list and the `raw` cause.
#[derive(Debug, Clone)]
pub struct StructuredError {
    kind: ErrorKind,
    code: String,
    description: String,
    layer: Layer,
    level: Level,
    http_status: StatusCode,
    function: String,
    messages: Vec<String>,
    raw: Option<Cause>,
}

impl StructuredError {
    /// Create a new structured error with the defaults of `kind`
    pub fn new(kind: ErrorKind, layer: Layer, description: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.error_code(),
            description: description.into(),
            layer,
            level: kind.level(),
            http_status: kind.status_code(),
            function: String::new(),
            messages: Vec::new(),
            raw: None,
        }
    }

    /// Create a "not found" error for an entity id
    ///
    /// Soft-deleted rows are reported as not found by update and get.
    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::NotFound,
            Layer::UseCase,
            format!("{entity} {id} not found"),
        )
    }

    /// Create an "already exists" error for a conflicting unique key
    ///
    /// ```rust
    /// use crud_service::error::StructuredError;
    ///
    /// let error = StructuredError::already_exists("role", "name", "Gerencia");
    /// assert_eq!(error.description(), "role with name 'Gerencia' already exists");
    /// ```
    pub fn already_exists(entity: &str, column: &str, value: &str) -> Self {
        Self::new(
            ErrorKind::AlreadyExists,
            Layer::UseCase,
            format!("{entity} with {column} '{value}' already exists"),
        )
    }

    /// Create an "already deleted" error for a soft-deleted row
    pub fn already_deleted(entity: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::AlreadyDeleted,
            Layer::UseCase,
            format!("{entity} {id} is already deleted"),
        )
    }

    /// Create a validation error carrying one message per failing field
    pub fn validation_failed(entity: &str, messages: Vec<String>) -> Self {
        Self::new(
            ErrorKind::ValidationFailed,
            Layer::Domain,
            format!("invalid {entity}"),
        )
        .with_messages(messages)
    }

    /// Create a bad request error at the transport boundary
    pub fn bad_request(description: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, Layer::Interface, description)
    }

    /// Create a timeout error for an operation whose deadline elapsed
    pub fn timeout(layer: Layer, function: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, layer, "operation timed out").with_function(function)
    }

    /// Create an infrastructure error classified at the repository boundary
    pub fn infrastructure<E>(function: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::new(
            ErrorKind::Infrastructure,
            Layer::Infrastructure,
            "storage operation failed",
        )
        .with_function(function)
        .with_raw(cause)
    }

    /// Wrap an unclassified failure at the layer that first observed it
    ///
    /// The cause is kept in `raw` for diagnostics and never serialized.
    pub fn unknown<E>(layer: Layer, function: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::new(ErrorKind::Unknown, layer, "unexpected error")
            .with_function(function)
            .with_raw(cause)
    }

    /// Create a fatal error from a panic recovered at an operation boundary
    pub fn fatal(function: impl Into<String>, panic_message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, Layer::UseCase, "internal failure")
            .with_function(function)
            .with_raw(PanicCause(panic_message.into()))
    }

    /// Classify an arbitrary error observed by `function`
    ///
    /// Structured errors keep their identity and are chained under the
    /// observer; anything else becomes [`ErrorKind::Unknown`] at `layer`.
    pub fn classify(
        layer: Layer,
        function: impl Into<String>,
        error: Box<dyn std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        match error.downcast::<Self>() {
            Ok(structured) => (*structured).observed_in(function),
            Err(other) => Self::unknown(layer, function, BoxedCause(other)),
        }
    }

    /// Re-raise this error from another function without changing its identity
    ///
    /// The returned error keeps the code, description, status, layer, level and
    /// messages, records `function` as the observer and chains the original as
    /// its cause.
    #[must_use]
    pub fn observed_in(self, function: impl Into<String>) -> Self {
        Self {
            kind: self.kind,
            code: self.code.clone(),
            description: self.description.clone(),
            layer: self.layer,
            level: self.level,
            http_status: self.http_status,
            function: function.into(),
            messages: self.messages.clone(),
            raw: Some(Arc::new(self)),
        }
    }

    /// Set the function that observed the error
    #[must_use]
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    /// Replace the message list
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<String>) -> Self {
        self.messages = messages;
        self
    }

    /// Append a single message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    /// Attach the underlying cause
    #[must_use]
    pub fn with_raw<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.raw = Some(Arc::new(cause));
        self
    }

    /// Category of the error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Stable code identifying the error on the wire
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Layer the error was classified in
    #[must_use]
    pub const fn layer(&self) -> Layer {
        self.layer
    }

    /// Severity
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    /// HTTP status the transport answers with
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        self.http_status
    }

    /// Function that observed the error
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Field or detail messages
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Underlying cause, if any
    #[must_use]
    pub fn raw(&self) -> Option<&Cause> {
        self.raw.as_ref()
    }

    /// Function at the bottom of the structured caused-by chain
    #[must_use]
    pub fn origin_function(&self) -> &str {
        let mut current = self;
        while let Some(inner) = current
            .raw
            .as_deref()
            .and_then(|raw| raw.downcast_ref::<Self>())
        {
            current = inner;
        }
        &current.function
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout | ErrorKind::Infrastructure)
    }

    /// Wire payload for this error
    #[must_use]
    pub fn to_response_body(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code.clone(),
            description: self.description.clone(),
            http_status: self.http_status.as_u16(),
            messages: self.messages.clone(),
        }
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} layer", self.code, self.layer)?;
        if !self.function.is_empty() {
            write!(f, ", {}", self.function)?;
        }
        write!(f, "]: {}", self.description)
    }
}

impl std::error::Error for StructuredError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.raw
            .as_deref()
            .map(|raw| raw as &(dyn std::error::Error + 'static))
    }
}

/// Cause recorded for a recovered panic
#[derive(Debug, Error)]
#[error("panic: {0}")]
pub struct PanicCause(pub String);

impl PanicCause {
    /// Extract a readable message from a panic payload
    #[must_use]
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self(message)
    }
}

#[derive(Debug, Error)]
#[error(transparent)]
struct BoxedCause(Box<dyn std::error::Error + Send + Sync + 'static>);

/// Error response body
///
/// Only the fields a client may act on are serialized; `raw`, `function`,
/// `layer` and `level` stay server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Stable error code
    pub code: String,
    /// Human-readable description
    pub description: String,
    /// HTTP status code
    pub http_status: u16,
    /// Field or detail messages
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl IntoResponse for StructuredError {
    fn into_response(self) -> Response {
        let cause = self.raw.as_ref().map(ToString::to_string);
        match self.level {
            Level::Info | Level::Warning => tracing::warn!(
                code = %self.code,
                layer = %self.layer,
                level = %self.level,
                function = %self.function,
                origin = %self.origin_function(),
                "{}", self.description
            ),
            Level::Error | Level::Fatal => tracing::error!(
                code = %self.code,
                layer = %self.layer,
                level = %self.level,
                function = %self.function,
                origin = %self.origin_function(),
                cause = ?cause,
                retriable = self.is_retriable(),
                "{}", self.description
            ),
        }

        (self.http_status, Json(self.to_response_body())).into_response()
    }
}

// ============================================================================
// Service bootstrap errors
// ============================================================================

/// Result type alias for service bootstrap
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring and starting the service
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Tracing subscriber could not be installed
    #[error("Tracing error: {0}")]
    Tracing(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, Error)]
    #[error("connection reset by peer")]
    struct DriverError;

    #[test]
    fn test_error_kind_codes_and_statuses() {
        assert_eq!(ErrorKind::NotFound.error_code(), "NOT_FOUND");
        assert_eq!(ErrorKind::AlreadyExists.error_code(), "ALREADY_EXISTS");
        assert_eq!(ErrorKind::AlreadyDeleted.error_code(), "ALREADY_DELETED");
        assert_eq!(ErrorKind::ValidationFailed.error_code(), "VALIDATION_FAILED");
        assert_eq!(ErrorKind::Timeout.error_code(), "TIMEOUT");
        assert_eq!(ErrorKind::Unknown.error_code(), "UNKNOWN");
        assert_eq!(ErrorKind::Fatal.error_code(), "FATAL");

        assert_eq!(ErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::AlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorKind::AlreadyDeleted.status_code(), StatusCode::GONE);
        assert_eq!(
            ErrorKind::ValidationFailed.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ErrorKind::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ErrorKind::Fatal.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_factories_build_fresh_values() {
        let first = StructuredError::not_found("role", "a").with_function("one");
        let second = StructuredError::not_found("role", "b");
        assert_eq!(first.function(), "one");
        assert!(second.function().is_empty());
        assert_eq!(second.description(), "role b not found");
    }

    #[test]
    fn test_validation_failed_carries_messages() {
        let error = StructuredError::validation_failed(
            "role",
            vec!["name: must not be empty".to_string()],
        );
        assert_eq!(error.kind(), ErrorKind::ValidationFailed);
        assert_eq!(error.layer(), Layer::Domain);
        assert_eq!(error.level(), Level::Info);
        assert_eq!(error.messages(), ["name: must not be empty".to_string()]);
    }

    #[test]
    fn test_observed_in_preserves_identity() {
        let infra = StructuredError::infrastructure("PgRoleRepository::count", DriverError);
        let surfaced = infra.observed_in("RoleUseCase::list");

        assert_eq!(surfaced.kind(), ErrorKind::Infrastructure);
        assert_eq!(surfaced.code(), "INFRASTRUCTURE");
        assert_eq!(surfaced.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(surfaced.layer(), Layer::Infrastructure);
        assert_eq!(surfaced.function(), "RoleUseCase::list");
        assert_eq!(surfaced.origin_function(), "PgRoleRepository::count");

        let source = surfaced.source().expect("chained cause");
        let inner = source
            .downcast_ref::<StructuredError>()
            .expect("structured cause");
        assert_eq!(inner.function(), "PgRoleRepository::count");
    }

    #[test]
    fn test_classify_keeps_structured_errors() {
        let original = StructuredError::already_deleted("role", "42");
        let classified = StructuredError::classify(Layer::UseCase, "delete", Box::new(original));
        assert_eq!(classified.kind(), ErrorKind::AlreadyDeleted);
        assert_eq!(classified.function(), "delete");
    }

    #[test]
    fn test_classify_wraps_unrecognized_errors() {
        let classified =
            StructuredError::classify(Layer::Infrastructure, "list", Box::new(DriverError));
        assert_eq!(classified.kind(), ErrorKind::Unknown);
        assert_eq!(classified.layer(), Layer::Infrastructure);
        assert_eq!(classified.function(), "list");
        assert_eq!(
            classified.raw().map(ToString::to_string),
            Some("connection reset by peer".to_string())
        );
    }

    #[test]
    fn test_fatal_records_panic_message() {
        let error = StructuredError::fatal("create", "boom");
        assert_eq!(error.kind(), ErrorKind::Fatal);
        assert_eq!(error.level(), Level::Fatal);
        assert_eq!(error.raw().map(ToString::to_string), Some("panic: boom".to_string()));
    }

    #[test]
    fn test_panic_cause_from_payload() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(PanicCause::from_payload(payload.as_ref()).0, "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(PanicCause::from_payload(payload.as_ref()).0, "owned message");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(
            PanicCause::from_payload(payload.as_ref()).0,
            "non-string panic payload"
        );
    }

    #[test]
    fn test_display() {
        let error = StructuredError::not_found("role", "X").with_function("update");
        assert_eq!(
            error.to_string(),
            "NOT_FOUND [use_case layer, update]: role X not found"
        );
    }

    #[test]
    fn test_response_body_omits_diagnostics() {
        let error = StructuredError::unknown(Layer::Infrastructure, "count", DriverError);
        let body = serde_json::to_value(error.to_response_body()).unwrap();

        assert_eq!(body["code"], "UNKNOWN");
        assert_eq!(body["description"], "unexpected error");
        assert_eq!(body["httpStatus"], 500);
        assert!(body.get("raw").is_none());
        assert!(body.get("function").is_none());
        assert!(body.get("messages").is_none());
        assert!(!body.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_into_response_uses_http_status() {
        let error = StructuredError::already_exists("role", "name", "Gerencia");
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.code, "ALREADY_EXISTS");
        assert_eq!(body.http_status, 409);
    }

    #[test]
    fn test_retriable() {
        assert!(StructuredError::timeout(Layer::UseCase, "list").is_retriable());
        assert!(StructuredError::infrastructure("count", DriverError).is_retriable());
        assert!(!StructuredError::not_found("role", "1").is_retriable());
    }
}
