// ctech-common/src/error.rs
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

use crate::settings::SettingsError;

/// Errors surfaced to REST callers. Each variant carries a machine-readable
/// code (WordPress REST style, e.g. `rest_post_invalid_id`) and a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{message}")]
    NotFound { code: Cow<'static, str>, message: String },
    #[error("{message}")]
    InvalidRequest { code: Cow<'static, str>, message: String },
    #[error("{message}")]
    Unauthorized { code: Cow<'static, str>, message: String },
    #[error("{message}")]
    Forbidden { code: Cow<'static, str>, message: String },
    #[error("{message}")]
    MethodNotAllowed { code: Cow<'static, str>, message: String },
    #[error("{message}")]
    Internal { code: Cow<'static, str>, message: String },
}

impl ApiError {
    pub fn not_found(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::NotFound { code: code.into(), message: message.into() }
    }

    pub fn invalid(code: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self::InvalidRequest { code: code.into(), message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { code: Cow::Borrowed("rest_not_logged_in"), message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { code: Cow::Borrowed("rest_forbidden"), message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { code: Cow::Borrowed("internal_error"), message: message.into() }
    }

    /// HTTP status equivalent of this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::InvalidRequest { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::MethodNotAllowed { .. } => 405,
            Self::Internal { .. } => 500,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::NotFound { code, .. }
            | Self::InvalidRequest { code, .. }
            | Self::Unauthorized { code, .. }
            | Self::Forbidden { code, .. }
            | Self::MethodNotAllowed { code, .. }
            | Self::Internal { code, .. } => code,
        }
    }

    /// Render the `{ code, message, data: { status } }` error body.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
            data: ErrorData { status: self.status() },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub data: ErrorData,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorData {
    pub status: u16,
}

/// Failure reported by the host key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

/// Failure reported by the derived-artifact cache. Never fails a write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cache error: {0}")]
pub struct CacheError(pub String);

/// Failure raised from a unit's `init` hook.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("{0}")]
    Init(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::NoActiveTarget { code, message }
            | SettingsError::TargetNotFound { code, message } => ApiError::NotFound { code, message },
            SettingsError::InvalidPayload(message) => ApiError::invalid("invalid_request", message),
            SettingsError::Storage(err) => ApiError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_wordpress_style_error_body() {
        let err = ApiError::not_found("rest_post_invalid_id", "Invalid post ID.");
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "code": "rest_post_invalid_id",
                "message": "Invalid post ID.",
                "data": { "status": 404 }
            })
        );
    }

    #[test]
    fn maps_settings_errors_to_taxonomy() {
        let err: ApiError = SettingsError::InvalidPayload("payload must be an object".into()).into();
        assert_eq!(err.status(), 400);

        let err: ApiError = SettingsError::NoActiveTarget {
            code: "no_active_kit".into(),
            message: "No active kit".into(),
        }
        .into();
        assert_eq!(err.status(), 404);
        assert_eq!(err.code(), "no_active_kit");

        let err: ApiError = SettingsError::Storage(StoreError("disk full".into())).into();
        assert_eq!(err.status(), 500);
    }
}
