#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod diagnosis;
pub mod event;
pub mod expert;
pub mod i18n;
pub mod image_processing;
pub mod model;
pub mod notes;
pub mod session;
pub mod view;
pub mod weather;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use crux_core::App as CruxApp;
pub use event::Event;
pub use model::Model;
pub use view::ViewModel;

use capabilities::{AuthError, CameraError, HttpError, KeyValueError, KvError, RequestError};
use config::ConfigError;
use diagnosis::DiagnosisError;
use i18n::{translate, Language};
use image_processing::ImageError;
use model::ValidationError;
use notes::NoteError;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 4096;
pub const MAX_IMAGE_ALLOC: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    RateLimited,
    ServiceUnavailable,
    Authentication,
    Configuration,
    Validation,
    NotFound,
    Storage,
    QuotaExceeded,
    Serialization,
    ImageProcessing,
    ImageTooLarge,
    ImageDimensionsTooLarge,
    ImageFormatUnsupported,
    Camera,
    CameraPermissionDenied,
    Diagnosis,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::RateLimited => "RATE_LIMITED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::Authentication => "AUTH_ERROR",
            Self::Configuration => "CONFIG_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Storage => "STORAGE_ERROR",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::ImageProcessing => "IMAGE_PROCESSING_ERROR",
            Self::ImageTooLarge => "IMAGE_TOO_LARGE",
            Self::ImageDimensionsTooLarge => "IMAGE_DIMENSIONS_TOO_LARGE",
            Self::ImageFormatUnsupported => "IMAGE_FORMAT_UNSUPPORTED",
            Self::Camera => "CAMERA_ERROR",
            Self::CameraPermissionDenied => "CAMERA_PERMISSION_DENIED",
            Self::Diagnosis => "DIAGNOSIS_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network
            | Self::Timeout
            | Self::RateLimited
            | Self::ServiceUnavailable
            | Self::Storage
            | Self::Camera => ErrorSeverity::Transient,

            Self::Authentication
            | Self::Configuration
            | Self::Validation
            | Self::NotFound
            | Self::QuotaExceeded
            | Self::Serialization
            | Self::ImageProcessing
            | Self::ImageTooLarge
            | Self::ImageDimensionsTooLarge
            | Self::ImageFormatUnsupported
            | Self::CameraPermissionDenied
            | Self::Diagnosis
            | Self::Internal => ErrorSeverity::Permanent,
        }
    }

    /// Whether trying the same action again by hand may succeed. Nothing in
    /// the core retries on its own.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network
                | Self::Timeout
                | Self::RateLimited
                | Self::ServiceUnavailable
                | Self::Storage
                | Self::Camera
        )
    }
}

/// The one error type the UI sees. Concern-specific errors convert into it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// String table key for the message shown to the farmer.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self.kind {
            ErrorKind::Network | ErrorKind::RateLimited | ErrorKind::ServiceUnavailable => {
                "err_network"
            }
            ErrorKind::Timeout => "err_timeout",
            ErrorKind::Authentication => "err_login_failed",
            ErrorKind::Configuration => "err_config",
            ErrorKind::Validation => self
                .context
                .get("field")
                .map_or("err_unexpected", |field| ValidationError::key_for_field(field)),
            ErrorKind::Storage | ErrorKind::QuotaExceeded | ErrorKind::Serialization => {
                "err_storage"
            }
            ErrorKind::ImageProcessing | ErrorKind::ImageFormatUnsupported => "err_image_invalid",
            ErrorKind::ImageTooLarge | ErrorKind::ImageDimensionsTooLarge => "err_image_too_large",
            ErrorKind::Camera => "err_camera",
            ErrorKind::CameraPermissionDenied => "err_camera_permission",
            ErrorKind::Diagnosis => "analysis_failed",
            ErrorKind::NotFound | ErrorKind::Internal => "err_unexpected",
        }
    }

    #[must_use]
    pub fn user_facing_message(&self, language: Language) -> String {
        translate(self.message_key(), language).to_string()
    }

    #[must_use]
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => ErrorKind::Configuration,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::Timeout,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::ServiceUnavailable,
            _ => ErrorKind::Diagnosis,
        };
        Self::new(kind, format!("HTTP error: {status}"))
            .with_internal(message)
            .with_context("http_status", status.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<KvError> for AppError {
    fn from(e: KvError) -> Self {
        let kind = match &e {
            KvError::ValueTooLarge { .. } => ErrorKind::QuotaExceeded,
            KvError::Serialization { .. } => ErrorKind::Serialization,
            KvError::InvalidKey { .. } => ErrorKind::Internal,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<KeyValueError> for AppError {
    fn from(e: KeyValueError) -> Self {
        let kind = match &e {
            KeyValueError::Timeout => ErrorKind::Timeout,
            KeyValueError::Io { .. } | KeyValueError::Other { .. } => ErrorKind::Storage,
            KeyValueError::CursorNotFound => ErrorKind::Internal,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<HttpError> for AppError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Http(failure) => {
                Self::from_http_status(u16::from(failure.code), failure.message)
            }
            HttpError::Timeout => Self::new(ErrorKind::Timeout, e.to_string()),
            HttpError::Io(_) => Self::new(ErrorKind::Network, e.to_string()),
            HttpError::Url(_) => Self::new(ErrorKind::Configuration, e.to_string()),
            HttpError::Json(_) => Self::new(ErrorKind::Internal, e.to_string()),
        }
    }
}

impl From<RequestError> for AppError {
    fn from(e: RequestError) -> Self {
        let kind = match &e {
            RequestError::InvalidUrl { .. } | RequestError::PrivateNetworkBlocked { .. } => {
                ErrorKind::Configuration
            }
            RequestError::BodyTooLarge { .. } => ErrorKind::ImageTooLarge,
            RequestError::InvalidHeader { .. }
            | RequestError::TooManyHeaders { .. }
            | RequestError::Serialization { .. } => ErrorKind::Internal,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        let kind = match e {
            AuthError::Rejected { .. } => ErrorKind::Authentication,
            AuthError::Unavailable { .. } => ErrorKind::Network,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<CameraError> for AppError {
    fn from(e: CameraError) -> Self {
        let kind = match e {
            CameraError::PermissionDenied => ErrorKind::CameraPermissionDenied,
            CameraError::TooLarge { .. } => ErrorKind::ImageTooLarge,
            CameraError::Cancelled | CameraError::Unavailable { .. } | CameraError::Failed { .. } => {
                ErrorKind::Camera
            }
        };
        Self::new(kind, e.to_string())
    }
}

impl From<ImageError> for AppError {
    fn from(e: ImageError) -> Self {
        let kind = match e {
            ImageError::InputTooLarge { .. } => ErrorKind::ImageTooLarge,
            ImageError::LimitsExceeded { .. } => ErrorKind::ImageDimensionsTooLarge,
            ImageError::UnsupportedFormat => ErrorKind::ImageFormatUnsupported,
            ImageError::EmptyInput | ImageError::InvalidEncoding(_) | ImageError::Decode { .. } => {
                ErrorKind::ImageProcessing
            }
        };
        Self::new(kind, e.to_string())
    }
}

impl From<DiagnosisError> for AppError {
    fn from(e: DiagnosisError) -> Self {
        match e {
            DiagnosisError::MissingApiKey => Self::new(ErrorKind::Configuration, e.to_string()),
            DiagnosisError::Request(inner) => inner.into(),
            DiagnosisError::Transport(inner) => inner.into(),
            DiagnosisError::Status { status, message } => Self::from_http_status(status, message),
            DiagnosisError::EmptyResponse
            | DiagnosisError::MalformedJson(_)
            | DiagnosisError::Schema(_) => Self::new(ErrorKind::Diagnosis, e.to_string()),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        let ValidationError::Required { field } = &e;
        let field = *field;
        Self::new(ErrorKind::Validation, e.to_string()).with_context("field", field)
    }
}

impl From<NoteError> for AppError {
    fn from(e: NoteError) -> Self {
        match e {
            NoteError::Invalid(inner) => inner.into(),
            NoteError::NotFound(id) => Self::new(ErrorKind::NotFound, format!("note {id} not found"))
                .with_context("note_id", id.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        Self::new(ErrorKind::Configuration, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds_are_retryable() {
        for kind in [ErrorKind::Network, ErrorKind::Timeout, ErrorKind::Storage] {
            assert_eq!(kind.default_severity(), ErrorSeverity::Transient);
            assert!(kind.is_retryable());
        }
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::Diagnosis.is_retryable());
    }

    #[test]
    fn http_status_maps_to_kind() {
        assert_eq!(AppError::from_http_status(429, "").kind, ErrorKind::RateLimited);
        assert_eq!(AppError::from_http_status(503, "").kind, ErrorKind::ServiceUnavailable);
        assert_eq!(AppError::from_http_status(403, "").kind, ErrorKind::Configuration);
        assert_eq!(AppError::from_http_status(400, "").kind, ErrorKind::Diagnosis);

        let err = AppError::from_http_status(500, "backend exploded");
        assert_eq!(err.context.get("http_status").map(String::as_str), Some("500"));
        assert_eq!(err.internal_message.as_deref(), Some("backend exploded"));
    }

    #[test]
    fn validation_errors_keep_their_field_message() {
        let err = AppError::from(ValidationError::Required { field: "title" });
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message_key(), "err_title_required");
    }

    #[test]
    fn diagnosis_parse_failures_are_generic() {
        let err = AppError::from(DiagnosisError::Schema("missing field".into()));
        assert_eq!(err.message_key(), "analysis_failed");
        assert_eq!(
            err.user_facing_message(Language::En),
            translate("analysis_failed", Language::En)
        );
    }

    #[test]
    fn diagnosis_transport_keeps_cause() {
        let err = AppError::from(DiagnosisError::Transport(HttpError::Timeout));
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.is_retryable());

        let err = AppError::from(DiagnosisError::Transport(HttpError::Io("offline".into())));
        assert_eq!(err.kind, ErrorKind::Network);
    }

    #[test]
    fn storage_errors_map_to_storage_message() {
        let err = AppError::from(KvError::ValueTooLarge { size: 10, max: 1 });
        assert_eq!(err.kind, ErrorKind::QuotaExceeded);
        assert_eq!(err.message_key(), "err_storage");

        let err = AppError::from(KeyValueError::Io {
            message: "disk full".into(),
        });
        assert_eq!(err.kind, ErrorKind::Storage);
        assert_eq!(err.message_key(), "err_storage");
        assert!(err.is_retryable());
    }

    #[test]
    fn blocked_endpoint_is_a_configuration_problem() {
        let err = AppError::from(RequestError::PrivateNetworkBlocked {
            url: "https://localhost/".into(),
            host: "localhost".into(),
        });
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn camera_permission_is_distinct() {
        assert_eq!(
            AppError::from(CameraError::PermissionDenied).message_key(),
            "err_camera_permission"
        );
        assert_eq!(
            AppError::from(ImageError::UnsupportedFormat).kind,
            ErrorKind::ImageFormatUnsupported
        );
    }

    #[test]
    fn display_includes_code_and_internal() {
        let err = AppError::new(ErrorKind::Network, "offline").with_internal("dns");
        assert_eq!(err.to_string(), "[NETWORK_ERROR] offline (internal: dns)");
    }

    #[test]
    fn every_message_key_is_translated() {
        let kinds = [
            ErrorKind::Network,
            ErrorKind::Timeout,
            ErrorKind::RateLimited,
            ErrorKind::ServiceUnavailable,
            ErrorKind::Authentication,
            ErrorKind::Configuration,
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::Storage,
            ErrorKind::QuotaExceeded,
            ErrorKind::Serialization,
            ErrorKind::ImageProcessing,
            ErrorKind::ImageTooLarge,
            ErrorKind::ImageDimensionsTooLarge,
            ErrorKind::ImageFormatUnsupported,
            ErrorKind::Camera,
            ErrorKind::CameraPermissionDenied,
            ErrorKind::Diagnosis,
            ErrorKind::Internal,
        ];
        for kind in kinds {
            let key = AppError::new(kind, "").message_key();
            assert!(i18n::has_key(key), "{key} missing from string table");
        }
    }
}
