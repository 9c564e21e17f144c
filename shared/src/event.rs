use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

use crate::capabilities::{AuthResult, CameraResult, HttpResult, KvResult, PhotoSource, StorageKey, StorageTier};
use crate::expert::ExpertSubject;
use crate::i18n::Language;
use crate::model::{AppView, NoteCategory, NoteId};
use crate::session::LoginForm;

/// A string that never shows up in `Debug` output and is wiped when dropped.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copies the value into the long-lived form kept in configuration.
    #[must_use]
    pub fn to_secret_string(&self) -> SecretString {
        SecretString::new(self.0.clone())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Lifecycle
    AppStarted,
    Configure {
        api_key: Secret,
        model: Option<String>,
        endpoint: Option<String>,
    },
    DismissError,

    // Session
    SessionRestored {
        tier: StorageTier,
        result: KvResult,
    },
    AuthModeToggled,
    LoginSubmitted(Box<LoginForm>),
    LoginVerified {
        remember: bool,
        result: AuthResult,
    },
    LogoutRequested,

    // Navigation & language
    Navigate(AppView),
    LanguageSelected(Language),
    LanguageLoaded(KvResult),

    // Field notes
    NotesLoaded(KvResult),
    NotesSearchChanged(String),
    NoteEditorOpened {
        id: Option<NoteId>,
    },
    NoteTitleChanged(String),
    NoteContentChanged(String),
    NoteCategorySelected(NoteCategory),
    NoteSaveRequested,
    NoteEditorClosed,
    NoteDeleteRequested {
        id: NoteId,
    },
    NoteDeleteConfirmed,
    NoteDeleteCancelled,

    // Crop doctor
    ImageSelected {
        data_url: String,
    },
    PhotoRequested {
        source: PhotoSource,
    },
    PhotoPicked(CameraResult),
    AnalyzeRequested,
    DiagnosisReceived {
        request_id: u64,
        result: Box<HttpResult>,
    },
    DiagnosisReset,

    // Expert form
    ExpertSubjectSelected(ExpertSubject),
    ExpertDescriptionChanged(String),
    ExpertSubmitted,
    ExpertConfirmationElapsed,

    // Storage write acknowledgements
    StorageWritten {
        key: StorageKey,
        result: KvResult,
    },
}

impl Event {
    /// Stable name for logs. Never includes payloads.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppStarted => "AppStarted",
            Self::Configure { .. } => "Configure",
            Self::DismissError => "DismissError",
            Self::SessionRestored { .. } => "SessionRestored",
            Self::AuthModeToggled => "AuthModeToggled",
            Self::LoginSubmitted(_) => "LoginSubmitted",
            Self::LoginVerified { .. } => "LoginVerified",
            Self::LogoutRequested => "LogoutRequested",
            Self::Navigate(_) => "Navigate",
            Self::LanguageSelected(_) => "LanguageSelected",
            Self::LanguageLoaded(_) => "LanguageLoaded",
            Self::NotesLoaded(_) => "NotesLoaded",
            Self::NotesSearchChanged(_) => "NotesSearchChanged",
            Self::NoteEditorOpened { .. } => "NoteEditorOpened",
            Self::NoteTitleChanged(_) => "NoteTitleChanged",
            Self::NoteContentChanged(_) => "NoteContentChanged",
            Self::NoteCategorySelected(_) => "NoteCategorySelected",
            Self::NoteSaveRequested => "NoteSaveRequested",
            Self::NoteEditorClosed => "NoteEditorClosed",
            Self::NoteDeleteRequested { .. } => "NoteDeleteRequested",
            Self::NoteDeleteConfirmed => "NoteDeleteConfirmed",
            Self::NoteDeleteCancelled => "NoteDeleteCancelled",
            Self::ImageSelected { .. } => "ImageSelected",
            Self::PhotoRequested { .. } => "PhotoRequested",
            Self::PhotoPicked(_) => "PhotoPicked",
            Self::AnalyzeRequested => "AnalyzeRequested",
            Self::DiagnosisReceived { .. } => "DiagnosisReceived",
            Self::DiagnosisReset => "DiagnosisReset",
            Self::ExpertSubjectSelected(_) => "ExpertSubjectSelected",
            Self::ExpertDescriptionChanged(_) => "ExpertDescriptionChanged",
            Self::ExpertSubmitted => "ExpertSubmitted",
            Self::ExpertConfirmationElapsed => "ExpertConfirmationElapsed",
            Self::StorageWritten { .. } => "StorageWritten",
        }
    }
}
