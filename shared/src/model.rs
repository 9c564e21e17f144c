use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::config::DiagnosisConfig;
use crate::diagnosis::DiagnosisResult;
use crate::expert::ExpertForm;
use crate::i18n::Language;
use crate::image_processing::StagedImage;
use crate::notes::NotesState;
use crate::session::AuthForm;
use crate::AppError;

pub const DEFAULT_USER_NAME: &str = "Farmer";
pub const DEFAULT_USER_LOCATION: &str = "India";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub email: String,
    pub location: String,
}

impl User {
    /// First whitespace-separated word of the name, used in greetings.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(NoteId);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NoteCategory {
    #[default]
    General,
    Planting,
    Irrigation,
    Harvest,
    Issue,
}

impl NoteCategory {
    pub const ALL: [Self; 5] = [
        Self::General,
        Self::Planting,
        Self::Irrigation,
        Self::Harvest,
        Self::Issue,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Planting => "Planting",
            Self::Irrigation => "Irrigation",
            Self::Harvest => "Harvest",
            Self::Issue => "Issue",
        }
    }

    #[must_use]
    pub const fn label_key(self) -> &'static str {
        match self {
            Self::General => "cat_general",
            Self::Planting => "cat_planting",
            Self::Irrigation => "cat_irrigation",
            Self::Harvest => "cat_harvest",
            Self::Issue => "cat_issue",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub category: NoteCategory,
}

// Field observations are user data; keep them out of logs.
impl fmt::Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Note")
            .field("id", &self.id)
            .field("title_len", &self.title.len())
            .field("content_len", &self.content.len())
            .field("date", &self.date)
            .field("category", &self.category)
            .finish()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AppView {
    #[default]
    Dashboard,
    Diagnosis,
    Notes,
    Expert,
}

impl AppView {
    pub const ALL: [Self; 4] = [Self::Dashboard, Self::Diagnosis, Self::Notes, Self::Expert];

    #[must_use]
    pub const fn label_key(self) -> &'static str {
        match self {
            Self::Dashboard => "nav_home",
            Self::Diagnosis => "nav_doctor",
            Self::Notes => "nav_notes",
            Self::Expert => "nav_expert",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the stored user to be read back.
    #[default]
    Restoring,
    SignedOut,
    Verifying,
    SignedIn,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
}

impl ValidationError {
    /// String table key for the message shown next to the form.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::Required { field } => Self::key_for_field(field),
        }
    }

    #[must_use]
    pub fn key_for_field(field: &str) -> &'static str {
        match field {
            "email" => "err_email_required",
            "password" => "err_password_required",
            "name" => "err_name_required",
            "title" => "err_title_required",
            "description" => "err_description_required",
            _ => "err_unexpected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DoctorStatus {
    #[default]
    Idle,
    Analyzing {
        request_id: u64,
    },
    Done(DiagnosisResult),
    Failed(AppError),
}

#[derive(Debug, Default)]
pub struct DoctorState {
    pub image: Option<StagedImage>,
    pub status: DoctorStatus,
    /// Problem loading the picked photo, shown under the picker.
    pub image_error: Option<AppError>,
    last_request_id: u64,
}

impl DoctorState {
    #[must_use]
    pub fn is_analyzing(&self) -> bool {
        matches!(self.status, DoctorStatus::Analyzing { .. })
    }

    /// Starts a new analysis generation. `None` when there is nothing to
    /// analyze or one is already in flight.
    pub fn begin_analysis(&mut self) -> Option<u64> {
        if self.image.is_none() || self.is_analyzing() {
            return None;
        }
        self.last_request_id += 1;
        self.status = DoctorStatus::Analyzing {
            request_id: self.last_request_id,
        };
        Some(self.last_request_id)
    }

    /// Whether a response for `request_id` still belongs to the screen.
    #[must_use]
    pub fn is_current(&self, request_id: u64) -> bool {
        self.status == DoctorStatus::Analyzing { request_id }
    }

    pub fn stage(&mut self, image: StagedImage) {
        self.image = Some(image);
        self.status = DoctorStatus::Idle;
        self.image_error = None;
    }

    pub fn reset(&mut self) {
        self.image = None;
        self.status = DoctorStatus::Idle;
        self.image_error = None;
    }
}

#[derive(Debug, Default)]
pub struct Model {
    pub phase: SessionPhase,
    pub user: Option<User>,
    pub view: AppView,
    pub language: Language,
    /// Set once the farmer picks a language. A stored preference that
    /// arrives later no longer applies.
    pub language_chosen: bool,
    pub auth_form: AuthForm,
    pub notes: NotesState,
    pub doctor: DoctorState,
    pub expert: ExpertForm,
    pub config: DiagnosisConfig,
    /// Last non-form error, shown as a dismissible banner.
    pub banner: Option<AppError>,
}

impl Model {
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.phase == SessionPhase::SignedIn && self.user.is_some()
    }
}
