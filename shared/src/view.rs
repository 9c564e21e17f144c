//! View model derivation. Every string the shell draws is resolved here in
//! the active language, so shells carry no string tables of their own.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::diagnosis::{DiagnosisResult, Treatment};
use crate::expert::{ExpertForm, ExpertSubject};
use crate::i18n::{translate, Language};
use crate::model::{AppView, DoctorState, DoctorStatus, Model, NoteCategory, SessionPhase, User};
use crate::notes::NotesState;
use crate::session::{AuthForm, AuthMode};
use crate::weather::{current_alerts, AlertSeverity, WeatherData, WeatherIcon};
use crate::{AppError, ErrorSeverity};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub language: Language,
    pub languages: Vec<LanguageOption>,
    pub rtl: bool,
    pub app_title: String,
    pub tagline: String,
    pub language_label: String,
    pub screen: Screen,
    pub banner: Option<UserFacingError>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageOption {
    pub language: Language,
    pub label: String,
    pub short_label: String,
    pub selected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Screen {
    Loading,
    Auth(AuthScreen),
    Main(Box<MainScreen>),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthScreen {
    pub mode: AuthMode,
    pub heading: String,
    pub show_name_field: bool,
    pub name_label: String,
    pub email_label: String,
    pub password_label: String,
    pub location_label: String,
    pub remember_label: String,
    pub submit_label: String,
    pub switch_mode_label: String,
    pub verifying: bool,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MainScreen {
    pub user: UserView,
    pub active_view: AppView,
    pub nav: Vec<NavItem>,
    pub logout_label: String,
    pub content: Content,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserView {
    pub name: String,
    pub first_name: String,
    pub email: String,
    pub location: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavItem {
    pub view: AppView,
    pub label: String,
    pub active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Dashboard(DashboardView),
    Diagnosis(DoctorView),
    Notes(NotesView),
    Expert(ExpertView),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DashboardView {
    pub greeting: String,
    pub date_label: String,
    pub location: String,
    pub weather_label: String,
    pub weather: WeatherData,
    pub weather_icon: WeatherIcon,
    pub humidity_label: String,
    pub wind_label: String,
    pub quick_actions: Vec<NavItem>,
    pub alerts_label: String,
    pub alerts: Vec<AlertView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertView {
    pub title: String,
    pub body: String,
    pub severity: AlertSeverity,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DoctorView {
    pub title: String,
    pub description: String,
    pub take_photo_label: String,
    pub upload_photo_label: String,
    pub image_preview: Option<String>,
    pub image_error: Option<String>,
    pub analyzing: bool,
    pub can_analyze: bool,
    pub analyze_label: String,
    pub result: Option<DiagnosisView>,
    pub failure: Option<String>,
    pub scan_another_label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisView {
    pub plant_name: String,
    pub disease_name: String,
    pub is_healthy: bool,
    pub status_label: String,
    pub confidence: f64,
    pub confidence_label: String,
    pub description: String,
    pub natural_label: String,
    pub natural_treatments: Vec<Treatment>,
    pub chemical_label: String,
    pub chemical_treatments: Vec<Treatment>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotesView {
    pub loaded: bool,
    pub title: String,
    pub new_label: String,
    pub search_placeholder: String,
    pub query: String,
    pub items: Vec<NoteItem>,
    pub empty_message: Option<String>,
    pub editor: Option<NoteEditorView>,
    pub confirm_delete: Option<ConfirmDeleteView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: NoteCategory,
    pub category_label: String,
    pub date: DateTime<Utc>,
    pub date_label: String,
    pub delete_label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteEditorView {
    pub heading: String,
    pub editing: bool,
    pub title_label: String,
    pub title: String,
    pub category_label: String,
    pub categories: Vec<CategoryOption>,
    pub content_label: String,
    pub content: String,
    pub can_save: bool,
    pub save_label: String,
    pub cancel_label: String,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryOption {
    pub category: NoteCategory,
    pub label: String,
    pub selected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmDeleteView {
    pub note_id: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpertView {
    pub title: String,
    pub description: String,
    pub subject_label: String,
    pub subjects: Vec<SubjectOption>,
    pub description_label: String,
    pub description_value: String,
    pub submit_label: String,
    pub sent: bool,
    pub sent_message: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubjectOption {
    pub subject: ExpertSubject,
    pub label: String,
    pub selected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl UserFacingError {
    fn new(error: &AppError, language: Language) -> Self {
        Self {
            message: error.user_facing_message(language),
            is_transient: error.severity == ErrorSeverity::Transient,
            is_retryable: error.is_retryable(),
            error_code: error.code().to_string(),
        }
    }
}

struct Labels(Language);

impl Labels {
    fn get(&self, key: &str) -> String {
        translate(key, self.0).to_string()
    }

    fn opt(&self, key: Option<&str>) -> Option<String> {
        key.map(|key| self.get(key))
    }
}

#[must_use]
pub fn build(model: &Model) -> ViewModel {
    let language = model.language;
    let t = Labels(language);

    let screen = match (model.phase, model.user.as_ref()) {
        (SessionPhase::Restoring, _) => Screen::Loading,
        (SessionPhase::SignedIn, Some(user)) => Screen::Main(Box::new(main_screen(model, user, &t))),
        (SessionPhase::SignedIn | SessionPhase::SignedOut | SessionPhase::Verifying, _) => {
            Screen::Auth(auth_screen(&model.auth_form, model.phase, &t))
        }
    };

    ViewModel {
        language,
        languages: Language::ALL
            .into_iter()
            .map(|option| LanguageOption {
                language: option,
                label: option.display_name().to_string(),
                short_label: option.short_label().to_string(),
                selected: option == language,
            })
            .collect(),
        rtl: language.is_rtl(),
        app_title: t.get("app_title"),
        tagline: t.get("smart_farming"),
        language_label: t.get("language_label"),
        screen,
        banner: model
            .banner
            .as_ref()
            .map(|error| UserFacingError::new(error, language)),
    }
}

fn auth_screen(form: &AuthForm, phase: SessionPhase, t: &Labels) -> AuthScreen {
    let registering = form.mode == AuthMode::Register;
    let verifying = phase == SessionPhase::Verifying;
    let submit_key = match (verifying, registering) {
        (true, _) => "signing_in",
        (false, true) => "start_farming",
        (false, false) => "login_to_farm",
    };
    AuthScreen {
        mode: form.mode,
        heading: t.get(if registering { "create_account" } else { "login_welcome" }),
        show_name_field: registering,
        name_label: t.get("full_name"),
        email_label: t.get("email"),
        password_label: t.get("password"),
        location_label: t.get("location"),
        remember_label: t.get("remember_me"),
        submit_label: t.get(submit_key),
        switch_mode_label: t.get(if registering {
            "already_have_account"
        } else {
            "new_to_app"
        }),
        verifying,
        error: t.opt(form.error_key),
    }
}

fn main_screen(model: &Model, user: &User, t: &Labels) -> MainScreen {
    let content = match model.view {
        AppView::Dashboard => {
            Content::Dashboard(dashboard(user, model.view, Local::now().date_naive(), t))
        },
        AppView::Diagnosis => Content::Diagnosis(doctor(&model.doctor, t)),
        AppView::Notes => Content::Notes(notes(&model.notes, t)),
        AppView::Expert => Content::Expert(expert(&model.expert, t)),
    };
    MainScreen {
        user: UserView {
            name: user.name.clone(),
            first_name: user.first_name().to_string(),
            email: user.email.clone(),
            location: user.location.clone(),
        },
        active_view: model.view,
        nav: AppView::ALL
            .into_iter()
            .map(|view| nav_item(view, view.label_key(), model.view, t))
            .collect(),
        logout_label: t.get("logout"),
        content,
    }
}

fn nav_item(view: AppView, label_key: &str, active: AppView, t: &Labels) -> NavItem {
    NavItem {
        view,
        label: t.get(label_key),
        active: view == active,
    }
}

/// Long-form date shown under the greeting, e.g. "Friday, October 16, 2026".
#[must_use]
pub fn date_label(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

fn dashboard(user: &User, active: AppView, today: NaiveDate, t: &Labels) -> DashboardView {
    let weather = WeatherData::mock();
    DashboardView {
        greeting: format!("{}, {}", t.get("hello"), user.first_name()),
        date_label: date_label(today),
        location: user.location.clone(),
        weather_label: t.get("weather_current"),
        weather_icon: weather.icon(),
        weather,
        humidity_label: t.get("humidity"),
        wind_label: t.get("wind"),
        quick_actions: vec![
            nav_item(AppView::Diagnosis, "scan_crop", active, t),
            nav_item(AppView::Notes, "field_notes", active, t),
        ],
        alerts_label: t.get("recent_alerts"),
        alerts: current_alerts()
            .into_iter()
            .map(|alert| AlertView {
                title: t.get(alert.title_key),
                body: t.get(alert.body_key),
                severity: alert.severity,
            })
            .collect(),
    }
}

fn doctor(state: &DoctorState, t: &Labels) -> DoctorView {
    let analyzing = state.is_analyzing();
    let (result, failure) = match &state.status {
        DoctorStatus::Done(result) => (Some(diagnosis_view(result, t)), None),
        // Every failure cause reads the same to the farmer.
        DoctorStatus::Failed(_) => (None, Some(t.get("analysis_failed"))),
        DoctorStatus::Idle | DoctorStatus::Analyzing { .. } => (None, None),
    };
    DoctorView {
        title: t.get("doctor_title"),
        description: t.get("doctor_desc"),
        take_photo_label: t.get("take_photo"),
        upload_photo_label: t.get("upload_photo"),
        image_preview: state.image.as_ref().map(|image| image.to_data_url()),
        image_error: state
            .image_error
            .as_ref()
            .map(|error| error.user_facing_message(t.0)),
        analyzing,
        can_analyze: state.image.is_some() && !analyzing,
        analyze_label: t.get(if analyzing { "analyzing" } else { "analyze_crop" }),
        result,
        failure,
        scan_another_label: t.get("scan_another"),
    }
}

fn diagnosis_view(result: &DiagnosisResult, t: &Labels) -> DiagnosisView {
    DiagnosisView {
        plant_name: result.plant_name.clone(),
        disease_name: result.disease_name.clone(),
        is_healthy: result.is_healthy,
        status_label: t.get(if result.is_healthy {
            "healthy"
        } else {
            "disease_detected"
        }),
        confidence: result.confidence,
        confidence_label: format!("{}: {}%", t.get("confidence"), result.confidence.round()),
        description: result.description.clone(),
        natural_label: t.get("natural_treatment"),
        natural_treatments: result.natural_treatments.clone(),
        chemical_label: t.get("chemical_treatment"),
        chemical_treatments: result.chemical_treatments.clone(),
    }
}

fn notes(state: &NotesState, t: &Labels) -> NotesView {
    let items: Vec<NoteItem> = state
        .book
        .search(&state.query)
        .into_iter()
        .map(|note| NoteItem {
            id: note.id.to_string(),
            title: note.title.clone(),
            content: note.content.clone(),
            category: note.category,
            category_label: t.get(note.category.label_key()),
            date: note.date,
            date_label: note.date.format("%Y-%m-%d").to_string(),
            delete_label: t.get("delete"),
        })
        .collect();

    let editor = state.editor.as_ref().map(|editor| {
        let editing = editor.editing.is_some();
        NoteEditorView {
            heading: t.get(if editing { "edit_note" } else { "new_note" }),
            editing,
            title_label: t.get("title_label"),
            title: editor.draft.title.clone(),
            category_label: t.get("category_label"),
            categories: NoteCategory::ALL
                .into_iter()
                .map(|category| CategoryOption {
                    category,
                    label: t.get(category.label_key()),
                    selected: category == editor.draft.category,
                })
                .collect(),
            content_label: t.get("observations_label"),
            content: editor.draft.content.clone(),
            can_save: editor.draft.can_save(),
            save_label: t.get(if editing { "update_note" } else { "save_note" }),
            cancel_label: t.get("cancel"),
            error: t.opt(editor.error_key),
        }
    });

    NotesView {
        loaded: state.loaded,
        title: t.get("field_notes"),
        new_label: t.get("new_btn"),
        search_placeholder: t.get("search_notes"),
        query: state.query.clone(),
        empty_message: (state.loaded && items.is_empty()).then(|| t.get("no_notes_found")),
        items,
        editor,
        confirm_delete: state.pending_delete.as_ref().map(|id| ConfirmDeleteView {
            note_id: id.to_string(),
            message: t.get("delete_confirm"),
            confirm_label: t.get("delete"),
            cancel_label: t.get("cancel"),
        }),
    }
}

fn expert(form: &ExpertForm, t: &Labels) -> ExpertView {
    ExpertView {
        title: t.get("ask_expert"),
        description: t.get("expert_desc"),
        subject_label: t.get("subject_label"),
        subjects: ExpertSubject::ALL
            .into_iter()
            .map(|subject| SubjectOption {
                subject,
                label: t.get(subject.label_key()),
                selected: subject == form.subject,
            })
            .collect(),
        description_label: t.get("description_label"),
        description_value: form.description.clone(),
        submit_label: t.get("submit_request"),
        sent: form.sent,
        sent_message: form.sent.then(|| t.get("request_sent")),
        error: t.opt(form.error_key),
    }
}
