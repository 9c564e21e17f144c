use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::capabilities::{Capabilities, KvOperation, KvResult, StorageKey, StorageTier};
use crate::config::{ConfigError, DiagnosisConfig};
use crate::diagnosis::{self, DiagnosisError};
use crate::event::{Event, Secret};
use crate::i18n::{Language, LANGUAGE_SLOT};
use crate::image_processing::{ImageError, ProcessingConfig, StagedImage};
use crate::model::{AppView, DoctorStatus, Model, SessionPhase};
use crate::notes::{NoteBook, NoteError};
use crate::session::{self, RestoreStep};
use crate::view::{self, ViewModel};
use crate::AppError;

#[derive(Default)]
pub struct App;

impl App {
    fn apply_config(
        base: DiagnosisConfig,
        api_key: Secret,
        model: Option<String>,
        endpoint: Option<String>,
    ) -> Result<DiagnosisConfig, ConfigError> {
        let mut config = base.with_api_key(api_key.to_secret_string());
        if let Some(model) = model {
            config = config.with_model(model)?;
        }
        if let Some(endpoint) = endpoint {
            config = config.with_endpoint(endpoint)?;
        }
        Ok(config)
    }

    fn persist_notes(model: &mut Model, caps: &Capabilities) {
        match model.notes.book.store_operation() {
            Ok(operation) => {
                debug!(count = model.notes.book.len(), "persisting notes");
                operation.dispatch(&caps.kv, |result| Event::StorageWritten {
                    key: StorageKey::Notes,
                    result,
                });
            }
            Err(e) => {
                error!(error = %e, "failed to encode notes");
                model.banner = Some(e.into());
            }
        }
    }

    fn stage_image(model: &mut Model, staged: Result<StagedImage, ImageError>) {
        match staged {
            Ok(image) => {
                let (width, height) = image.dimensions();
                debug!(mime_type = image.mime_type(), width, height, "photo staged");
                model.doctor.stage(image);
            }
            Err(e) => {
                warn!(error = %e, "rejected photo");
                model.doctor.image_error = Some(e.into());
            }
        }
    }

    fn start_diagnosis(model: &mut Model, caps: &Capabilities) {
        let Some(request_id) = model.doctor.begin_analysis() else {
            debug!("analysis already running or no photo staged");
            return;
        };

        let request = match model.doctor.image.as_ref() {
            Some(image) => diagnosis::build_request(&model.config, image, model.language),
            None => return,
        };

        match request {
            Ok(request) => {
                info!(
                    request_id,
                    language = %model.language,
                    "requesting diagnosis"
                );
                request.send(&caps.http, move |result| Event::DiagnosisReceived {
                    request_id,
                    result: Box::new(result),
                });
            }
            Err(e) => {
                error!(error = %e, "could not build diagnosis request");
                model.doctor.status = DoctorStatus::Failed(e.into());
            }
        }
    }

    fn finish_diagnosis(model: &mut Model, outcome: Result<diagnosis::DiagnosisResult, DiagnosisError>) {
        model.doctor.status = match outcome {
            Ok(result) => {
                info!(
                    healthy = result.is_healthy,
                    confidence = result.confidence,
                    "diagnosis complete"
                );
                DoctorStatus::Done(result)
            }
            Err(e) => {
                error!(error = %e, retryable = e.is_retryable(), "diagnosis failed");
                DoctorStatus::Failed(e.into())
            }
        };
    }

    fn storage_acknowledged(model: &mut Model, key: StorageKey, result: KvResult) -> bool {
        match result {
            Ok(previous) => {
                debug!(%key, replaced = previous.is_some(), "storage write acknowledged");
                false
            }
            Err(e) => {
                warn!(%key, error = %e, "storage write failed");
                // Only lost notes are surfaced.
                if key == StorageKey::Notes {
                    model.banner = Some(AppError::from(e));
                    true
                } else {
                    false
                }
            }
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(event = event.name(), "update");

        match event {
            Event::AppStarted => {
                model.phase = SessionPhase::Restoring;
                let first = session::RESTORE_ORDER[0];
                KvOperation::get(first, StorageKey::User).dispatch(&caps.kv, move |result| {
                    Event::SessionRestored {
                        tier: first,
                        result,
                    }
                });
                KvOperation::get(StorageTier::Local, StorageKey::Language)
                    .dispatch(&caps.kv, Event::LanguageLoaded);
                KvOperation::get(StorageTier::Local, StorageKey::Notes)
                    .dispatch(&caps.kv, Event::NotesLoaded);
                caps.render.render();
            }

            Event::Configure {
                api_key,
                model: model_name,
                endpoint,
            } => {
                match Self::apply_config(model.config.clone(), api_key, model_name, endpoint) {
                    Ok(config) => {
                        info!(
                            model = %config.model,
                            has_api_key = config.has_api_key(),
                            "diagnosis configured"
                        );
                        model.config = config;
                    }
                    Err(e) => {
                        warn!(error = %e, "rejected configuration");
                        model.banner = Some(e.into());
                    }
                }
                caps.render.render();
            }

            Event::DismissError => {
                model.banner = None;
                caps.render.render();
            }

            Event::SessionRestored { tier, result } => {
                if model.phase != SessionPhase::Restoring {
                    debug!(tier = tier.prefix(), "ignoring late session restore");
                    return;
                }
                match session::restore_step(tier, result) {
                    RestoreStep::Found(user) => {
                        model.user = Some(user);
                        model.phase = SessionPhase::SignedIn;
                        model.view = AppView::Dashboard;
                    }
                    RestoreStep::TryNext(next) => {
                        KvOperation::get(next, StorageKey::User).dispatch(
                            &caps.kv,
                            move |result| Event::SessionRestored { tier: next, result },
                        );
                        return;
                    }
                    RestoreStep::SignedOut => {
                        info!("no stored session");
                        model.phase = SessionPhase::SignedOut;
                    }
                }
                caps.render.render();
            }

            Event::AuthModeToggled => {
                model.auth_form.mode = model.auth_form.mode.toggled();
                model.auth_form.error_key = None;
                caps.render.render();
            }

            Event::LoginSubmitted(form) => {
                if model.phase != SessionPhase::SignedOut {
                    debug!(phase = ?model.phase, "ignoring login outside the sign-in screen");
                    return;
                }
                match session::validate(&form, model.auth_form.mode) {
                    Ok(credentials) => {
                        model.phase = SessionPhase::Verifying;
                        model.auth_form.error_key = None;
                        let remember = form.remember;
                        caps.auth.verify(credentials, move |result| Event::LoginVerified {
                            remember,
                            result,
                        });
                    }
                    Err(e) => {
                        debug!(error = %e, "login form incomplete");
                        model.auth_form.error_key = Some(e.message_key());
                    }
                }
                caps.render.render();
            }

            Event::LoginVerified { remember, result } => {
                if model.phase != SessionPhase::Verifying {
                    debug!("ignoring stale credential verification");
                    return;
                }
                match result {
                    Ok(user) => {
                        match session::persist_operations(&user, remember) {
                            Ok(operations) => {
                                for operation in operations {
                                    operation.dispatch(&caps.kv, |result| {
                                        Event::StorageWritten {
                                            key: StorageKey::User,
                                            result,
                                        }
                                    });
                                }
                            }
                            Err(e) => warn!(error = %e, "could not store session"),
                        }
                        info!(remember, "signed in");
                        model.user = Some(user);
                        model.phase = SessionPhase::SignedIn;
                        model.view = AppView::Dashboard;
                        model.auth_form = Default::default();
                    }
                    Err(e) => {
                        warn!(error = %e, "login failed");
                        model.phase = SessionPhase::SignedOut;
                        model.auth_form.error_key = Some(AppError::from(e).message_key());
                    }
                }
                caps.render.render();
            }

            Event::LogoutRequested => {
                for operation in session::logout_operations() {
                    operation.dispatch(&caps.kv, |result| Event::StorageWritten {
                        key: StorageKey::User,
                        result,
                    });
                }
                info!("signed out");
                model.user = None;
                model.phase = SessionPhase::SignedOut;
                model.view = AppView::Dashboard;
                model.auth_form = Default::default();
                model.doctor.reset();
                model.expert = Default::default();
                model.notes.editor = None;
                model.notes.pending_delete = None;
                model.notes.query.clear();
                model.banner = None;
                caps.render.render();
            }

            Event::Navigate(view) => {
                if !model.is_signed_in() {
                    debug!(?view, "ignoring navigation while signed out");
                    return;
                }
                if model.view == AppView::Notes && view != AppView::Notes {
                    model.notes.editor = None;
                    model.notes.pending_delete = None;
                }
                model.view = view;
                caps.render.render();
            }

            Event::LanguageSelected(language) => {
                model.language = language;
                model.language_chosen = true;
                match LANGUAGE_SLOT.set(StorageTier::Local, &language) {
                    Ok(operation) => operation.dispatch(&caps.kv, |result| {
                        Event::StorageWritten {
                            key: StorageKey::Language,
                            result,
                        }
                    }),
                    Err(e) => warn!(error = %e, "could not store language"),
                }
                caps.render.render();
            }

            Event::LanguageLoaded(result) => {
                if model.language_chosen {
                    debug!("keeping the language picked before storage answered");
                    return;
                }
                match result {
                    Ok(Some(bytes)) => {
                        model.language = Language::from_stored(&bytes).unwrap_or_else(|| {
                            warn!("stored language unreadable, using English");
                            Language::default()
                        });
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "language read failed"),
                }
                caps.render.render();
            }

            Event::NotesLoaded(result) => {
                if model.notes.loaded {
                    debug!("notes already loaded");
                    return;
                }
                let (book, origin) = NoteBook::restore(result, Utc::now());
                info!(count = book.len(), ?origin, "notes loaded");
                model.notes.book = book;
                model.notes.loaded = true;
                if origin.needs_persist() {
                    Self::persist_notes(model, caps);
                }
                caps.render.render();
            }

            Event::NotesSearchChanged(query) => {
                model.notes.query = query;
                caps.render.render();
            }

            Event::NoteEditorOpened { id } => {
                if !model.notes.loaded {
                    return;
                }
                if let Err(e) = model.notes.open_editor(id) {
                    warn!(error = %e, "cannot edit note");
                    model.banner = Some(e.into());
                }
                caps.render.render();
            }

            Event::NoteTitleChanged(title) => {
                if let Some(editor) = model.notes.editor.as_mut() {
                    editor.draft.title = title;
                    editor.error_key = None;
                }
                caps.render.render();
            }

            Event::NoteContentChanged(content) => {
                if let Some(editor) = model.notes.editor.as_mut() {
                    editor.draft.content = content;
                }
                caps.render.render();
            }

            Event::NoteCategorySelected(category) => {
                if let Some(editor) = model.notes.editor.as_mut() {
                    editor.draft.category = category;
                }
                caps.render.render();
            }

            Event::NoteSaveRequested => {
                if !model.notes.loaded || model.notes.editor.is_none() {
                    return;
                }
                match model.notes.save_editor(Utc::now()) {
                    Ok(()) => {
                        info!(count = model.notes.book.len(), "note saved");
                        Self::persist_notes(model, caps);
                    }
                    Err(NoteError::Invalid(e)) => debug!(error = %e, "note draft incomplete"),
                    Err(e) => {
                        warn!(error = %e, "note save failed");
                        model.banner = Some(e.into());
                    }
                }
                caps.render.render();
            }

            Event::NoteEditorClosed => {
                model.notes.editor = None;
                caps.render.render();
            }

            Event::NoteDeleteRequested { id } => {
                if !model.notes.loaded {
                    return;
                }
                if let Err(e) = model.notes.request_delete(id) {
                    warn!(error = %e, "cannot delete note");
                    model.banner = Some(e.into());
                }
                caps.render.render();
            }

            Event::NoteDeleteConfirmed => {
                match model.notes.confirm_delete() {
                    Some(Ok(note)) => {
                        info!(id = %note.id, "note deleted");
                        Self::persist_notes(model, caps);
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "note delete failed");
                        model.banner = Some(e.into());
                    }
                    None => return,
                }
                caps.render.render();
            }

            Event::NoteDeleteCancelled => {
                model.notes.pending_delete = None;
                caps.render.render();
            }

            Event::ImageSelected { data_url } => {
                if model.doctor.is_analyzing() {
                    debug!("ignoring photo while analyzing");
                    return;
                }
                let staged = StagedImage::from_data_url(&data_url, &ProcessingConfig::default());
                Self::stage_image(model, staged);
                caps.render.render();
            }

            Event::PhotoRequested { source } => {
                if model.doctor.is_analyzing() {
                    return;
                }
                caps.camera.pick_photo(source, Event::PhotoPicked);
            }

            Event::PhotoPicked(result) => {
                if model.doctor.is_analyzing() {
                    debug!("ignoring photo while analyzing");
                    return;
                }
                match result {
                    Ok(photo) => {
                        let staged = StagedImage::from_bytes(photo.data, &ProcessingConfig::default());
                        Self::stage_image(model, staged);
                    }
                    Err(e) if e.is_cancellation() => {
                        debug!("photo selection cancelled");
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "photo selection failed");
                        model.doctor.image_error = Some(e.into());
                    }
                }
                caps.render.render();
            }

            Event::AnalyzeRequested => {
                Self::start_diagnosis(model, caps);
                caps.render.render();
            }

            Event::DiagnosisReceived { request_id, result } => {
                if !model.doctor.is_current(request_id) {
                    debug!(request_id, "discarding stale diagnosis");
                    return;
                }
                Self::finish_diagnosis(model, diagnosis::parse_response(*result));
                caps.render.render();
            }

            Event::DiagnosisReset => {
                model.doctor.reset();
                caps.render.render();
            }

            Event::ExpertSubjectSelected(subject) => {
                model.expert.subject = subject;
                caps.render.render();
            }

            Event::ExpertDescriptionChanged(description) => {
                model.expert.description = description;
                model.expert.error_key = None;
                caps.render.render();
            }

            Event::ExpertSubmitted => {
                if model.expert.sent {
                    return;
                }
                match model.expert.submit() {
                    Ok(()) => info!(subject = ?model.expert.subject, "expert request recorded"),
                    Err(e) => debug!(error = %e, "expert form incomplete"),
                }
                caps.render.render();
            }

            Event::ExpertConfirmationElapsed => {
                model.expert.dismiss_confirmation();
                caps.render.render();
            }

            Event::StorageWritten { key, result } => {
                if Self::storage_acknowledged(model, key, result) {
                    caps.render.render();
                }
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        view::build(model)
    }
}
