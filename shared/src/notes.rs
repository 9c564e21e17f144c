//! Field notes: an ordered collection, newest first, persisted whole.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use thiserror::Error;

use crate::capabilities::{
    KvError, KvOperation, KvResult, StorageKey, StorageTier, StoredValue, TypedSlot,
};
use crate::model::{Note, NoteCategory, NoteId, ValidationError};

pub const NOTES_SLOT: TypedSlot<Vec<Note>> = TypedSlot::new(StorageKey::Notes);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("note {0} not found")]
    NotFound(NoteId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub category: NoteCategory,
}

impl NoteDraft {
    #[must_use]
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            category: note.category,
        }
    }

    #[must_use]
    pub fn can_save(&self) -> bool {
        !self.title.trim().is_empty()
    }

    fn check(&self) -> Result<(), NoteError> {
        if self.can_save() {
            Ok(())
        } else {
            Err(ValidationError::Required { field: "title" }.into())
        }
    }
}

/// The two example notes a brand new install starts with.
#[must_use]
pub fn seed_notes(now: DateTime<Utc>) -> Vec<Note> {
    vec![
        Note {
            id: NoteId::new("1"),
            title: "Corn Planting".to_string(),
            content: "Finished planting North field. Used hybrid seeds.".to_string(),
            date: now,
            category: NoteCategory::Planting,
        },
        Note {
            id: NoteId::new("2"),
            title: "Irrigation Pump Maintenance".to_string(),
            content: "Pump #4 needs new filter.".to_string(),
            date: now - Duration::hours(24),
            category: NoteCategory::Irrigation,
        },
    ]
}

/// Where a freshly loaded notebook came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesOrigin {
    Stored,
    /// Nothing was stored yet. The seeds should be written.
    Seeded,
    /// Storage could not be read. The seeds are shown but never written,
    /// so whatever is stored stays untouched until the farmer edits.
    Fallback,
}

impl NotesOrigin {
    #[must_use]
    pub const fn needs_persist(self) -> bool {
        matches!(self, Self::Seeded)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteBook {
    notes: Vec<Note>,
}

impl NoteBook {
    #[must_use]
    pub fn new(notes: Vec<Note>) -> Self {
        Self { notes }
    }

    /// Loads whatever storage returned.
    #[must_use]
    pub fn restore(result: KvResult, now: DateTime<Utc>) -> (Self, NotesOrigin) {
        match NOTES_SLOT.read(result) {
            StoredValue::Found(notes) => (Self::new(notes), NotesOrigin::Stored),
            StoredValue::Absent => (Self::new(seed_notes(now)), NotesOrigin::Seeded),
            StoredValue::Unreadable => (Self::new(seed_notes(now)), NotesOrigin::Fallback),
        }
    }

    /// Writes the whole collection to local storage.
    pub fn store_operation(&self) -> Result<KvOperation, KvError> {
        NOTES_SLOT.set(StorageTier::Local, &self.notes)
    }

    #[must_use]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| &note.id == id)
    }

    /// Case-insensitive substring match over title, content and category
    /// name. An empty query returns every note in stored order.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Note> {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return self.notes.iter().collect();
        }
        self.notes
            .iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&needle)
                    || note.content.to_lowercase().contains(&needle)
                    || note.category.as_str().to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn create(&mut self, draft: NoteDraft, now: DateTime<Utc>) -> Result<&Note, NoteError> {
        draft.check()?;
        let taken: HashSet<&NoteId> = self.notes.iter().map(|note| &note.id).collect();
        let mut id = NoteId::generate();
        while taken.contains(&id) {
            id = NoteId::generate();
        }
        self.notes.insert(
            0,
            Note {
                id,
                title: draft.title,
                content: draft.content,
                date: now,
                category: draft.category,
            },
        );
        Ok(&self.notes[0])
    }

    pub fn update(&mut self, id: &NoteId, draft: NoteDraft) -> Result<&Note, NoteError> {
        draft.check()?;
        let note = self
            .notes
            .iter_mut()
            .find(|note| &note.id == id)
            .ok_or_else(|| NoteError::NotFound(id.clone()))?;
        note.title = draft.title;
        note.content = draft.content;
        note.category = draft.category;
        Ok(note)
    }

    pub fn delete(&mut self, id: &NoteId) -> Result<Note, NoteError> {
        let index = self
            .notes
            .iter()
            .position(|note| &note.id == id)
            .ok_or_else(|| NoteError::NotFound(id.clone()))?;
        Ok(self.notes.remove(index))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteEditor {
    /// `None` while composing a new note.
    pub editing: Option<NoteId>,
    pub draft: NoteDraft,
    pub error_key: Option<&'static str>,
}

#[derive(Debug, Clone, Default)]
pub struct NotesState {
    pub loaded: bool,
    pub book: NoteBook,
    pub query: String,
    pub editor: Option<NoteEditor>,
    pub pending_delete: Option<NoteId>,
}

impl NotesState {
    /// Opens the editor, prefilled when `id` names an existing note.
    pub fn open_editor(&mut self, id: Option<NoteId>) -> Result<(), NoteError> {
        let editor = match id {
            None => NoteEditor::default(),
            Some(id) => {
                let note = self.book.get(&id).ok_or_else(|| NoteError::NotFound(id.clone()))?;
                NoteEditor {
                    draft: NoteDraft::from_note(note),
                    editing: Some(id),
                    error_key: None,
                }
            }
        };
        self.editor = Some(editor);
        Ok(())
    }

    /// Saves the open draft. The editor stays open with an error message if
    /// the draft is invalid.
    pub fn save_editor(&mut self, now: DateTime<Utc>) -> Result<(), NoteError> {
        let Some(editor) = self.editor.as_mut() else {
            return Ok(());
        };
        let draft = editor.draft.clone();
        let outcome = match &editor.editing {
            Some(id) => self.book.update(id, draft).map(|_| ()),
            None => self.book.create(draft, now).map(|_| ()),
        };
        match outcome {
            Ok(()) => {
                self.editor = None;
                Ok(())
            }
            Err(NoteError::Invalid(e)) => {
                editor.error_key = Some(e.message_key());
                Err(NoteError::Invalid(e))
            }
            Err(e) => {
                self.editor = None;
                Err(e)
            }
        }
    }

    pub fn request_delete(&mut self, id: NoteId) -> Result<(), NoteError> {
        if self.book.get(&id).is_none() {
            return Err(NoteError::NotFound(id));
        }
        self.pending_delete = Some(id);
        Ok(())
    }

    /// Deletes the note awaiting confirmation, if any.
    pub fn confirm_delete(&mut self) -> Option<Result<Note, NoteError>> {
        let id = self.pending_delete.take()?;
        if self
            .editor
            .as_ref()
            .is_some_and(|editor| editor.editing.as_ref() == Some(&id))
        {
            self.editor = None;
        }
        Some(self.book.delete(&id))
    }
}
