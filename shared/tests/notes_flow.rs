mod common;

use agroai_shared::capabilities::{StorageKey, StorageTier};
use agroai_shared::model::{AppView, Note, NoteCategory, NoteId};
use agroai_shared::native::MemoryKvStore;
use agroai_shared::view::{Content, NotesView, Screen};
use agroai_shared::Event;
use common::{FlakyStore, Harness};

fn stored_notes(store: &MemoryKvStore) -> Vec<Note> {
    let bytes = store
        .get(StorageTier::Local, StorageKey::Notes)
        .expect("notes persisted");
    serde_json::from_slice(bytes).expect("notes are JSON")
}

fn signed_in_on_notes() -> Harness {
    let mut harness = Harness::started(MemoryKvStore::new());
    harness.login("ravi@example.com", true);
    harness.send(Event::Navigate(AppView::Notes));
    harness
}

fn notes_view(harness: &Harness) -> NotesView {
    let Screen::Main(main) = harness.view().screen else {
        panic!("expected main screen");
    };
    let Content::Notes(notes) = main.content else {
        panic!("expected notes view");
    };
    notes
}

fn create(harness: &mut Harness, title: &str, content: &str, category: NoteCategory) {
    harness.send(Event::NoteEditorOpened { id: None });
    harness.send(Event::NoteTitleChanged(title.into()));
    harness.send(Event::NoteContentChanged(content.into()));
    harness.send(Event::NoteCategorySelected(category));
    harness.send(Event::NoteSaveRequested);
}

#[test]
fn first_launch_seeds_and_persists_examples() {
    let harness = signed_in_on_notes();

    let stored = stored_notes(&harness.store);
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].title, "Corn Planting");
    assert_eq!(stored[0].category, NoteCategory::Planting);
    assert_eq!(stored[0].content, "Finished planting North field. Used hybrid seeds.");
    assert_eq!(stored[1].title, "Irrigation Pump Maintenance");
    assert_eq!(stored[1].content, "Pump #4 needs new filter.");
    assert_eq!(stored[1].category, NoteCategory::Irrigation);

    let view = notes_view(&harness);
    assert_eq!(view.items.len(), 2);
    assert_eq!(view.items[0].category_label, "Planting");
}

#[test]
fn corn_planting_create_then_delete() {
    let mut harness = signed_in_on_notes();
    let before = stored_notes(&harness.store);

    create(
        &mut harness,
        "Corn Planting",
        "Planted 5 acres of sweet corn",
        NoteCategory::Planting,
    );

    let after_create = stored_notes(&harness.store);
    assert_eq!(after_create.len(), before.len() + 1);
    let created = after_create[0].clone();
    assert_eq!(created.title, "Corn Planting");
    assert_eq!(created.category, NoteCategory::Planting);
    assert!(before.iter().all(|note| note.id != created.id));
    assert_eq!(&after_create[1..], before.as_slice());
    assert!(harness.model.notes.editor.is_none());

    harness.send(Event::NoteDeleteRequested {
        id: created.id.clone(),
    });
    assert_eq!(
        notes_view(&harness).confirm_delete.map(|confirm| confirm.note_id),
        Some(created.id.to_string())
    );
    // Nothing is removed before confirmation.
    assert_eq!(stored_notes(&harness.store).len(), after_create.len());

    harness.send(Event::NoteDeleteConfirmed);

    let after_delete = stored_notes(&harness.store);
    assert_eq!(after_delete, before);
    assert!(notes_view(&harness).confirm_delete.is_none());
}

#[test]
fn cancelled_delete_keeps_the_note() {
    let mut harness = signed_in_on_notes();
    harness.send(Event::NoteDeleteRequested {
        id: NoteId::new("2"),
    });
    harness.send(Event::NoteDeleteCancelled);
    harness.send(Event::NoteDeleteConfirmed);

    assert_eq!(stored_notes(&harness.store).len(), 2);
}

#[test]
fn edit_preserves_id_date_and_position() {
    let mut harness = signed_in_on_notes();
    let before = stored_notes(&harness.store);

    harness.send(Event::NoteEditorOpened {
        id: Some(NoteId::new("2")),
    });
    let editor = notes_view(&harness).editor.expect("editor open");
    assert_eq!(editor.title, "Irrigation Pump Maintenance");
    assert_eq!(editor.save_label, "Update Note");

    harness.send(Event::NoteTitleChanged("Pump fixed".into()));
    harness.send(Event::NoteCategorySelected(NoteCategory::Issue));
    harness.send(Event::NoteSaveRequested);

    let after = stored_notes(&harness.store);
    assert_eq!(after.len(), before.len());
    assert_eq!(after[1].id, before[1].id);
    assert_eq!(after[1].date, before[1].date);
    assert_eq!(after[1].title, "Pump fixed");
    assert_eq!(after[1].category, NoteCategory::Issue);
    assert_eq!(after[1].content, before[1].content);
    assert_eq!(after[0], before[0]);
}

#[test]
fn blank_title_keeps_editor_open() {
    let mut harness = signed_in_on_notes();
    let writes_before = harness.storage_ops;

    create(&mut harness, "   ", "no title", NoteCategory::General);

    let editor = notes_view(&harness).editor.expect("editor still open");
    assert!(!editor.can_save);
    assert_eq!(editor.error.as_deref(), Some("Please enter a title."));
    assert_eq!(harness.storage_ops, writes_before);
    assert_eq!(stored_notes(&harness.store).len(), 2);
}

#[test]
fn closing_the_editor_discards_the_draft() {
    let mut harness = signed_in_on_notes();
    harness.send(Event::NoteEditorOpened { id: None });
    harness.send(Event::NoteTitleChanged("Draft".into()));
    harness.send(Event::NoteEditorClosed);

    assert!(notes_view(&harness).editor.is_none());
    assert_eq!(stored_notes(&harness.store).len(), 2);
}

#[test]
fn search_matches_title_content_and_category() {
    let mut harness = signed_in_on_notes();

    harness.send(Event::NotesSearchChanged("CORN".into()));
    assert_eq!(notes_view(&harness).items.len(), 1);

    harness.send(Event::NotesSearchChanged("new filter".into()));
    let items = notes_view(&harness).items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "2");

    harness.send(Event::NotesSearchChanged("irrigation".into()));
    assert_eq!(notes_view(&harness).items.len(), 1);

    harness.send(Event::NotesSearchChanged("banana".into()));
    let view = notes_view(&harness);
    assert!(view.items.is_empty());
    assert_eq!(view.empty_message.as_deref(), Some("No notes found"));

    harness.send(Event::NotesSearchChanged(String::new()));
    let ids: Vec<_> = notes_view(&harness).items.into_iter().map(|item| item.id).collect();
    assert_eq!(ids, ["1", "2"]);
}

#[test]
fn stored_notes_are_loaded_not_reseeded() {
    let mut store = MemoryKvStore::new();
    store.put_raw(
        StorageTier::Local,
        StorageKey::Notes,
        br#"[{"id":"abc","title":"Soil test","content":"pH 6.5","date":"2024-05-01T10:00:00.000Z","category":"General"}]"#.to_vec(),
    );

    let harness = Harness::started(store);
    assert_eq!(harness.model.notes.book.len(), 1);
    assert_eq!(harness.model.notes.book.notes()[0].title, "Soil test");
}

#[test]
fn empty_stored_list_stays_empty() {
    let mut store = MemoryKvStore::new();
    store.put_raw(StorageTier::Local, StorageKey::Notes, b"[]".to_vec());

    let harness = Harness::started(store);
    assert!(harness.model.notes.loaded);
    assert!(harness.model.notes.book.is_empty());
}

#[test]
fn malformed_notes_show_seeds_without_overwriting() {
    let mut store = MemoryKvStore::new();
    let original = b"{\"not\": \"a list\"}".to_vec();
    store.put_raw(StorageTier::Local, StorageKey::Notes, original.clone());

    let harness = Harness::started(store);
    assert_eq!(harness.model.notes.book.len(), 2);
    assert_eq!(
        harness.store.get(StorageTier::Local, StorageKey::Notes),
        Some(original.as_slice())
    );
}

#[test]
fn failed_first_read_leaves_stored_notes_alone() {
    let mut store = MemoryKvStore::new();
    let original = br#"[{"id":"a","title":"Soil test","content":"pH 6.5","date":"2024-05-01T10:00:00.000Z","category":"General"},{"id":"b","title":"Sow mustard","content":"","date":"2024-05-02T10:00:00.000Z","category":"Planting"},{"id":"c","title":"Sell maize","content":"","date":"2024-05-03T10:00:00.000Z","category":"Harvest"}]"#.to_vec();
    store.put_raw(StorageTier::Local, StorageKey::Notes, original.clone());

    let harness = Harness::started(FlakyStore::failing_first_read(store, "local:agroai_notes"));

    assert!(harness.model.notes.loaded);
    assert_eq!(harness.model.notes.book.len(), 2);
    assert!(!harness.store.writes.iter().any(|key| key == "local:agroai_notes"));
    assert_eq!(
        harness.store.inner.get(StorageTier::Local, StorageKey::Notes),
        Some(original.as_slice())
    );

    let harness = Harness::started(harness.store.inner);
    assert_eq!(harness.model.notes.book.len(), 3);
    assert_eq!(harness.model.notes.book.notes()[0].title, "Soil test");
}

#[test]
fn notes_survive_restart() {
    let mut harness = signed_in_on_notes();
    create(&mut harness, "Harvest wheat", "", NoteCategory::Harvest);
    let harness = harness.restart();

    assert_eq!(harness.model.notes.book.len(), 3);
    assert_eq!(harness.model.notes.book.notes()[0].title, "Harvest wheat");
}

#[test]
fn leaving_notes_closes_editor_and_confirmation() {
    let mut harness = signed_in_on_notes();
    harness.send(Event::NoteEditorOpened { id: None });
    harness.send(Event::NoteDeleteRequested {
        id: NoteId::new("1"),
    });
    harness.send(Event::Navigate(AppView::Dashboard));

    assert!(harness.model.notes.editor.is_none());
    assert!(harness.model.notes.pending_delete.is_none());
}

#[test]
fn deleting_an_unknown_note_raises_banner() {
    let mut harness = signed_in_on_notes();
    harness.send(Event::NoteDeleteRequested {
        id: NoteId::new("missing"),
    });

    assert!(harness.model.notes.pending_delete.is_none());
    assert!(harness.view().banner.is_some());

    harness.send(Event::DismissError);
    assert!(harness.view().banner.is_none());
}
