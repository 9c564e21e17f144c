mod common;

use agroai_shared::capabilities::{StorageKey, StorageTier};
use agroai_shared::event::Secret;
use agroai_shared::model::{AppView, SessionPhase, User};
use agroai_shared::native::{MemoryKvStore, SqliteKvStore};
use agroai_shared::session::{AuthMode, LoginForm};
use agroai_shared::view::{Content, Screen};
use agroai_shared::Event;
use common::Harness;

fn stored_user(store: &MemoryKvStore, tier: StorageTier) -> Option<User> {
    store
        .get(tier, StorageKey::User)
        .map(|bytes| serde_json::from_slice(bytes).expect("stored user is JSON"))
}

#[test]
fn fresh_install_lands_on_login() {
    let mut harness = Harness::new();
    assert_eq!(harness.view().screen, Screen::Loading);

    harness.send(Event::AppStarted);

    assert_eq!(harness.model.phase, SessionPhase::SignedOut);
    assert!(matches!(harness.view().screen, Screen::Auth(_)));
}

#[test]
fn remembered_login_survives_restart() {
    let mut harness = Harness::started(MemoryKvStore::new());
    harness.login("ravi@example.com", true);

    assert!(harness.model.is_signed_in());
    let local = stored_user(&harness.store, StorageTier::Local).expect("user in local tier");
    assert_eq!(local.email, "ravi@example.com");
    assert_eq!(local.name, "Ravi Kumar");
    assert!(stored_user(&harness.store, StorageTier::Session).is_none());

    harness.store.end_session();
    let harness = harness.restart();
    assert_eq!(harness.model.phase, SessionPhase::SignedIn);
    assert_eq!(harness.model.user.as_ref().map(|u| u.email.as_str()), Some("ravi@example.com"));
}

#[test]
fn unremembered_login_lasts_only_for_the_session() {
    let mut harness = Harness::started(MemoryKvStore::new());
    harness.login("ravi@example.com", false);

    assert!(stored_user(&harness.store, StorageTier::Local).is_none());
    assert!(stored_user(&harness.store, StorageTier::Session).is_some());

    // Reload within the same session keeps the user.
    let mut harness = harness.restart();
    assert!(harness.model.is_signed_in());

    harness.store.end_session();
    let harness = harness.restart();
    assert_eq!(harness.model.phase, SessionPhase::SignedOut);
}

#[test]
fn switching_remember_moves_the_user_between_tiers() {
    let mut harness = Harness::started(MemoryKvStore::new());
    harness.login("ravi@example.com", true);
    harness.send(Event::LogoutRequested);
    harness.login("ravi@example.com", false);

    assert!(stored_user(&harness.store, StorageTier::Local).is_none());
    assert!(stored_user(&harness.store, StorageTier::Session).is_some());
}

#[test]
fn logout_clears_both_tiers_and_resets_view() {
    let mut harness = Harness::started(MemoryKvStore::new());
    harness.login("ravi@example.com", true);
    harness.send(Event::Navigate(AppView::Notes));
    assert_eq!(harness.model.view, AppView::Notes);

    harness.send(Event::LogoutRequested);

    assert_eq!(harness.model.phase, SessionPhase::SignedOut);
    assert!(harness.model.user.is_none());
    assert_eq!(harness.model.view, AppView::Dashboard);
    assert!(stored_user(&harness.store, StorageTier::Local).is_none());
    assert!(stored_user(&harness.store, StorageTier::Session).is_none());

    let harness = harness.restart();
    assert_eq!(harness.model.phase, SessionPhase::SignedOut);
}

#[test]
fn missing_email_blocks_submission() {
    let mut harness = Harness::started(MemoryKvStore::new());
    harness.login("   ", true);

    assert_eq!(harness.model.phase, SessionPhase::SignedOut);
    assert_eq!(harness.model.auth_form.error_key, Some("err_email_required"));
    let Screen::Auth(auth) = harness.view().screen else {
        panic!("expected auth screen");
    };
    assert_eq!(auth.error.as_deref(), Some("Please enter your email."));
}

#[test]
fn register_mode_requires_a_name() {
    let mut harness = Harness::started(MemoryKvStore::new());
    harness.send(Event::AuthModeToggled);
    assert_eq!(harness.model.auth_form.mode, AuthMode::Register);

    harness.send(Event::LoginSubmitted(Box::new(LoginForm {
        name: String::new(),
        email: "new@example.com".into(),
        password: Secret::new("pw"),
        location: String::new(),
        remember: false,
    })));
    assert_eq!(harness.model.auth_form.error_key, Some("err_name_required"));

    harness.send(Event::LoginSubmitted(Box::new(LoginForm {
        name: "Asha Devi".into(),
        email: "new@example.com".into(),
        password: Secret::new("pw"),
        location: String::new(),
        remember: false,
    })));
    let user = harness.model.user.clone().expect("signed in");
    assert_eq!(user.name, "Asha Devi");
    assert_eq!(user.location, "India");
}

#[test]
fn login_defaults_fill_blank_profile_fields() {
    let mut harness = Harness::started(MemoryKvStore::new());
    harness.send(Event::LoginSubmitted(Box::new(LoginForm {
        name: String::new(),
        email: "anon@example.com".into(),
        password: Secret::new("pw"),
        location: "  ".into(),
        remember: true,
    })));

    let user = harness.model.user.clone().expect("signed in");
    assert_eq!(user.name, "Farmer");
    assert_eq!(user.location, "India");
}

#[test]
fn verifying_state_is_visible_until_the_verifier_answers() {
    let mut harness = Harness::started(MemoryKvStore::new());
    harness.auto_verify = false;
    harness.login("ravi@example.com", true);

    assert_eq!(harness.model.phase, SessionPhase::Verifying);
    let Screen::Auth(auth) = harness.view().screen else {
        panic!("expected auth screen");
    };
    assert!(auth.verifying);

    // A second submit while verifying is ignored.
    harness.login("other@example.com", true);
    assert_eq!(harness.auth.len(), 1);

    harness.resolve_auth();
    assert!(harness.model.is_signed_in());
    assert_eq!(
        harness.model.user.as_ref().map(|u| u.email.as_str()),
        Some("ravi@example.com")
    );
}

#[test]
fn malformed_local_user_falls_back_to_session() {
    let mut store = MemoryKvStore::new();
    store.put_raw(StorageTier::Local, StorageKey::User, b"{broken".to_vec());
    store.put_raw(
        StorageTier::Session,
        StorageKey::User,
        br#"{"name":"Meera","email":"meera@example.com","location":"Kerala"}"#.to_vec(),
    );

    let harness = Harness::started(store);
    assert!(harness.model.is_signed_in());
    assert_eq!(harness.model.user.as_ref().map(|u| u.name.as_str()), Some("Meera"));
}

#[test]
fn malformed_users_everywhere_mean_signed_out() {
    let mut store = MemoryKvStore::new();
    store.put_raw(StorageTier::Local, StorageKey::User, b"null".to_vec());
    store.put_raw(StorageTier::Session, StorageKey::User, b"42".to_vec());

    let harness = Harness::started(store);
    assert_eq!(harness.model.phase, SessionPhase::SignedOut);
}

#[test]
fn navigation_requires_a_session() {
    let mut harness = Harness::started(MemoryKvStore::new());
    harness.send(Event::Navigate(AppView::Expert));
    assert_eq!(harness.model.view, AppView::Dashboard);

    harness.login("ravi@example.com", true);
    harness.send(Event::Navigate(AppView::Expert));
    let Screen::Main(main) = harness.view().screen else {
        panic!("expected main screen");
    };
    assert!(matches!(main.content, Content::Expert(_)));
}

#[test]
fn sqlite_store_keeps_remembered_user_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("agroai.db");

    {
        let store = SqliteKvStore::open(&path).expect("open db");
        let mut harness = Harness::started(store);
        harness.login("ravi@example.com", true);
        assert!(harness.model.is_signed_in());
    }

    let store = SqliteKvStore::open(&path).expect("reopen db");
    let harness = Harness::started(store);
    assert!(harness.model.is_signed_in());
    assert_eq!(harness.model.user.as_ref().map(|u| u.location.as_str()), Some("Punjab"));
}
