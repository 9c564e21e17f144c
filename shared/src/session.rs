//! Login form rules and where the signed-in user is kept between launches.

use serde::{Deserialize, Serialize};

use crate::capabilities::{
    Credentials, KvError, KvOperation, KvResult, StorageKey, StorageTier, TypedSlot,
};
use crate::event::Secret;
use crate::model::{User, ValidationError, DEFAULT_USER_LOCATION, DEFAULT_USER_NAME};

pub const USER_SLOT: TypedSlot<User> = TypedSlot::new(StorageKey::User);

/// Tiers consulted on start, in order. The first that yields a user wins.
pub const RESTORE_ORDER: [StorageTier; 2] = [StorageTier::Local, StorageTier::Session];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

impl AuthMode {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Login => Self::Register,
            Self::Register => Self::Login,
        }
    }
}

/// What the login screen submits.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LoginForm {
    pub name: String,
    pub email: String,
    pub password: Secret,
    pub location: String,
    pub remember: bool,
}

/// Screen state for the login/register form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub mode: AuthMode,
    /// String table key of the message to show, if any.
    pub error_key: Option<&'static str>,
}

/// Checks the form and applies the profile defaults.
pub fn validate(form: &LoginForm, mode: AuthMode) -> Result<Credentials, ValidationError> {
    if mode == AuthMode::Register && form.name.trim().is_empty() {
        return Err(ValidationError::Required { field: "name" });
    }
    if form.email.trim().is_empty() {
        return Err(ValidationError::Required { field: "email" });
    }
    if form.password.is_empty() {
        return Err(ValidationError::Required { field: "password" });
    }

    Ok(Credentials {
        name: non_empty_or(&form.name, DEFAULT_USER_NAME),
        email: form.email.trim().to_string(),
        location: non_empty_or(&form.location, DEFAULT_USER_LOCATION),
        password: form.password.clone(),
    })
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Storage writes for a fresh login: the user goes into one tier and is
/// removed from the other, so exactly one copy exists.
pub fn persist_operations(user: &User, remember: bool) -> Result<[KvOperation; 2], KvError> {
    let keep = if remember {
        StorageTier::Local
    } else {
        StorageTier::Session
    };
    Ok([
        USER_SLOT.set(keep, user)?,
        KvOperation::delete(keep.other(), StorageKey::User),
    ])
}

#[must_use]
pub fn logout_operations() -> [KvOperation; 2] {
    RESTORE_ORDER.map(|tier| KvOperation::delete(tier, StorageKey::User))
}

/// Outcome of reading one tier during startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreStep {
    Found(User),
    TryNext(StorageTier),
    SignedOut,
}

#[must_use]
pub fn restore_step(tier: StorageTier, result: KvResult) -> RestoreStep {
    if let Some(user) = USER_SLOT.read(result).found() {
        tracing::info!(tier = tier.prefix(), "restored session");
        return RestoreStep::Found(user);
    }
    let position = RESTORE_ORDER.iter().position(|t| *t == tier);
    match position.and_then(|i| RESTORE_ORDER.get(i + 1)) {
        Some(next) => RestoreStep::TryNext(*next),
        None => RestoreStep::SignedOut,
    }
}
