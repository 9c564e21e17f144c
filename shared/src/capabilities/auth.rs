use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::event::Secret;
use crate::model::User;

/// Fixed delay the accept-all verifier waits before answering.
pub const NULL_VERIFIER_DELAY: Duration = Duration::from_millis(1000);

/// What the login form hands to the verifier. Name and location have their
/// defaults applied already.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub name: String,
    pub email: String,
    pub location: String,
    pub password: Secret,
}

impl Credentials {
    #[must_use]
    pub fn profile(&self) -> User {
        User {
            name: self.name.clone(),
            email: self.email.clone(),
            location: self.location.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuthOperation {
    Verify { credentials: Credentials },
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AuthError {
    #[error("credentials rejected: {reason}")]
    Rejected { reason: String },

    #[error("verifier unavailable: {message}")]
    Unavailable { message: String },
}

pub type AuthResult = Result<User, AuthError>;

impl Operation for AuthOperation {
    type Output = AuthResult;
}

/// Accepts every submission. Shells wire this in until a real identity
/// provider exists.
#[derive(Debug, Clone, Copy)]
pub struct NullCredentialVerifier {
    delay: Duration,
}

impl Default for NullCredentialVerifier {
    fn default() -> Self {
        Self {
            delay: NULL_VERIFIER_DELAY,
        }
    }
}

impl NullCredentialVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Answers immediately. Shells that want the login spinner call
    /// `verify_after_delay` instead.
    #[must_use]
    pub fn verify(&self, operation: &AuthOperation) -> AuthResult {
        match operation {
            AuthOperation::Verify { credentials } => Ok(credentials.profile()),
        }
    }
}

pub struct Auth<Ev> {
    context: CapabilityContext<AuthOperation, Ev>,
}

impl<Ev> Clone for Auth<Ev> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<Ev> Capability<Ev> for Auth<Ev> {
    type Operation = AuthOperation;
    type MappedSelf<MappedEv> = Auth<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Auth::new(self.context.map_event(f))
    }
}

impl<Ev> Auth<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<AuthOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn verify<F>(&self, credentials: Credentials, make_event: F)
    where
        F: FnOnce(AuthResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context
                .request_from_shell(AuthOperation::Verify { credentials })
                .await;
            context.update_app(make_event(result));
        });
    }
}
