//! Side effects the core asks the platform shell to perform.
//!
//! Rendering, HTTP and key-value storage come from the Crux capability
//! crates. Credential verification and photo picking are small in-crate
//! capabilities whose operations the shell resolves and reports back as
//! events.

mod auth;
mod camera;
mod http;
mod kv;

pub use self::auth::{
    Auth, AuthError, AuthOperation, AuthResult, Credentials, NullCredentialVerifier,
    NULL_VERIFIER_DELAY,
};
pub use self::camera::{Camera, CameraError, CameraOperation, CameraResult, PhotoSource, PickedPhoto};
pub use self::http::{
    HttpError, HttpHeaders, HttpResult, OutboundRequest, RequestError, ValidatedUrl,
};
pub use self::kv::{
    KvError, KvKey, KvOperation, KvResult, StorageKey, StorageTier, StoredValue, TypedSlot,
    MAX_VALUE_SIZE,
};
pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::error::KeyValueError;
pub use crux_kv::KeyValue;

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub render: Render<Event>,
    pub auth: Auth<Event>,
    pub camera: Camera<Event>,
}
