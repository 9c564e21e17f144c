#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;

use agroai_shared::capabilities::{
    AuthOperation, CameraOperation, CameraResult, HttpError, KeyValueError,
    NullCredentialVerifier,
};
use agroai_shared::native::{KvBackend, MemoryKvStore};
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult as ShellHttpResult};
use crux_kv::{KeyValueOperation, KeyValueResult};
use agroai_shared::event::Secret;
use agroai_shared::session::LoginForm;
use agroai_shared::{App, Effect, Event, Model, ViewModel};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use crux_core::testing::AppTester;
use crux_core::Request;

/// Drives the core the way a shell would: storage and credential requests are
/// answered on the spot, HTTP and camera requests wait for the test.
///
/// With `hold_reads` set, storage reads are parked in `held_reads` until the
/// test answers them with `resolve_read`.
pub struct Harness<S = MemoryKvStore> {
    pub app: AppTester<App, Effect>,
    pub model: Model,
    pub store: S,
    pub verifier: NullCredentialVerifier,
    pub auto_verify: bool,
    pub renders: usize,
    pub storage_ops: usize,
    pub hold_reads: bool,
    pub held_reads: Vec<Request<KeyValueOperation>>,
    pub http: Vec<Request<HttpRequest>>,
    pub camera: Vec<Request<CameraOperation>>,
    pub auth: Vec<Request<AuthOperation>>,
}

impl Harness<MemoryKvStore> {
    pub fn new() -> Self {
        Self::with_store(MemoryKvStore::new())
    }
}

impl<S: KvBackend> Harness<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            app: AppTester::default(),
            model: Model::default(),
            store,
            verifier: NullCredentialVerifier::new(),
            auto_verify: true,
            renders: 0,
            storage_ops: 0,
            hold_reads: false,
            held_reads: Vec::new(),
            http: Vec::new(),
            camera: Vec::new(),
            auth: Vec::new(),
        }
    }

    /// Fresh core over the same storage, as after an app restart.
    pub fn restart(self) -> Self {
        let mut next = Self::with_store(self.store);
        next.send(Event::AppStarted);
        next
    }

    pub fn started(store: S) -> Self {
        let mut harness = Self::with_store(store);
        harness.send(Event::AppStarted);
        harness
    }

    pub fn send(&mut self, event: Event) {
        let update = self.app.update(event, &mut self.model);
        self.process(update.effects);
    }

    pub fn view(&self) -> ViewModel {
        agroai_shared::view::build(&self.model)
    }

    pub fn login(&mut self, email: &str, remember: bool) {
        self.send(Event::LoginSubmitted(Box::new(LoginForm {
            name: "Ravi Kumar".into(),
            email: email.into(),
            password: Secret::new("hunter2"),
            location: "Punjab".into(),
            remember,
        })));
    }

    pub fn respond_http(&mut self, status: u16, body: impl Into<Vec<u8>>) {
        let mut request = self.http.remove(0);
        let response = HttpResponse::status(status).body(body.into()).build();
        let update = self
            .app
            .resolve(&mut request, ShellHttpResult::Ok(response))
            .expect("resolve http");
        self.apply(update.effects, update.events);
    }

    pub fn fail_http(&mut self, error: HttpError) {
        let mut request = self.http.remove(0);
        let update = self
            .app
            .resolve(&mut request, ShellHttpResult::Err(error))
            .expect("resolve http");
        self.apply(update.effects, update.events);
    }

    /// First header of the oldest pending HTTP request named `name`, ignoring case.
    pub fn http_header(&self, name: &str) -> Option<&str> {
        self.http[0]
            .operation
            .headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }

    pub fn pending_http(&self) -> &HttpRequest {
        &self.http[0].operation
    }

    /// Answers the parked read of `raw_key` with `result`.
    pub fn resolve_read(&mut self, raw_key: &str, result: KeyValueResult) {
        let index = self
            .held_reads
            .iter()
            .position(|request| {
                matches!(&request.operation, KeyValueOperation::Get { key } if key == raw_key)
            })
            .expect("read is parked");
        let mut request = self.held_reads.remove(index);
        let update = self
            .app
            .resolve(&mut request, result)
            .expect("resolve storage");
        self.apply(update.effects, update.events);
    }

    pub fn resolve_camera(&mut self, result: CameraResult) {
        let mut request = self.camera.remove(0);
        let update = self
            .app
            .resolve(&mut request, result)
            .expect("resolve camera");
        self.apply(update.effects, update.events);
    }

    pub fn resolve_auth(&mut self) {
        let mut request = self.auth.remove(0);
        let result = self.verifier.verify(&request.operation);
        let update = self
            .app
            .resolve(&mut request, result)
            .expect("resolve auth");
        self.apply(update.effects, update.events);
    }

    fn apply(&mut self, effects: Vec<Effect>, events: Vec<Event>) {
        self.process(effects);
        for event in events {
            self.send(event);
        }
    }

    fn process(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Render(_) => self.renders += 1,
                Effect::KeyValue(request)
                    if self.hold_reads
                        && matches!(request.operation, KeyValueOperation::Get { .. }) =>
                {
                    self.held_reads.push(request);
                }
                Effect::KeyValue(mut request) => {
                    self.storage_ops += 1;
                    let output = self.store.handle(&request.operation);
                    let update = self
                        .app
                        .resolve(&mut request, output)
                        .expect("resolve storage");
                    queue.extend(update.effects);
                    for event in update.events {
                        let next = self.app.update(event, &mut self.model);
                        queue.extend(next.effects);
                    }
                }
                Effect::Auth(mut request) => {
                    if self.auto_verify {
                        let result = self.verifier.verify(&request.operation);
                        let update = self
                            .app
                            .resolve(&mut request, result)
                            .expect("resolve auth");
                        queue.extend(update.effects);
                        for event in update.events {
                            let next = self.app.update(event, &mut self.model);
                            queue.extend(next.effects);
                        }
                    } else {
                        self.auth.push(request);
                    }
                }
                Effect::Http(request) => self.http.push(request),
                Effect::Camera(request) => self.camera.push(request),
            }
        }
    }
}

/// Wraps a store and fails the first read of one key.
pub struct FlakyStore {
    pub inner: MemoryKvStore,
    fail_next_read_of: Option<String>,
    pub writes: Vec<String>,
}

impl FlakyStore {
    pub fn failing_first_read(inner: MemoryKvStore, raw_key: &str) -> Self {
        Self {
            inner,
            fail_next_read_of: Some(raw_key.to_string()),
            writes: Vec::new(),
        }
    }
}

impl KvBackend for FlakyStore {
    fn handle(&mut self, operation: &KeyValueOperation) -> KeyValueResult {
        match operation {
            KeyValueOperation::Get { key } if self.fail_next_read_of.as_ref() == Some(key) => {
                self.fail_next_read_of = None;
                KeyValueResult::Err {
                    error: KeyValueError::Io {
                        message: "storage is locked".into(),
                    },
                }
            }
            KeyValueOperation::Set { key, .. } | KeyValueOperation::Delete { key } => {
                self.writes.push(key.clone());
                self.inner.handle(operation)
            }
            _ => self.inner.handle(operation),
        }
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 20 % 256) as u8, (y * 20 % 256) as u8, 120])
    });
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .expect("encode png");
    buffer
}

pub fn png_data_url() -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(4, 4)))
}

/// A `generateContent` reply whose only text part is `text`.
pub fn gemini_envelope(text: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    }))
    .expect("encode envelope")
}

pub fn blight_diagnosis() -> String {
    serde_json::json!({
        "plantName": "Tomato",
        "diseaseName": "Early Blight",
        "isHealthy": false,
        "confidence": 92,
        "description": "Dark concentric spots on lower leaves.",
        "naturalTreatments": [
            { "name": "Neem oil spray", "instruction": "Spray every 7 days in the evening." }
        ],
        "chemicalTreatments": [
            { "name": "Mancozeb", "instruction": "Apply 2 g per litre of water." }
        ]
    })
    .to_string()
}
