use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MAX_IMAGE_BYTES;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhotoSource {
    #[default]
    Camera,
    Gallery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraOperation {
    /// Opens the rear camera or the photo library and returns one still image.
    PickPhoto { source: PhotoSource, max_bytes: usize },
}

impl Operation for CameraOperation {
    type Output = CameraResult;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickedPhoto {
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    /// What the platform claimed. The core sniffs the bytes anyway.
    pub mime_type: Option<String>,
}

impl PickedPhoto {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            mime_type: None,
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum CameraError {
    #[error("photo selection cancelled by user")]
    Cancelled,

    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("photo too large: {size} bytes exceeds maximum of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("capture failed: {reason}")]
    Failed { reason: String },
}

impl CameraError {
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type CameraResult = Result<PickedPhoto, CameraError>;

pub struct Camera<Ev> {
    context: CapabilityContext<CameraOperation, Ev>,
}

impl<Ev> Clone for Camera<Ev> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<Ev> Capability<Ev> for Camera<Ev> {
    type Operation = CameraOperation;
    type MappedSelf<MappedEv> = Camera<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Camera::new(self.context.map_event(f))
    }
}

impl<Ev> Camera<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<CameraOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn pick_photo<F>(&self, source: PhotoSource, make_event: F)
    where
        F: FnOnce(CameraResult) -> Ev + Send + 'static,
    {
        let operation = CameraOperation::PickPhoto {
            source,
            max_bytes: MAX_IMAGE_BYTES,
        };
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(make_event(result));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_helpers() {
        assert!(CameraError::Cancelled.is_cancellation());
        assert!(!CameraError::PermissionDenied.is_cancellation());
        assert!(!CameraError::Failed {
            reason: "sensor".into()
        }
        .is_cancellation());
    }

    #[test]
    fn picked_photo_serializes_bytes_compactly() {
        let photo = PickedPhoto::new(vec![0xFF, 0xD8, 0xFF]);
        let json = serde_json::to_string(&photo).unwrap();
        assert_eq!(json, r#"{"data":[255,216,255],"mime_type":null}"#);
    }
}
