//! Crop diagnosis through Gemini `generateContent`.
//!
//! The request asks for structured JSON; the reply is validated field by
//! field before it becomes a [`DiagnosisResult`]. Every failure is typed here
//! and collapses to one generic message at the UI.

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::capabilities::{HttpError, HttpResult, OutboundRequest, RequestError};
use crate::config::DiagnosisConfig;
use crate::i18n::Language;
use crate::image_processing::StagedImage;

pub const API_KEY_HEADER: &str = "x-goog-api-key";

pub const REQUIRED_FIELDS: [&str; 7] = [
    "plantName",
    "diseaseName",
    "isHealthy",
    "confidence",
    "description",
    "naturalTreatments",
    "chemicalTreatments",
];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Treatment {
    pub name: String,
    pub instruction: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    pub plant_name: String,
    pub disease_name: String,
    pub is_healthy: bool,
    pub confidence: f64,
    pub description: String,
    pub natural_treatments: Vec<Treatment>,
    pub chemical_treatments: Vec<Treatment>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagnosisError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("could not build request: {0}")]
    Request(RequestError),

    #[error("transport failed: {0}")]
    Transport(HttpError),

    #[error("service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("service returned no text")]
    EmptyResponse,

    #[error("response is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("response does not match schema: {0}")]
    Schema(String),
}

impl DiagnosisError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => matches!(e, HttpError::Io(_) | HttpError::Timeout),
            Self::Status { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}

/// Drops a `data:...;base64,` prefix. Mirrors `payload.split(',')[1] ||
/// payload`: the segment after the first comma, or the whole input when that
/// segment is missing or empty.
#[must_use]
pub fn strip_data_uri(payload: &str) -> &str {
    payload
        .split(',')
        .nth(1)
        .filter(|data| !data.is_empty())
        .unwrap_or(payload)
}

#[must_use]
pub fn instruction(language: Language) -> String {
    let name = language.display_name();
    format!(
        "As an agricultural expert, analyze this crop image.\n\
         IMPORTANT: You MUST respond entirely in {name}.\n\
         Identify the plant, detect any diseases, and provide treatment instructions.\n\
         Ensure the terminology is simple and localized for a farmer who speaks {name}."
    )
}

fn treatment_list_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": {
                    "type": "STRING",
                    "description": "Name of treatment in requested language."
                },
                "instruction": {
                    "type": "STRING",
                    "description": "Step-by-step instruction in requested language."
                }
            },
            "required": ["name", "instruction"]
        }
    })
}

#[must_use]
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "plantName": {
                "type": "STRING",
                "description": "The common name of the identified plant in the requested language."
            },
            "diseaseName": {
                "type": "STRING",
                "description": "The name of the detected disease in the requested language."
            },
            "isHealthy": {
                "type": "BOOLEAN",
                "description": "True if the plant is healthy."
            },
            "confidence": {
                "type": "NUMBER",
                "description": "Confidence score (0-100)."
            },
            "description": {
                "type": "STRING",
                "description": "A detailed explanation in the requested language."
            },
            "naturalTreatments": treatment_list_schema(),
            "chemicalTreatments": treatment_list_schema()
        },
        "required": REQUIRED_FIELDS
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: &'static str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    temperature: f32,
}

/// Builds the `generateContent` call for one photo.
pub fn build_request(
    config: &DiagnosisConfig,
    image: &StagedImage,
    language: Language,
) -> Result<OutboundRequest, DiagnosisError> {
    let api_key = config
        .api_key
        .as_ref()
        .map(ExposeSecret::expose_secret)
        .filter(|key| !key.is_empty())
        .ok_or(DiagnosisError::MissingApiKey)?;

    let body = GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    inline_data: Some(Blob {
                        mime_type: image.mime_type(),
                        data: image.to_base64(),
                    }),
                    text: None,
                },
                Part {
                    inline_data: None,
                    text: Some(instruction(language)),
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: response_schema(),
            temperature: config.temperature,
        },
    };

    OutboundRequest::post(config.generate_content_url())
        .and_then(|request| request.with_header(API_KEY_HEADER, api_key.as_str()))
        .and_then(|request| request.with_json(&body))
        .map_err(DiagnosisError::Request)
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

fn api_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ApiErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_default()
}

/// Turns whatever the shell reported back into a validated result.
///
/// `crux_http` reports 4xx and 5xx replies as `HttpError::Http`, carrying
/// the status and body.
pub fn parse_response(result: HttpResult) -> Result<DiagnosisResult, DiagnosisError> {
    let mut response = match result {
        Ok(response) => response,
        Err(HttpError::Http(failure)) => {
            return Err(DiagnosisError::Status {
                status: u16::from(failure.code),
                message: failure.body.as_deref().map(api_error_message).unwrap_or_default(),
            });
        }
        Err(e) => return Err(DiagnosisError::Transport(e)),
    };

    let status = u16::from(response.status());
    let body = response.take_body().unwrap_or_default();
    if !(200..300).contains(&status) {
        return Err(DiagnosisError::Status {
            status,
            message: api_error_message(&body),
        });
    }

    let envelope: GenerateContentResponse = serde_json::from_slice(&body)
        .map_err(|e| DiagnosisError::MalformedJson(e.to_string()))?;

    let text: String = envelope
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(DiagnosisError::EmptyResponse);
    }
    debug!(len = text.len(), "received diagnosis text");
    parse_diagnosis_text(&text)
}

/// Validates the model's JSON text against the diagnosis schema.
pub fn parse_diagnosis_text(text: &str) -> Result<DiagnosisResult, DiagnosisError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DiagnosisError::MalformedJson(e.to_string()))?;

    let Some(object) = value.as_object() else {
        return Err(DiagnosisError::Schema("expected a JSON object".to_string()));
    };
    if let Some(missing) = REQUIRED_FIELDS.iter().find(|field| !object.contains_key(**field)) {
        return Err(DiagnosisError::Schema(format!("missing field `{missing}`")));
    }

    let result: DiagnosisResult =
        serde_json::from_value(value).map_err(|e| DiagnosisError::Schema(e.to_string()))?;

    if !result.confidence.is_finite() || !(0.0..=100.0).contains(&result.confidence) {
        warn!(confidence = result.confidence, "confidence out of range");
        return Err(DiagnosisError::Schema(format!(
            "confidence {} outside 0..=100",
            result.confidence
        )));
    }
    Ok(result)
}
