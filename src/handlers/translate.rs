//! # Translate & Speak Handler
//!
//! `POST /translate` runs the full pipeline and answers with a reference to the
//! encrypted audio artifact instead of the audio itself.
//!
//! ## Request:
//! Form fields `text`, `input_lang_code`, `output_lang_code`, sent either as
//! `application/x-www-form-urlencoded` or as `multipart/form-data` (browser `FormData`).
//!
//! ## Response:
//! ```json
//! {
//!   "original_text": "Hello",
//!   "translated_text": "Hola",
//!   "audio_filename": "67e55044-10b1-426f-9247-bb680e5fe0c8"
//! }
//! ```
//! Fetch the audio afterwards with `GET /audio/{audio_filename}`.

use crate::error::{AppError, AppResult};
use crate::pipeline::TranslationRequest;
use crate::state::{AppState, ArtifactEvent};
use actix_multipart::Multipart;
use actix_web::{web, Either, HttpResponse};
use futures_util::stream::StreamExt;
use serde::{Deserialize, Serialize};

/// Largest multipart text field we buffer (bytes)
const MAX_FIELD_BYTES: usize = 64 * 1024;

/// Form fields of `POST /translate`.
///
/// Missing fields default to empty so the pipeline reports which one is absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TranslateForm {
    pub text: String,
    pub input_lang_code: String,
    pub output_lang_code: String,
}

impl From<TranslateForm> for TranslationRequest {
    fn from(form: TranslateForm) -> Self {
        TranslationRequest {
            text: form.text,
            source_lang: form.input_lang_code,
            target_lang: form.output_lang_code,
        }
    }
}

/// Response body of `POST /translate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub original_text: String,
    pub translated_text: String,
    pub audio_filename: String,
}

pub async fn translate_and_speak(
    state: web::Data<AppState>,
    payload: Either<web::Form<TranslateForm>, Multipart>,
) -> AppResult<HttpResponse> {
    let form = match payload {
        Either::Left(form) => form.into_inner(),
        Either::Right(multipart) => read_multipart_form(multipart).await?,
    };

    let outcome = state.pipeline.translate_and_speak(form.into()).await?;
    state.record_artifact_event(ArtifactEvent::Created);

    Ok(HttpResponse::Ok().json(TranslateResponse {
        original_text: outcome.original_text,
        translated_text: outcome.translated_text,
        audio_filename: outcome.artifact_id,
    }))
}

/// Collect the three text fields from a multipart body. Unknown fields are drained and ignored.
async fn read_multipart_form(mut payload: Multipart) -> AppResult<TranslateForm> {
    let mut form = TranslateForm::default();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::Validation(format!("Multipart error: {}", e)))?;

        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("Missing field name".to_string()))?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::Validation(format!("Chunk error: {}", e)))?;
            if bytes.len() + chunk.len() > MAX_FIELD_BYTES {
                return Err(AppError::Validation(format!(
                    "Field '{}' exceeds {} bytes",
                    name, MAX_FIELD_BYTES
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        let value = String::from_utf8(bytes)
            .map_err(|_| AppError::Validation(format!("Field '{}' is not valid UTF-8", name)))?;

        match name.as_str() {
            "text" => form.text = value,
            "input_lang_code" => form.input_lang_code = value,
            "output_lang_code" => form.output_lang_code = value,
            _ => {}
        }
    }

    Ok(form)
}
