//! # Audio Handlers
//!
//! - `GET /audio/{id}` - decrypt and serve a stored artifact
//! - `POST /text-to-speech` - synthesize and stream audio directly (nothing is stored)

use crate::error::AppResult;
use crate::pipeline::PipelineError;
use crate::state::{AppState, ArtifactEvent};
use actix_web::{http::header, web, HttpResponse};
use serde::Deserialize;

/// Media type of every audio payload we serve
pub const AUDIO_MEDIA_TYPE: &str = "audio/mpeg";

/// Request body of `POST /text-to-speech`.
#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    pub lang_code: String,
}

/// Serve the decrypted audio of one artifact.
///
/// ## Responses:
/// - 200 `audio/mpeg` with the exact bytes the speech provider produced
/// - 404 when the artifact expired, was cleaned up, or never existed
/// - 500 when the stored ciphertext fails authentication
pub async fn fetch_audio(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let artifact_id = path.into_inner();

    let audio = match state.pipeline.fetch_audio(&artifact_id).await {
        Ok(audio) => audio,
        Err(err) => {
            match &err {
                PipelineError::NotFound(_) => state.record_artifact_event(ArtifactEvent::Missing),
                PipelineError::Decryption(_) => {
                    state.record_artifact_event(ArtifactEvent::DecryptionFailed)
                }
                _ => {}
            }
            return Err(err.into());
        }
    };

    state.record_artifact_event(ArtifactEvent::Served);

    Ok(HttpResponse::Ok()
        .content_type(AUDIO_MEDIA_TYPE)
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}.mp3\"", artifact_id),
        ))
        .body(audio))
}

/// Synthesize speech and stream it back without storing anything.
pub async fn text_to_speech(
    state: web::Data<AppState>,
    body: web::Json<TtsRequest>,
) -> AppResult<HttpResponse> {
    let request = body.into_inner();
    let audio = state.pipeline.speak(&request.text, &request.lang_code).await?;

    Ok(HttpResponse::Ok()
        .content_type(AUDIO_MEDIA_TYPE)
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .body(audio))
}
