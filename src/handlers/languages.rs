use crate::languages::SUPPORTED_LANGUAGES;
use actix_web::HttpResponse;
use serde_json::json;

/// `GET /api/v1/languages` - languages offered for input and output.
pub async fn list_languages() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "languages": SUPPORTED_LANGUAGES,
        "count": SUPPORTED_LANGUAGES.len()
    }))
}
