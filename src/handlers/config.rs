use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// `GET /api/v1/config` - effective configuration, encryption key redacted.
///
/// There is no update counterpart: the key and the store are fixed for the
/// lifetime of the process.
pub async fn get_config(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": state.config.redacted_json()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{StubSynthesizer, StubTranslator};
    use crate::state::tests::test_state;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_config_endpoint_hides_key() {
        let state = test_state(StubTranslator::failing(), StubSynthesizer::failing());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/config", web::get().to(get_config)),
        )
        .await;

        let req = test::TestRequest::get().uri("/config").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["config"]["storage"]["backend"], "memory");
        assert!(body["config"]["security"].get("encryption_key").is_none());
    }
}
