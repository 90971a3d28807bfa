//! Text translation client

use super::{error_body, ProviderError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Translate text between two languages (ISO 639-1 style codes).
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError>;
}

/// Translator backed by Google's public `translate_a/single` (`client=gtx`) endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl GoogleTranslator {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Err(ProviderError::InvalidInput("text to translate is empty".to_string()));
        }
        if source_lang.is_empty() || target_lang.is_empty() {
            return Err(ProviderError::InvalidInput("language code is empty".to_string()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source_lang),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let translated = parse_gtx_response(&payload)?;
        debug!(
            source_lang = %source_lang,
            target_lang = %target_lang,
            chars = translated.chars().count(),
            "Translation received"
        );
        Ok(translated)
    }
}

/// Join the translated segments of a gtx response.
///
/// The payload is a nested array whose first element lists segments, each
/// segment starting with its translated text:
/// `[[["Hola ", "Hello ", ...], ["mundo", "world", ...]], null, "en", ...]`
pub(crate) fn parse_gtx_response(payload: &Value) -> Result<String, ProviderError> {
    let segments = payload
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::MalformedResponse("missing segment list".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(ProviderError::MalformedResponse(
            "response contained no translated text".to_string(),
        ));
    }

    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn translator_for(server: &MockServer, timeout: Duration) -> GoogleTranslator {
        let client = reqwest::Client::builder().timeout(timeout).build().unwrap();
        GoogleTranslator::new(client, format!("{}/translate_a/single", server.uri()), timeout)
    }

    #[test]
    fn test_parse_multi_segment_response() {
        let payload = json!([
            [["Hola. ", "Hello. ", null, null, 10], ["¿Cómo estás?", "How are you?", null, null, 10]],
            null,
            "en"
        ]);
        assert_eq!(parse_gtx_response(&payload).unwrap(), "Hola. ¿Cómo estás?");
    }

    #[test]
    fn test_parse_rejects_unexpected_shapes() {
        assert!(matches!(
            parse_gtx_response(&json!({"error": "nope"})),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_gtx_response(&json!([[], null, "en"])),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_input_rejected_before_network() {
        // Port 9 (discard) on localhost: the call must fail before reaching it
        let translator = GoogleTranslator::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/translate",
            Duration::from_secs(1),
        );

        let result = translator.translate("   ", "en", "es").await;
        assert!(matches!(result, Err(ProviderError::InvalidInput(_))));

        let result = translator.translate("Hello", "", "es").await;
        assert!(matches!(result, Err(ProviderError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_translate_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("client", "gtx"))
            .and(query_param("sl", "en"))
            .and(query_param("tl", "es"))
            .and(query_param("dt", "t"))
            .and(query_param("q", "Hello world"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                [["Hola ", "Hello ", null, null, 10], ["mundo", "world", null, null, 10]],
                null,
                "en"
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let translator = translator_for(&server, Duration::from_secs(5));
        let translated = translator.translate("Hello world", "en", "es").await.unwrap();
        assert_eq!(translated, "Hola mundo");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad tl"))
            .mount(&server)
            .await;

        let translator = translator_for(&server, Duration::from_secs(5));
        match translator.translate("Hello", "en", "zz").await {
            Err(ProviderError::Status { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad tl");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([[["Hola", "Hello"]], null, "en"]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let timeout = Duration::from_millis(200);
        let translator = translator_for(&server, timeout);
        match translator.translate("Hello", "en", "es").await {
            Err(ProviderError::Timeout(after)) => assert_eq!(after, timeout),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
