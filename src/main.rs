//! # Secure Speak Backend - Main Application Entry Point
//!
//! HTTP service that translates text, turns the translation into speech, and keeps the
//! resulting audio encrypted at rest until a client fetches it.
//!
//! ## Startup Order (fail-fast):
//! 1. Load `.env`, configuration files and environment variables
//! 2. Build the artifact cipher from `AUDIO_ENCRYPTION_KEY`; the process exits here,
//!    before binding any socket, if the key is missing or malformed
//! 3. Build provider clients and the artifact store
//! 4. Start the Actix-web server
//!
//! ## Application Architecture:
//! - **config**: Configuration (TOML file + environment variables)
//! - **cipher**: AES-256-GCM encryption of audio artifacts
//! - **storage**: Artifact store backends (scratch directory, memory)
//! - **providers**: Translation and speech-synthesis clients
//! - **pipeline**: Translate → synthesize → encrypt → store, and fetch → decrypt
//! - **handlers**: HTTP request handlers
//! - **state / health / middleware / error**: server plumbing
//!
//! ## Generating a key:
//! `secure-speak-backend --generate-key` prints fresh key material and exits.

mod cipher;
mod config;
mod error;
mod handlers;
mod health;
mod languages;
mod middleware;
mod pipeline;
mod providers;
mod state;
mod storage;

use actix_cors::Cors;
use actix_web::{middleware::NormalizePath, web, App, HttpServer};
use anyhow::{Context, Result};
use crate::cipher::AudioCipher;
use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::providers::{GoogleSpeechSynthesizer, GoogleTranslator};
use crate::state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown signal set by the signal handler task.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// Largest urlencoded form accepted by `POST /translate` (bytes)
const FORM_LIMIT_BYTES: usize = 64 * 1024;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if std::env::args().skip(1).any(|arg| arg == "--generate-key") {
        println!("{}", cipher::generate_key_material());
        return Ok(());
    }

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting secure-speak-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    // Fail fast: no request is accepted until the key is known to be usable
    let cipher = AudioCipher::from_key_material(config.security.encryption_key.as_deref())
        .map_err(|e| {
            error!(
                error = %e,
                "Refusing to start: set {} to a valid key",
                crate::config::ENCRYPTION_KEY_ENV
            );
            e
        })?;
    info!(
        key_fingerprint = %cipher.fingerprint(),
        "Artifact cipher ready (artifacts from a different key fingerprint cannot be decrypted)"
    );

    let pipeline = build_pipeline(&config, cipher).await?;
    info!(
        store_backend = pipeline.store_backend(),
        timeout_secs = config.providers.timeout_secs,
        "Pipeline assembled"
    );

    let app_state = AppState::new(config.clone(), Arc::new(pipeline));
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::FormConfig::default().limit(FORM_LIMIT_BYTES))
            .wrap(cors)
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .wrap(TracingLogger::default())
            .wrap(NormalizePath::trim())
            .configure(configure_routes)
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Register every HTTP route.
///
/// ## Public contract:
/// - `POST /translate` - translate, synthesize, store encrypted audio
/// - `GET /audio/{id}` - decrypt and serve stored audio
/// - `POST /text-to-speech` - synthesize and stream audio directly
///
/// ## Operational:
/// - `GET /health`, `GET /api/v1/health`, `GET /api/v1/metrics`
/// - `GET /api/v1/config`, `GET /api/v1/languages`
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/translate", web::post().to(handlers::translate_and_speak))
        .route("/audio/{id}", web::get().to(handlers::fetch_audio))
        .route("/text-to-speech", web::post().to(handlers::text_to_speech))
        .service(
            web::scope("/api/v1")
                .route("/health", web::get().to(health::health_check))
                .route("/metrics", web::get().to(health::detailed_metrics))
                .route("/config", web::get().to(handlers::get_config))
                .route("/languages", web::get().to(handlers::list_languages)),
        )
        .route("/health", web::get().to(health::health_check));
}

/// Wire the Google providers, the configured store, and the cipher into a pipeline.
async fn build_pipeline(config: &AppConfig, cipher: AudioCipher) -> Result<Pipeline> {
    let timeout = Duration::from_secs(config.providers.timeout_secs);
    let http_client =
        providers::build_http_client(&config.providers).context("Failed to build HTTP client")?;

    let translator = GoogleTranslator::new(
        http_client.clone(),
        config.providers.translate_url.clone(),
        timeout,
    );
    let synthesizer =
        GoogleSpeechSynthesizer::new(http_client, config.providers.tts_url.clone(), timeout);

    let store = storage::build_store(&config.storage)
        .await
        .context("Failed to initialize artifact store")?;

    Ok(Pipeline::new(
        Arc::new(translator),
        Arc::new(synthesizer),
        Arc::new(cipher),
        store,
    ))
}

/// Initialize tracing.
///
/// `RUST_LOG` controls filtering; the default is
/// `secure_speak_backend=debug,actix_web=info`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secure_speak_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to initialize tracing")?;

    Ok(())
}

/// Listen for SIGTERM/SIGINT and flip the global shutdown flag.
fn setup_signal_handlers() {
    tokio::spawn(async {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to install signal handlers: {}", e);
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Wait for the shutdown signal to be set.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::TranslateResponse;
    use crate::pipeline::tests::{StubSynthesizer, StubTranslator};
    use crate::state::tests::test_state;
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn test_full_route_table() {
        let state = test_state(
            StubTranslator::replying("Hola"),
            StubSynthesizer::producing(b"\x00\x01audio"),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .wrap(middleware::MetricsMiddleware)
                .wrap(NormalizePath::trim())
                .configure(configure_routes),
        )
        .await;

        // Trailing slash is accepted, as the original clients post to /translate/
        let req = test::TestRequest::post()
            .uri("/translate/")
            .set_form([
                ("text", "Hello"),
                ("input_lang_code", "en"),
                ("output_lang_code", "es"),
            ])
            .to_request();
        let created: TranslateResponse = test::call_and_read_body_json(&app, req).await;

        let req = test::TestRequest::get()
            .uri(&format!("/audio/{}", created.audio_filename))
            .to_request();
        assert_eq!(&test::call_and_read_body(&app, req).await[..], b"\x00\x01audio");

        let req = test::TestRequest::get().uri("/audio/does-not-exist").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let operational = [
            "/health",
            "/api/v1/health",
            "/api/v1/metrics",
            "/api/v1/config",
            "/api/v1/languages",
        ];
        for path in operational {
            let req = test::TestRequest::get().uri(path).to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK, "{}", path);
        }
    }

    #[actix_web::test]
    async fn test_startup_refuses_missing_or_bad_key() {
        let mut config = AppConfig::default();
        assert!(AudioCipher::from_key_material(config.security.encryption_key.as_deref()).is_err());

        config.security.encryption_key = Some("too-short".to_string());
        assert!(AudioCipher::from_key_material(config.security.encryption_key.as_deref()).is_err());
    }

    #[tokio::test]
    async fn test_build_pipeline_with_memory_store() {
        let mut config = AppConfig::default();
        config.storage.backend = "memory".to_string();
        let cipher = AudioCipher::from_key_material(Some(&cipher::generate_key_material())).unwrap();
        let fingerprint = cipher.fingerprint().to_string();

        let pipeline = build_pipeline(&config, cipher).await.unwrap();
        assert_eq!(pipeline.store_backend(), "memory");
        assert_eq!(pipeline.key_fingerprint(), fingerprint);
    }
}
