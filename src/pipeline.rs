//! # Translate & Speak Pipeline
//!
//! Orchestrates the two request flows around encrypted audio artifacts.
//!
//! ## Flow A: Translate & Speak:
//! ```text
//! Received → Translating → Synthesizing → Encrypting → Persisting → Done
//!     └──────────┴─────────────┴─────────────┴────────────┴──→ Failed
//! ```
//! Nothing is written until the Persisting stage, so every failure before it
//! leaves no artifact behind and is safe to retry as a whole.
//!
//! ## Flow B: Fetch Audio:
//! ```text
//! Received → Locating → Decrypting → Done
//!     └──────────┴───────────┴──→ Failed
//! ```
//! "Not found" is checked before decryption, so a missing artifact can never
//! surface as a decryption failure. Decrypted audio is only held in memory for
//! the lifetime of one response and never written back to storage.
//!
//! ## Shared State:
//! The pipeline is immutable after construction. The cipher key is read-only and
//! every artifact id is fresh, so concurrent requests need no locking here.

use crate::cipher::{AudioCipher, CipherError};
use crate::languages::is_valid_language_code;
use crate::providers::{ProviderError, SpeechSynthesizer, Translator};
use crate::storage::{is_valid_artifact_id, ArtifactStore, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Longest input text accepted for translation (characters)
pub const MAX_TEXT_CHARS: usize = 5000;

/// Failure taxonomy of both flows.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad input; rejected before any provider call
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("translation failed: {0}")]
    Translation(#[source] ProviderError),

    #[error("speech synthesis failed: {0}")]
    Synthesis(#[source] ProviderError),

    #[error("encryption failed: {0}")]
    Encryption(#[source] CipherError),

    /// Write (or unexpected read) failure; no artifact was persisted
    #[error("artifact storage failed: {0}")]
    Storage(#[source] StorageError),

    /// Artifact absent: expired, cleaned up or never created
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// Ciphertext is corrupted or was written under a different key
    #[error("artifact decryption failed: {0}")]
    Decryption(#[source] CipherError),
}

/// Stages of both flows, used for structured logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Received,
    Translating,
    Synthesizing,
    Encrypting,
    Persisting,
    Locating,
    Decrypting,
    Done,
}

impl FlowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStage::Received => "received",
            FlowStage::Translating => "translating",
            FlowStage::Synthesizing => "synthesizing",
            FlowStage::Encrypting => "encrypting",
            FlowStage::Persisting => "persisting",
            FlowStage::Locating => "locating",
            FlowStage::Decrypting => "decrypting",
            FlowStage::Done => "done",
        }
    }
}

/// Input of Flow A.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

/// Result of a successful Flow A run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateOutcome {
    pub original_text: String,
    pub translated_text: String,
    pub artifact_id: String,
}

/// The orchestrator. Cheap to share behind an `Arc`.
pub struct Pipeline {
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    cipher: Arc<AudioCipher>,
    store: Arc<dyn ArtifactStore>,
}

impl Pipeline {
    /// Assemble the pipeline.
    ///
    /// The cipher passed here is the only key this process will ever use.
    /// Artifacts written under any other key fail with `PipelineError::Decryption`.
    pub fn new(
        translator: Arc<dyn Translator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        cipher: Arc<AudioCipher>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            translator,
            synthesizer,
            cipher,
            store,
        }
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn key_fingerprint(&self) -> &str {
        self.cipher.fingerprint()
    }

    /// Flow A: translate, synthesize the translation, encrypt, persist.
    pub async fn translate_and_speak(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslateOutcome, PipelineError> {
        trace_stage(FlowStage::Received);
        let text = validate_text(&request.text)?;
        validate_language("input_lang_code", &request.source_lang)?;
        validate_language("output_lang_code", &request.target_lang)?;

        trace_stage(FlowStage::Translating);
        let translated_text = self
            .translator
            .translate(text, &request.source_lang, &request.target_lang)
            .await
            .map_err(|e| {
                warn!(error = %e, source_lang = %request.source_lang, target_lang = %request.target_lang, "Translation provider failed");
                PipelineError::Translation(e)
            })?;

        trace_stage(FlowStage::Synthesizing);
        let audio = self
            .synthesizer
            .synthesize(&translated_text, &request.target_lang)
            .await
            .map_err(|e| {
                warn!(error = %e, lang = %request.target_lang, "Speech provider failed");
                PipelineError::Synthesis(e)
            })?;

        trace_stage(FlowStage::Encrypting);
        let ciphertext = self.cipher.encrypt(&audio).map_err(|e| {
            error!(error = %e, "Audio encryption failed");
            PipelineError::Encryption(e)
        })?;

        trace_stage(FlowStage::Persisting);
        let artifact_id = self.store.generate_id();
        self.store
            .save(&artifact_id, &ciphertext)
            .await
            .map_err(|e| {
                error!(error = %e, artifact_id = %artifact_id, backend = self.store.backend_name(), "Failed to persist audio artifact");
                PipelineError::Storage(e)
            })?;

        trace_stage(FlowStage::Done);
        info!(
            artifact_id = %artifact_id,
            source_lang = %request.source_lang,
            target_lang = %request.target_lang,
            audio_bytes = audio.len(),
            "Audio artifact created"
        );

        Ok(TranslateOutcome {
            original_text: request.text,
            translated_text,
            artifact_id,
        })
    }

    /// Flow B: locate an artifact and return its decrypted audio.
    pub async fn fetch_audio(&self, artifact_id: &str) -> Result<Vec<u8>, PipelineError> {
        trace_stage(FlowStage::Received);
        if !is_valid_artifact_id(artifact_id) {
            debug!(artifact_id = %artifact_id, "Malformed artifact id treated as not found");
            return Err(PipelineError::NotFound(artifact_id.to_string()));
        }

        let present = self
            .store
            .exists(artifact_id)
            .await
            .map_err(PipelineError::Storage)?;
        if !present {
            info!(artifact_id = %artifact_id, "Audio artifact not found");
            return Err(PipelineError::NotFound(artifact_id.to_string()));
        }

        trace_stage(FlowStage::Locating);
        let ciphertext = match self.store.load(artifact_id).await {
            Ok(bytes) => bytes,
            // Removed between the existence check and the read
            Err(StorageError::NotFound(_)) => {
                info!(artifact_id = %artifact_id, "Audio artifact disappeared before read");
                return Err(PipelineError::NotFound(artifact_id.to_string()));
            }
            Err(e) => {
                error!(error = %e, artifact_id = %artifact_id, "Failed to read audio artifact");
                return Err(PipelineError::Storage(e));
            }
        };

        trace_stage(FlowStage::Decrypting);
        let audio = self.cipher.decrypt(&ciphertext).map_err(|e| {
            error!(
                error = %e,
                artifact_id = %artifact_id,
                key_fingerprint = %self.cipher.fingerprint(),
                "Audio artifact failed authentication - corrupted data or key mismatch"
            );
            PipelineError::Decryption(e)
        })?;

        trace_stage(FlowStage::Done);
        debug!(artifact_id = %artifact_id, audio_bytes = audio.len(), "Audio artifact served");
        Ok(audio)
    }

    /// Direct synthesis without touching the cipher or the store.
    pub async fn speak(&self, text: &str, lang: &str) -> Result<Vec<u8>, PipelineError> {
        let text = validate_text(text)?;
        validate_language("lang_code", lang)?;

        trace_stage(FlowStage::Synthesizing);
        self.synthesizer.synthesize(text, lang).await.map_err(|e| {
            warn!(error = %e, lang = %lang, "Speech provider failed");
            PipelineError::Synthesis(e)
        })
    }
}

fn trace_stage(stage: FlowStage) {
    debug!(stage = stage.as_str(), "Pipeline stage");
}

fn validate_text(text: &str) -> Result<&str, PipelineError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::Validation("text must not be empty".to_string()));
    }

    let chars = trimmed.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(PipelineError::Validation(format!(
            "text is too long ({} characters, max {})",
            chars, MAX_TEXT_CHARS
        )));
    }

    Ok(trimmed)
}

fn validate_language(field: &str, code: &str) -> Result<(), PipelineError> {
    if code.trim().is_empty() {
        return Err(PipelineError::Validation(format!("{} must not be empty", field)));
    }
    if !is_valid_language_code(code) {
        return Err(PipelineError::Validation(format!(
            "{} '{}' is not a valid language code",
            field, code
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cipher::generate_key_material;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Translator stub returning a fixed translation and counting calls.
    #[derive(Default)]
    pub struct StubTranslator {
        pub reply: Option<String>,
        pub calls: AtomicUsize,
    }

    impl StubTranslator {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl Translator for StubTranslator {
        async fn translate(&self, _text: &str, _src: &str, _dst: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().ok_or(ProviderError::Status {
                status: 400,
                body: "unsupported language pair".to_string(),
            })
        }
    }

    /// Synthesizer stub returning fixed audio and recording what it was asked to speak.
    #[derive(Default)]
    pub struct StubSynthesizer {
        pub audio: Option<Vec<u8>>,
        pub spoken: Mutex<Vec<(String, String)>>,
    }

    impl StubSynthesizer {
        pub fn producing(audio: &[u8]) -> Self {
            Self {
                audio: Some(audio.to_vec()),
                spoken: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for StubSynthesizer {
        async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>, ProviderError> {
            self.spoken
                .lock()
                .unwrap()
                .push((text.to_string(), lang.to_string()));
            self.audio
                .clone()
                .ok_or_else(|| ProviderError::Network("connection reset".to_string()))
        }
    }

    /// Store that accepts nothing, for exercising write failures.
    pub struct BrokenStore;

    #[async_trait]
    impl ArtifactStore for BrokenStore {
        fn backend_name(&self) -> &'static str {
            "broken"
        }

        async fn save(&self, _id: &str, _bytes: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }

        async fn load(&self, id: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(id.to_string()))
        }

        async fn exists(&self, _id: &str) -> Result<bool, StorageError> {
            Ok(false)
        }

        async fn delete(&self, _id: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    pub fn new_cipher() -> Arc<AudioCipher> {
        Arc::new(AudioCipher::from_key_material(Some(&generate_key_material())).unwrap())
    }

    fn hello_request() -> TranslationRequest {
        TranslationRequest {
            text: "Hello".to_string(),
            source_lang: "en".to_string(),
            target_lang: "es".to_string(),
        }
    }

    struct Harness {
        translator: Arc<StubTranslator>,
        synthesizer: Arc<StubSynthesizer>,
        store: Arc<MemoryStore>,
        pipeline: Pipeline,
    }

    fn harness(translator: StubTranslator, synthesizer: StubSynthesizer) -> Harness {
        let translator = Arc::new(translator);
        let synthesizer = Arc::new(synthesizer);
        let store = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(
            translator.clone(),
            synthesizer.clone(),
            new_cipher(),
            store.clone(),
        );
        Harness {
            translator,
            synthesizer,
            store,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_round_trip_returns_synthesized_bytes() {
        let h = harness(
            StubTranslator::replying("Hola"),
            StubSynthesizer::producing(b"\x00\x01audio"),
        );

        let outcome = h.pipeline.translate_and_speak(hello_request()).await.unwrap();
        assert_eq!(outcome.original_text, "Hello");
        assert_eq!(outcome.translated_text, "Hola");
        assert!(is_valid_artifact_id(&outcome.artifact_id));

        // Synthesis must receive the translated text in the target language
        assert_eq!(
            h.synthesizer.spoken.lock().unwrap().as_slice(),
            &[("Hola".to_string(), "es".to_string())]
        );

        // Stored bytes are ciphertext, not the raw audio
        let stored = h.store.load(&outcome.artifact_id).await.unwrap();
        assert_ne!(stored, b"\x00\x01audio");

        let audio = h.pipeline.fetch_audio(&outcome.artifact_id).await.unwrap();
        assert_eq!(audio, b"\x00\x01audio");

        // Fetching does not consume the artifact
        assert!(h.pipeline.fetch_audio(&outcome.artifact_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_identical_requests_create_distinct_artifacts() {
        let h = harness(
            StubTranslator::replying("Hola"),
            StubSynthesizer::producing(b"\x00\x01audio"),
        );

        let first = h.pipeline.translate_and_speak(hello_request()).await.unwrap();
        let second = h.pipeline.translate_and_speak(hello_request()).await.unwrap();
        assert_ne!(first.artifact_id, second.artifact_id);

        let first_bytes = h.store.load(&first.artifact_id).await.unwrap();
        let second_bytes = h.store.load(&second.artifact_id).await.unwrap();
        assert_ne!(first_bytes, second_bytes);

        assert_eq!(
            h.pipeline.fetch_audio(&first.artifact_id).await.unwrap(),
            h.pipeline.fetch_audio(&second.artifact_id).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_provider_calls() {
        let h = harness(
            StubTranslator::replying("Hola"),
            StubSynthesizer::producing(b"audio"),
        );

        for text in ["", "   \n\t"] {
            let mut request = hello_request();
            request.text = text.to_string();
            let result = h.pipeline.translate_and_speak(request).await;
            assert!(matches!(result, Err(PipelineError::Validation(_))));
        }

        assert_eq!(h.translator.calls.load(Ordering::SeqCst), 0);
        assert!(h.synthesizer.spoken.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_language_codes_are_rejected() {
        let h = harness(
            StubTranslator::replying("Hola"),
            StubSynthesizer::producing(b"audio"),
        );

        let mut request = hello_request();
        request.target_lang = String::new();
        assert!(matches!(
            h.pipeline.translate_and_speak(request).await,
            Err(PipelineError::Validation(_))
        ));

        let mut request = hello_request();
        request.source_lang = "../../etc".to_string();
        assert!(matches!(
            h.pipeline.translate_and_speak(request).await,
            Err(PipelineError::Validation(_))
        ));

        let mut request = hello_request();
        request.text = "a".repeat(MAX_TEXT_CHARS + 1);
        assert!(matches!(
            h.pipeline.translate_and_speak(request).await,
            Err(PipelineError::Validation(_))
        ));

        assert_eq!(h.translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_translation_failure_creates_no_artifact() {
        let h = harness(StubTranslator::failing(), StubSynthesizer::producing(b"audio"));

        let result = h.pipeline.translate_and_speak(hello_request()).await;
        assert!(matches!(result, Err(PipelineError::Translation(_))));
        assert!(h.synthesizer.spoken.lock().unwrap().is_empty());
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_synthesis_failure_creates_no_artifact() {
        let h = harness(StubTranslator::replying("Hola"), StubSynthesizer::failing());

        let result = h.pipeline.translate_and_speak(hello_request()).await;
        assert!(matches!(result, Err(PipelineError::Synthesis(_))));
        assert_eq!(h.translator.calls.load(Ordering::SeqCst), 1);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let pipeline = Pipeline::new(
            Arc::new(StubTranslator::replying("Hola")),
            Arc::new(StubSynthesizer::producing(b"audio")),
            new_cipher(),
            Arc::new(BrokenStore),
        );

        let result = pipeline.translate_and_speak(hello_request()).await;
        assert!(matches!(result, Err(PipelineError::Storage(_))));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found_never_decryption_error() {
        let h = harness(
            StubTranslator::replying("Hola"),
            StubSynthesizer::producing(b"audio"),
        );

        let fresh_id = h.store.generate_id();
        for id in ["does-not-exist", fresh_id.as_str(), "../etc/passwd"] {
            assert!(matches!(
                h.pipeline.fetch_audio(id).await,
                Err(PipelineError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_restart_with_different_key_fails_decryption() {
        let store = Arc::new(MemoryStore::new());
        let before_restart = Pipeline::new(
            Arc::new(StubTranslator::replying("Hola")),
            Arc::new(StubSynthesizer::producing(b"\x00\x01audio")),
            new_cipher(),
            store.clone(),
        );
        let outcome = before_restart.translate_and_speak(hello_request()).await.unwrap();

        let after_restart = Pipeline::new(
            Arc::new(StubTranslator::replying("Hola")),
            Arc::new(StubSynthesizer::producing(b"\x00\x01audio")),
            new_cipher(),
            store.clone(),
        );
        assert_ne!(before_restart.key_fingerprint(), after_restart.key_fingerprint());

        let result = after_restart.fetch_audio(&outcome.artifact_id).await;
        assert!(matches!(result, Err(PipelineError::Decryption(_))));
    }

    #[tokio::test]
    async fn test_corrupted_artifact_fails_decryption() {
        let h = harness(
            StubTranslator::replying("Hola"),
            StubSynthesizer::producing(b"audio"),
        );

        let id = h.store.generate_id();
        h.store.save(&id, b"definitely not ciphertext").await.unwrap();

        assert!(matches!(
            h.pipeline.fetch_audio(&id).await,
            Err(PipelineError::Decryption(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_artifact_is_not_found() {
        let h = harness(
            StubTranslator::replying("Hola"),
            StubSynthesizer::producing(b"audio"),
        );

        let outcome = h.pipeline.translate_and_speak(hello_request()).await.unwrap();
        h.store.delete(&outcome.artifact_id).await.unwrap();

        assert!(matches!(
            h.pipeline.fetch_audio(&outcome.artifact_id).await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_speak_bypasses_store() {
        let h = harness(
            StubTranslator::replying("Hola"),
            StubSynthesizer::producing(b"mp3"),
        );

        assert_eq!(h.pipeline.speak("Hola", "es").await.unwrap(), b"mp3");
        assert!(h.store.is_empty().await);
        assert_eq!(h.translator.calls.load(Ordering::SeqCst), 0);

        assert!(matches!(
            h.pipeline.speak(" ", "es").await,
            Err(PipelineError::Validation(_))
        ));
    }
}
