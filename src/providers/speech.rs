//! Text-to-speech client

use super::{error_body, ProviderError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Longest text the translate TTS endpoint accepts in one request
pub const MAX_CHUNK_CHARS: usize = 100;

/// Convert text into a complete encoded audio payload (MP3).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>, ProviderError>;
}

/// Synthesizer backed by Google's `translate_tts` endpoint.
///
/// Long text is split into chunks of at most [`MAX_CHUNK_CHARS`] characters on
/// word boundaries; the MP3 frames returned for each chunk are concatenated,
/// which players handle as one continuous stream.
#[derive(Debug, Clone)]
pub struct GoogleSpeechSynthesizer {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl GoogleSpeechSynthesizer {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        lang: &str,
        index: usize,
        total: usize,
    ) -> Result<Vec<u8>, ProviderError> {
        let index = index.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", lang),
                ("q", chunk),
                ("idx", index.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
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

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;

        if bytes.is_empty() {
            return Err(ProviderError::MalformedResponse("empty audio payload".to_string()));
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeechSynthesizer {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>, ProviderError> {
        if lang.is_empty() {
            return Err(ProviderError::InvalidInput("language code is empty".to_string()));
        }

        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(ProviderError::InvalidInput("no text to speak".to_string()));
        }

        let mut audio = Vec::new();
        for (index, chunk) in chunks.iter().enumerate() {
            let part = self.fetch_chunk(chunk, lang, index, chunks.len()).await?;
            audio.extend_from_slice(&part);
        }

        debug!(lang = %lang, chunks = chunks.len(), bytes = audio.len(), "Speech synthesized");
        Ok(audio)
    }
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Words are packed greedily; a single word longer than `max_chars` is cut on
/// character boundaries. Whitespace-only input yields no chunks.
pub(crate) fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { word_len + 1 };
        if current_len + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
