//! Text-to-speech (TTS) via the `OpenAI` speech endpoint

use std::time::Duration;

use serde::Serialize;

use crate::{Error, Result};

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Default request timeout; covers downloading the whole clip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Synthesizes speech from text
#[derive(Debug, Clone)]
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    voice: String,
    speed: f32,
}

#[derive(Serialize)]
struct TtsRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
}

impl TextToSpeech {
    /// Create a TTS client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be
    /// built
    pub fn new(
        api_key: String,
        model: String,
        voice: String,
        speed: f32,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: OPENAI_SPEECH_URL.to_string(),
            model,
            voice,
            speed,
        })
    }

    /// Point at a different speech endpoint (e.g. a local proxy)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Synthesize `text` to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the provider rejects it
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), voice = %self.voice, "speech synthesized");
        Ok(audio.to_vec())
    }
}
