//! Voice output
//!
//! Speech synthesis and speaker playback for the piggy bank's replies.

mod playback;
mod tts;

use async_trait::async_trait;

use crate::Result;

#[cfg(feature = "audio")]
pub use playback::decode_mp3;
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE};
pub use tts::{DEFAULT_TIMEOUT as TTS_TIMEOUT, TextToSpeech};

/// Says a phrase out loud
#[async_trait(?Send)]
pub trait Speaker {
    /// Speak `text`, returning once playback has finished
    ///
    /// # Errors
    ///
    /// Returns error if the phrase could not be synthesized or played
    async fn speak(&self, text: &str) -> Result<()>;
}

#[async_trait(?Send)]
impl<T: Speaker + ?Sized> Speaker for Box<T> {
    async fn speak(&self, text: &str) -> Result<()> {
        (**self).speak(text).await
    }
}

/// `OpenAI` TTS played through the local speaker
pub struct SpeechOutput {
    tts: TextToSpeech,
    playback: AudioPlayback,
}

impl SpeechOutput {
    #[must_use]
    pub const fn new(tts: TextToSpeech, playback: AudioPlayback) -> Self {
        Self { tts, playback }
    }
}

#[async_trait(?Send)]
impl Speaker for SpeechOutput {
    async fn speak(&self, text: &str) -> Result<()> {
        let audio = self.tts.synthesize(text).await?;
        tracing::debug!(bytes = audio.len(), "playing reply");
        self.playback.play_mp3(&audio)
    }
}
