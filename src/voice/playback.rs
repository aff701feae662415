//! Speaker output

/// Sample rate for playback (`OpenAI` TTS MP3 output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

#[cfg(feature = "audio")]
pub use device::AudioPlayback;

#[cfg(not(feature = "audio"))]
pub use disabled::AudioPlayback;

#[cfg(feature = "audio")]
mod device {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{SampleRate, StreamConfig};

    use super::{PLAYBACK_SAMPLE_RATE, decode_mp3};
    use crate::{Error, Result};

    /// Plays audio to the default output device
    pub struct AudioPlayback {
        config: StreamConfig,
    }

    impl AudioPlayback {
        /// Probe the default output device
        ///
        /// # Errors
        ///
        /// Returns error if no output device supports the playback rate
        pub fn new() -> Result<Self> {
            let host = cpal::default_host();

            let device = host
                .default_output_device()
                .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

            let supports_rate = |c: &cpal::SupportedStreamConfigRange| {
                c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            };

            let supported_config = device
                .supported_output_configs()
                .map_err(|e| Error::Audio(e.to_string()))?
                .find(|c| c.channels() == 1 && supports_rate(c))
                .or_else(|| {
                    // Fallback: try stereo
                    device
                        .supported_output_configs()
                        .ok()?
                        .find(|c| c.channels() == 2 && supports_rate(c))
                })
                .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

            let config = supported_config
                .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
                .config();

            tracing::debug!(
                device = device.name().unwrap_or_default(),
                sample_rate = PLAYBACK_SAMPLE_RATE,
                channels = config.channels,
                "audio playback initialized"
            );

            Ok(Self { config })
        }

        /// Play MP3 bytes, blocking until playback ends
        ///
        /// # Errors
        ///
        /// Returns error if decoding or playback fails
        pub fn play_mp3(&self, mp3_data: &[u8]) -> Result<()> {
            let samples = decode_mp3(mp3_data)?;
            self.play(samples)
        }

        /// Play mono f32 samples, blocking until playback ends
        ///
        /// # Errors
        ///
        /// Returns error if the output stream cannot be opened
        pub fn play(&self, samples: Vec<f32>) -> Result<()> {
            if samples.is_empty() {
                return Ok(());
            }

            let device = cpal::default_host()
                .default_output_device()
                .ok_or_else(|| Error::Audio("no output device".to_string()))?;

            let channels = usize::from(self.config.channels);
            let sample_count = samples.len();
            let samples = Arc::new(samples);
            let position = Arc::new(AtomicUsize::new(0));
            let finished = Arc::new(AtomicBool::new(false));

            let stream = {
                let samples = Arc::clone(&samples);
                let position = Arc::clone(&position);
                let finished = Arc::clone(&finished);

                device
                    .build_output_stream(
                        &self.config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            let mut pos = position.load(Ordering::Relaxed);
                            for frame in data.chunks_mut(channels) {
                                let sample = samples.get(pos).copied().unwrap_or(0.0);
                                frame.fill(sample);
                                if pos < samples.len() {
                                    pos += 1;
                                }
                            }
                            position.store(pos, Ordering::Relaxed);
                            if pos >= samples.len() {
                                finished.store(true, Ordering::Release);
                            }
                        },
                        |err| {
                            tracing::error!(error = %err, "audio playback error");
                        },
                        None,
                    )
                    .map_err(|e| Error::Audio(e.to_string()))?
            };

            stream.play().map_err(|e| Error::Audio(e.to_string()))?;

            let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
            let timeout = Duration::from_millis(duration_ms + 500);
            let start = Instant::now();

            while !finished.load(Ordering::Acquire) && start.elapsed() < timeout {
                std::thread::sleep(Duration::from_millis(50));
            }

            // Let the device drain its last buffer
            std::thread::sleep(Duration::from_millis(100));

            drop(stream);
            tracing::debug!(samples = sample_count, "playback complete");

            Ok(())
        }
    }
}

#[cfg(not(feature = "audio"))]
mod disabled {
    use crate::{Error, Result};

    /// Placeholder when built without the `audio` feature
    pub struct AudioPlayback;

    impl AudioPlayback {
        /// Always fails: no audio backend compiled in
        ///
        /// # Errors
        ///
        /// Always returns `Error::Audio`
        pub fn new() -> Result<Self> {
            Err(Error::Audio(
                "built without the `audio` feature, speaker output unavailable".to_string(),
            ))
        }

        /// Never reached; see [`AudioPlayback::new`]
        ///
        /// # Errors
        ///
        /// Always returns `Error::Audio`
        #[allow(clippy::unused_self)]
        pub fn play_mp3(&self, _mp3_data: &[u8]) -> Result<()> {
            Err(Error::Audio("speaker output unavailable".to_string()))
        }
    }
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error if the stream is not valid MP3
#[cfg(feature = "audio")]
pub fn decode_mp3(mp3_data: &[u8]) -> crate::Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(std::io::Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(crate::Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}
