//! RNNoise-based noise suppression.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nnnoiseless::DenoiseState;
use soundry_storage::AudioExtension;
use tracing::debug;

use crate::audio::{self, MonoAudio};
use crate::backend::ProcessingBackend;
use crate::error::{BackendError, BackendResult};
use crate::job::Job;

/// Samples per RNNoise frame (10 ms at 48 kHz).
pub const FRAME_SIZE: usize = 480;
/// The only sample rate RNNoise models are trained for.
pub const SAMPLE_RATE: u32 = 48_000;

/// RNNoise consumes samples in the 16-bit integer range.
pub(crate) const PCM_SCALE: f32 = 32_767.0;

/// Denoises 48 kHz input into a 32-bit float mono WAV.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenoiseBackend;

impl DenoiseBackend {
    /// Construct the backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessingBackend for DenoiseBackend {
    fn name(&self) -> &'static str {
        "denoise"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["rnnoise"]
    }

    fn output_extension(&self) -> Option<AudioExtension> {
        Some(AudioExtension::Wav)
    }

    async fn process(&self, input: &Path, output: &Path, job: &Job) -> BackendResult<PathBuf> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();
        let job = job.clone();
        tokio::task::spawn_blocking(move || {
            let audio = audio::decode_mono(&input)?;
            if audio.sample_rate != SAMPLE_RATE {
                return Err(BackendError::UnsupportedSampleRate {
                    required: SAMPLE_RATE,
                    actual: audio.sample_rate,
                });
            }
            job.ensure_active()?;
            let denoised = denoise(&audio)?;
            audio::publish_wav_mono(&output, &denoised, SAMPLE_RATE, &job)?;
            debug!(
                output = %output.display(),
                frames = denoised.len() / FRAME_SIZE,
                "denoised audio written"
            );
            Ok(output)
        })
        .await
        .map_err(|source| BackendError::Join { source })?
    }
}

/// Run every frame of `audio` through RNNoise.
///
/// The final partial frame is zero-padded, so the result length is a
/// multiple of [`FRAME_SIZE`].
///
/// # Errors
///
/// Returns [`BackendError::Frame`] when a frame yields non-finite samples.
pub fn denoise(audio: &MonoAudio) -> BackendResult<Vec<f32>> {
    let mut state = DenoiseState::new();
    let frame_count = audio.samples.len().div_ceil(FRAME_SIZE);
    let mut denoised = Vec::with_capacity(frame_count * FRAME_SIZE);
    let mut input = [0.0f32; FRAME_SIZE];
    let mut output = [0.0f32; FRAME_SIZE];

    for (index, chunk) in audio.samples.chunks(FRAME_SIZE).enumerate() {
        input.fill(0.0);
        for (slot, sample) in input.iter_mut().zip(chunk) {
            *slot = sample * PCM_SCALE;
        }
        state.process_frame(&mut output, &input);
        if output.iter().any(|sample| !sample.is_finite()) {
            return Err(BackendError::Frame { index });
        }
        denoised.extend(output.iter().map(|sample| sample / PCM_SCALE));
    }
    Ok(denoised)
}
