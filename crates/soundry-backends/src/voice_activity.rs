//! Voice-activity filtering: keeps only frames RNNoise scores as speech.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nnnoiseless::DenoiseState;
use soundry_storage::AudioExtension;
use tracing::debug;

use crate::audio::{self, MonoAudio};
use crate::backend::ProcessingBackend;
use crate::denoise::{FRAME_SIZE, PCM_SCALE, SAMPLE_RATE};
use crate::error::{BackendError, BackendResult};
use crate::job::Job;

/// Drops non-speech frames and writes the remainder as 48 kHz mono WAV.
#[derive(Debug, Clone, Copy)]
pub struct VoiceActivityBackend {
    threshold: f32,
}

impl VoiceActivityBackend {
    /// Backend keeping frames whose speech probability exceeds `threshold`.
    #[must_use]
    pub const fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Threshold in effect.
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }
}

#[async_trait]
impl ProcessingBackend for VoiceActivityBackend {
    fn name(&self) -> &'static str {
        "voice-activity"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["silero"]
    }

    fn output_extension(&self) -> Option<AudioExtension> {
        Some(AudioExtension::Wav)
    }

    async fn process(&self, input: &Path, output: &Path, job: &Job) -> BackendResult<PathBuf> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();
        let threshold = self.threshold;
        let job = job.clone();
        tokio::task::spawn_blocking(move || {
            let audio = audio::resample(audio::decode_mono(&input)?, SAMPLE_RATE)?;
            job.ensure_active()?;
            let scores = speech_scores(&audio);
            job.ensure_active()?;
            write_voiced(&output, &audio, &scores, threshold, &job)?;
            Ok(output)
        })
        .await
        .map_err(|source| BackendError::Join { source })?
    }
}

/// RNNoise speech probability for each [`FRAME_SIZE`] frame of 48 kHz audio.
/// The final partial frame is scored zero-padded.
#[must_use]
pub fn speech_scores(audio: &MonoAudio) -> Vec<f32> {
    let mut state = DenoiseState::new();
    let mut input = [0.0f32; FRAME_SIZE];
    let mut scratch = [0.0f32; FRAME_SIZE];

    audio
        .samples
        .chunks(FRAME_SIZE)
        .map(|chunk| {
            input.fill(0.0);
            for (slot, sample) in input.iter_mut().zip(chunk) {
                *slot = sample * PCM_SCALE;
            }
            state.process_frame(&mut scratch, &input)
        })
        .collect()
}

/// Concatenate, in order, the frames whose score exceeds `threshold`.
///
/// # Errors
///
/// Returns [`BackendError::NoSpeech`] when no frame qualifies.
pub fn select_frames(samples: &[f32], scores: &[f32], threshold: f32) -> BackendResult<Vec<f32>> {
    let voiced: Vec<f32> = samples
        .chunks(FRAME_SIZE)
        .zip(scores)
        .filter(|&(_, &score)| score > threshold)
        .flat_map(|(chunk, _)| chunk.iter().copied())
        .collect();

    if voiced.is_empty() {
        return Err(BackendError::NoSpeech { threshold });
    }
    Ok(voiced)
}

/// Keep the voiced frames of 48 kHz `audio` and publish them to `output`.
fn write_voiced(
    output: &Path,
    audio: &MonoAudio,
    scores: &[f32],
    threshold: f32,
    job: &Job,
) -> BackendResult<()> {
    let voiced = select_frames(&audio.samples, scores, threshold)?;
    audio::publish_wav_mono(output, &voiced, SAMPLE_RATE, job)?;
    debug!(
        output = %output.display(),
        kept = voiced.len(),
        total = audio.samples.len(),
        "voiced audio written"
    );
    Ok(())
}
