//! Backend failures.
//!
//! Messages are returned to API clients inside problem documents, so they
//! describe the failure without exposing internal types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors raised while processing audio.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The input file does not exist.
    #[error("input file not found")]
    MissingInput {
        /// Expected input location.
        path: PathBuf,
    },
    /// Filesystem failure around a backend run.
    #[error("i/o failure during {operation}")]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The container or codec could not be decoded.
    #[error("failed to decode input audio: {source}")]
    Decode {
        /// Underlying decoder error.
        source: symphonia::core::errors::Error,
    },
    /// The container has no audio track with a supported codec.
    #[error("input contains no decodable audio track")]
    NoAudioTrack,
    /// Decoding succeeded but yielded no samples.
    #[error("input contains no audio samples")]
    EmptyAudio,
    /// The backend requires a specific sample rate.
    #[error("input must be sampled at {required} Hz, got {actual} Hz")]
    UnsupportedSampleRate {
        /// Rate the backend accepts.
        required: u32,
        /// Rate found in the input.
        actual: u32,
    },
    /// Frame-level processing produced unusable samples.
    #[error("denoising failed at frame {index}")]
    Frame {
        /// Zero-based frame index.
        index: usize,
    },
    /// The resampler rejected its configuration.
    #[error("failed to configure resampler: {source}")]
    ResamplerSetup {
        /// Underlying resampler error.
        source: rubato::ResamplerConstructionError,
    },
    /// Resampling failed.
    #[error("failed to resample audio: {source}")]
    Resample {
        /// Underlying resampler error.
        source: rubato::ResampleError,
    },
    /// Writing the output WAV failed.
    #[error("failed to write output audio: {source}")]
    Encode {
        /// Underlying encoder error.
        source: hound::Error,
    },
    /// The external tool could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The external tool exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    ProcessFailed {
        /// Program that failed.
        program: String,
        /// Exit status rendering.
        status: String,
        /// Tail of the tool's stderr.
        stderr: String,
    },
    /// The external tool finished without producing the expected stem.
    #[error("separation did not produce the '{stem}' stem")]
    MissingStem {
        /// Stem that was expected.
        stem: String,
        /// Location that was checked.
        path: PathBuf,
    },
    /// Voice-activity filtering kept no frames.
    #[error("no speech detected above threshold {threshold}")]
    NoSpeech {
        /// Threshold in effect.
        threshold: f32,
    },
    /// The blocking worker panicked or was cancelled.
    #[error("processing task did not complete")]
    Join {
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
    /// The caller abandoned the job before its output was published.
    #[error("processing was cancelled")]
    Cancelled,
    /// The backend's concurrency gate was closed.
    #[error("backend {backend} is shutting down")]
    Unavailable {
        /// Backend name.
        backend: &'static str,
    },
}

impl BackendError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rate_message_names_required_rate() {
        let err = BackendError::UnsupportedSampleRate {
            required: 48_000,
            actual: 44_100,
        };
        assert_eq!(
            err.to_string(),
            "input must be sampled at 48000 Hz, got 44100 Hz"
        );
    }

    #[test]
    fn process_failure_includes_stderr_tail() {
        let err = BackendError::ProcessFailed {
            program: "demucs".into(),
            status: "exit status: 1".into(),
            stderr: "model not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "demucs exited with exit status: 1: model not found"
        );
    }
}
