//! Shared decode, resample, and WAV encode helpers for in-process backends.
//!
//! Everything here is synchronous; callers run it on the blocking pool.

use std::fs::File;
use std::io;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::{BackendError, BackendResult};
use crate::job::Job;

/// Mono signal with its sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct MonoAudio {
    /// Samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Samples per second.
    pub sample_rate: u32,
}

/// Decode `path` and average all channels into one.
///
/// # Errors
///
/// Fails when the file cannot be opened, probed, or decoded, has no audio
/// track, or decodes to zero samples.
pub fn decode_mono(path: &Path) -> BackendResult<MonoAudio> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            BackendError::MissingInput {
                path: path.to_path_buf(),
            }
        } else {
            BackendError::io("open input", path, source)
        }
    })?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|source| BackendError::Decode { source })?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(BackendError::NoAudioTrack)?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|source| BackendError::Decode { source })?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(source) => return Err(BackendError::Decode { source }),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(reason)) => {
                debug!(reason, "skipping undecodable packet");
                continue;
            }
            Err(source) => return Err(BackendError::Decode { source }),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        let channels = spec.channels.count().max(1);
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        #[allow(clippy::cast_precision_loss)]
        let scale = 1.0 / channels as f32;
        samples.extend(
            buffer
                .samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() * scale),
        );
    }

    let sample_rate = sample_rate.ok_or(BackendError::NoAudioTrack)?;
    if samples.is_empty() {
        return Err(BackendError::EmptyAudio);
    }
    debug!(
        path = %path.display(),
        sample_rate,
        samples = samples.len(),
        "decoded input audio"
    );
    Ok(MonoAudio {
        samples,
        sample_rate,
    })
}

/// Resample `audio` to `target_rate`.
///
/// The resampler's delay line is flushed and its leading delay trimmed, so
/// the result is aligned with the input and holds
/// `len * target_rate / sample_rate` samples.
///
/// # Errors
///
/// Fails when the resampler cannot be built for the ratio or rejects the input.
pub fn resample(audio: MonoAudio, target_rate: u32) -> BackendResult<MonoAudio> {
    if audio.sample_rate == target_rate || audio.samples.is_empty() {
        return Ok(MonoAudio {
            samples: audio.samples,
            sample_rate: target_rate,
        });
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = f64::from(target_rate) / f64::from(audio.sample_rate);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    let expected = (audio.samples.len() as f64 * ratio).round() as usize;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, audio.samples.len(), 1)
        .map_err(|source| BackendError::ResamplerSetup { source })?;
    let delay = resampler.output_delay();

    let input = vec![audio.samples];
    let mut samples = first_channel(
        resampler
            .process(&input, None)
            .map_err(|source| BackendError::Resample { source })?,
    );
    samples.extend(first_channel(
        resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|source| BackendError::Resample { source })?,
    ));

    let mut samples: Vec<f32> = samples.into_iter().skip(delay).take(expected).collect();
    samples.resize(expected, 0.0);
    Ok(MonoAudio {
        samples,
        sample_rate: target_rate,
    })
}

fn first_channel(channels: Vec<Vec<f32>>) -> Vec<f32> {
    channels.into_iter().next().unwrap_or_default()
}

/// Write `samples` as a 32-bit float mono WAV file.
///
/// # Errors
///
/// Fails when the file cannot be created or written.
pub fn write_wav_mono(path: &Path, samples: &[f32], sample_rate: u32) -> BackendResult<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer =
        WavWriter::create(path, spec).map_err(|source| BackendError::Encode { source })?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|source| BackendError::Encode { source })?;
    }
    writer
        .finalize()
        .map_err(|source| BackendError::Encode { source })
}

/// Encode `samples` next to `output` and move the file into place through
/// [`Job::commit`]. A cancelled job leaves nothing behind.
///
/// # Errors
///
/// Fails when staging or encoding fails, or with
/// [`BackendError::Cancelled`] when the job was abandoned.
pub fn publish_wav_mono(
    output: &Path,
    samples: &[f32],
    sample_rate: u32,
    job: &Job,
) -> BackendResult<()> {
    let dir = output.parent().unwrap_or_else(|| Path::new("."));
    let staged = tempfile::Builder::new()
        .prefix(".staged-")
        .suffix(".wav")
        .tempfile_in(dir)
        .map_err(|source| BackendError::io("stage output", dir, source))?;
    write_wav_mono(staged.path(), samples, sample_rate)?;
    job.commit(|| {
        staged
            .persist(output)
            .map(drop)
            .map_err(|err| BackendError::io("publish output", output, err.error))
    })
}
