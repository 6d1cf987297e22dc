use std::fs::File;
use std::path::Path;

use rubato::{FftFixedIn, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info};

use crate::audio::frame::SAMPLE_RATE;
use crate::error::{PipelineError, Result};

const RESAMPLER_CHUNK_SIZE: usize = 1024;

/// Convert an audio file of arbitrary container/codec/rate/layout into
/// canonical PCM (16kHz, mono, i16).
///
/// A WAV file already in canonical format is read verbatim: no resampler in
/// the path, bit-identical samples, no padding. Everything else goes through
/// symphonia decode, channel downmix and FFT resampling.
pub fn normalize(path: &Path) -> Result<Vec<i16>> {
    info!("Normalizing audio file: {}", path.display());

    if let Some(samples) = try_canonical_wav(path) {
        debug!("Canonical WAV fast path: {} samples", samples.len());
        return Ok(samples);
    }

    let (pcm, src_rate, src_channels) = decode_file(path)?;
    debug!(
        "Decoded {} interleaved samples ({} Hz, {} channels)",
        pcm.len(),
        src_rate,
        src_channels
    );

    let mono = downmix_to_mono(&pcm, src_channels);

    let resampled = if src_rate == SAMPLE_RATE {
        mono
    } else {
        resample(&mono, src_rate, SAMPLE_RATE)
            .map_err(|reason| PipelineError::decode(path, reason))?
    };

    let samples = quantize(&resampled);
    info!(
        "Normalized {}: {:.1}s of canonical audio",
        path.display(),
        samples.len() as f64 / SAMPLE_RATE as f64
    );
    Ok(samples)
}

/// Read the file with hound if it is already 16kHz/mono/16-bit WAV.
fn try_canonical_wav(path: &Path) -> Option<Vec<i16>> {
    let reader = hound::WavReader::open(path).ok()?;
    let spec = reader.spec();
    if spec.sample_rate != SAMPLE_RATE
        || spec.channels != 1
        || spec.bits_per_sample != 16
        || spec.sample_format != hound::SampleFormat::Int
    {
        return None;
    }
    reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .ok()
}

/// Decode any supported container/codec to interleaved f32 samples.
fn decode_file(path: &Path) -> Result<(Vec<f32>, u32, usize)> {
    let file =
        File::open(path).map_err(|e| PipelineError::decode(path, e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PipelineError::decode(path, format!("unsupported format: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::decode(path, "no decodable audio track"))?;
    let track_id = track.id;

    let src_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| PipelineError::decode(path, "unknown sample rate"))?;
    let src_channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1)
        .max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PipelineError::decode(path, format!("unsupported codec: {e}")))?;

    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut pcm = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(PipelineError::decode(path, e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if sample_buf.is_none() {
                    let spec = *decoded.spec();
                    sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                let buf = sample_buf.as_mut().unwrap();
                buf.copy_interleaved_ref(decoded);
                pcm.extend_from_slice(buf.samples());
            }
            // A corrupt packet is skippable; anything else is fatal.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(PipelineError::decode(path, e.to_string())),
        }
    }

    Ok((pcm, src_rate, src_channels))
}

/// Average interleaved channels down to mono.
fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let frames = samples.len() / channels;
    let mut mono = Vec::with_capacity(frames);
    for frame in 0..frames {
        let sum: f32 = samples[frame * channels..(frame + 1) * channels].iter().sum();
        mono.push(sum / channels as f32);
    }
    mono
}

/// FFT resample mono f32 samples from `in_rate` to `out_rate`.
///
/// The final partial chunk is zero-padded through the resampler and the
/// output trimmed back to the true audio length.
fn resample(
    samples: &[f32],
    in_rate: u32,
    out_rate: u32,
) -> std::result::Result<Vec<f32>, String> {
    let mut resampler = FftFixedIn::<f32>::new(
        in_rate as usize,
        out_rate as usize,
        RESAMPLER_CHUNK_SIZE,
        1,
        1,
    )
    .map_err(|e| format!("failed to create resampler: {e}"))?;

    let expected_len =
        (samples.len() as u64 * out_rate as u64 / in_rate as u64) as usize;
    let mut output = Vec::with_capacity(expected_len + RESAMPLER_CHUNK_SIZE);
    let mut pos = 0;

    while pos + RESAMPLER_CHUNK_SIZE <= samples.len() {
        let chunk = &samples[pos..pos + RESAMPLER_CHUNK_SIZE];
        let out = resampler
            .process(&[chunk], None)
            .map_err(|e| format!("resampler failed: {e}"))?;
        output.extend_from_slice(&out[0]);
        pos += RESAMPLER_CHUNK_SIZE;
    }

    if pos < samples.len() {
        let mut last = vec![0.0f32; RESAMPLER_CHUNK_SIZE];
        last[..samples.len() - pos].copy_from_slice(&samples[pos..]);
        let out = resampler
            .process(&[&last], None)
            .map_err(|e| format!("resampler failed: {e}"))?;
        output.extend_from_slice(&out[0]);
    }

    output.truncate(expected_len);
    Ok(output)
}

/// Requantize normalized f32 samples to i16 with saturation.
fn quantize(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}
