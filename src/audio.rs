//! Audio clip decoding.
//!
//! Accepts raw encoded audio bytes and produces 16kHz mono f32 samples in
//! [-1.0, 1.0], the format the speech backends expect. WAV input is parsed
//! directly with hound; anything else is converted through `ffmpeg` first.

use crate::defaults::SAMPLE_RATE;
use crate::error::{MictokError, Result};
use std::io::Cursor;
use std::process::{Command, Stdio};

/// A recorded audio clip as received from the caller.
///
/// Immutable once constructed; consumed by a single pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Raw encoded audio bytes (WAV, WebM, Ogg, MP3, ...).
    pub data: Vec<u8>,
    /// Declared container/mime type, e.g. "audio/wav".
    pub mime_type: String,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }
}

/// Guess a mime type from a file extension.
///
/// Used by the CLI; callers that know the real type should pass it directly.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "webm" => "audio/webm",
        "m4a" | "mp4" => "audio/mp4",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Decode a clip to 16kHz mono f32 samples.
///
/// Tries hound first; on parse failure falls back to converting the clip
/// with `ffmpeg` and re-parsing. A zero-duration clip decodes to an empty
/// buffer, not an error.
pub fn decode(clip: &AudioClip) -> Result<Vec<f32>> {
    match decode_wav(&clip.data) {
        Ok(samples) => Ok(samples),
        Err(wav_err) => {
            tracing::debug!(
                mime_type = %clip.mime_type,
                error = %wav_err,
                "not directly readable as WAV, converting with ffmpeg"
            );
            let converted =
                convert_with_ffmpeg(&clip.data).map_err(|e| MictokError::UnsupportedAudioFormat {
                    message: format!("{e} (direct WAV parse: {wav_err})"),
                })?;
            decode_wav(&converted).map_err(|e| MictokError::UnsupportedAudioFormat {
                message: format!("ffmpeg output unreadable: {e}"),
            })
        }
    }
}

/// Re-encode samples as a 16kHz mono 16-bit WAV file in memory.
///
/// Used by the remote backend, whose API takes an audio file upload.
pub fn encode_wav(samples: &[f32]) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut bytes = Vec::new();
    {
        let cursor = Cursor::new(&mut bytes);
        let mut writer = hound::WavWriter::new(cursor, spec)
            .map_err(|e| MictokError::Other(format!("Failed to create WAV writer: {e}")))?;

        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(v)
                .map_err(|e| MictokError::Other(format!("Failed to write WAV sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| MictokError::Other(format!("Failed to finalize WAV: {e}")))?;
    }
    Ok(bytes)
}

/// Parse WAV bytes into 16kHz mono f32 samples.
///
/// Handles integer and float sample formats, arbitrary channel counts, and
/// resamples to 16kHz when needed.
fn decode_wav(data: &[u8]) -> std::result::Result<Vec<f32>, String> {
    let mut reader = hound::WavReader::new(Cursor::new(data))
        .map_err(|e| format!("Failed to parse WAV file: {e}"))?;

    let spec = reader.spec();
    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| format!("Failed to read WAV samples: {e}"))?,
        hound::SampleFormat::Int => {
            // Normalize by the full scale of the declared bit depth.
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| format!("Failed to read WAV samples: {e}"))?
        }
    };

    let mono = mix_to_mono(&raw, spec.channels);
    if spec.sample_rate == SAMPLE_RATE {
        Ok(mono)
    } else {
        Ok(resample(&mono, spec.sample_rate, SAMPLE_RATE))
    }
}

/// Average interleaved channels down to mono.
fn mix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Simple linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let frac = pos - idx as f64;
            let a = samples.get(idx).copied().unwrap_or(0.0);
            let b = samples.get(idx + 1).copied().unwrap_or(a);
            (a as f64 * (1.0 - frac) + b as f64 * frac) as f32
        })
        .collect()
}

/// Convert arbitrary audio bytes to 16kHz mono WAV via the ffmpeg CLI.
fn convert_with_ffmpeg(data: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut child = Command::new("ffmpeg")
        .args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-i",
            "pipe:0",
            "-ac",
            "1",
            "-ar",
            "16000",
            "-f",
            "wav",
            "pipe:1",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("ffmpeg unavailable: {e}; install ffmpeg for non-WAV input"))?;

    // Feed stdin from a separate thread so a large clip cannot deadlock
    // against a full stdout pipe.
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| "ffmpeg stdin not captured".to_string())?;
    let input = data.to_vec();
    let writer = std::thread::spawn(move || {
        use std::io::Write;
        stdin.write_all(&input).ok();
    });

    let output = child
        .wait_with_output()
        .map_err(|e| format!("ffmpeg did not run to completion: {e}"))?;
    writer.join().ok();

    if !output.status.success() {
        return Err(format!(
            "ffmpeg conversion failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an in-memory 16-bit WAV with the given spec and samples.
    fn wav_bytes(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let cursor = Cursor::new(&mut bytes);
            let mut writer = hound::WavWriter::new(cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        bytes
    }

    #[test]
    fn test_decode_mono_16k_passthrough() {
        let samples = vec![0i16, 16384, -16384, 32767];
        let clip = AudioClip::new(wav_bytes(1, 16000, &samples), "audio/wav");

        let decoded = decode(&clip).unwrap();
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[0], 0.0);
        assert!((decoded[1] - 0.5).abs() < 0.01);
        assert!((decoded[2] + 0.5).abs() < 0.01);
        assert!((decoded[3] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_decode_stereo_mixes_to_mono() {
        // Left = 1000, right = 3000 → mono = 2000
        let samples = vec![1000i16, 3000, 1000, 3000];
        let clip = AudioClip::new(wav_bytes(2, 16000, &samples), "audio/wav");

        let decoded = decode(&clip).unwrap();
        assert_eq!(decoded.len(), 2);
        for s in decoded {
            assert!((s - 2000.0 / 32768.0).abs() < 0.001);
        }
    }

    #[test]
    fn test_decode_resamples_to_16k() {
        // 1 second at 48kHz → ~16000 samples after resampling
        let samples = vec![1000i16; 48000];
        let clip = AudioClip::new(wav_bytes(1, 48000, &samples), "audio/wav");

        let decoded = decode(&clip).unwrap();
        assert!((decoded.len() as i64 - 16000).abs() <= 1, "got {}", decoded.len());
    }

    #[test]
    fn test_decode_float_wav() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut bytes = Vec::new();
        {
            let cursor = Cursor::new(&mut bytes);
            let mut writer = hound::WavWriter::new(cursor, spec).unwrap();
            for s in [0.0f32, 0.5, -0.5] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }

        let clip = AudioClip::new(bytes, "audio/wav");
        let decoded = decode(&clip).unwrap();
        assert_eq!(decoded, vec![0.0, 0.5, -0.5]);
    }

    #[test]
    fn test_decode_empty_wav_is_empty_not_error() {
        let clip = AudioClip::new(wav_bytes(1, 16000, &[]), "audio/wav");
        let decoded = decode(&clip).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_decode_garbage_is_unsupported_format() {
        let clip = AudioClip::new(vec![0xde, 0xad, 0xbe, 0xef], "audio/webm");
        let result = decode(&clip);
        match result {
            Err(MictokError::UnsupportedAudioFormat { .. }) => {}
            other => panic!("Expected UnsupportedAudioFormat, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_encode_wav_round_trips() {
        let samples = vec![0.0f32, 0.25, -0.25, 0.99];
        let bytes = encode_wav(&samples).unwrap();

        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.len(), samples.len());
        for (a, b) in samples.iter().zip(decoded.iter()) {
            assert!((a - b).abs() < 0.001, "{a} vs {b}");
        }
    }

    #[test]
    fn test_encode_wav_clamps_out_of_range() {
        let bytes = encode_wav(&[2.0f32, -2.0]).unwrap();
        let decoded = decode_wav(&bytes).unwrap();
        assert!((decoded[0] - 1.0).abs() < 0.01);
        assert!((decoded[1] + 1.0).abs() < 0.01);
    }

    #[test]
    fn test_mix_to_mono_single_channel_passthrough() {
        let samples = vec![0.1f32, 0.2, 0.3];
        assert_eq!(mix_to_mono(&samples, 1), samples);
    }

    #[test]
    fn test_resample_identity() {
        let samples = vec![0.1f32, 0.2, 0.3];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn test_resample_downsample_halves_length() {
        let samples = vec![0.5f32; 32000];
        let out = resample(&samples, 32000, 16000);
        assert_eq!(out.len(), 16000);
        assert!(out.iter().all(|&s| (s - 0.5).abs() < 0.001));
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("wav"), "audio/wav");
        assert_eq!(mime_for_extension("WAV"), "audio/wav");
        assert_eq!(mime_for_extension("mp3"), "audio/mpeg");
        assert_eq!(mime_for_extension("webm"), "audio/webm");
        assert_eq!(mime_for_extension("xyz"), "application/octet-stream");
    }
}
