//! Audio feature extraction
//!
//! Decodes the first 30 seconds of any format symphonia understands, mixes
//! down to mono and computes the spectral/temporal statistics the local
//! heuristic model scores:
//!
//! | key | meaning |
//! |-----|---------|
//! | `mfcc_mean`, `mfcc_var` | 13 MFCCs per frame (mel dB + DCT-II) |
//! | `spectral_centroid_mean`, `spectral_centroid_var` | brightness, Hz |
//! | `spectral_rolloff_mean` | 85% magnitude rolloff, Hz |
//! | `zcr_mean` | zero crossings per sample |
//! | `chroma_mean`, `chroma_var` | 12 pitch classes, max-normalised per frame |
//! | `silence_ratio` | share of samples with \|x\| < 1e-4 |

use std::f64::consts::PI;
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::detection::features::{ExtractError, FeatureMap};

/// Only the start of long recordings is analysed
const MAX_SECONDS: usize = 30;

const FRAME_SIZE: usize = 2048;
const HOP_SIZE: usize = 512;

/// Frames analysed at most; the hop widens for long inputs
const MAX_FRAMES: usize = 400;

const N_MELS: usize = 128;
const N_MFCC: usize = 13;
const ROLLOFF_PERCENT: f64 = 0.85;
const SILENCE_LEVEL: f32 = 1e-4;
const TOP_DB: f64 = 80.0;

/// Lowest frequency mapped onto a pitch class (≈ A0)
const CHROMA_MIN_HZ: f64 = 27.5;

// ============================================================================
// DECODING
// ============================================================================

/// Decode `path` and compute its feature map
pub fn extract(path: &Path) -> Result<FeatureMap, ExtractError> {
    if !path.is_file() {
        return Err(ExtractError::FileNotFound);
    }

    let (samples, sample_rate) = decode_mono(path)?;
    if samples.is_empty() {
        return Err(ExtractError::Decode("No audio samples decoded".to_string()));
    }

    tracing::debug!(
        file = %path.display(),
        samples = samples.len(),
        sample_rate,
        "Decoded audio for feature extraction"
    );

    Ok(compute_features(&samples, sample_rate))
}

fn decode_mono(path: &Path) -> Result<(Vec<f32>, u32), ExtractError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ExtractError::Decode(format!("Unsupported audio format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ExtractError::Decode("No audio track found".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| ExtractError::Decode("Unknown sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| ExtractError::Decode(format!("Unsupported codec: {}", e)))?;

    let max_samples = sample_rate as usize * MAX_SECONDS;
    let mut mono = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(ExtractError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // corrupt packet, keep going
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(ExtractError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);

        mono.extend(
            buffer
                .samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );

        if mono.len() >= max_samples {
            mono.truncate(max_samples);
            break;
        }
    }

    Ok((mono, sample_rate))
}

// ============================================================================
// FEATURES
// ============================================================================

/// Feature map for mono samples at `sample_rate`
pub fn compute_features(samples: &[f32], sample_rate: u32) -> FeatureMap {
    let sr = f64::from(sample_rate);
    let frames = frame_signal(samples);
    let window = hann(FRAME_SIZE);
    let mel_bank = mel_filterbank(sr);
    let bin_hz = sr / FRAME_SIZE as f64;

    let mut centroids = Vec::with_capacity(frames.len());
    let mut rolloffs = Vec::with_capacity(frames.len());
    let mut zcrs = Vec::with_capacity(frames.len());
    let mut mel_db = Vec::with_capacity(frames.len());
    let mut chroma = Vec::with_capacity(frames.len());

    for frame in &frames {
        zcrs.push(zero_crossing_rate(frame));

        let magnitude = magnitude_spectrum(frame, &window);
        centroids.push(spectral_centroid(&magnitude, bin_hz));
        rolloffs.push(spectral_rolloff(&magnitude, bin_hz));

        let power: Vec<f64> = magnitude.iter().map(|m| m * m).collect();
        mel_db.push(
            mel_bank
                .iter()
                .map(|filter| filter.iter().map(|&(bin, w)| power[bin] * w).sum::<f64>())
                .map(|energy| 10.0 * energy.max(1e-10).log10())
                .collect::<Vec<f64>>(),
        );
        chroma.push(chroma_frame(&power, bin_hz));
    }

    // power_to_db(top_db=80) over the whole spectrogram
    let db_max = mel_db.iter().flatten().cloned().fold(f64::MIN, f64::max);
    let floor = db_max - TOP_DB;
    let mfccs: Vec<Vec<f64>> = mel_db
        .iter()
        .map(|frame| {
            let clipped: Vec<f64> = frame.iter().map(|v| v.max(floor)).collect();
            dct_ortho(&clipped, N_MFCC)
        })
        .collect();

    let silent = samples.iter().filter(|s| s.abs() < SILENCE_LEVEL).count();

    FeatureMap::new()
        .with_scalar("duration", samples.len() as f64 / sr)
        .with_scalar("sample_rate", sr)
        .with_series("mfcc_mean", column_means(&mfccs, N_MFCC))
        .with_series("mfcc_var", column_vars(&mfccs, N_MFCC))
        .with_scalar("spectral_centroid_mean", mean(&centroids))
        .with_scalar("spectral_centroid_var", variance(&centroids))
        .with_scalar("spectral_rolloff_mean", mean(&rolloffs))
        .with_scalar("zcr_mean", mean(&zcrs))
        .with_series("chroma_mean", column_means(&chroma, 12))
        .with_series("chroma_var", column_vars(&chroma, 12))
        .with_scalar("silence_ratio", silent as f64 / samples.len() as f64)
}

/// Fixed-size frames; short inputs become one zero-padded frame
fn frame_signal(samples: &[f32]) -> Vec<Vec<f64>> {
    if samples.len() <= FRAME_SIZE {
        let mut frame: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();
        frame.resize(FRAME_SIZE, 0.0);
        return vec![frame];
    }

    let span = samples.len() - FRAME_SIZE;
    let hop = HOP_SIZE.max(span / MAX_FRAMES + 1);

    (0..=span)
        .step_by(hop)
        .map(|start| {
            samples[start..start + FRAME_SIZE]
                .iter()
                .map(|&s| f64::from(s))
                .collect()
        })
        .collect()
}

fn hann(size: usize) -> Vec<f64> {
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / size as f64).cos())
        .collect()
}

fn zero_crossing_rate(frame: &[f64]) -> f64 {
    let crossings = frame
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f64 / frame.len() as f64
}

fn magnitude_spectrum(frame: &[f64], window: &[f64]) -> Vec<f64> {
    let mut re: Vec<f64> = frame.iter().zip(window).map(|(x, w)| x * w).collect();
    let mut im = vec![0.0; re.len()];
    fft(&mut re, &mut im);

    (0..=FRAME_SIZE / 2)
        .map(|k| (re[k] * re[k] + im[k] * im[k]).sqrt())
        .collect()
}

fn spectral_centroid(magnitude: &[f64], bin_hz: f64) -> f64 {
    let total: f64 = magnitude.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    magnitude
        .iter()
        .enumerate()
        .map(|(k, m)| k as f64 * bin_hz * m)
        .sum::<f64>()
        / total
}

fn spectral_rolloff(magnitude: &[f64], bin_hz: f64) -> f64 {
    let total: f64 = magnitude.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let target = ROLLOFF_PERCENT * total;
    let mut cumulative = 0.0;
    for (k, m) in magnitude.iter().enumerate() {
        cumulative += m;
        if cumulative >= target {
            return k as f64 * bin_hz;
        }
    }
    (magnitude.len() - 1) as f64 * bin_hz
}

/// 12-bin pitch-class profile of one power spectrum, normalised by its max
fn chroma_frame(power: &[f64], bin_hz: f64) -> Vec<f64> {
    let mut classes = vec![0.0; 12];
    for (k, p) in power.iter().enumerate().skip(1) {
        let freq = k as f64 * bin_hz;
        if freq < CHROMA_MIN_HZ {
            continue;
        }
        // A = 9 with C = 0
        let semitone = (12.0 * (freq / 440.0).log2()).round() as i64 + 9;
        classes[semitone.rem_euclid(12) as usize] += p;
    }

    let max = classes.iter().cloned().fold(0.0, f64::max);
    if max > 0.0 {
        classes.iter_mut().for_each(|c| *c /= max);
    }
    classes
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filters as sparse (bin, weight) lists
fn mel_filterbank(sr: f64) -> Vec<Vec<(usize, f64)>> {
    let n_bins = FRAME_SIZE / 2 + 1;
    let bin_hz = sr / FRAME_SIZE as f64;
    let mel_max = hz_to_mel(sr / 2.0);
    let edges: Vec<f64> = (0..N_MELS + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (N_MELS + 1) as f64))
        .collect();

    (0..N_MELS)
        .map(|m| {
            let (lo, center, hi) = (edges[m], edges[m + 1], edges[m + 2]);
            (0..n_bins)
                .filter_map(|k| {
                    let f = k as f64 * bin_hz;
                    let w = if f > lo && f <= center {
                        (f - lo) / (center - lo)
                    } else if f > center && f < hi {
                        (hi - f) / (hi - center)
                    } else {
                        0.0
                    };
                    (w > 0.0).then_some((k, w))
                })
                .collect()
        })
        .collect()
}

/// First `n_out` coefficients of an orthonormal DCT-II
fn dct_ortho(input: &[f64], n_out: usize) -> Vec<f64> {
    let n = input.len() as f64;
    (0..n_out)
        .map(|k| {
            let sum: f64 = input
                .iter()
                .enumerate()
                .map(|(i, x)| x * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                .sum();
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            sum * scale
        })
        .collect()
}

/// In-place iterative radix-2 FFT; length must be a power of two
fn fft(re: &mut [f64], im: &mut [f64]) {
    let n = re.len();
    debug_assert!(n.is_power_of_two());

    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }

    let mut len = 2;
    while len <= n {
        let angle = -2.0 * PI / len as f64;
        let (w_re, w_im) = (angle.cos(), angle.sin());
        for start in (0..n).step_by(len) {
            let (mut cur_re, mut cur_im) = (1.0, 0.0);
            for k in 0..len / 2 {
                let a = start + k;
                let b = a + len / 2;
                let t_re = re[b] * cur_re - im[b] * cur_im;
                let t_im = re[b] * cur_im + im[b] * cur_re;
                re[b] = re[a] - t_re;
                im[b] = im[a] - t_im;
                re[a] += t_re;
                im[a] += t_im;
                let next_re = cur_re * w_re - cur_im * w_im;
                cur_im = cur_re * w_im + cur_im * w_re;
                cur_re = next_re;
            }
        }
        len <<= 1;
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance
fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

fn column(rows: &[Vec<f64>], index: usize) -> Vec<f64> {
    rows.iter().map(|row| row[index]).collect()
}

fn column_means(rows: &[Vec<f64>], width: usize) -> Vec<f64> {
    (0..width).map(|i| mean(&column(rows, i))).collect()
}

fn column_vars(rows: &[Vec<f64>], width: usize) -> Vec<f64> {
    (0..width).map(|i| variance(&column(rows, i))).collect()
}
