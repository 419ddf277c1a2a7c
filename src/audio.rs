//! Audio asset store
//!
//! Samples live on disk as `<sound_dir>/<group>/<name>.wav`. The view never
//! plays audio itself: it asks an [`AudioPlayer`] for a playback request and
//! the browser fetches the bytes from the server's `/audio` endpoint.
//!
//! Decoding goes through symphonia, which is also what the spectrum
//! extraction in [`crate::pipeline::spectral`] uses.

use serde::Serialize;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AudioError;

const AUDIO_EXTENSION: &str = "wav";
const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Composite key addressing one audio asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AudioKey {
    pub group: String,
    pub name: String,
}

impl AudioKey {
    pub fn new(group: &str, name: &str) -> Self {
        Self { group: group.to_string(), name: name.to_string() }
    }

    /// Reject anything that could escape the sound directory.
    fn validate(&self) -> Result<(), AudioError> {
        for part in [&self.group, &self.name] {
            if part.is_empty()
                || part == "."
                || part == ".."
                || part.contains('/')
                || part.contains('\\')
                || part.contains('\0')
            {
                return Err(AudioError::InvalidKey(format!("{}/{}", self.group, self.name)));
            }
        }
        Ok(())
    }
}

/// What the client needs to start playback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

/// Anything that can start playback of a sample.
pub trait AudioPlayer {
    fn play(&self, key: &AudioKey) -> Result<PlaybackRequest, AudioError>;
}

/// Filesystem-backed asset store.
#[derive(Debug, Clone)]
pub struct AudioStore {
    root: PathBuf,
}

impl AudioStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &AudioKey) -> Result<PathBuf, AudioError> {
        key.validate()?;
        Ok(self
            .root
            .join(&key.group)
            .join(format!("{}.{}", key.name, AUDIO_EXTENSION)))
    }

    /// Raw file bytes, as served to the browser.
    pub fn read(&self, key: &AudioKey) -> Result<Vec<u8>, AudioError> {
        let path = self.path_for(key)?;
        if !path.is_file() {
            return Err(AudioError::Missing(path));
        }
        std::fs::read(&path).map_err(|source| AudioError::Unreadable { path, source })
    }

    /// Server route for `key`.
    pub fn url_for(key: &AudioKey) -> Result<String, AudioError> {
        let query = serde_urlencoded::to_string([("group", &key.group), ("name", &key.name)])
            .map_err(|e| AudioError::InvalidKey(e.to_string()))?;
        Ok(format!("/audio?{}", query))
    }
}

impl AudioPlayer for AudioStore {
    fn play(&self, key: &AudioKey) -> Result<PlaybackRequest, AudioError> {
        let data = self.read(key)?;
        let duration_secs = probe(&data).map_err(|reason| AudioError::Unplayable {
            path: self.path_for(key).unwrap_or_default(),
            reason,
        })?;
        Ok(PlaybackRequest {
            url: Self::url_for(key)?,
            duration_secs,
        })
    }
}

/// Check that `data` holds decodable audio. Returns the duration when the
/// container reports a frame count.
pub fn probe(data: &[u8]) -> Result<Option<f64>, String> {
    let cursor = std::io::Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(&Hint::new(), mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| e.to_string())?;

    let mut format = probed.format;
    let track = format.default_track().ok_or("no audio track")?;
    let track_id = track.id;
    let duration = match (track.codec_params.n_frames, track.codec_params.sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => Some(frames as f64 / rate as f64),
        _ => None,
    };

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| e.to_string())?;

    // One decoded packet is enough to know the stream is playable
    loop {
        let packet = format.next_packet().map_err(|e| e.to_string())?;
        if packet.track_id() != track_id {
            continue;
        }
        decoder.decode(&packet).map_err(|e| e.to_string())?;
        return Ok(duration);
    }
}

/// Decode audio to mono PCM samples using symphonia (supports WAV, MP3, FLAC, OGG, etc.)
pub fn decode_mono(data: &[u8], max_secs: Option<f64>) -> Option<(Vec<f64>, u32)> {
    let cursor = std::io::Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(&Hint::new(), mss, &FormatOptions::default(), &MetadataOptions::default())
        .ok()?;

    let mut format = probed.format;
    let track = format.default_track()?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .ok()?;

    let max_samples = max_secs.map(|s| (s * sample_rate as f64) as usize);
    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(_) => break,
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(_) => continue,
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(duration, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            let channel_count = decoded.spec().channels.count();
            buf.copy_interleaved_ref(decoded);

            for chunk in buf.samples().chunks(channel_count) {
                let mono: f64 = chunk.iter().map(|&s| s as f64).sum::<f64>() / channel_count as f64;
                samples.push(mono);
            }

            if max_samples.is_some_and(|max| samples.len() >= max) {
                break;
            }
        }
    }

    if samples.is_empty() {
        return None;
    }

    Some((samples, sample_rate))
}

#[cfg(test)]
pub(crate) mod test_wav {
    use std::path::Path;

    /// Minimal 16-bit mono PCM WAV.
    pub fn encode(samples: &[f64], sample_rate: u32) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f64) as i16;
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    pub fn sine(freq: f64, sample_rate: u32, secs: f64) -> Vec<f64> {
        let n = (sample_rate as f64 * secs) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate as f64).sin())
            .collect()
    }

    pub fn write(path: &Path, samples: &[f64], sample_rate: u32) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, encode(samples, sample_rate)).unwrap();
    }
}
