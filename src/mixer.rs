//! Track mixing: vocal over a mood-selected instrumental
//!
//! Gain staging, loop-to-length, fades, overlay and final normalization all
//! happen on interleaved f32 so nothing clips until the encoder sees it.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::audio::{db_to_gain, AudioClip, Result, Waveform};
use crate::codec::{decode_file, write_mp3};
use crate::protocol::Mood;
use crate::resample::resample;

/// Boost applied to the vocal before overlay
pub const VOCAL_GAIN_DB: f32 = 6.0;
/// Cut applied to the instrumental before overlay
pub const INSTRUMENTAL_GAIN_DB: f32 = -15.0;
/// Instrumental fade-in and fade-out length
pub const FADE_MS: u32 = 1000;
/// Headroom left below full scale after normalization
pub const HEADROOM_DB: f32 = 0.1;

/// Description of a written song
#[derive(Debug, Clone, PartialEq)]
pub struct MixReport {
    pub path: PathBuf,
    pub duration_secs: f32,
    pub frames: usize,
    /// Rate the mix was computed at
    pub sample_rate: u32,
    pub channels: u16,
    /// False when the vocal was exported alone
    pub instrumental_used: bool,
}

/// Bring a clip to the given rate and channel count
fn conform(clip: &AudioClip, sample_rate: u32, channels: u16) -> Result<AudioClip> {
    resample(clip, sample_rate)?.with_channels(channels)
}

/// Repeat `clip` until it covers `frames`, then cut to exactly `frames`
fn loop_to_length(clip: &AudioClip, frames: usize) -> AudioClip {
    let repeats = frames / clip.frames() + 1;
    let mut looped = AudioClip::new(
        clip.samples.repeat(repeats),
        clip.sample_rate,
        clip.channels,
    );
    looped.set_frames(frames);
    looped
}

/// Linear fade-in and fade-out over `fade_frames` frames each
fn apply_fades(clip: &mut AudioClip, fade_frames: usize) {
    let frames = clip.frames();
    let fade = fade_frames.min(frames);
    if fade == 0 {
        return;
    }
    let channels = clip.channels.max(1) as usize;
    for (i, frame) in clip.samples.chunks_exact_mut(channels).enumerate() {
        let mut gain = 1.0f32;
        if i < fade {
            gain *= i as f32 / fade as f32;
        }
        let from_end = frames - 1 - i;
        if from_end < fade {
            gain *= from_end as f32 / fade as f32;
        }
        if gain < 1.0 {
            for s in frame.iter_mut() {
                *s *= gain;
            }
        }
    }
}

/// Mix a vocal with an optional instrumental.
///
/// Without an instrumental (or with an empty one) the vocal is returned
/// untouched. Otherwise the result has the vocal's duration at the higher of
/// the two sample rates, and its peak sits [`HEADROOM_DB`] below full scale.
pub fn mix_tracks(vocal: &Waveform, instrumental: Option<&AudioClip>) -> Result<AudioClip> {
    let vocal_clip = vocal.to_clip();

    let instrumental = match instrumental {
        Some(clip) if !clip.is_empty() => clip,
        _ => return Ok(vocal_clip),
    };

    if vocal_clip.is_empty() {
        return Ok(vocal_clip);
    }

    let sample_rate = vocal_clip.sample_rate.max(instrumental.sample_rate);
    // Output is at most stereo; surround backings are folded down.
    let channels = vocal_clip.channels.max(instrumental.channels).min(2);
    debug!(
        sample_rate,
        channels,
        vocal_rate = vocal_clip.sample_rate,
        instrumental_rate = instrumental.sample_rate,
        "conforming tracks for overlay"
    );

    let mut vocal_track = conform(&vocal_clip, sample_rate, channels)?;
    vocal_track.apply_gain_db(VOCAL_GAIN_DB);
    let frames = vocal_track.frames();

    let instrumental = conform(instrumental, sample_rate, channels)?;
    if instrumental.frames() < frames {
        debug!(
            instrumental_frames = instrumental.frames(),
            vocal_frames = frames,
            "looping instrumental"
        );
    }
    let mut backing = loop_to_length(&instrumental, frames);
    backing.apply_gain_db(INSTRUMENTAL_GAIN_DB);

    let fade_frames = (sample_rate as u64 * FADE_MS as u64 / 1000) as usize;
    apply_fades(&mut backing, fade_frames);

    for (v, b) in vocal_track.samples.iter_mut().zip(&backing.samples) {
        *v += b;
    }
    vocal_track.normalize_peak(db_to_gain(-HEADROOM_DB));

    Ok(vocal_track)
}

/// Mood-aware mixer backed by a directory of instrumentals
#[derive(Debug, Clone)]
pub struct Mixer {
    assets_dir: PathBuf,
}

impl Mixer {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// `<assets_dir>/<mood>.mp3`
    pub fn instrumental_path(&self, mood: Mood) -> PathBuf {
        self.assets_dir.join(format!("{}.mp3", mood.as_str()))
    }

    /// Decode the instrumental for `mood`.
    ///
    /// A missing file, or one holding no audio, yields `None`.
    pub fn load_instrumental(&self, mood: Mood) -> Result<Option<AudioClip>> {
        let path = self.instrumental_path(mood);
        if !path.is_file() {
            warn!(path = %path.display(), %mood, "instrumental not found, exporting vocal only");
            return Ok(None);
        }

        let clip = decode_file(&path)?;
        if clip.is_empty() {
            warn!(path = %path.display(), %mood, "instrumental has no audio, exporting vocal only");
            return Ok(None);
        }

        debug!(
            path = %path.display(),
            duration_secs = format!("{:.1}", clip.duration_secs()),
            sample_rate = clip.sample_rate,
            channels = clip.channels,
            "loaded instrumental"
        );
        Ok(Some(clip))
    }

    /// Mix `vocal` with the instrumental for `mood` and write a 192 kbps MP3.
    #[instrument(skip(self, vocal), fields(vocal_secs = vocal.duration_secs()))]
    pub fn mix(&self, vocal: &Waveform, mood: Mood, out_path: &Path) -> Result<MixReport> {
        let instrumental = self.load_instrumental(mood)?;
        let mixed = mix_tracks(vocal, instrumental.as_ref())?;
        write_mp3(out_path, &mixed)?;

        let report = MixReport {
            path: out_path.to_path_buf(),
            duration_secs: mixed.duration_secs(),
            frames: mixed.frames(),
            sample_rate: mixed.sample_rate,
            // The encoder always writes two channels.
            channels: 2,
            instrumental_used: instrumental.is_some(),
        };
        info!(
            path = %report.path.display(),
            duration_secs = format!("{:.1}", report.duration_secs),
            instrumental_used = report.instrumental_used,
            "song exported"
        );
        Ok(report)
    }

    /// Read a vocal WAV written by the pipeline and mix it.
    pub fn mix_file(&self, vocal_wav: &Path, mood: Mood, out_path: &Path) -> Result<MixReport> {
        let vocal = Waveform::read_wav(vocal_wav)?;
        self.mix(&vocal, mood, out_path)
    }
}
