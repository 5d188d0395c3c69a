//! Compressed audio codecs
//!
//! Instrumentals are decoded with symphonia (MP3, WAV). Finished songs are
//! encoded with libmp3lame at 192 kbps, always as stereo.

use std::io::Write;
use std::path::Path;

use mp3lame_encoder::{Builder, FlushNoGap, InterleavedPcm, Quality};
use symphonia::core::audio::SampleBuffer as DecodedBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::audio::{AudioClip, AudioError, Result};
use crate::resample::resample;

/// Output bitrate for finished songs
pub const SONG_BITRATE_KBPS: u32 = 192;

/// Lowest rate at which MPEG-1 Layer III (and so 192 kbps) is available
const MIN_MPEG1_RATE: u32 = 32000;

/// Rate used when the input is below [`MIN_MPEG1_RATE`]
const ENCODE_FALLBACK_RATE: u32 = 44100;

/// Decode an audio file into interleaved f32 samples.
///
/// The file extension is used as a format hint; content is probed either way.
pub fn decode_file(path: impl AsRef<Path>) -> Result<AudioClip> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    decode_stream(mss, hint)
}

fn decode_stream(mss: MediaSourceStream, hint: Hint) -> Result<AudioClip> {
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Decode(format!("failed to probe audio format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| AudioError::Decode("no audio tracks found".to_string()))?;

    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("failed to create decoder: {e}")))?;

    let track_id = track.id;
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!(error = msg, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channels.get_or_insert(spec.channels.count() as u16);

        let mut buf = DecodedBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    let sample_rate =
        sample_rate.ok_or_else(|| AudioError::Decode("unknown sample rate".to_string()))?;
    let channels = channels.unwrap_or(1).max(1);

    Ok(AudioClip::new(samples, sample_rate, channels))
}

/// Encode a clip to an MP3 file at 192 kbps.
pub fn write_mp3(path: impl AsRef<Path>, clip: &AudioClip) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_mp3_to(file, clip)
}

/// Encode a clip to MP3 into any writer.
///
/// Mono clips are duplicated to both channels. Clips below 32 kHz are
/// resampled to 44.1 kHz first since MPEG-2 rates top out at 160 kbps.
pub fn write_mp3_to<W: Write>(mut writer: W, clip: &AudioClip) -> Result<()> {
    let clip = if clip.sample_rate < MIN_MPEG1_RATE {
        debug!(
            from = clip.sample_rate,
            to = ENCODE_FALLBACK_RATE,
            "resampling for 192 kbps encode"
        );
        resample(clip, ENCODE_FALLBACK_RATE)?
    } else {
        clip.clone()
    };
    let stereo = match clip.channels {
        2 => clip,
        1 => clip.with_channels(2)?,
        n => {
            return Err(AudioError::Unsupported(format!(
                "MP3 output supports mono or stereo input, got {n} channels"
            )))
        }
    };

    let mut encoder = Builder::new()
        .ok_or_else(|| AudioError::Encode("failed to create LAME encoder".into()))?
        .with_num_channels(2)
        .map_err(|e| AudioError::Encode(format!("LAME set_num_channels failed: {e:?}")))?
        .with_sample_rate(stereo.sample_rate)
        .map_err(|e| AudioError::Encode(format!("LAME set_sample_rate failed: {e:?}")))?
        .with_brate(mp3lame_encoder::Bitrate::Kbps192)
        .map_err(|e| AudioError::Encode(format!("LAME set_brate failed: {e:?}")))?
        .with_quality(Quality::Best)
        .map_err(|e| AudioError::Encode(format!("LAME set_quality failed: {e:?}")))?
        .build()
        .map_err(|e| AudioError::Encode(format!("LAME build failed: {e:?}")))?;

    let mut buf = Vec::new();
    buf.reserve(mp3lame_encoder::max_required_buffer_size(stereo.frames()));

    let encoded_size = encoder
        .encode(InterleavedPcm(&stereo.samples), buf.spare_capacity_mut())
        .map_err(|e| AudioError::Encode(format!("LAME encode failed: {e:?}")))?;
    // SAFETY: encode initialized exactly `encoded_size` bytes of spare capacity.
    unsafe { buf.set_len(encoded_size) };

    let flush_size = encoder
        .flush::<FlushNoGap>(buf.spare_capacity_mut())
        .map_err(|e| AudioError::Encode(format!("LAME flush failed: {e:?}")))?;
    // SAFETY: flush initialized exactly `flush_size` bytes of spare capacity.
    unsafe { buf.set_len(buf.len() + flush_size) };

    writer.write_all(&buf)?;
    Ok(())
}
