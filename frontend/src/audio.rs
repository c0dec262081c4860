use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use irobot_core::device::quad_pokey::AudioSink;
use log::warn;
use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};

/// Number of samples over which to fade in/out (~5.7 ms at 44.7 kHz).
const FADE_SAMPLES: u32 = 256;

/// Scale of one unsigned 8-bit voice in the 16-bit mix. Four voices at full
/// swing stay inside `i16`.
const VOICE_GAIN: i32 = 63;

pub(crate) struct AudioPlayer {
    buffer: AudioRing,
    fade_in_pos: u32,
    fading_out: FadeOut,
    fade_out_pos: u32,
}

impl AudioCallback for AudioPlayer {
    type Channel = i16;
    fn callback(&mut self, out: &mut [i16]) {
        let mut buf = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        for sample in out.iter_mut() {
            let raw = buf.pop_front().unwrap_or(0);

            if self.fade_in_pos < FADE_SAMPLES {
                let gain = self.fade_in_pos as f32 / FADE_SAMPLES as f32;
                *sample = (raw as f32 * gain) as i16;
                self.fade_in_pos += 1;
            } else if self.fading_out.load(Ordering::Relaxed) {
                if self.fade_out_pos < FADE_SAMPLES {
                    let gain = 1.0 - (self.fade_out_pos as f32 / FADE_SAMPLES as f32);
                    *sample = (raw as f32 * gain) as i16;
                    self.fade_out_pos += 1;
                } else {
                    *sample = 0;
                }
            } else {
                *sample = raw;
            }
        }
    }
}

/// Shared sample queue. The emulator thread pushes mixed samples in;
/// the SDL audio callback thread pops them out.
pub type AudioRing = Arc<Mutex<VecDeque<i16>>>;

/// Handle for signalling the audio callback to fade out before shutdown.
pub type FadeOut = Arc<AtomicBool>;

/// Mix the per-chip voices the board submits into the playback queue.
pub struct RingSink {
    ring: AudioRing,
    /// Samples per submitted buffer, learned from the first submission.
    buffer_len: usize,
}

impl RingSink {
    pub fn new(ring: AudioRing) -> Self {
        Self { ring, buffer_len: 0 }
    }
}

impl AudioSink for RingSink {
    fn queued_buffers(&self) -> usize {
        let queued = self.ring.lock().unwrap_or_else(PoisonError::into_inner).len();
        queued.checked_div(self.buffer_len).unwrap_or(0)
    }

    fn submit(&mut self, voices: &[&[u8]]) {
        let len = voices.iter().map(|v| v.len()).max().unwrap_or(0);
        self.buffer_len = len;
        let mut ring = self.ring.lock().unwrap_or_else(PoisonError::into_inner);
        ring.extend((0..len).map(|n| mix(voices, n)));
    }
}

/// Sum sample `n` of every voice around the 0x80 midpoint.
fn mix(voices: &[&[u8]], n: usize) -> i16 {
    let sum: i32 = voices
        .iter()
        .map(|v| (*v.get(n).unwrap_or(&0x80) as i32 - 0x80) * VOICE_GAIN)
        .sum();
    sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Open SDL2 audio playback at `sample_rate`.
///
/// Returns the audio device (must be kept alive), the shared sample queue
/// and a fade-out signal for clean shutdown. `None` when the board is muted
/// or no device can be opened.
pub fn init(
    sdl_audio: &sdl2::AudioSubsystem,
    sample_rate: u32,
) -> Option<(AudioDevice<AudioPlayer>, AudioRing, FadeOut)> {
    if sample_rate == 0 {
        return None;
    }

    let ring: AudioRing = Arc::new(Mutex::new(VecDeque::with_capacity(4096)));
    let fade_out: FadeOut = Arc::new(AtomicBool::new(false));

    let desired_spec = AudioSpecDesired {
        freq: Some(sample_rate as i32),
        channels: Some(1),
        samples: Some(512),
    };

    let device = sdl_audio
        .open_playback(None, &desired_spec, |_spec| AudioPlayer {
            buffer: Arc::clone(&ring),
            fade_in_pos: 0,
            fading_out: Arc::clone(&fade_out),
            fade_out_pos: 0,
        })
        .map_err(|e| warn!("audio: no playback device: {e}"))
        .ok()?;

    // Device starts paused; the emulator loop resumes it once the first
    // frame of audio is queued.
    Some((device, ring, fade_out))
}

/// Time to wait after signalling fade-out so the callback can ramp down.
pub fn fade_out_duration() -> std::time::Duration {
    std::time::Duration::from_millis(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_mixes_to_zero() {
        let quiet = [0x80u8; 4];
        assert_eq!(mix(&[&quiet, &quiet, &quiet, &quiet], 2), 0);
    }

    #[test]
    fn full_swing_stays_in_range() {
        let hi = [0xFFu8; 1];
        let lo = [0x00u8; 1];
        assert_eq!(mix(&[&hi, &hi, &hi, &hi], 0), 4 * 127 * VOICE_GAIN as i16);
        assert_eq!(mix(&[&lo, &lo, &lo, &lo], 0), -4 * 128 * VOICE_GAIN as i16);
    }

    #[test]
    fn sink_counts_whole_buffers() {
        let ring: AudioRing = Arc::new(Mutex::new(VecDeque::new()));
        let mut sink = RingSink::new(Arc::clone(&ring));
        assert_eq!(sink.queued_buffers(), 0);

        let voice = [0x90u8; 44];
        sink.submit(&[&voice, &voice, &voice, &voice]);
        sink.submit(&[&voice, &voice, &voice, &voice]);
        assert_eq!(sink.queued_buffers(), 2);
        assert_eq!(ring.lock().unwrap().len(), 88);
        assert_eq!(ring.lock().unwrap()[0], 4 * 0x10 * VOICE_GAIN as i16);
    }
}
