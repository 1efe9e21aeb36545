//! Mono 16-bit PCM sounds and their playback state

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::AssetError;

/// Frequency of a piano key number (49 = A4 = 440 Hz)
pub fn note_pitch(note: i32) -> f64 {
    2f64.powf((note - 49) as f64 / 12.0) * 440.0
}

/// Playback rate for `note` relative to the sample's native pitch (key 40)
pub fn pitch_ratio(note: i32) -> f64 {
    note_pitch(note) / note_pitch(BASE_NOTE)
}

/// Key number a sample plays at when its pitch ratio is 1.0
pub const BASE_NOTE: i32 = 40;

/// Coarse playback state reported by the mixer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Empty,
    Stopped,
    Playing,
    Paused,
}

/// Snapshot of one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStatus {
    pub state: PlayState,
    pub looping: bool,
    pub fading: bool,
    pub cursor: f64,
    pub volume: f32,
}

impl ChannelStatus {
    pub const EMPTY: ChannelStatus = ChannelStatus {
        state: PlayState::Empty,
        looping: false,
        fading: false,
        cursor: 0.0,
        volume: 0.0,
    };
}

/// A sample plus its playback state.
///
/// Mono sources are stored once and shared by the left and right lanes.
/// Cloning is cheap: sample data is reference counted.
#[derive(Debug, Clone)]
pub struct Sound {
    pub name: String,
    left: Arc<[i16]>,
    right: Arc<[i16]>,
    cursor: f64,
    pitch: f64,
    volume: f32,
    fade_amount: f64,
    fading: bool,
    playing: bool,
    looping: bool,
    /// Reached the end on its own; cleared by play/stop/retrigger
    finished: bool,
    loop_start: usize,
    loop_end: usize,
}

impl Sound {
    pub fn from_samples(name: impl Into<String>, samples: Vec<i16>) -> Self {
        let data: Arc<[i16]> = samples.into();
        let len = data.len();
        Self {
            name: name.into(),
            left: Arc::clone(&data),
            right: data,
            cursor: 0.0,
            pitch: 1.0,
            volume: 1.0,
            fade_amount: 0.0,
            fading: false,
            playing: false,
            looping: false,
            finished: false,
            loop_start: 0,
            loop_end: len,
        }
    }

    /// Raw little-endian signed 16-bit mono PCM
    pub fn from_pcm_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, AssetError> {
        if bytes.len() % 2 != 0 {
            return Err(AssetError::OddPcmLength(bytes.len()));
        }
        if bytes.is_empty() {
            return Err(AssetError::Empty);
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        Ok(Self::from_samples(name, samples))
    }

    /// Load a headerless 16-bit mono PCM file
    pub fn load_raw<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let sound = Self::from_pcm_bytes(name, &bytes)?;
        info!("Loaded sound: {} ({} frames)", sound.name, sound.len());
        Ok(sound)
    }

    /// Length in frames
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Rewind and start playing; cancels any fade.
    pub fn play(&mut self) {
        self.cursor = 0.0;
        self.fading = false;
        self.playing = true;
        self.finished = false;
    }

    /// Stop advancing but keep the cursor
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Resume from the current cursor
    pub fn resume(&mut self) {
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.cursor = 0.0;
        self.finished = false;
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    pub fn set_pitch(&mut self, ratio: f64) {
        self.pitch = ratio;
    }

    /// Play back at the pitch of piano key `note`
    pub fn set_note(&mut self, note: i32) {
        self.pitch = pitch_ratio(note);
    }

    /// Start a fade: each mixer update scales volume by `1 - amount/1000`.
    pub fn fade(&mut self, amount: f64) {
        self.fade_amount = amount;
        self.fading = true;
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Loop bounds in frames, clamped to the sample. Returns false if the region is empty.
    pub fn set_loop_region(&mut self, start: usize, end: usize) -> bool {
        let end = end.min(self.len());
        if start >= end {
            return false;
        }
        self.loop_start = start;
        self.loop_end = end;
        true
    }

    pub fn loop_region(&self) -> (usize, usize) {
        (self.loop_start, self.loop_end)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_fading(&self) -> bool {
        self.fading
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn status(&self) -> ChannelStatus {
        let state = if self.playing {
            PlayState::Playing
        } else if self.cursor > 0.0 {
            PlayState::Paused
        } else {
            PlayState::Stopped
        };
        ChannelStatus {
            state,
            looping: self.looping,
            fading: self.fading,
            cursor: self.cursor,
            volume: self.volume,
        }
    }

    /// Left/right samples at the cursor, or silence past the end
    pub(crate) fn frame(&self) -> (i16, i16) {
        let i = self.cursor as usize;
        match (self.left.get(i), self.right.get(i)) {
            (Some(l), Some(r)) => (*l, *r),
            _ => (0, 0),
        }
    }

    /// Step the cursor by the pitch ratio; stops at the end of the sample.
    pub(crate) fn advance(&mut self) {
        self.cursor += self.pitch;
        if self.cursor >= self.len() as f64 {
            self.stop();
            self.finished = true;
        }
    }

    /// One fade step. Volume snaps to zero once it is inaudible.
    pub(crate) fn apply_fade(&mut self) {
        if !self.fading {
            return;
        }
        self.volume *= (1.0 - self.fade_amount / 1000.0) as f32;
        if self.volume < 1e-4 {
            self.volume = 0.0;
            self.fading = false;
        }
    }

    /// Restart a looping sound at its loop start once it has run off the end
    /// or past the loop end. Driven by the caller, not by [`Sound::advance`].
    pub(crate) fn retrigger(&mut self) -> bool {
        if !self.looping {
            return false;
        }
        if self.finished || (self.playing && self.cursor >= self.loop_end as f64) {
            self.cursor = self.loop_start as f64;
            self.playing = true;
            self.finished = false;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_pitch_reference_points() {
        assert!((note_pitch(49) - 440.0).abs() < 1e-9);
        assert!((note_pitch(61) - 880.0).abs() < 1e-9);
        assert!((pitch_ratio(BASE_NOTE) - 1.0).abs() < 1e-12);
        assert!((pitch_ratio(BASE_NOTE + 12) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_pcm_bytes_little_endian() {
        let s = Sound::from_pcm_bytes("t", &[0x64, 0x00, 0x38, 0xff]).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.frame(), (100, 100));
        assert!(matches!(Sound::from_pcm_bytes("t", &[1, 2, 3]), Err(AssetError::OddPcmLength(3))));
        assert!(matches!(Sound::from_pcm_bytes("t", &[]), Err(AssetError::Empty)));
    }

    #[test]
    fn test_status_state_machine() {
        let mut s = Sound::from_samples("t", vec![1, 2, 3, 4]);
        assert_eq!(s.status().state, PlayState::Stopped);
        s.play();
        s.advance();
        assert_eq!(s.status().state, PlayState::Playing);
        s.pause();
        assert_eq!(s.status().state, PlayState::Paused);
        s.stop();
        assert_eq!(s.status().state, PlayState::Stopped);
        assert_eq!(s.cursor(), 0.0);
    }

    #[test]
    fn test_fade_snaps_to_silence() {
        let mut s = Sound::from_samples("t", vec![1]);
        s.fade(100.0);
        s.apply_fade();
        assert!((s.volume() - 0.9).abs() < 1e-6);
        for _ in 0..200 {
            s.apply_fade();
        }
        assert_eq!(s.volume(), 0.0);
        assert!(!s.is_fading());
    }

    #[test]
    fn test_loop_region_is_validated() {
        let mut s = Sound::from_samples("t", vec![0; 10]);
        assert!(!s.set_loop_region(5, 5));
        assert!(s.set_loop_region(2, 50));
        assert_eq!(s.loop_region(), (2, 10));
    }

    #[test]
    fn test_retrigger_only_restarts_finished_loops() {
        let mut s = Sound::from_samples("t", vec![0; 2]);
        s.set_loop_region(1, 2);
        s.play();
        s.advance();
        s.advance();
        assert!(!s.is_playing());
        assert!(!s.retrigger());

        s.set_looping(true);
        s.play();
        s.advance();
        s.advance();
        assert!(s.retrigger());
        assert!(s.is_playing());
        assert_eq!(s.cursor(), 1.0);
        // a manual stop is not a loop point
        s.stop();
        assert!(!s.retrigger());
    }

    #[test]
    fn test_load_raw_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blip.raw");
        std::fs::write(&path, [0x10, 0x00, 0x20, 0x00]).unwrap();
        let s = Sound::load_raw(&path).unwrap();
        assert_eq!(s.name, "blip");
        assert_eq!(s.len(), 2);
    }
}
