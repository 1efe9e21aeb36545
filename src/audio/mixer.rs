//! Fixed-channel PCM mixer
//!
//! Channels are slots holding at most one [`Sound`]. Every produced stereo
//! frame reads each playing channel at its cursor, combines them with a
//! clip-then-halve mix, then advances the cursors by their pitch ratio.
//! Fades are applied once per [`Mixer::update`] call, not per frame.

use tracing::{debug, warn};

use super::sound::{ChannelStatus, Sound};
use crate::error::MixerError;

/// Number of channel slots
pub const CHANNELS: usize = 32;

/// Clip bound of the doubled pairwise sum; keeps every mixed frame within `i16`
pub const MAX_MIX_AMP: i32 = 65536;

/// Combine two samples: `clamp(2a + 2b, ±(MAX_MIX_AMP - 1)) / 2`
pub fn mix_samples(a: i16, b: i16) -> i16 {
    let mix = (a as i32 * 2 + b as i32 * 2).clamp(-(MAX_MIX_AMP - 1), MAX_MIX_AMP - 1);
    (mix / 2) as i16
}

pub struct Mixer {
    channels: [Option<Sound>; CHANNELS],
    master_volume: f32,
    last: (i16, i16),
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            channels: std::array::from_fn(|_| None),
            master_volume: 1.0,
            last: (0, 0),
        }
    }

    fn check_range(channel: usize) -> Result<(), MixerError> {
        if channel >= CHANNELS {
            let err = MixerError::ChannelOutOfRange { channel, channels: CHANNELS };
            warn!("{}", err);
            return Err(err);
        }
        Ok(())
    }

    /// Put `sound` in a channel slot, replacing whatever was there.
    pub fn set_sound(&mut self, channel: usize, sound: Sound) -> Result<(), MixerError> {
        Self::check_range(channel)?;
        if sound.is_empty() {
            warn!("Rejected empty sound '{}' for channel {}", sound.name, channel);
            return Err(MixerError::EmptySound);
        }
        debug!("Channel {}: '{}' ({} frames)", channel, sound.name, sound.len());
        self.channels[channel] = Some(sound);
        Ok(())
    }

    /// Empty a channel slot, handing back its sound if it had one
    pub fn remove_sound(&mut self, channel: usize) -> Result<Option<Sound>, MixerError> {
        Self::check_range(channel)?;
        Ok(self.channels[channel].take())
    }

    pub fn channel(&self, channel: usize) -> Option<&Sound> {
        self.channels.get(channel).and_then(|c| c.as_ref())
    }

    pub fn channel_mut(&mut self, channel: usize) -> Result<&mut Sound, MixerError> {
        Self::check_range(channel)?;
        self.channels[channel].as_mut().ok_or_else(|| {
            warn!("Channel {} holds no sound", channel);
            MixerError::EmptyChannel(channel)
        })
    }

    pub fn play(&mut self, channel: usize) -> Result<(), MixerError> {
        self.channel_mut(channel).map(Sound::play)
    }

    pub fn pause(&mut self, channel: usize) -> Result<(), MixerError> {
        self.channel_mut(channel).map(Sound::pause)
    }

    pub fn resume(&mut self, channel: usize) -> Result<(), MixerError> {
        self.channel_mut(channel).map(Sound::resume)
    }

    pub fn stop(&mut self, channel: usize) -> Result<(), MixerError> {
        self.channel_mut(channel).map(Sound::stop)
    }

    pub fn set_volume(&mut self, channel: usize, volume: f32) -> Result<(), MixerError> {
        self.channel_mut(channel).map(|s| s.set_volume(volume))
    }

    pub fn set_note(&mut self, channel: usize, note: i32) -> Result<(), MixerError> {
        self.channel_mut(channel).map(|s| s.set_note(note))
    }

    pub fn set_pitch(&mut self, channel: usize, ratio: f64) -> Result<(), MixerError> {
        self.channel_mut(channel).map(|s| s.set_pitch(ratio))
    }

    pub fn fade(&mut self, channel: usize, amount: f64) -> Result<(), MixerError> {
        self.channel_mut(channel).map(|s| s.fade(amount))
    }

    pub fn set_looping(&mut self, channel: usize, looping: bool) -> Result<(), MixerError> {
        self.channel_mut(channel).map(|s| s.set_looping(looping))
    }

    /// See [`Sound::set_loop_region`]; `Ok(false)` when the region is empty.
    pub fn set_loop_region(&mut self, channel: usize, start: usize, end: usize) -> Result<bool, MixerError> {
        self.channel_mut(channel).map(|s| s.set_loop_region(start, end))
    }

    pub fn status(&self, channel: usize) -> ChannelStatus {
        self.channel(channel).map_or(ChannelStatus::EMPTY, Sound::status)
    }

    /// Occupied channel slots
    pub fn occupied_count(&self) -> usize {
        self.channels.iter().flatten().count()
    }

    /// Channels currently contributing to the mix
    pub fn active_count(&self) -> usize {
        self.channels.iter().flatten().filter(|s| s.is_playing()).count()
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    /// Last frame produced by [`Mixer::next_frame`]
    pub fn last_frame(&self) -> (i16, i16) {
        self.last
    }

    /// Once per device callback: fade decay, then loop retriggers.
    pub fn update(&mut self) {
        for sound in self.channels.iter_mut().flatten() {
            sound.apply_fade();
            if sound.retrigger() {
                debug!("Looping '{}'", sound.name);
            }
        }
    }

    /// Produce one stereo frame and advance every playing channel.
    pub fn next_frame(&mut self) -> (i16, i16) {
        let mut playing = self.channels.iter().flatten().filter(|s| s.is_playing());

        let frame = match (playing.next(), playing.next()) {
            (None, _) => (0, 0),
            (Some(only), None) => {
                let (l, r) = only.frame();
                let v = only.volume();
                ((l as f32 * v) as i16, (r as f32 * v) as i16)
            }
            _ => {
                let (mut acc_l, mut acc_r) = (0i16, 0i16);
                for sound in self.channels.iter().rev().flatten().filter(|s| s.is_playing()) {
                    let (l, r) = sound.frame();
                    let half = sound.volume() / 2.0;
                    acc_l = mix_samples((l as f32 * half) as i16, acc_l);
                    acc_r = mix_samples((r as f32 * half) as i16, acc_r);
                }
                (acc_l, acc_r)
            }
        };

        for sound in self.channels.iter_mut().flatten().filter(|s| s.is_playing()) {
            sound.advance();
        }

        self.last = frame;
        frame
    }

    /// Fill an interleaved f32 device buffer.
    ///
    /// Runs one [`Mixer::update`], then one [`Mixer::next_frame`] per output
    /// frame. Mono devices get the average of left and right; channels beyond
    /// the second are silent.
    pub fn fill(&mut self, data: &mut [f32], channels: usize) {
        self.update();
        let channels = channels.max(1);
        let scale = self.master_volume / 32768.0;
        for frame in data.chunks_mut(channels) {
            let (l, r) = self.next_frame();
            let (l, r) = (l as f32 * scale, r as f32 * scale);
            match frame {
                [mono] => *mono = (l + r) * 0.5,
                [left, right, rest @ ..] => {
                    *left = l;
                    *right = r;
                    rest.fill(0.0);
                }
                [] => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_scale(len: usize) -> Sound {
        Sound::from_samples("full", vec![32000; len])
    }

    #[test]
    fn test_single_channel_is_identity() {
        let mut m = Mixer::new();
        m.set_sound(0, Sound::from_samples("clip", vec![100, -200, 300, -400])).unwrap();
        m.play(0).unwrap();

        let got: Vec<_> = (0..4).map(|_| m.next_frame()).collect();
        assert_eq!(got, vec![(100, 100), (-200, -200), (300, 300), (-400, -400)]);

        assert!(!m.channel(0).unwrap().is_playing());
        assert_eq!(m.next_frame(), (0, 0));
        assert_eq!(m.next_frame(), (0, 0));
    }

    #[test]
    fn test_mix_is_bounded_and_monotonic() {
        let mut prev = 0i16;
        for n in 1..=CHANNELS {
            let mut m = Mixer::new();
            for c in 0..n {
                m.set_sound(c, full_scale(8)).unwrap();
                m.play(c).unwrap();
            }
            let (l, r) = m.next_frame();
            assert_eq!(l, r);
            assert!(l as i32 <= MAX_MIX_AMP / 2 - 1, "{} channels gave {}", n, l);
            assert!(l >= prev, "{} channels dropped to {} from {}", n, l, prev);
            prev = l;
        }
        assert_eq!(prev, 32767);
    }

    #[test]
    fn test_mix_samples_clips_symmetrically() {
        assert_eq!(mix_samples(i16::MAX, i16::MAX), 32767);
        assert_eq!(mix_samples(i16::MIN, i16::MIN), -32767);
        assert_eq!(mix_samples(1000, -1000), 0);
        assert_eq!(mix_samples(1000, 500), 1500);
    }

    #[test]
    fn test_stopped_channel_is_silent() {
        let mut m = Mixer::new();
        m.set_sound(3, full_scale(4)).unwrap();
        assert_eq!(m.next_frame(), (0, 0));
        assert_eq!(m.active_count(), 0);
        assert_eq!(m.occupied_count(), 1);
    }

    #[test]
    fn test_pitch_advances_cursor() {
        let mut m = Mixer::new();
        m.set_sound(0, Sound::from_samples("ramp", (0..16).collect())).unwrap();
        m.channel_mut(0).unwrap().set_pitch(2.0);
        m.play(0).unwrap();
        assert_eq!(m.next_frame(), (0, 0));
        assert_eq!(m.next_frame(), (2, 2));
        assert_eq!(m.next_frame(), (4, 4));
    }

    #[test]
    fn test_set_note_changes_pitch_ratio() {
        let mut m = Mixer::new();
        m.set_sound(1, full_scale(4)).unwrap();
        m.set_note(1, 52).unwrap();
        assert!((m.channel(1).unwrap().pitch() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_fade_runs_per_update_not_per_frame() {
        let mut m = Mixer::new();
        m.set_sound(0, full_scale(1000)).unwrap();
        m.play(0).unwrap();
        m.fade(0, 500.0).unwrap();
        for _ in 0..10 {
            m.next_frame();
        }
        assert_eq!(m.status(0).volume, 1.0);
        m.update();
        assert!((m.status(0).volume - 0.5).abs() < 1e-6);
        assert!(m.status(0).fading);
    }

    #[test]
    fn test_invalid_channel_and_empty_sound_are_rejected() {
        let mut m = Mixer::new();
        assert_eq!(
            m.set_sound(CHANNELS, full_scale(1)).unwrap_err(),
            MixerError::ChannelOutOfRange { channel: CHANNELS, channels: CHANNELS }
        );
        assert_eq!(
            m.set_sound(0, Sound::from_samples("empty", Vec::new())).unwrap_err(),
            MixerError::EmptySound
        );
        assert_eq!(m.play(5).unwrap_err(), MixerError::EmptyChannel(5));
        assert_eq!(m.status(99), ChannelStatus::EMPTY);
        assert_eq!(m.occupied_count(), 0);
    }

    #[test]
    fn test_fill_interleaves_and_applies_master_volume() {
        let mut m = Mixer::new();
        m.set_sound(0, Sound::from_samples("c", vec![16384, -16384])).unwrap();
        m.play(0).unwrap();
        m.set_master_volume(0.5);
        let mut buf = [1.0f32; 6];
        m.fill(&mut buf, 2);
        assert_eq!(buf, [0.25, 0.25, -0.25, -0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_looping_channel_restarts_on_update() {
        let mut m = Mixer::new();
        m.set_sound(0, Sound::from_samples("loop", vec![7, 8])).unwrap();
        m.channel_mut(0).unwrap().set_looping(true);
        m.play(0).unwrap();
        m.next_frame();
        m.next_frame();
        assert_eq!(m.next_frame(), (0, 0));
        m.update();
        assert_eq!(m.next_frame(), (7, 7));
    }
}
