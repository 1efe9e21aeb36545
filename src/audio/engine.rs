//! Audio output through cpal
//!
//! The mixer is shared with the device callback behind a mutex. The callback
//! runs one mixer update per buffer and one mixed frame per output frame.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use tracing::{error, info, warn};

use super::mixer::Mixer;
use crate::config::AudioConfig;
use crate::error::MixerError;

/// Owns the output stream and the mixer it pulls from
pub struct AudioEngine {
    mixer: Arc<Mutex<Mixer>>,
    /// The audio stream (kept alive)
    stream: Option<Stream>,
    sample_rate: u32,
}

impl AudioEngine {
    /// Open the default output device. Without a device the engine still
    /// works as a silent mixer.
    pub fn new(config: &AudioConfig) -> Self {
        let mut mixer = Mixer::new();
        mixer.set_master_volume(config.master_volume);
        let mixer = Arc::new(Mutex::new(mixer));

        let stream = Self::init_audio_stream(Arc::clone(&mixer), config);
        if stream.is_none() {
            warn!("No audio output available, mixing silently");
        }

        Self {
            mixer,
            stream,
            sample_rate: config.sample_rate,
        }
    }

    /// Mixer with no output stream, for headless runs
    pub fn silent(config: &AudioConfig) -> Self {
        let mut mixer = Mixer::new();
        mixer.set_master_volume(config.master_volume);
        Self {
            mixer: Arc::new(Mutex::new(mixer)),
            stream: None,
            sample_rate: config.sample_rate,
        }
    }

    fn init_audio_stream(mixer: Arc<Mutex<Mixer>>, config: &AudioConfig) -> Option<Stream> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let channels = config.channels as usize;

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut mixer) = mixer.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    mixer.fill(data, channels);
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| warn!("Failed to build audio stream: {}", e))
            .ok()?;

        stream
            .play()
            .map_err(|e| warn!("Failed to start audio stream: {}", e))
            .ok()?;

        if let Ok(name) = device.name() {
            info!("Audio output: {} @ {} Hz, {} channels", name, config.sample_rate, config.channels);
        }
        Some(stream)
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Shared handle to the mixer
    pub fn mixer(&self) -> Arc<Mutex<Mixer>> {
        Arc::clone(&self.mixer)
    }

    /// Run `f` with the mixer locked. Returns `None` if the lock is poisoned.
    pub fn with_mixer<R>(&self, f: impl FnOnce(&mut Mixer) -> R) -> Option<R> {
        match self.mixer.lock() {
            Ok(mut mixer) => Some(f(&mut mixer)),
            Err(_) => {
                error!("Mixer lock poisoned");
                None
            }
        }
    }

    /// Run a fallible mixer command; failures are logged as `what`.
    /// Returns whether the command succeeded.
    pub fn command(&self, what: &str, f: impl FnOnce(&mut Mixer) -> Result<(), MixerError>) -> bool {
        match self.with_mixer(f) {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                warn!("Failed to {}: {}", what, e);
                false
            }
            None => false,
        }
    }
}
