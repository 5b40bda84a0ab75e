//! Audio cues and the background track
//!
//! [`AudioController`] owns the playback policy: cue volumes, the background
//! track's volume and its fade job. The actual output is an [`AudioSink`];
//! on the web that is [`WebAudioSink`], which synthesizes everything with
//! oscillators so there are no sound files to load.
//!
//! Playback failures never reach gameplay. They are logged and dropped.

use thiserror::Error;

use crate::settings::Settings;
use crate::sim::clock::Interval;
use crate::tuning::Tuning;

/// One-shot sound effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// Direction pressed
    Move,
    /// Projectile fired
    Shoot,
    /// Projectile hit the adversary
    Hit,
    /// Run ended
    GameOver,
}

impl Cue {
    /// Per-cue loudness before the player's volume settings
    pub fn base_volume(&self) -> f32 {
        match self {
            Cue::Move => 0.3,
            Cue::Shoot => 0.6,
            Cue::Hit => 0.5,
            Cue::GameOver => 0.6,
        }
    }
}

/// A playback request the output could not honor
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    #[error("audio output unavailable")]
    Unavailable,
    #[error("audio backend error: {0}")]
    Backend(String),
}

/// Audio output device
pub trait AudioSink {
    /// Restart `cue` from its beginning at `volume`. Overlapping requests
    /// restart rather than queue.
    fn play_cue(&mut self, cue: Cue, volume: f32) -> Result<(), AudioError>;
    /// Play (or continue) the looping background track
    fn music_play(&mut self) -> Result<(), AudioError>;
    /// Pause the background track, keeping its position
    fn music_pause(&mut self) -> Result<(), AudioError>;
    /// Seek the background track to its start
    fn music_rewind(&mut self) -> Result<(), AudioError>;
    fn set_music_volume(&mut self, volume: f32) -> Result<(), AudioError>;
}

/// Silent output, for native builds and headless runs
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play_cue(&mut self, cue: Cue, volume: f32) -> Result<(), AudioError> {
        log::trace!("cue {:?} at {:.2}", cue, volume);
        Ok(())
    }

    fn music_play(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn music_pause(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn music_rewind(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn set_music_volume(&mut self, _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Discrete volume ramp toward a target on a fixed interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeJob {
    interval: Interval,
    step: f32,
    target: f32,
}

impl FadeJob {
    /// Ramp from 0 to `target` over `duration_ms` in `step_ms` increments
    pub fn new(target: f32, duration_ms: u32, step_ms: u32) -> Self {
        let steps = (duration_ms / step_ms.max(1)).max(1);
        let mut interval = Interval::new(step_ms);
        interval.start();
        Self {
            interval,
            step: target / steps as f32,
            target,
        }
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}

/// Playback policy for cues and the background track
pub struct AudioController<S: AudioSink> {
    sink: S,
    /// Track volume before the player's mix settings, in [0, target]
    track_volume: f32,
    music_playing: bool,
    /// At most one fade runs at a time
    fade: Option<FadeJob>,
    target_volume: f32,
    fade_duration_ms: u32,
    fade_step_ms: u32,
    master_volume: f32,
    sfx_volume: f32,
    music_volume: f32,
    muted: bool,
}

impl<S: AudioSink> AudioController<S> {
    pub fn new(sink: S, settings: &Settings, tuning: &Tuning) -> Self {
        Self {
            sink,
            track_volume: tuning.music_target_volume,
            music_playing: false,
            fade: None,
            target_volume: tuning.music_target_volume,
            fade_duration_ms: tuning.fade_duration_ms,
            fade_step_ms: tuning.fade_step_ms,
            master_volume: settings.master_volume.clamp(0.0, 1.0),
            sfx_volume: settings.sfx_volume.clamp(0.0, 1.0),
            music_volume: settings.music_volume.clamp(0.0, 1.0),
            muted: settings.muted,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Pick up new volume/mute preferences
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.master_volume = settings.master_volume.clamp(0.0, 1.0);
        self.sfx_volume = settings.sfx_volume.clamp(0.0, 1.0);
        self.music_volume = settings.music_volume.clamp(0.0, 1.0);
        self.muted = settings.muted;
        self.push_music_volume();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.push_music_volume();
    }

    /// Effective cue volume
    fn cue_volume(&self, cue: Cue) -> f32 {
        if self.muted {
            0.0
        } else {
            cue.base_volume() * self.master_volume * self.sfx_volume
        }
    }

    /// Effective background track volume
    pub fn mixed_music_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.track_volume * self.master_volume * self.music_volume
        }
    }

    pub fn track_volume(&self) -> f32 {
        self.track_volume
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    pub fn is_music_playing(&self) -> bool {
        self.music_playing
    }

    /// Fire-and-forget cue
    pub fn play_cue(&mut self, cue: Cue) {
        let volume = self.cue_volume(cue);
        if volume <= 0.0 {
            return;
        }
        let result = self.sink.play_cue(cue, volume);
        swallow("play cue", result);
    }

    /// Rewind the track, drop it to silence, play it and fade it in
    pub fn start_intro(&mut self) {
        let result = self.sink.music_rewind();
        swallow("rewind music", result);
        self.track_volume = 0.0;
        self.push_music_volume();
        self.resume_music();
        self.fade_in();
    }

    /// Ramp the track from its current level to the target, replacing any
    /// fade already running
    pub fn fade_in(&mut self) {
        self.cancel_fade();
        self.fade = Some(FadeJob::new(
            self.target_volume,
            self.fade_duration_ms,
            self.fade_step_ms,
        ));
    }

    /// Returns true if a fade was running
    pub fn cancel_fade(&mut self) -> bool {
        self.fade.take().is_some()
    }

    /// Pause without losing the track position
    pub fn pause_music(&mut self) {
        self.cancel_fade();
        let result = self.sink.music_pause();
        swallow("pause music", result);
        self.music_playing = false;
    }

    pub fn resume_music(&mut self) {
        let result = self.sink.music_play();
        swallow("play music", result);
        self.music_playing = true;
    }

    /// Stop and rewind to the start
    pub fn stop_music(&mut self) {
        self.pause_music();
        let result = self.sink.music_rewind();
        swallow("rewind music", result);
    }

    /// Advance the fade job
    pub fn update(&mut self, dt_ms: u32) {
        let Some(job) = self.fade.as_mut() else {
            return;
        };
        let fires = job.interval.advance(dt_ms);
        let (step, target) = (job.step, job.target);
        if fires == 0 {
            return;
        }

        for _ in 0..fires {
            self.track_volume = (self.track_volume + step).min(target);
            if self.track_volume >= target {
                self.fade = None;
                break;
            }
        }
        self.push_music_volume();
    }

    fn push_music_volume(&mut self) {
        let volume = self.mixed_music_volume();
        let result = self.sink.set_music_volume(volume);
        swallow("set music volume", result);
    }
}

/// Presentation failures are cosmetic: note them and keep going
fn swallow(what: &str, result: Result<(), AudioError>) {
    if let Err(e) = result {
        log::debug!("Audio: {} failed: {}", what, e);
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudioSink;

#[cfg(target_arch = "wasm32")]
mod web {
    //! Web Audio output. Procedurally generated sounds, no external files.

    use wasm_bindgen::JsValue;
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{AudioError, AudioSink, Cue};

    fn js_err(e: JsValue) -> AudioError {
        AudioError::Backend(format!("{:?}", e))
    }

    /// The looping background drone
    struct MusicVoice {
        oscillators: Vec<OscillatorNode>,
        gain: GainNode,
        connected: bool,
    }

    /// Audio output on the Web Audio API
    pub struct WebAudioSink {
        ctx: Option<AudioContext>,
        music: Option<MusicVoice>,
        music_volume: f32,
    }

    impl Default for WebAudioSink {
        fn default() -> Self {
            Self::new()
        }
    }

    impl WebAudioSink {
        pub fn new() -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                music: None,
                music_volume: 0.0,
            }
        }

        /// Resume the context (browsers require a user gesture first)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        fn context(&self) -> Result<&AudioContext, AudioError> {
            let ctx = self.ctx.as_ref().ok_or(AudioError::Unavailable)?;
            // Nodes scheduled while suspended start once the context resumes
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }
            Ok(ctx)
        }

        /// Oscillator routed through its own gain to the speakers
        fn create_osc(
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Result<(OscillatorNode, GainNode), AudioError> {
            let osc = ctx.create_oscillator().map_err(js_err)?;
            let gain = ctx.create_gain().map_err(js_err)?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).map_err(js_err)?;
            gain.connect_with_audio_node(&ctx.destination())
                .map_err(js_err)?;

            Ok((osc, gain))
        }

        /// Short blip with a pitch sweep and exponential decay
        fn blip(
            ctx: &AudioContext,
            osc_type: OscillatorType,
            from_hz: f32,
            to_hz: f32,
            peak: f32,
            length: f64,
        ) -> Result<(), AudioError> {
            let (osc, gain) = Self::create_osc(ctx, from_hz, osc_type)?;
            let t = ctx.current_time();

            gain.gain().set_value_at_time(peak, t).map_err(js_err)?;
            gain.gain()
                .exponential_ramp_to_value_at_time(0.001, t + length)
                .map_err(js_err)?;
            osc.frequency().set_value_at_time(from_hz, t).map_err(js_err)?;
            osc.frequency()
                .exponential_ramp_to_value_at_time(to_hz, t + length)
                .map_err(js_err)?;

            osc.start().map_err(js_err)?;
            osc.stop_with_when(t + length + 0.05).map_err(js_err)?;
            Ok(())
        }

        /// Game over - three falling tones
        fn game_over(ctx: &AudioContext, vol: f32) -> Result<(), AudioError> {
            let t = ctx.current_time();
            for (i, freq) in [392.0, 311.0, 196.0].into_iter().enumerate() {
                let (osc, gain) = Self::create_osc(ctx, freq, OscillatorType::Triangle)?;
                let start = t + i as f64 * 0.25;
                gain.gain().set_value_at_time(0.0, t).map_err(js_err)?;
                gain.gain().set_value_at_time(vol, start).map_err(js_err)?;
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.001, start + 0.4)
                    .map_err(js_err)?;
                osc.start_with_when(start).map_err(js_err)?;
                osc.stop_with_when(start + 0.45).map_err(js_err)?;
            }
            Ok(())
        }

        fn create_music(ctx: &AudioContext) -> Result<MusicVoice, AudioError> {
            let gain = ctx.create_gain().map_err(js_err)?;
            gain.gain().set_value(0.0);

            let mut oscillators = Vec::new();
            for (freq, osc_type) in [
                (55.0, OscillatorType::Sawtooth),
                (110.0, OscillatorType::Triangle),
                (164.8, OscillatorType::Sine),
            ] {
                let osc = ctx.create_oscillator().map_err(js_err)?;
                osc.set_type(osc_type);
                osc.frequency().set_value(freq);
                osc.connect_with_audio_node(&gain).map_err(js_err)?;
                osc.start().map_err(js_err)?;
                oscillators.push(osc);
            }

            Ok(MusicVoice {
                oscillators,
                gain,
                connected: false,
            })
        }
    }

    impl AudioSink for WebAudioSink {
        fn play_cue(&mut self, cue: Cue, volume: f32) -> Result<(), AudioError> {
            let ctx = self.context()?;
            match cue {
                Cue::Move => Self::blip(ctx, OscillatorType::Sine, 660.0, 440.0, volume, 0.06),
                Cue::Shoot => Self::blip(ctx, OscillatorType::Square, 1200.0, 200.0, volume * 0.5, 0.15),
                Cue::Hit => Self::blip(ctx, OscillatorType::Sawtooth, 220.0, 40.0, volume, 0.3),
                Cue::GameOver => Self::game_over(ctx, volume),
            }
        }

        fn music_play(&mut self) -> Result<(), AudioError> {
            let ctx = self.context()?.clone();
            if self.music.is_none() {
                self.music = Some(Self::create_music(&ctx)?);
            }
            let volume = self.music_volume;
            if let Some(voice) = self.music.as_mut() {
                if !voice.connected {
                    voice.gain
                        .connect_with_audio_node(&ctx.destination())
                        .map_err(js_err)?;
                    voice.connected = true;
                }
                voice.gain.gain().set_value(volume);
            }
            Ok(())
        }

        fn music_pause(&mut self) -> Result<(), AudioError> {
            if let Some(voice) = self.music.as_mut() {
                if voice.connected {
                    voice.gain.disconnect().map_err(js_err)?;
                    voice.connected = false;
                }
            }
            Ok(())
        }

        fn music_rewind(&mut self) -> Result<(), AudioError> {
            // A drone has no position; dropping the voice restarts it
            if let Some(voice) = self.music.take() {
                for osc in &voice.oscillators {
                    let _ = osc.stop();
                }
                let _ = voice.gain.disconnect();
            }
            Ok(())
        }

        fn set_music_volume(&mut self, volume: f32) -> Result<(), AudioError> {
            // Keep the drone well under the cues
            self.music_volume = volume * 0.25;
            if let Some(voice) = &self.music {
                voice.gain.gain().set_value(self.music_volume);
            }
            Ok(())
        }
    }
}
