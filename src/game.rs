//! Frame-level controller
//!
//! [`Game`] owns the one [`GameState`] and the presentation components, and
//! is the only place sim events turn into audio and scroll side effects.
//! Platform code feeds it input events and frame timestamps, then reads a
//! [`Snapshot`] to draw.

use serde::Serialize;

use crate::audio::{AudioController, AudioSink, NullSink};
use crate::background::BackgroundScroll;
use crate::input::{InputEvent, InputRouter};
use crate::settings::Settings;
use crate::sim::{
    Adversary, Command, FrameClock, GameEvent, GamePhase, GameState, Player, Projectile,
    TickInput, Viewport, apply_command, resize, tick,
};
use crate::tuning::Tuning;

/// Read-only view of everything a frame needs to draw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub viewport: Viewport,
    pub player: Player,
    pub adversary: Adversary,
    pub projectiles: Vec<Projectile>,
    pub score: u32,
    pub phase: GamePhase,
    /// Remaining countdown seconds while counting down
    pub countdown: Option<u8>,
    pub countdown_label: Option<String>,
    pub scroll_offset: f32,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Sim plus presentation, driven one frame at a time
pub struct Game<S: AudioSink = NullSink> {
    state: GameState,
    background: BackgroundScroll,
    audio: AudioController<S>,
    router: InputRouter,
    clock: FrameClock,
    settings: Settings,
    /// Phase/score notifications for the HUD
    ui_events: Vec<GameEvent>,
}

impl Game<NullSink> {
    /// Silent game with default tuning and settings
    pub fn headless(seed: u64) -> Self {
        Self::new(
            seed,
            Viewport::default(),
            Tuning::default(),
            Settings::default(),
            NullSink,
        )
    }
}

impl<S: AudioSink> Game<S> {
    pub fn new(seed: u64, viewport: Viewport, tuning: Tuning, settings: Settings, sink: S) -> Self {
        let background = BackgroundScroll::new(tuning.scroll_speed, viewport.height);
        let audio = AudioController::new(sink, &settings, &tuning);
        log::info!(
            "Game created: seed {}, viewport {}x{}",
            seed,
            viewport.width,
            viewport.height
        );
        Self {
            state: GameState::with_tuning(seed, viewport, tuning),
            background,
            audio,
            router: InputRouter::new(),
            clock: FrameClock::new(),
            settings,
            ui_events: Vec::new(),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn background(&self) -> &BackgroundScroll {
        &self.background
    }

    pub fn audio(&self) -> &AudioController<S> {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioController<S> {
        &mut self.audio
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.audio.apply_settings(&settings);
        self.settings = settings;
    }

    /// Route a device event. Returns true if it produced an accepted command.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        if event == InputEvent::FocusLost {
            for release in self.router.release_all() {
                apply_command(&mut self.state, release);
            }
        }
        let phase = self.state.phase;
        match self
            .router
            .route(event, phase, self.settings.pause_on_blur)
        {
            Some(command) => self.command(command),
            None => false,
        }
    }

    /// Apply a command right away so its audio starts inside the user
    /// gesture that caused it
    pub fn command(&mut self, command: Command) -> bool {
        let accepted = apply_command(&mut self.state, command);
        self.dispatch_events();
        accepted
    }

    /// Feed a render-loop timestamp (ms)
    pub fn frame(&mut self, time_ms: f64) {
        let dt_ms = self.clock.frame(time_ms);
        self.update(dt_ms);
    }

    /// Advance everything by `dt_ms`
    pub fn update(&mut self, dt_ms: u32) {
        tick(&mut self.state, &TickInput::default(), dt_ms);
        self.dispatch_events();
        self.background.advance(dt_ms as f32);
        self.audio.update(dt_ms);
    }

    /// Forget the last frame time, e.g. after the tab was hidden
    pub fn reset_clock(&mut self) {
        self.clock.reset();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        resize(&mut self.state, width, height);
        self.background.set_height(self.state.viewport.height);
    }

    /// Take the HUD notifications since the last call
    pub fn drain_ui_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.ui_events)
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = &self.state;
        Snapshot {
            viewport: state.viewport,
            player: state.player,
            adversary: state.adversary,
            projectiles: state.projectiles.clone(),
            score: state.score,
            phase: state.phase,
            countdown: state.phase.countdown(),
            countdown_label: state.phase.countdown_label(),
            scroll_offset: self.background.offset(),
        }
    }

    fn dispatch_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                GameEvent::Cue(cue) => self.audio.play_cue(cue),
                GameEvent::MusicIntro => self.audio.start_intro(),
                GameEvent::MusicPause => self.audio.pause_music(),
                GameEvent::MusicResume => self.audio.resume_music(),
                GameEvent::MusicStop => self.audio.stop_music(),
                GameEvent::ScrollStart => {
                    self.background.start();
                }
                GameEvent::ScrollFreeze => self.background.freeze(),
                GameEvent::ScrollUnfreeze => self.background.unfreeze(),
                GameEvent::ScrollStop => self.background.stop(),
                GameEvent::PhaseChanged { .. }
                | GameEvent::ScoreChanged(_)
                | GameEvent::GameOver { .. } => self.ui_events.push(event),
            }
        }
    }
}
