//! Star Blaze - A single-screen arcade shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (lifecycle, entities, collisions, timers)
//! - `background`: Scrolling background, decoupled from gameplay ticks
//! - `audio`: One-shot cues and the fading background track
//! - `input`: Maps raw device events to lifecycle/entity commands
//! - `game`: Controller wiring the pieces together per frame
//! - `renderer`: WebGPU rendering pipeline
//! - `tuning`: Data-driven game balance

pub mod audio;
pub mod background;
pub mod game;
pub mod input;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use game::{Game, Snapshot};
pub use settings::Settings;
pub use tuning::Tuning;

/// Game configuration constants
///
/// Defaults for [`Tuning`]; the sim reads the live values from its tuning.
pub mod consts {
    /// Default viewport size (logical pixels)
    pub const DEFAULT_VIEWPORT_WIDTH: f32 = 390.0;
    pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 600.0;

    /// Longest frame delta the render loop will feed the sim (ms)
    pub const MAX_FRAME_MS: f64 = 100.0;
    /// Reference frame length for per-frame speeds (60 Hz)
    pub const REFERENCE_FRAME_MS: f32 = 1000.0 / 60.0;

    /// Countdown before a run starts
    pub const COUNTDOWN_SECONDS: u8 = 5;
    pub const COUNTDOWN_PERIOD_MS: u32 = 1000;

    /// Player layout: fraction of viewport width, capped
    pub const PLAYER_WIDTH_FRACTION: f32 = 0.18;
    pub const PLAYER_MAX_WIDTH: f32 = 140.0;
    pub const PLAYER_ASPECT: f32 = 0.6;
    pub const PLAYER_BOTTOM_MARGIN: f32 = 16.0;
    /// Player movement while a direction is held
    pub const PLAYER_STEP: f32 = 12.0;
    pub const PLAYER_PERIOD_MS: u32 = 25;
    pub const PLAYER_EDGE_MARGIN: f32 = 5.0;

    /// Adversary layout: fraction of viewport width, capped
    pub const ADVERSARY_WIDTH_FRACTION: f32 = 0.22;
    pub const ADVERSARY_MAX_WIDTH: f32 = 180.0;
    pub const ADVERSARY_ASPECT: f32 = 0.8;
    /// Fast fall cadence
    pub const FALL_STEP: f32 = 6.0;
    pub const FALL_PERIOD_MS: u32 = 28;
    /// Game over once the adversary is deeper than viewport height minus this
    pub const GAME_OVER_MARGIN: f32 = 200.0;
    /// Slow horizontal reposition cadence
    pub const REPOSITION_PERIOD_MS: u32 = 2900;
    /// Delay between a hit and the adversary reappearing
    pub const RESPAWN_DELAY_MS: u32 = 300;

    /// Projectile size and motion
    pub const PROJECTILE_WIDTH: f32 = 40.0;
    pub const PROJECTILE_HEIGHT: f32 = 20.0;
    pub const PROJECTILE_STEP: f32 = 12.0;
    pub const PROJECTILE_PERIOD_MS: u32 = 20;
    /// Spawn offset above the player's top edge
    pub const PROJECTILE_SPAWN_GAP: f32 = 10.0;
    /// Destroyed once its top is above -EXIT_MARGIN
    pub const PROJECTILE_EXIT_MARGIN: f32 = 40.0;

    /// Background scroll speed (pixels per 60 Hz frame)
    pub const SCROLL_SPEED: f32 = 7.0;

    /// Background track
    pub const MUSIC_TARGET_VOLUME: f32 = 0.6;
    pub const FADE_DURATION_MS: u32 = 1500;
    pub const FADE_STEP_MS: u32 = 50;
}
