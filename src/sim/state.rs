//! Game state and core simulation types
//!
//! Plain records for the entities plus the single authoritative lifecycle
//! phase. Presentation layers read these; only `sim::tick` mutates them.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::clock::Scheduler;
use super::collision::Aabb;
use crate::audio::Cue;
use crate::consts::*;
use crate::tuning::Tuning;

/// Current lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the first start press
    Idle,
    /// Counting down to a run; 0 is the "go" marker
    Countdown(u8),
    /// Active gameplay
    Running,
    /// Gameplay frozen, resumable
    Paused,
    /// Run ended, waiting for restart
    GameOver,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Idle => "idle",
            GamePhase::Countdown(_) => "countdown",
            GamePhase::Running => "running",
            GamePhase::Paused => "paused",
            GamePhase::GameOver => "game_over",
        }
    }

    /// Remaining countdown seconds, if counting down
    pub fn countdown(&self) -> Option<u8> {
        match self {
            GamePhase::Countdown(n) => Some(*n),
            _ => None,
        }
    }

    /// Text shown over the playfield during the countdown
    pub fn countdown_label(&self) -> Option<String> {
        match self {
            GamePhase::Countdown(0) => Some("START!".to_string()),
            GamePhase::Countdown(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Logical playfield size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT)
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    pub fn player_width(&self) -> f32 {
        (self.width * PLAYER_WIDTH_FRACTION).round().min(PLAYER_MAX_WIDTH)
    }

    pub fn player_height(&self) -> f32 {
        self.player_width() * PLAYER_ASPECT
    }

    /// Top edge of the player ship
    pub fn player_y(&self) -> f32 {
        self.height - PLAYER_BOTTOM_MARGIN - self.player_height()
    }

    pub fn adversary_width(&self) -> f32 {
        (self.width * ADVERSARY_WIDTH_FRACTION)
            .round()
            .min(ADVERSARY_MAX_WIDTH)
    }

    pub fn adversary_height(&self) -> f32 {
        self.adversary_width() * ADVERSARY_ASPECT
    }
}

/// The player's ship
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Left edge
    pub x: f32,
    /// Top edge (fixed for a given viewport)
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Player {
    /// Player centered at the bottom of the viewport
    pub fn new(viewport: &Viewport) -> Self {
        let mut player = Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        };
        player.layout(viewport);
        player.center(viewport);
        player
    }

    /// Largest legal `x`
    pub fn max_x(&self, viewport: &Viewport) -> f32 {
        (viewport.width - self.width).max(0.0)
    }

    /// Recompute size and vertical position, keep `x` inside the viewport
    pub fn layout(&mut self, viewport: &Viewport) {
        self.width = viewport.player_width();
        self.height = viewport.player_height();
        self.y = viewport.player_y();
        self.x = self.x.clamp(0.0, self.max_x(viewport));
    }

    pub fn center(&mut self, viewport: &Viewport) {
        self.x = ((viewport.width - self.width) / 2.0).max(0.0);
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, self.y, self.width, self.height)
    }
}

/// The descending enemy ship
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adversary {
    /// Top-left corner
    pub pos: Vec2,
    pub width: f32,
    pub height: f32,
    /// Hidden adversaries are skipped by collision and rendering
    pub visible: bool,
}

impl Adversary {
    /// Hidden until a run places it
    pub fn new(viewport: &Viewport) -> Self {
        Self {
            pos: Vec2::ZERO,
            width: viewport.adversary_width(),
            height: viewport.adversary_height(),
            visible: false,
        }
    }

    /// Largest legal `x`
    pub fn max_x(&self, viewport: &Viewport) -> f32 {
        (viewport.width - self.width).max(0.0)
    }

    /// Recompute size, keep `x` inside the viewport
    pub fn layout(&mut self, viewport: &Viewport) {
        self.width = viewport.adversary_width();
        self.height = viewport.adversary_height();
        self.pos.x = self.pos.x.clamp(0.0, self.max_x(viewport));
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos.x, self.pos.y, self.width, self.height)
    }
}

/// A player shot travelling up the screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
}

impl Projectile {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos.x, self.pos.y, self.size.x, self.size.y)
    }
}

/// Directions currently held down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldDirections {
    pub left: bool,
    pub right: bool,
}

/// Gameplay timers multiplexed on the sim clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// One tick per countdown second
    Countdown,
    /// Held-direction player movement
    PlayerMove,
    /// One pass over every live projectile
    ProjectileStep,
    /// Fast adversary descent
    AdversaryFall,
    /// Slow random horizontal jump
    AdversaryReposition,
    /// One-shot reappearance after a hit
    Respawn,
}

/// Side effects for the components outside the sim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Play a one-shot sound
    Cue(Cue),
    PhaseChanged { from: GamePhase, to: GamePhase },
    ScoreChanged(u32),
    /// Rewind the background track and fade it in from silence
    MusicIntro,
    MusicPause,
    MusicResume,
    /// Stop the background track and rewind it
    MusicStop,
    ScrollStart,
    /// Hold the background still without stopping its loop
    ScrollFreeze,
    ScrollUnfreeze,
    ScrollStop,
    /// Final score, for the result panel
    GameOver { score: u32 },
}

/// Complete simulation state (deterministic for a given seed and input)
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub tuning: Tuning,
    pub viewport: Viewport,
    /// Single source of truth for which ticks and inputs are honored
    pub phase: GamePhase,
    pub score: u32,
    pub player: Player,
    pub adversary: Adversary,
    /// Live projectiles, ordered by id
    pub projectiles: Vec<Projectile>,
    pub held: HeldDirections,
    pub timers: Scheduler<Timer>,
    /// Set by the first game-over transition of a run
    pub(crate) game_over_latched: bool,
    /// Respawn expired while paused; applied on resume
    pub(crate) respawn_pending: bool,
    /// Pending side effects, drained by the controller
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// New idle game with default viewport and tuning
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Viewport::default(), Tuning::default())
    }

    pub fn with_tuning(seed: u64, viewport: Viewport, tuning: Tuning) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            tuning,
            viewport,
            phase: GamePhase::Idle,
            score: 0,
            player: Player::new(&viewport),
            adversary: Adversary::new(&viewport),
            projectiles: Vec::new(),
            held: HeldDirections::default(),
            timers: Scheduler::new(),
            game_over_latched: false,
            respawn_pending: false,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Move to `to`, recording the transition
    pub fn set_phase(&mut self, to: GamePhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        log::info!("Phase {} -> {}", from.as_str(), to.as_str());
        self.emit(GameEvent::PhaseChanged { from, to });
    }

    pub fn is_game_over_latched(&self) -> bool {
        self.game_over_latched
    }

    pub fn is_respawn_pending(&self) -> bool {
        self.respawn_pending
    }

    /// Uniform whole-pixel x in [0, viewport width - adversary width]
    pub fn random_adversary_x(&mut self) -> f32 {
        let max_x = self.adversary.max_x(&self.viewport).floor() as u32;
        self.rng.random_range(0..=max_x) as f32
    }

    /// Put the adversary back at the top, visible, at a random x
    pub fn respawn_adversary(&mut self) {
        self.adversary.layout(&self.viewport);
        self.adversary.pos = Vec2::new(self.random_adversary_x(), 0.0);
        self.adversary.visible = true;
        self.respawn_pending = false;
    }

    /// Fresh run: zero score, centered player, no shots, adversary at the top
    pub fn reset_entities(&mut self) {
        self.score = 0;
        self.player.layout(&self.viewport);
        self.player.center(&self.viewport);
        self.projectiles.clear();
        self.respawn_adversary();
        self.emit(GameEvent::ScoreChanged(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_idle() {
        let state = GameState::new(7);
        assert_eq!(state.phase, GamePhase::Idle);
        assert_eq!(state.score, 0);
        assert!(state.projectiles.is_empty());
        assert!(state.timers.is_empty());
        assert!(!state.adversary.visible);
    }

    #[test]
    fn test_layout_from_viewport() {
        let vp = Viewport::new(390.0, 600.0);
        assert_eq!(vp.player_width(), 70.0);
        assert_eq!(vp.adversary_width(), 86.0);

        // Caps kick in on wide screens
        let wide = Viewport::new(2000.0, 900.0);
        assert_eq!(wide.player_width(), PLAYER_MAX_WIDTH);
        assert_eq!(wide.adversary_width(), ADVERSARY_MAX_WIDTH);
    }

    #[test]
    fn test_player_starts_centered() {
        let vp = Viewport::new(390.0, 600.0);
        let player = Player::new(&vp);
        assert_eq!(player.x, 160.0);
        assert!(player.y + player.height < vp.height);
    }

    #[test]
    fn test_respawn_x_in_range() {
        let mut state = GameState::new(42);
        for _ in 0..200 {
            state.respawn_adversary();
            let max_x = state.viewport.width - state.adversary.width;
            assert!(state.adversary.pos.x >= 0.0 && state.adversary.pos.x <= max_x);
            assert_eq!(state.adversary.pos.y, 0.0);
            assert!(state.adversary.visible);
        }
    }

    #[test]
    fn test_same_seed_same_positions() {
        let mut a = GameState::new(99);
        let mut b = GameState::new(99);
        for _ in 0..10 {
            assert_eq!(a.random_adversary_x(), b.random_adversary_x());
        }
    }

    #[test]
    fn test_countdown_label() {
        assert_eq!(GamePhase::Countdown(3).countdown_label().as_deref(), Some("3"));
        assert_eq!(
            GamePhase::Countdown(0).countdown_label().as_deref(),
            Some("START!")
        );
        assert_eq!(GamePhase::Running.countdown_label(), None);
    }
}
