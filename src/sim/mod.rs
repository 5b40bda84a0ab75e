//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Simulated millisecond clock only, advanced by the caller
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod clock;
pub mod collision;
pub mod state;
pub mod tick;

pub use clock::{FrameClock, Interval, Scheduler};
pub use collision::{Aabb, overlap};
pub use state::{
    Adversary, GameEvent, GamePhase, GameState, HeldDirections, Player, Projectile, Timer,
    Viewport,
};
pub use tick::{Command, TickInput, apply_command, resize, tick, trigger_game_over};
