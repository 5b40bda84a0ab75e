//! Shape generation for 2D primitives
//!
//! All coordinates are viewport pixels, y pointing down.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::vertex::{Vertex, colors};
use crate::game::Snapshot;
use crate::sim::{Adversary, GamePhase, Player, Projectile, Viewport};

/// Stars per background copy
const STAR_COUNT: usize = 48;
/// Fixed so the starfield is the same image every frame
const STAR_SEED: u64 = 0x5747_4152;

/// Axis-aligned rectangle as two triangles
pub fn rect(min: Vec2, size: Vec2, color: [f32; 4]) -> [Vertex; 6] {
    let max = min + size;
    [
        Vertex::new(min.x, min.y, color),
        Vertex::new(max.x, min.y, color),
        Vertex::new(min.x, max.y, color),
        Vertex::new(min.x, max.y, color),
        Vertex::new(max.x, min.y, color),
        Vertex::new(max.x, max.y, color),
    ]
}

pub fn triangle(a: Vec2, b: Vec2, c: Vec2, color: [f32; 4]) -> [Vertex; 3] {
    [
        Vertex::new(a.x, a.y, color),
        Vertex::new(b.x, b.y, color),
        Vertex::new(c.x, c.y, color),
    ]
}

/// One copy of the starfield, shifted down by `offset_y`
pub fn starfield(viewport: &Viewport, offset_y: f32) -> Vec<Vertex> {
    let mut rng = Pcg32::seed_from_u64(STAR_SEED);
    let mut vertices = Vec::with_capacity(STAR_COUNT * 6);

    for _ in 0..STAR_COUNT {
        let x = rng.random::<f32>() * viewport.width;
        let y = rng.random::<f32>() * viewport.height + offset_y;
        let bright = rng.random_bool(0.3);
        let (size, color) = if bright {
            (3.0, colors::STAR)
        } else {
            (2.0, colors::STAR_DIM)
        };
        vertices.extend(rect(Vec2::new(x, y), Vec2::splat(size), color));
    }

    vertices
}

/// Upward-pointing ship with a cockpit
pub fn player_ship(player: &Player) -> Vec<Vertex> {
    let Player {
        x,
        y,
        width: w,
        height: h,
    } = *player;
    let mut vertices = Vec::with_capacity(15);

    // Hull
    vertices.extend(triangle(
        Vec2::new(x + w / 2.0, y),
        Vec2::new(x, y + h),
        Vec2::new(x + w, y + h),
        colors::PLAYER,
    ));
    // Cockpit
    vertices.extend(rect(
        Vec2::new(x + w * 0.4, y + h * 0.45),
        Vec2::new(w * 0.2, h * 0.3),
        colors::PLAYER_COCKPIT,
    ));
    // Engine block
    vertices.extend(triangle(
        Vec2::new(x + w * 0.3, y + h),
        Vec2::new(x + w * 0.7, y + h),
        Vec2::new(x + w / 2.0, y + h * 0.7),
        colors::PLAYER_COCKPIT,
    ));

    vertices
}

/// Downward-pointing ship; nothing for a hidden adversary
pub fn adversary_ship(adversary: &Adversary) -> Vec<Vertex> {
    if !adversary.visible {
        return Vec::new();
    }
    let Vec2 { x, y } = adversary.pos;
    let (w, h) = (adversary.width, adversary.height);
    let mut vertices = Vec::with_capacity(12);

    // Wings
    vertices.extend(rect(
        Vec2::new(x, y + h * 0.2),
        Vec2::new(w, h * 0.3),
        colors::ADVERSARY,
    ));
    // Nose
    vertices.extend(triangle(
        Vec2::new(x + w * 0.2, y),
        Vec2::new(x + w * 0.8, y),
        Vec2::new(x + w / 2.0, y + h),
        colors::ADVERSARY,
    ));
    // Core
    vertices.extend(triangle(
        Vec2::new(x + w * 0.4, y + h * 0.2),
        Vec2::new(x + w * 0.6, y + h * 0.2),
        Vec2::new(x + w / 2.0, y + h * 0.6),
        colors::ADVERSARY_CORE,
    ));

    vertices
}

/// Bolt, narrower than its hitbox
pub fn projectile(projectile: &Projectile) -> [Vertex; 6] {
    let size = projectile.size;
    let bolt = Vec2::new(size.x * 0.3, size.y);
    let min = projectile.pos + Vec2::new((size.x - bolt.x) / 2.0, 0.0);
    rect(min, bolt, colors::PROJECTILE)
}

/// Everything visible this frame, back to front.
///
/// Ships are hidden while paused. Otherwise each entity's own visibility
/// decides.
pub fn scene(snapshot: &Snapshot) -> Vec<Vertex> {
    let viewport = &snapshot.viewport;
    let mut vertices = Vec::new();

    // Two copies one viewport-height apart
    for layer in [
        snapshot.scroll_offset,
        snapshot.scroll_offset - viewport.height,
    ] {
        vertices.extend(starfield(viewport, layer));
    }

    for shot in &snapshot.projectiles {
        vertices.extend(projectile(shot));
    }

    if snapshot.phase != GamePhase::Paused {
        vertices.extend(adversary_ship(&snapshot.adversary));
        vertices.extend(player_ship(&snapshot.player));
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Game;
    use crate::sim::Command;

    fn running_snapshot() -> Snapshot {
        let mut game = Game::headless(21);
        game.command(Command::Start);
        game.update(6000);
        game.snapshot()
    }

    #[test]
    fn test_rect_covers_bounds() {
        let v = rect(Vec2::new(10.0, 20.0), Vec2::new(30.0, 40.0), [1.0; 4]);
        let xs: Vec<f32> = v.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = v.iter().map(|v| v.position[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), 10.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 40.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), 20.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 60.0);
    }

    #[test]
    fn test_starfield_stable_between_frames() {
        let vp = Viewport::default();
        assert_eq!(starfield(&vp, 0.0), starfield(&vp, 0.0));
        assert_eq!(starfield(&vp, 0.0).len(), STAR_COUNT * 6);
    }

    #[test]
    fn test_hidden_adversary_not_drawn() {
        let mut snapshot = running_snapshot();
        let visible = scene(&snapshot).len();
        snapshot.adversary.visible = false;
        assert_eq!(scene(&snapshot).len(), visible - 12);
    }

    #[test]
    fn test_idle_draws_only_the_player() {
        let game = Game::headless(21);
        let snapshot = game.snapshot();
        assert!(!snapshot.adversary.visible);
        let stars = STAR_COUNT * 6 * 2;
        assert_eq!(
            scene(&snapshot).len(),
            stars + player_ship(&snapshot.player).len()
        );
    }

    #[test]
    fn test_paused_hides_ships() {
        let mut snapshot = running_snapshot();
        snapshot.phase = GamePhase::Paused;
        assert_eq!(scene(&snapshot).len(), STAR_COUNT * 6 * 2);
    }

    #[test]
    fn test_projectiles_drawn() {
        let mut game = Game::headless(21);
        game.command(Command::Start);
        game.update(6000);
        let before = scene(&game.snapshot()).len();
        game.command(Command::Fire);
        assert_eq!(scene(&game.snapshot()).len(), before + 6);
    }
}
