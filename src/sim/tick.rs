//! Lifecycle state machine and fixed-cadence gameplay ticks
//!
//! Commands are validated against the current phase before they touch any
//! entity. Every gameplay timer checks the phase first and does nothing
//! unless the game is running.

use glam::Vec2;

use super::collision::overlap;
use super::state::{GameEvent, GamePhase, GameState, Projectile, Timer, Viewport};
use crate::audio::Cue;

/// A validated-at-apply-time request from the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Restart,
    /// Left direction pressed (`true`) or released (`false`)
    Left(bool),
    Right(bool),
    Fire,
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub commands: Vec<Command>,
}

impl TickInput {
    pub fn single(command: Command) -> Self {
        Self {
            commands: vec![command],
        }
    }
}

/// Apply the commands, then advance the sim clock by `dt_ms`, firing every
/// timer that falls due in time order.
pub fn tick(state: &mut GameState, input: &TickInput, dt_ms: u32) {
    for &command in &input.commands {
        apply_command(state, command);
    }

    let target = state.timers.now_ms() + dt_ms as u64;
    while let Some(timer) = state.timers.next_due(target) {
        on_timer(state, timer);
    }
    state.timers.advance_to(target);
}

/// Apply one command if the current phase allows it.
///
/// Returns true when the command was honored. Rejected commands leave the
/// phase, score and every entity untouched.
pub fn apply_command(state: &mut GameState, command: Command) -> bool {
    match (command, state.phase) {
        (Command::Start, GamePhase::Idle) => {
            begin_countdown(state);
            true
        }
        (Command::Pause, GamePhase::Running) => {
            pause(state);
            true
        }
        (Command::Resume, GamePhase::Paused) => {
            resume(state);
            true
        }
        (Command::Restart, GamePhase::GameOver) => {
            restart(state);
            true
        }
        (Command::Left(down), phase) => {
            state.held.left = down;
            press_direction(state, down, phase)
        }
        (Command::Right(down), phase) => {
            state.held.right = down;
            press_direction(state, down, phase)
        }
        (Command::Fire, GamePhase::Running) => fire(state),
        (command, phase) => {
            log::debug!("Ignoring {:?} while {}", command, phase.as_str());
            false
        }
    }
}

/// Held flags track the device even outside a run so a release is never
/// lost; only a press while running counts as accepted.
fn press_direction(state: &mut GameState, down: bool, phase: GamePhase) -> bool {
    if phase != GamePhase::Running {
        return false;
    }
    if down {
        state.emit(GameEvent::Cue(Cue::Move));
    }
    true
}

fn on_timer(state: &mut GameState, timer: Timer) {
    if timer == Timer::Countdown {
        countdown_step(state);
        return;
    }

    if state.phase != GamePhase::Running {
        if timer == Timer::Respawn && state.phase == GamePhase::Paused {
            state.respawn_pending = true;
        }
        return;
    }

    match timer {
        Timer::PlayerMove => move_player(state),
        Timer::ProjectileStep => step_projectiles(state),
        Timer::AdversaryFall => adversary_fall(state),
        Timer::AdversaryReposition => adversary_reposition(state),
        Timer::Respawn => state.respawn_adversary(),
        Timer::Countdown => {}
    }
}

// === Lifecycle transitions ===

fn begin_countdown(state: &mut GameState) {
    state.timers.cancel_all();
    state.game_over_latched = false;
    state.respawn_pending = false;
    state.reset_entities();

    let seconds = state.tuning.countdown_seconds;
    state.set_phase(GamePhase::Countdown(seconds));
    state
        .timers
        .every(Timer::Countdown, state.tuning.countdown_period_ms);
    state.emit(GameEvent::MusicIntro);
}

fn countdown_step(state: &mut GameState) {
    match state.phase {
        GamePhase::Countdown(0) => {
            state.timers.cancel(Timer::Countdown);
            enter_running(state);
        }
        GamePhase::Countdown(n) => state.set_phase(GamePhase::Countdown(n - 1)),
        _ => {
            state.timers.cancel(Timer::Countdown);
        }
    }
}

fn enter_running(state: &mut GameState) {
    state.set_phase(GamePhase::Running);

    let tuning = &state.tuning;
    let cadences = [
        (Timer::PlayerMove, tuning.player_period_ms),
        (Timer::ProjectileStep, tuning.projectile_period_ms),
        (Timer::AdversaryFall, tuning.fall_period_ms),
        (Timer::AdversaryReposition, tuning.reposition_period_ms),
    ];
    for (timer, period) in cadences {
        state.timers.every(timer, period);
    }
    state.emit(GameEvent::ScrollStart);
}

fn pause(state: &mut GameState) {
    state.set_phase(GamePhase::Paused);
    state.emit(GameEvent::MusicPause);
    state.emit(GameEvent::ScrollFreeze);
}

fn resume(state: &mut GameState) {
    state.set_phase(GamePhase::Running);
    if state.respawn_pending {
        state.respawn_adversary();
    }
    state.emit(GameEvent::MusicResume);
    state.emit(GameEvent::ScrollUnfreeze);
}

fn restart(state: &mut GameState) {
    state.set_phase(GamePhase::Idle);
    begin_countdown(state);
}

/// End the run. Only the first call per run has any effect.
///
/// Returns true if this call performed the transition.
pub fn trigger_game_over(state: &mut GameState) -> bool {
    if state.game_over_latched {
        return false;
    }
    state.game_over_latched = true;
    state.respawn_pending = false;

    for timer in [
        Timer::AdversaryFall,
        Timer::AdversaryReposition,
        Timer::Respawn,
        Timer::PlayerMove,
        Timer::ProjectileStep,
    ] {
        state.timers.cancel(timer);
    }

    state.set_phase(GamePhase::GameOver);
    state.emit(GameEvent::ScrollStop);
    state.emit(GameEvent::MusicStop);
    state.emit(GameEvent::Cue(Cue::GameOver));
    state.emit(GameEvent::GameOver { score: state.score });
    log::info!("Game over, score {}", state.score);
    true
}

// === Gameplay ticks ===

fn move_player(state: &mut GameState) {
    let step = state.tuning.player_step;
    let margin = state.tuning.player_edge_margin;
    let max_x = state.player.max_x(&state.viewport);
    let player = &mut state.player;

    if state.held.left && player.x > margin {
        player.x = (player.x - step).max(0.0);
    }
    if state.held.right && player.x < max_x - margin {
        player.x = (player.x + step).min(max_x);
    }
}

fn fire(state: &mut GameState) -> bool {
    if let Some(cap) = state.tuning.max_projectiles {
        if state.projectiles.len() >= cap {
            return false;
        }
    }

    let size = Vec2::new(state.tuning.projectile_width, state.tuning.projectile_height);
    let player = &state.player;
    let pos = Vec2::new(
        player.x + player.width / 2.0 - size.x / 2.0,
        player.y - state.tuning.projectile_spawn_gap,
    );
    let id = state.next_entity_id();
    state.projectiles.push(Projectile { id, pos, size });
    state.emit(GameEvent::Cue(Cue::Shoot));
    true
}

/// One pass over the projectile arena.
///
/// Per projectile: move up, then drop it if it left the top, then test it
/// against the adversary. A shot that leaves the screen never scores.
fn step_projectiles(state: &mut GameState) {
    let step = state.tuning.projectile_step;
    let exit_y = -state.tuning.projectile_exit_margin;
    let target = state.adversary.visible.then(|| state.adversary.bounds());
    let mut hit = false;

    state.projectiles.retain_mut(|projectile| {
        projectile.pos.y -= step;
        if projectile.pos.y < exit_y {
            return false;
        }
        match target {
            Some(bounds) if !hit && overlap(&projectile.bounds(), &bounds) => {
                hit = true;
                false
            }
            _ => true,
        }
    });

    if hit {
        on_hit(state);
    }
}

fn on_hit(state: &mut GameState) {
    state.adversary.visible = false;
    state.score += 1;
    state.emit(GameEvent::Cue(Cue::Hit));
    state.emit(GameEvent::ScoreChanged(state.score));
    state
        .timers
        .after(Timer::Respawn, state.tuning.respawn_delay_ms);
}

fn adversary_fall(state: &mut GameState) {
    if !state.adversary.visible {
        return;
    }
    state.adversary.pos.y += state.tuning.fall_step;
    let threshold = state.viewport.height - state.tuning.game_over_margin;
    if state.adversary.pos.y > threshold {
        trigger_game_over(state);
    }
}

fn adversary_reposition(state: &mut GameState) {
    if !state.adversary.visible {
        return;
    }
    state.adversary.pos.x = state.random_adversary_x();
}

/// Absorb a viewport size change.
///
/// Layout-derived sizes and bounds are recomputed; positions are only
/// clamped, except while idle when the player is re-centered.
pub fn resize(state: &mut GameState, width: f32, height: f32) {
    state.viewport = Viewport::new(width, height);
    state.player.layout(&state.viewport);
    state.adversary.layout(&state.viewport);
    if state.phase == GamePhase::Idle {
        state.player.center(&state.viewport);
    }
    log::debug!("Viewport resized to {}x{}", width, height);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn press(state: &mut GameState, command: Command) -> bool {
        apply_command(state, command)
    }

    /// Idle -> Running, with the countdown fully elapsed
    fn running_state(seed: u64) -> GameState {
        let mut state = GameState::new(seed);
        assert!(press(&mut state, Command::Start));
        let countdown_ms = (state.tuning.countdown_seconds as u32 + 1) * 1000;
        tick(&mut state, &TickInput::default(), countdown_ms);
        assert_eq!(state.phase, GamePhase::Running);
        state.drain_events();
        state
    }

    fn park_adversary(state: &mut GameState, x: f32, y: f32, w: f32, h: f32) {
        state.adversary.pos = Vec2::new(x, y);
        state.adversary.width = w;
        state.adversary.height = h;
        state.adversary.visible = true;
    }

    #[test]
    fn test_start_enters_countdown() {
        let mut state = GameState::new(1);
        assert!(press(&mut state, Command::Start));
        assert_eq!(state.phase, GamePhase::Countdown(5));
        assert!(state.events.contains(&GameEvent::MusicIntro));
        assert!(state.timers.is_scheduled(Timer::Countdown));
    }

    #[test]
    fn test_countdown_timing() {
        let mut state = GameState::new(1);
        press(&mut state, Command::Start);
        let idle = TickInput::default();

        for expected in (0..5).rev() {
            tick(&mut state, &idle, 1000);
            assert_eq!(state.phase, GamePhase::Countdown(expected));
        }
        // "START!" stays up for one more tick
        tick(&mut state, &idle, 999);
        assert_eq!(state.phase, GamePhase::Countdown(0));
        tick(&mut state, &idle, 1);
        assert_eq!(state.phase, GamePhase::Running);
        assert!(!state.timers.is_scheduled(Timer::Countdown));
        assert!(state.events.contains(&GameEvent::ScrollStart));
    }

    #[test]
    fn test_countdown_in_one_big_step() {
        let mut state = GameState::new(1);
        press(&mut state, Command::Start);
        tick(&mut state, &TickInput::default(), 5999);
        assert_eq!(state.phase, GamePhase::Countdown(0));
        tick(&mut state, &TickInput::default(), 1);
        assert_eq!(state.phase, GamePhase::Running);
    }

    #[test]
    fn test_countdown_ignores_gameplay_input() {
        let mut state = GameState::new(1);
        press(&mut state, Command::Start);
        let player = state.player;
        assert!(!press(&mut state, Command::Fire));
        assert!(!press(&mut state, Command::Pause));
        assert!(!press(&mut state, Command::Left(true)));
        tick(&mut state, &TickInput::default(), 500);
        assert!(state.projectiles.is_empty());
        assert_eq!(state.player, player);
        assert_eq!(state.phase, GamePhase::Countdown(5));
    }

    #[test]
    fn test_hit_scores_and_respawns() {
        let mut state = running_state(3);
        park_adversary(&mut state, 50.0, 100.0, 80.0, 60.0);
        state.projectiles.push(Projectile {
            id: 999,
            // One step below the overlap position, so the step lands at y=150
            pos: Vec2::new(60.0, 162.0),
            size: Vec2::new(40.0, 20.0),
        });
        let remaining = state.timers.remaining_ms(Timer::ProjectileStep).unwrap() as u32;
        tick(&mut state, &TickInput::default(), remaining);

        assert_eq!(state.score, 1);
        assert!(!state.adversary.visible);
        assert!(state.projectiles.is_empty());
        assert!(state.events.contains(&GameEvent::Cue(Cue::Hit)));
        assert!(state.events.contains(&GameEvent::ScoreChanged(1)));

        tick(&mut state, &TickInput::default(), 299);
        assert!(!state.adversary.visible);
        tick(&mut state, &TickInput::default(), 1);
        assert!(state.adversary.visible);
        assert_eq!(state.adversary.pos.y, 0.0);
        let max_x = state.viewport.width - state.adversary.width;
        assert!(state.adversary.pos.x >= 0.0 && state.adversary.pos.x <= max_x);
        assert_eq!(state.score, 1);
    }

    #[test]
    fn test_hidden_adversary_is_not_hit() {
        let mut state = running_state(3);
        park_adversary(&mut state, 50.0, 100.0, 80.0, 60.0);
        state.adversary.visible = false;
        state.timers.cancel(Timer::Respawn);
        state.projectiles.push(Projectile {
            id: 999,
            pos: Vec2::new(60.0, 162.0),
            size: Vec2::new(40.0, 20.0),
        });
        tick(&mut state, &TickInput::default(), 20);
        assert_eq!(state.score, 0);
        assert_eq!(state.projectiles.len(), 1);
    }

    #[test]
    fn test_out_of_bounds_projectile_never_scores() {
        let mut state = running_state(4);
        // Adversary sitting above the exit line
        park_adversary(&mut state, 0.0, -200.0, 400.0, 155.0);
        state.projectiles.push(Projectile {
            id: 1,
            pos: Vec2::new(10.0, -35.0),
            size: Vec2::new(40.0, 20.0),
        });
        tick(&mut state, &TickInput::default(), 20);
        assert!(state.projectiles.is_empty());
        assert_eq!(state.score, 0);
        assert!(state.adversary.visible);
    }

    #[test]
    fn test_fire_spawns_above_player() {
        let mut state = running_state(5);
        assert!(press(&mut state, Command::Fire));
        assert!(press(&mut state, Command::Fire));
        assert_eq!(state.projectiles.len(), 2);

        let shot = state.projectiles[0];
        let player = state.player;
        assert_eq!(shot.pos.x, player.x + player.width / 2.0 - 20.0);
        assert_eq!(shot.pos.y, player.y - 10.0);
        assert_ne!(state.projectiles[0].id, state.projectiles[1].id);
        assert!(state.events.contains(&GameEvent::Cue(Cue::Shoot)));
    }

    #[test]
    fn test_projectile_cap() {
        let mut state = running_state(5);
        state.tuning.max_projectiles = Some(2);
        assert!(press(&mut state, Command::Fire));
        assert!(press(&mut state, Command::Fire));
        assert!(!press(&mut state, Command::Fire));
        assert_eq!(state.projectiles.len(), 2);
    }

    #[test]
    fn test_projectiles_leave_the_screen() {
        let mut state = running_state(6);
        state.timers.cancel(Timer::AdversaryFall);
        state.adversary.visible = false;
        state.timers.cancel(Timer::Respawn);
        press(&mut state, Command::Fire);
        tick(&mut state, &TickInput::default(), 2000);
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_held_movement_and_edges() {
        let mut state = running_state(7);
        state.timers.cancel(Timer::AdversaryFall);
        let start_x = state.player.x;

        press(&mut state, Command::Left(true));
        assert!(state.events.contains(&GameEvent::Cue(Cue::Move)));
        tick(&mut state, &TickInput::default(), 25);
        assert_eq!(state.player.x, start_x - 12.0);

        // Hold long enough to reach the wall; movement stops inside the margin
        tick(&mut state, &TickInput::default(), 2000);
        assert_eq!(state.player.x, 4.0);

        press(&mut state, Command::Left(false));
        press(&mut state, Command::Right(true));
        tick(&mut state, &TickInput::default(), 5000);
        let max_x = state.player.max_x(&state.viewport);
        assert!(state.player.x <= max_x);
        assert!(state.player.x >= max_x - 5.0);

        press(&mut state, Command::Right(false));
        let x = state.player.x;
        tick(&mut state, &TickInput::default(), 100);
        assert_eq!(state.player.x, x);
    }

    #[test]
    fn test_fall_triggers_game_over_once() {
        let mut state = running_state(8);
        let threshold = state.viewport.height - 200.0;
        let y0 = state.adversary.pos.y;

        tick(&mut state, &TickInput::default(), 28);
        assert_eq!(state.adversary.pos.y, y0 + 6.0);

        state.adversary.pos.y = threshold - 1.0;
        tick(&mut state, &TickInput::default(), 28);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(!state.timers.is_scheduled(Timer::AdversaryFall));
        assert!(!state.timers.is_scheduled(Timer::AdversaryReposition));

        // A stray extra fall cannot end the run twice
        adversary_fall(&mut state);
        assert!(!trigger_game_over(&mut state));
        let game_overs = state
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert_eq!(game_overs, 1);
        assert!(state.events.contains(&GameEvent::MusicStop));
        assert!(state.events.contains(&GameEvent::ScrollStop));
        assert!(state.events.contains(&GameEvent::Cue(Cue::GameOver)));
    }

    #[test]
    fn test_reposition_keeps_y() {
        let mut state = running_state(9);
        state.timers.cancel(Timer::AdversaryFall);
        let y = state.adversary.pos.y;
        tick(&mut state, &TickInput::default(), 2900 * 4);
        assert_eq!(state.adversary.pos.y, y);
        let max_x = state.adversary.max_x(&state.viewport);
        assert!(state.adversary.pos.x <= max_x);
    }

    #[test]
    fn test_pause_freezes_everything() {
        let mut state = running_state(10);
        press(&mut state, Command::Fire);
        press(&mut state, Command::Left(true));
        state.drain_events();

        assert!(press(&mut state, Command::Pause));
        assert_eq!(state.phase, GamePhase::Paused);
        assert_eq!(
            state.events,
            vec![
                GameEvent::PhaseChanged {
                    from: GamePhase::Running,
                    to: GamePhase::Paused
                },
                GameEvent::MusicPause,
                GameEvent::ScrollFreeze,
            ]
        );

        let before = (state.player, state.adversary, state.projectiles.clone(), state.score);
        tick(&mut state, &TickInput::default(), 10_000);
        assert!(!press(&mut state, Command::Fire));
        let after = (state.player, state.adversary, state.projectiles.clone(), state.score);
        assert_eq!(before, after);

        assert!(press(&mut state, Command::Resume));
        assert_eq!(state.phase, GamePhase::Running);
        assert!(state.events.contains(&GameEvent::MusicResume));
        assert!(state.events.contains(&GameEvent::ScrollUnfreeze));
    }

    #[test]
    fn test_respawn_deferred_while_paused() {
        let mut state = running_state(11);
        park_adversary(&mut state, 50.0, 100.0, 80.0, 60.0);
        state.projectiles.push(Projectile {
            id: 999,
            pos: Vec2::new(60.0, 162.0),
            size: Vec2::new(40.0, 20.0),
        });
        tick(&mut state, &TickInput::default(), 20);
        assert!(!state.adversary.visible);

        press(&mut state, Command::Pause);
        tick(&mut state, &TickInput::default(), 1000);
        assert!(!state.adversary.visible);
        assert!(state.is_respawn_pending());

        press(&mut state, Command::Resume);
        assert!(state.adversary.visible);
        assert_eq!(state.adversary.pos.y, 0.0);
    }

    #[test]
    fn test_restart_resets_score() {
        let mut state = running_state(12);
        state.score = 9;
        trigger_game_over(&mut state);
        assert!(!press(&mut state, Command::Start));
        assert!(!press(&mut state, Command::Resume));
        assert_eq!(state.score, 9);

        assert!(press(&mut state, Command::Restart));
        assert_eq!(state.phase, GamePhase::Countdown(5));
        assert_eq!(state.score, 0);
        assert!(!state.is_game_over_latched());
        assert!(state.events.contains(&GameEvent::PhaseChanged {
            from: GamePhase::GameOver,
            to: GamePhase::Idle
        }));
    }

    #[test]
    fn test_resize_clamps_and_recenters() {
        let mut state = GameState::new(13);
        resize(&mut state, 800.0, 700.0);
        assert_eq!(state.player.width, 140.0);
        assert_eq!(state.player.x, (800.0 - 140.0) / 2.0);

        let mut state = running_state(13);
        state.player.x = 300.0;
        state.score = 4;
        resize(&mut state, 200.0, 500.0);
        assert_eq!(state.player.x, state.player.max_x(&state.viewport));
        assert_eq!(state.score, 4);
        assert_eq!(state.phase, GamePhase::Running);
        assert!(state.adversary.pos.x <= state.adversary.max_x(&state.viewport));
    }

    #[test]
    fn test_determinism() {
        let script = [
            (Command::Start, 6000),
            (Command::Right(true), 300),
            (Command::Fire, 150),
            (Command::Right(false), 3000),
            (Command::Fire, 500),
        ];
        let mut a = GameState::new(77);
        let mut b = GameState::new(77);
        for (command, dt) in script {
            let input = TickInput::single(command);
            tick(&mut a, &input, dt);
            tick(&mut b, &input, dt);
        }
        assert_eq!(a.player, b.player);
        assert_eq!(a.adversary, b.adversary);
        assert_eq!(a.projectiles, b.projectiles);
        assert_eq!(a.phase, b.phase);
    }

    fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            Just(Command::Start),
            Just(Command::Pause),
            Just(Command::Resume),
            Just(Command::Restart),
            Just(Command::Fire),
            any::<bool>().prop_map(Command::Left),
            any::<bool>().prop_map(Command::Right),
        ]
    }

    fn is_valid(command: Command, phase: GamePhase) -> bool {
        matches!(
            (command, phase),
            (Command::Start, GamePhase::Idle)
                | (Command::Pause, GamePhase::Running)
                | (Command::Resume, GamePhase::Paused)
                | (Command::Restart, GamePhase::GameOver)
                | (Command::Fire, GamePhase::Running)
                | (Command::Left(_), GamePhase::Running)
                | (Command::Right(_), GamePhase::Running)
        )
    }

    proptest! {
        #[test]
        fn invalid_commands_change_nothing(
            phase_index in 0usize..5,
            command in arb_command(),
        ) {
            let mut state = running_state(21);
            match phase_index {
                0 => state = GameState::new(21),
                1 => {
                    state = GameState::new(21);
                    press(&mut state, Command::Start);
                }
                2 => {}
                3 => { press(&mut state, Command::Pause); }
                _ => { trigger_game_over(&mut state); }
            }
            prop_assume!(!is_valid(command, state.phase));

            let before = (
                state.phase,
                state.score,
                state.player,
                state.adversary,
                state.projectiles.clone(),
            );
            prop_assert!(!press(&mut state, command));
            let after = (
                state.phase,
                state.score,
                state.player,
                state.adversary,
                state.projectiles.clone(),
            );
            prop_assert_eq!(before, after);
        }

        #[test]
        fn score_never_decreases_while_playing(
            seed in 0u64..1000,
            script in prop::collection::vec(
                (
                    prop_oneof![
                        Just(Command::Fire),
                        any::<bool>().prop_map(Command::Left),
                        any::<bool>().prop_map(Command::Right),
                    ],
                    0u32..400,
                ),
                1..60,
            ),
        ) {
            let mut state = running_state(seed);
            let mut score = state.score;
            for (command, dt) in script {
                tick(&mut state, &TickInput::single(command), dt);
                prop_assert!(state.score >= score);
                score = state.score;
            }
        }
    }
}
