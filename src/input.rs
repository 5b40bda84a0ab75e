//! Raw device events to lifecycle/entity commands
//!
//! Keyboard, touch, mouse and window-focus events all funnel through
//! [`InputRouter::route`]. The router only translates; whether a command is
//! honored is decided by the sim against the current phase.

use crate::sim::{Command, GamePhase};

/// Keys the game listens to, by `KeyboardEvent.code`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    ArrowLeft,
    ArrowRight,
    Space,
    KeyP,
}

impl KeyCode {
    /// Map a DOM `code` string; unrelated keys give `None`
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ArrowLeft" => Some(KeyCode::ArrowLeft),
            "ArrowRight" => Some(KeyCode::ArrowRight),
            "Space" => Some(KeyCode::Space),
            "KeyP" => Some(KeyCode::KeyP),
            _ => None,
        }
    }
}

/// On-screen controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Left,
    Right,
    Shoot,
    Pause,
    /// Start when idle, resume when paused
    Play,
    /// Result panel restart
    Restart,
}

impl Button {
    /// Map a DOM element id
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "left-btn" => Some(Button::Left),
            "right-btn" => Some(Button::Right),
            "shoot-btn" => Some(Button::Shoot),
            "pause-btn" => Some(Button::Pause),
            "play-btn" | "resume-big-btn" => Some(Button::Play),
            "restart-btn" => Some(Button::Restart),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Button::Left => "left-btn",
            Button::Right => "right-btn",
            Button::Shoot => "shoot-btn",
            Button::Pause => "pause-btn",
            Button::Play => "play-btn",
            Button::Restart => "restart-btn",
        }
    }

    /// Buttons that act while held, not on a single press
    pub fn is_hold(&self) -> bool {
        matches!(self, Button::Left | Button::Right)
    }
}

/// Device-level input, already stripped of DOM types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown { key: KeyCode, repeat: bool },
    KeyUp { key: KeyCode },
    /// Touch start or mouse down on a control
    ButtonDown(Button),
    /// Touch end, mouse up or pointer leaving a hold control
    ButtonUp(Button),
    /// Window blur or tab hidden
    FocusLost,
}

/// Stateful translator from [`InputEvent`] to [`Command`]
#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    left_down: bool,
    right_down: bool,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one event given the current phase.
    ///
    /// Keyboard autorepeat on the arrows is collapsed into one press so the
    /// move cue plays once per physical press.
    pub fn route(
        &mut self,
        event: InputEvent,
        phase: GamePhase,
        pause_on_blur: bool,
    ) -> Option<Command> {
        match event {
            InputEvent::KeyDown { key, repeat } => match key {
                KeyCode::ArrowLeft => self.press_left(repeat),
                KeyCode::ArrowRight => self.press_right(repeat),
                KeyCode::Space => Some(Command::Fire),
                KeyCode::KeyP if !repeat => toggle_pause(phase),
                KeyCode::KeyP => None,
            },
            InputEvent::KeyUp { key } => match key {
                KeyCode::ArrowLeft => self.release_left(),
                KeyCode::ArrowRight => self.release_right(),
                _ => None,
            },
            InputEvent::ButtonDown(button) => match button {
                Button::Left => self.press_left(false),
                Button::Right => self.press_right(false),
                Button::Shoot => Some(Command::Fire),
                Button::Pause => Some(Command::Pause),
                Button::Play => play(phase),
                Button::Restart => Some(Command::Restart),
            },
            InputEvent::ButtonUp(button) => match button {
                Button::Left => self.release_left(),
                Button::Right => self.release_right(),
                _ => None,
            },
            InputEvent::FocusLost => {
                if pause_on_blur && phase == GamePhase::Running {
                    Some(Command::Pause)
                } else {
                    None
                }
            }
        }
    }

    /// Release both directions, e.g. after a blur swallowed the key-up
    pub fn release_all(&mut self) -> [Command; 2] {
        self.left_down = false;
        self.right_down = false;
        [Command::Left(false), Command::Right(false)]
    }

    /// Directions the router believes are held
    pub fn held(&self) -> (bool, bool) {
        (self.left_down, self.right_down)
    }

    fn press_left(&mut self, repeat: bool) -> Option<Command> {
        if repeat || self.left_down {
            return None;
        }
        self.left_down = true;
        Some(Command::Left(true))
    }

    fn press_right(&mut self, repeat: bool) -> Option<Command> {
        if repeat || self.right_down {
            return None;
        }
        self.right_down = true;
        Some(Command::Right(true))
    }

    // Releases always go through so the sim never sticks on a held direction
    fn release_left(&mut self) -> Option<Command> {
        self.left_down = false;
        Some(Command::Left(false))
    }

    fn release_right(&mut self) -> Option<Command> {
        self.right_down = false;
        Some(Command::Right(false))
    }
}

fn toggle_pause(phase: GamePhase) -> Option<Command> {
    match phase {
        GamePhase::Running => Some(Command::Pause),
        GamePhase::Paused => Some(Command::Resume),
        _ => None,
    }
}

fn play(phase: GamePhase) -> Option<Command> {
    match phase {
        GamePhase::Idle => Some(Command::Start),
        GamePhase::Paused => Some(Command::Resume),
        _ => None,
    }
}
