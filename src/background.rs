//! Infinite vertical background scroll
//!
//! Runs off the render loop, not the gameplay timers. Two copies of the
//! background are drawn one viewport-height apart at [`BackgroundScroll::layers`],
//! which makes the wrap seamless.
//!
//! Freezing keeps the loop alive with zero speed (pause: last frame stays on
//! screen, resume is free). Stopping ends the loop (game over).

use crate::consts::REFERENCE_FRAME_MS;

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundScroll {
    /// Current offset, always in [0, height)
    offset: f32,
    /// Pixels per 60 Hz frame; 0 while frozen
    speed: f32,
    /// Speed to restore on unfreeze
    saved_speed: Option<f32>,
    running: bool,
    height: f32,
}

impl BackgroundScroll {
    pub fn new(speed: f32, height: f32) -> Self {
        Self {
            offset: 0.0,
            speed,
            saved_speed: None,
            running: false,
            height: height.max(1.0),
        }
    }

    /// Start the loop. No-op if it is already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    /// End the loop entirely
    pub fn stop(&mut self) {
        self.running = false;
        if let Some(speed) = self.saved_speed.take() {
            self.speed = speed;
        }
    }

    /// Hold the current frame without ending the loop
    pub fn freeze(&mut self) {
        if self.saved_speed.is_none() {
            self.saved_speed = Some(self.speed);
        }
        self.speed = 0.0;
    }

    /// Restore the speed saved by [`freeze`](Self::freeze), or start the
    /// loop if nothing was frozen
    pub fn unfreeze(&mut self) {
        match self.saved_speed.take() {
            Some(speed) => self.speed = speed,
            None => {
                self.start();
            }
        }
    }

    /// Advance by one frame of `dt_ms`
    pub fn advance(&mut self, dt_ms: f32) {
        if !self.running {
            return;
        }
        let delta = self.speed * dt_ms / REFERENCE_FRAME_MS;
        self.offset = (self.offset + delta).rem_euclid(self.height);
    }

    /// Track a viewport height change, keeping the offset wrapped
    pub fn set_height(&mut self, height: f32) {
        self.height = height.max(1.0);
        self.offset = self.offset.rem_euclid(self.height);
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Effective speed (0 while frozen)
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_frozen(&self) -> bool {
        self.saved_speed.is_some()
    }

    /// Vertical draw offsets of the two background copies
    pub fn layers(&self) -> [f32; 2] {
        [self.offset, self.offset - self.height]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FRAME: f32 = REFERENCE_FRAME_MS;

    #[test]
    fn test_idle_until_started() {
        let mut bg = BackgroundScroll::new(7.0, 600.0);
        bg.advance(FRAME);
        assert_eq!(bg.offset(), 0.0);

        assert!(bg.start());
        assert!(!bg.start());
        bg.advance(FRAME);
        assert!((bg.offset() - 7.0).abs() < 1e-4);
    }

    #[test]
    fn test_freeze_preserves_offset_and_speed() {
        let mut bg = BackgroundScroll::new(7.0, 600.0);
        bg.start();
        for _ in 0..10 {
            bg.advance(FRAME);
        }
        let offset = bg.offset();

        bg.freeze();
        bg.freeze();
        assert_eq!(bg.speed(), 0.0);
        for _ in 0..100 {
            bg.advance(FRAME);
        }
        assert_eq!(bg.offset(), offset);
        assert!(bg.is_running());

        bg.unfreeze();
        assert_eq!(bg.speed(), 7.0);
        assert_eq!(bg.offset(), offset);
        assert!(!bg.is_frozen());
    }

    #[test]
    fn test_stop_halts_loop() {
        let mut bg = BackgroundScroll::new(7.0, 600.0);
        bg.start();
        bg.advance(FRAME);
        bg.stop();
        let offset = bg.offset();
        bg.advance(FRAME * 10.0);
        assert_eq!(bg.offset(), offset);
        assert!(!bg.is_running());
    }

    #[test]
    fn test_unfreeze_without_freeze_starts() {
        let mut bg = BackgroundScroll::new(7.0, 600.0);
        bg.unfreeze();
        assert!(bg.is_running());
    }

    #[test]
    fn test_layers_one_height_apart() {
        let mut bg = BackgroundScroll::new(7.0, 600.0);
        bg.start();
        bg.advance(FRAME * 3.0);
        let [a, b] = bg.layers();
        assert!((a - b - 600.0).abs() < 1e-4);
    }

    #[test]
    fn test_shrinking_height_rewraps() {
        let mut bg = BackgroundScroll::new(100.0, 600.0);
        bg.start();
        bg.advance(FRAME * 5.0);
        bg.set_height(300.0);
        assert!(bg.offset() < 300.0);
    }

    proptest! {
        #[test]
        fn offset_stays_wrapped(
            speed in 0.0f32..50.0,
            height in 50.0f32..2000.0,
            frames in proptest::collection::vec(0.0f32..100.0, 1..100),
        ) {
            let mut bg = BackgroundScroll::new(speed, height);
            bg.start();
            for dt in frames {
                bg.advance(dt);
                prop_assert!(bg.offset() >= 0.0 && bg.offset() < height);
            }
        }
    }
}
