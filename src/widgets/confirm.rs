//! Two-step delete confirmation.
//!
//! First click arms the button, a second click inside the window confirms;
//! otherwise the arm times out and the button falls back to idle. Modeled
//! as an explicit two-state machine rather than a visual property.

use std::time::{Duration, Instant};

/// Outcome of one click.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmClick {
    /// Armed; click again within the window to confirm.
    Armed,
    /// Confirmed; the caller performs the destructive action.
    Confirmed,
}

/// `Idle -> Armed -> Idle` with a disarm deadline.
#[derive(Debug)]
pub struct ConfirmButton {
    armed_until: Option<Instant>,
    window: Duration,
}

impl Default for ConfirmButton {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmButton {
    /// Default one-second confirm window.
    pub fn new() -> Self {
        Self::with_window(Duration::from_millis(1000))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            armed_until: None,
            window,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed_until.is_some()
    }

    /// Handle one click at the given instant.
    pub fn click(&mut self, now: Instant) -> ConfirmClick {
        match self.armed_until {
            Some(deadline) if now < deadline => {
                self.armed_until = None;
                ConfirmClick::Confirmed
            }
            _ => {
                self.armed_until = Some(now + self.window);
                ConfirmClick::Armed
            }
        }
    }

    /// Disarm if the window has elapsed. Call from the host update loop.
    pub fn tick(&mut self, now: Instant) {
        if let Some(deadline) = self.armed_until
            && now >= deadline
        {
            self.armed_until = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_click_within_window_confirms() {
        let mut button = ConfirmButton::with_window(Duration::from_millis(100));
        let t0 = Instant::now();

        assert_eq!(button.click(t0), ConfirmClick::Armed);
        assert!(button.is_armed());
        assert_eq!(
            button.click(t0 + Duration::from_millis(50)),
            ConfirmClick::Confirmed
        );
        assert!(!button.is_armed());
    }

    #[test]
    fn test_late_click_rearms_instead_of_confirming() {
        let mut button = ConfirmButton::with_window(Duration::from_millis(100));
        let t0 = Instant::now();

        assert_eq!(button.click(t0), ConfirmClick::Armed);
        assert_eq!(
            button.click(t0 + Duration::from_millis(150)),
            ConfirmClick::Armed
        );
    }

    #[test]
    fn test_tick_disarms_after_deadline() {
        let mut button = ConfirmButton::with_window(Duration::from_millis(100));
        let t0 = Instant::now();

        let _ = button.click(t0);
        button.tick(t0 + Duration::from_millis(50));
        assert!(button.is_armed());
        button.tick(t0 + Duration::from_millis(100));
        assert!(!button.is_armed());
    }
}
