//! The boundary between the validator and whatever draws on screen.

use crate::config::TargetStyle;
use crate::gui::UiError;
use crate::position::Position;

use std::time::Duration;

/// Something the person at the screen did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// Leave the splash screen and start testing
    Begin,
    /// A confirmed click at the given screen position
    Click(Position),
    /// The pointer moved
    PointerMoved(Position),
    /// Stop, keeping whatever was measured so far
    Quit,
}

/// A display the validator can show targets on and read input from.
pub trait ValidatorUi {
    /// Size of the drawing area, in the same units as every [`Position`]
    /// passed to or from this UI.
    fn screen_resolution(&self) -> (u32, u32);

    /// Show the start screen and wait there until the user begins.
    fn show_splash(&mut self) -> Result<(), UiError>;

    /// Clear the screen and draw a single target.
    fn show_target(
        &mut self,
        pos: Position,
        diameter: u32,
        style: TargetStyle,
    ) -> Result<(), UiError>;

    /// Draw every given target at once.
    fn show_preview(
        &mut self,
        targets: &[Position],
        diameter: u32,
        style: TargetStyle,
    ) -> Result<(), UiError>;

    /// Mark where the tracker thinks the eyes are looking.
    fn show_gaze(&mut self, _right: Position, _left: Position) -> Result<(), UiError> {
        Ok(())
    }

    /// Has the user left the splash screen?
    fn in_test_routine(&self) -> bool;

    /// Wait up to `timeout` for the next event.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<UiEvent>, UiError>;

    /// Take the UI down. Safe to call more than once.
    fn stop(&mut self) -> Result<(), UiError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// A UI that plays back a list of events and remembers what it was asked
    /// to draw.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedUi {
        pub resolution: (u32, u32),
        pub in_test: bool,
        pub events: VecDeque<UiEvent>,
        pub splash_shown: usize,
        pub targets: Vec<Position>,
        pub preview: Vec<Position>,
        pub gaze: Vec<(Position, Position)>,
        pub stopped: usize,
    }

    impl ScriptedUi {
        pub fn new(resolution: (u32, u32)) -> Self {
            Self {
                resolution,
                ..Self::default()
            }
        }

        pub fn with_events(mut self, events: impl IntoIterator<Item = UiEvent>) -> Self {
            self.events.extend(events);
            self
        }
    }

    impl ValidatorUi for ScriptedUi {
        fn screen_resolution(&self) -> (u32, u32) {
            self.resolution
        }

        fn show_splash(&mut self) -> Result<(), UiError> {
            self.splash_shown += 1;
            Ok(())
        }

        fn show_target(
            &mut self,
            pos: Position,
            _diameter: u32,
            _style: TargetStyle,
        ) -> Result<(), UiError> {
            self.targets.push(pos);
            Ok(())
        }

        fn show_preview(
            &mut self,
            targets: &[Position],
            _diameter: u32,
            _style: TargetStyle,
        ) -> Result<(), UiError> {
            self.preview = targets.to_vec();
            Ok(())
        }

        fn show_gaze(&mut self, right: Position, left: Position) -> Result<(), UiError> {
            self.gaze.push((right, left));
            Ok(())
        }

        fn in_test_routine(&self) -> bool {
            self.in_test
        }

        fn poll_event(&mut self, _timeout: Duration) -> Result<Option<UiEvent>, UiError> {
            let event = self.events.pop_front();
            if event == Some(UiEvent::Begin) {
                self.in_test = true;
            }
            Ok(event)
        }

        fn stop(&mut self) -> Result<(), UiError> {
            self.stopped += 1;
            Ok(())
        }
    }
}
