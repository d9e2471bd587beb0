//! The foreground loop that ties a [`Validator`] to a [`ValidatorUi`].

use crate::position_store::PositionStore;
use crate::ui::{UiEvent, ValidatorUi};
use crate::validator::{ClickOutcome, Tick, Validator, ValidatorError};

use log::{debug, info};
use std::{sync::Arc, time::Duration};

/// How long the loop waits for input before ticking the validator again.
pub const TICK: Duration = Duration::from_millis(50);

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Every cell was tested
    Completed,
    /// The user quit early
    Aborted,
}

/// Run a validation from the splash screen until every cell is tested or the
/// user quits.
///
/// `pointer` is kept up to date with every pointer movement, for trackers
/// that follow the pointer. Measurements are flushed whichever way the
/// session ends.
pub fn run_session(
    validator: &mut Validator,
    ui: &mut dyn ValidatorUi,
    pointer: &PositionStore,
) -> Result<SessionEnd, ValidatorError> {
    ui.show_splash()?;

    loop {
        if validator.tick(ui)? == Tick::Finished {
            return Ok(SessionEnd::Completed);
        }

        if ui.in_test_routine() {
            let (right, left) = validator.gaze_store().lock().right_left();
            ui.show_gaze(right, left)?;
        }

        match ui.poll_event(TICK)? {
            Some(UiEvent::Quit) => {
                info!("Validation stopped by the user.");
                ui.stop()?;
                validator.flush()?;
                return Ok(SessionEnd::Aborted);
            }
            Some(UiEvent::Click(pos)) => {
                pointer.set_single(pos, 0.0);
                if let ClickOutcome::Hit { index } = validator.handle_click(pos) {
                    debug!("Hit on target {index}");
                }
            }
            Some(UiEvent::PointerMoved(pos)) => pointer.set_single(pos, 0.0),
            Some(UiEvent::Begin) | None => {}
        }
    }
}

/// Show every target at once until the user quits. Nothing is measured.
pub fn run_preview(validator: &Validator, ui: &mut dyn ValidatorUi) -> Result<(), ValidatorError> {
    let targets = validator.preview_targets();
    ui.show_preview(&targets, validator.target_size(), validator.style())?;

    while ui.poll_event(TICK)? != Some(UiEvent::Quit) {}

    ui.stop()?;
    Ok(())
}
