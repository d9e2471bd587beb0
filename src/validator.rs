//! The trial state machine.
//!
//! A [`Validator`] owns the target, cursor and gaze stores, the grid and the
//! recorder. It moves between three states:
//!
//! ```text
//! AwaitingTarget --tick--> ShowingTarget --hit--> AwaitingTarget ... --tick--> Done
//!                               |   ^
//!                               +---+ miss
//! ```
//!
//! Each tick in `AwaitingTarget` picks a random cell that still needs
//! testing. A click that lands inside the target takes a [`Snapshot`] of all
//! three stores, records it, and counts the cell once more. Once every cell
//! has been hit `repeats` times the recorder is flushed and the UI is taken
//! down.

use crate::config::{ConfigError, TargetStyle, ValidatorConfig};
use crate::grid::Grid;
use crate::gui::UiError;
use crate::position::Position;
use crate::position_store::{PositionStore, Snapshot};
use crate::recorder::{Recorder, RecorderError, TrialRecord};
use crate::ui::ValidatorUi;

use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    borrow::Cow,
    fmt,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    AwaitingTarget,
    ShowingTarget,
    Done,
}

/// What a [`Validator::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Nothing to do until the user acts
    Waiting,
    /// A new target went up
    TargetShown { index: usize, position: Position },
    /// Every cell is done
    Finished,
}

/// What became of a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Inside the target; a row was recorded for this cell
    Hit { index: usize },
    /// Outside the target, or the row could not be recorded
    Miss,
    /// No target was showing
    Ignored,
}

/// Is `cursor` within the circle of the given diameter around `target`?
/// The edge counts as inside.
pub fn hit_test(cursor: Position, target: Position, diameter: u32) -> bool {
    let radius = f64::from(diameter) / 2.0;
    cursor.distance_sq(&target) <= radius.powi(2)
}

pub struct Validator {
    grid: Grid,
    repeats: u32,
    target_size: u32,
    style: TargetStyle,
    test_count: Vec<u32>,
    state: TrialState,
    target_index: usize,
    gaze: Arc<PositionStore>,
    cursor: Arc<PositionStore>,
    target: Arc<PositionStore>,
    recorder: Recorder,
    rng: StdRng,
}

impl Validator {
    /// Set up a run on a screen of the given size. The random sequence of
    /// targets is seeded from the clock, so every run is different.
    pub fn new(
        config: &ValidatorConfig,
        resolution: (u32, u32),
        recorder: Recorder,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = Grid::new(
            config.cols,
            config.rows,
            config.placement,
            config.padding,
            resolution,
        )?;

        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();

        Ok(Self {
            test_count: vec![0; grid.cell_count()],
            grid,
            repeats: config.repeats,
            target_size: config.target_size,
            style: config.target_style,
            state: TrialState::AwaitingTarget,
            target_index: 0,
            gaze: Arc::new(PositionStore::new()),
            cursor: Arc::new(PositionStore::new()),
            target: Arc::new(PositionStore::new()),
            recorder,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Replace the clock seed with a fixed one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The store the gaze collector writes into.
    pub fn gaze_store(&self) -> &Arc<PositionStore> {
        &self.gaze
    }

    pub fn cursor_store(&self) -> &Arc<PositionStore> {
        &self.cursor
    }

    pub fn target_store(&self) -> &Arc<PositionStore> {
        &self.target
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn test_counts(&self) -> &[u32] {
        &self.test_count
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn target_size(&self) -> u32 {
        self.target_size
    }

    pub fn style(&self) -> TargetStyle {
        self.style
    }

    /// Has every cell been hit `repeats` times?
    pub fn testing_done(&self) -> bool {
        self.test_count.iter().all(|&count| count >= self.repeats)
    }

    /// Advance the state machine as far as it can go without user input.
    pub fn tick(&mut self, ui: &mut dyn ValidatorUi) -> Result<Tick, ValidatorError> {
        match self.state {
            TrialState::Done => return Ok(Tick::Finished),
            TrialState::ShowingTarget => return Ok(Tick::Waiting),
            TrialState::AwaitingTarget => {}
        }

        if self.testing_done() {
            info!("Validator finished!");
            self.state = TrialState::Done;
            ui.stop()?;
            self.recorder.flush()?;
            return Ok(Tick::Finished);
        }

        if !ui.in_test_routine() {
            return Ok(Tick::Waiting);
        }

        let (index, position) = self.show_next_target(ui)?;
        Ok(Tick::TargetShown { index, position })
    }

    /// Pick a cell that still needs testing and show its target.
    ///
    /// Asking for a target once testing is complete is a logic error.
    pub fn show_next_target(
        &mut self,
        ui: &mut dyn ValidatorUi,
    ) -> Result<(usize, Position), ValidatorError> {
        if self.testing_done() {
            return Err(ValidatorError::AlreadyDone);
        }

        let index = loop {
            let candidate = self.rng.gen_range(0..self.test_count.len());
            if self.test_count[candidate] < self.repeats {
                break candidate;
            }
        };

        let position = self.grid.target_position(index);
        self.target.set_single(position, 0.0);
        self.target_index = index;
        debug!("Target {index} at {position}");

        ui.show_target(position, self.target_size, self.style)?;
        self.state = TrialState::ShowingTarget;
        Ok((index, position))
    }

    /// A confirmed click at `pos`.
    pub fn handle_click(&mut self, pos: Position) -> ClickOutcome {
        self.cursor.set_single(pos, 0.0);
        if self.state != TrialState::ShowingTarget {
            return ClickOutcome::Ignored;
        }
        self.record_measurement()
    }

    /// Check the current cursor against the current target and record a row
    /// if it is a hit. Nothing is recorded unless a target is showing.
    pub fn record_measurement(&mut self) -> ClickOutcome {
        if self.state != TrialState::ShowingTarget {
            return ClickOutcome::Ignored;
        }

        let snapshot = Snapshot::take(&self.gaze, &self.cursor, &self.target);
        if !hit_test(snapshot.cursor, snapshot.target, self.target_size) {
            debug!("Missed target {} at {}", self.target_index, snapshot.cursor);
            return ClickOutcome::Miss;
        }

        let record = TrialRecord::from_snapshot(self.target_index, &snapshot);
        if !self.recorder.write_row(&record) {
            return ClickOutcome::Miss;
        }

        let index = self.target_index;
        self.test_count[index] += 1;
        self.state = TrialState::AwaitingTarget;
        info!(
            "Target {index} at {}: cursor {} gaze {}",
            snapshot.target, snapshot.cursor, snapshot.gaze
        );
        ClickOutcome::Hit { index }
    }

    /// Every target position, for preview mode. Counts are not touched.
    pub fn preview_targets(&self) -> Vec<Position> {
        self.grid.positions().collect()
    }

    /// Write out any buffered rows now.
    pub fn flush(&mut self) -> Result<(), RecorderError> {
        self.recorder.flush()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("grid", &self.grid)
            .field("repeats", &self.repeats)
            .field("state", &self.state)
            .field("test_count", &self.test_count)
            .finish()
    }
}

#[derive(Debug)]
pub enum ValidatorError {
    /// A new target was asked for after every cell was done
    AlreadyDone,
    Recorder(RecorderError),
    Ui(UiError),
}

impl fmt::Display for ValidatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::AlreadyDone => Cow::from("cannot show new target, testing already complete"),
            Self::Recorder(error) => Cow::from(format!("recorder error: {error}")),
            Self::Ui(error) => Cow::from(format!("ui error: {error}")),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ValidatorError {}

impl From<RecorderError> for ValidatorError {
    fn from(value: RecorderError) -> Self {
        Self::Recorder(value)
    }
}

impl From<UiError> for ValidatorError {
    fn from(value: UiError) -> Self {
        Self::Ui(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Placement;
    use crate::recorder::tests::{labels, SharedWriter};
    use crate::ui::tests::ScriptedUi;

    fn setup(cols: u32, rows: u32, repeats: u32) -> (Validator, SharedWriter) {
        let config = ValidatorConfig {
            cols,
            rows,
            repeats,
            target_size: 10,
            ..ValidatorConfig::default()
        };
        let writer = SharedWriter::default();
        let recorder = Recorder::to_writer(labels(false), Box::new(writer.clone()));
        let validator = Validator::new(&config, (1000, 1000), recorder)
            .unwrap()
            .with_seed(7);
        (validator, writer)
    }

    #[test]
    fn hit_test_boundary() {
        let target = Position::new(500, 500);
        assert!(hit_test(Position::new(503, 503), target, 10));
        assert!(!hit_test(Position::new(506, 500), target, 10));
        assert!(hit_test(Position::new(505, 500), target, 10));
        assert!(hit_test(Position::new(495, 500), target, 10));
        assert!(!hit_test(Position::INVALID, target, 10));
    }

    #[test]
    fn waits_for_the_splash_screen() {
        let (mut validator, _) = setup(2, 2, 1);
        let mut ui = ScriptedUi::new((1000, 1000));

        assert_eq!(validator.tick(&mut ui).unwrap(), Tick::Waiting);
        assert!(ui.targets.is_empty());
        assert_eq!(validator.state(), TrialState::AwaitingTarget);
    }

    #[test]
    fn full_run_two_by_two() {
        let (mut validator, writer) = setup(2, 2, 1);
        let mut ui = ScriptedUi::new((1000, 1000));
        ui.in_test = true;

        let mut seen = Vec::new();
        for _ in 0..4 {
            let Tick::TargetShown { index, position } = validator.tick(&mut ui).unwrap() else {
                panic!("no target shown");
            };
            assert_eq!(validator.state(), TrialState::ShowingTarget);
            assert_eq!(validator.tick(&mut ui).unwrap(), Tick::Waiting);

            assert_eq!(validator.handle_click(position), ClickOutcome::Hit { index });
            assert!(validator.test_counts().iter().all(|&c| c <= 1));
            seen.push(index);
        }

        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(writer.flush_count(), 0);

        assert_eq!(validator.tick(&mut ui).unwrap(), Tick::Finished);
        assert_eq!(validator.state(), TrialState::Done);
        assert!(validator.testing_done());
        assert_eq!(ui.stopped, 1);
        assert_eq!(writer.flush_count(), 1);
        assert_eq!(writer.contents().lines().count(), 5);

        // nothing more happens, and dropping doesn't flush again
        assert_eq!(validator.tick(&mut ui).unwrap(), Tick::Finished);
        drop(validator);
        assert_eq!(writer.flush_count(), 1);
    }

    #[test]
    fn misses_are_discarded() {
        let (mut validator, writer) = setup(2, 2, 1);
        let mut ui = ScriptedUi::new((1000, 1000));
        ui.in_test = true;

        let Tick::TargetShown { position, .. } = validator.tick(&mut ui).unwrap() else {
            panic!("no target shown");
        };
        let off = Position::new(position.x + 6, position.y);
        assert_eq!(validator.handle_click(off), ClickOutcome::Miss);
        assert_eq!(validator.state(), TrialState::ShowingTarget);
        assert!(validator.test_counts().iter().all(|&c| c == 0));

        validator.flush().unwrap();
        assert_eq!(writer.contents().lines().count(), 1);
    }

    #[test]
    fn clicks_without_a_target_are_ignored() {
        let (mut validator, _) = setup(2, 2, 1);
        assert_eq!(
            validator.handle_click(Position::new(250, 250)),
            ClickOutcome::Ignored
        );
        assert_eq!(validator.cursor_store().read_single(), Position::new(250, 250));
    }

    #[test]
    fn counts_never_exceed_repeats() {
        let (mut validator, _) = setup(3, 2, 3);
        let mut ui = ScriptedUi::new((1000, 1000));
        ui.in_test = true;

        while let Tick::TargetShown { position, .. } = validator.tick(&mut ui).unwrap() {
            validator.handle_click(position);
            assert!(validator.test_counts().iter().all(|&c| c <= 3));
        }
        assert!(validator.test_counts().iter().all(|&c| c == 3));
        assert_eq!(ui.targets.len(), 18);
    }

    #[test]
    fn no_target_after_done() {
        let (mut validator, _) = setup(1, 1, 1);
        let mut ui = ScriptedUi::new((1000, 1000));
        ui.in_test = true;

        let (_, position) = validator.show_next_target(&mut ui).unwrap();
        validator.handle_click(position);
        assert!(matches!(
            validator.show_next_target(&mut ui),
            Err(ValidatorError::AlreadyDone)
        ));
    }

    #[test]
    fn second_measurement_after_a_hit_is_ignored() {
        let (mut validator, writer) = setup(1, 1, 1);
        let mut ui = ScriptedUi::new((1000, 1000));
        ui.in_test = true;

        let (index, position) = validator.show_next_target(&mut ui).unwrap();
        assert_eq!(validator.handle_click(position), ClickOutcome::Hit { index });
        assert_eq!(validator.record_measurement(), ClickOutcome::Ignored);
        assert_eq!(validator.test_counts(), &[1]);

        validator.flush().unwrap();
        assert_eq!(writer.contents().lines().count(), 2);
    }

    #[test]
    fn row_holds_the_target_at_commit_time() {
        let (mut validator, writer) = setup(1, 1, 2);
        let mut ui = ScriptedUi::new((1000, 1000));
        ui.in_test = true;
        validator
            .gaze_store()
            .set_right_left(Position::new(490, 510), Position::new(510, 490), 1.0);

        let Tick::TargetShown { position, .. } = validator.tick(&mut ui).unwrap() else {
            panic!("no target shown");
        };
        assert_eq!(position, Position::new(500, 500));
        validator.handle_click(Position::new(501, 502));
        validator.target_store().set_single(Position::new(1, 1), 0.0);
        validator.flush().unwrap();

        let text = writer.contents();
        let row = text.lines().nth(1).unwrap();
        assert!(row.ends_with(",0,500,500,501,502,500,500"), "{row}");
    }

    #[test]
    fn preview_leaves_counts_alone() {
        let config = ValidatorConfig {
            cols: 2,
            rows: 2,
            placement: Placement::Corners,
            ..ValidatorConfig::default()
        };
        let recorder = Recorder::to_writer(labels(false), Box::new(SharedWriter::default()));
        let validator = Validator::new(&config, (1000, 1000), recorder).unwrap();

        assert_eq!(validator.preview_targets().len(), 9);
        assert!(validator.test_counts().iter().all(|&c| c == 0));
        assert_eq!(validator.state(), TrialState::AwaitingTarget);
    }

    #[test]
    fn bad_config_is_rejected() {
        let config = ValidatorConfig {
            repeats: 0,
            ..ValidatorConfig::default()
        };
        let recorder = Recorder::to_writer(labels(false), Box::new(SharedWriter::default()));
        assert!(matches!(
            Validator::new(&config, (1000, 1000), recorder),
            Err(ConfigError::ZeroRepeats)
        ));
    }
}
