//! Tracker Validation measures how accurate a gaze tracker is. It shows
//! fixation targets one at a time on a grid of screen cells, in random
//! order, and the user looks at each target and clicks it. At every click
//! the target position, the cursor position and the tracker's gaze estimate
//! are recorded together, so the offsets can be analysed afterwards.
//!
//! The pieces:
//!
//! - a [`Collector`](collector::Collector) samples the tracker on a
//!   background thread into a [`PositionStore`](position_store::PositionStore);
//! - the [`Validator`](validator::Validator) state machine picks targets,
//!   hit-tests clicks and commits measurements to a
//!   [`Recorder`](recorder::Recorder);
//! - [`session`] drives the validator from a [`ValidatorUi`](ui::ValidatorUi),
//!   of which [`gui::TerminalUi`] is the one we ship.

pub mod args;
pub mod collector;
pub mod config;
pub mod cursor_source;
pub mod gazepoint;
pub mod grid;
pub mod gui;
pub mod position;
pub mod position_store;
pub mod recorder;
pub mod session;
pub mod simulated_source;
pub mod ui;
pub mod validator;
