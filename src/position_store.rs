//! The thread-safe "latest value" store for one source of screen positions
//! (the cursor, the gaze tracker, or the target on screen).
//!
//! A store only ever holds the most recent sample. Writers replace the whole
//! sample at once, and all reads go through a [`PositionGuard`], so there is
//! no way to observe a half-written right/left pair. Reading from several
//! stores consistently is done with [`Snapshot::take`], which always locks in
//! the same order: gaze, then cursor, then target.

use crate::position::Position;

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    right: Position,
    left: Position,
    sequence: f64,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            right: Position::INVALID,
            left: Position::INVALID,
            sequence: 0.0,
        }
    }
}

/// The latest known right/left position of one source, plus the sequence
/// number or timestamp the source gave with it.
///
/// Single-stream sources (a mouse, the target) write the same value to both
/// sides.
#[derive(Debug, Default)]
pub struct PositionStore {
    sample: Mutex<Sample>,
}

impl PositionStore {
    /// A store with no data in it yet; both sides hold [`Position::INVALID`]
    /// and the sequence is zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the same position for both sides.
    pub fn set_single(&self, pos: Position, sequence: f64) {
        self.set_right_left(pos, pos, sequence);
    }

    /// Store both sides of a binocular sample at once.
    pub fn set_right_left(&self, right: Position, left: Position, sequence: f64) {
        *self.guard() = Sample {
            right,
            left,
            sequence,
        };
    }

    /// Take the store's lock. The stored values can only be read through the
    /// returned guard, and no writer can get in until it is dropped.
    pub fn lock(&self) -> PositionGuard<'_> {
        PositionGuard {
            sample: self.guard(),
        }
    }

    /// Shorthand for a one-off `lock().single()`.
    pub fn read_single(&self) -> Position {
        self.lock().single()
    }

    // A panicking writer cannot leave a torn sample behind: the whole sample
    // is replaced in one assignment. So a poisoned lock is still safe to use.
    fn guard(&self) -> MutexGuard<'_, Sample> {
        self.sample.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped read access to a [`PositionStore`].
pub struct PositionGuard<'a> {
    sample: MutexGuard<'a, Sample>,
}

impl PositionGuard<'_> {
    /// The best single estimate of the position: the mean of the right and
    /// left sides if both are valid, otherwise whichever side is valid,
    /// otherwise [`Position::INVALID`].
    pub fn single(&self) -> Position {
        match (self.is_right_valid(), self.is_left_valid()) {
            (true, true) => self.sample.right.midpoint(&self.sample.left),
            (true, false) => self.sample.right,
            (false, true) => self.sample.left,
            (false, false) => Position::INVALID,
        }
    }

    /// The raw `(right, left)` pair, without averaging.
    pub fn right_left(&self) -> (Position, Position) {
        (self.sample.right, self.sample.left)
    }

    /// True iff neither right coordinate is the sentinel.
    pub fn is_right_valid(&self) -> bool {
        self.sample.right.is_valid()
    }

    /// True iff neither left coordinate is the sentinel.
    pub fn is_left_valid(&self) -> bool {
        self.sample.left.is_valid()
    }

    /// The sequence number or timestamp given with the sample.
    pub fn sequence(&self) -> f64 {
        self.sample.sequence
    }
}

impl fmt::Debug for PositionGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionGuard")
            .field("right", &self.sample.right)
            .field("left", &self.sample.left)
            .field("sequence", &self.sample.sequence)
            .finish()
    }
}

impl fmt::Display for PositionGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, l) = self.right_left();
        write!(f, "(R:{},{} L:{},{})", r.x, r.y, l.x, l.y)
    }
}

/// Gaze, cursor and target values read together, under all three locks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Best single gaze estimate (see [`PositionGuard::single`])
    pub gaze: Position,
    /// Raw right-eye gaze
    pub gaze_right: Position,
    /// Raw left-eye gaze
    pub gaze_left: Position,
    /// Sequence number the tracker gave with the gaze sample
    pub gaze_sequence: f64,
    /// Cursor position
    pub cursor: Position,
    /// Target position
    pub target: Position,
}

impl Snapshot {
    /// Lock gaze, cursor and target (in that order, always), read every
    /// value, and only then release the locks.
    ///
    /// The three stores must be distinct; passing the same store twice would
    /// deadlock.
    pub fn take(gaze: &PositionStore, cursor: &PositionStore, target: &PositionStore) -> Self {
        let gaze = gaze.lock();
        let cursor = cursor.lock();
        let target = target.lock();

        let (gaze_right, gaze_left) = gaze.right_left();
        Self {
            gaze: gaze.single(),
            gaze_right,
            gaze_left,
            gaze_sequence: gaze.sequence(),
            cursor: cursor.single(),
            target: target.single(),
        }
    }
}
