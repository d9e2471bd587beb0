//! The pointer as a stand-in gaze tracker.

use crate::collector::{CollectorError, Sample, SampleSource};
use crate::position_store::PositionStore;

use std::{sync::Arc, time::Duration};

/// How often the pointer is sampled.
pub const CURSOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Reports wherever the pointer currently is. The user interface keeps the
/// pointer store up to date; this source just copies it across every
/// [`CURSOR_POLL_INTERVAL`], numbering the samples as it goes.
#[derive(Debug)]
pub struct CursorSource {
    pointer: Arc<PositionStore>,
    count: u64,
}

impl CursorSource {
    pub fn new(pointer: Arc<PositionStore>) -> Self {
        Self { pointer, count: 0 }
    }
}

impl SampleSource for CursorSource {
    fn name(&self) -> &str {
        "Mouse"
    }

    fn poll_interval(&self) -> Option<Duration> {
        Some(CURSOR_POLL_INTERVAL)
    }

    fn next_sample(&mut self) -> Result<Option<Sample>, CollectorError> {
        let pos = self.pointer.read_single();
        self.count += 1;
        Ok(Some(Sample::single(pos, self.count as f64)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn copies_the_pointer() {
        let pointer = Arc::new(PositionStore::new());
        let mut source = CursorSource::new(Arc::clone(&pointer));

        let first = source.next_sample().unwrap().unwrap();
        assert_eq!(first.right, Position::INVALID);
        assert_eq!(first.sequence, 1.0);

        pointer.set_single(Position::new(12, 34), 0.0);
        let second = source.next_sample().unwrap().unwrap();
        assert_eq!(second.right, Position::new(12, 34));
        assert_eq!(second.left, Position::new(12, 34));
        assert_eq!(second.sequence, 2.0);
    }
}
