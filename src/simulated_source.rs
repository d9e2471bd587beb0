//! A pretend binocular tracker, for trying the program out without hardware.
//!
//! The simulated subject fixates on a point and every so often jumps to a
//! new one somewhere on screen. Each eye reports that point plus its own
//! random jitter, and now and then both eyes "blink" and report no data.

use crate::collector::{CollectorError, Sample, SampleSource};
use crate::position::Position;

use rand::prelude::*;
use std::time::Duration;

/// Roughly 60 samples a second.
const SIMULATED_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Synthetic gaze data. Build one with [`SimulatedSource::builder`].
#[derive(Debug)]
pub struct SimulatedSource {
    resolution: (u32, u32),
    noise: f64,
    blink_rate: f64,
    saccade_rate: f64,
    fixation: (f64, f64),
    count: u64,
}

impl SimulatedSource {
    pub fn builder() -> SimulatedSourceBuilder {
        SimulatedSourceBuilder::default()
    }

    fn jitter(&self, rng: &mut impl Rng) -> Position {
        let (w, h) = self.resolution;
        let x = self.fixation.0 + rng.gen_range(-self.noise..=self.noise);
        let y = self.fixation.1 + rng.gen_range(-self.noise..=self.noise);
        Position::from_signed(
            x.clamp(0.0, f64::from(w.saturating_sub(1))) as i64,
            y.clamp(0.0, f64::from(h.saturating_sub(1))) as i64,
        )
    }
}

impl SampleSource for SimulatedSource {
    fn name(&self) -> &str {
        "Simulated"
    }

    fn poll_interval(&self) -> Option<Duration> {
        Some(SIMULATED_POLL_INTERVAL)
    }

    fn next_sample(&mut self) -> Result<Option<Sample>, CollectorError> {
        let mut rng = thread_rng();
        self.count += 1;
        let sequence = self.count as f64;

        if rng.gen_bool(self.saccade_rate) {
            self.fixation = random_point(&mut rng, self.resolution);
        }

        if rng.gen_bool(self.blink_rate) {
            return Ok(Some(Sample::single(Position::INVALID, sequence)));
        }

        Ok(Some(Sample {
            right: self.jitter(&mut rng),
            left: self.jitter(&mut rng),
            sequence,
        }))
    }
}

fn random_point(rng: &mut impl Rng, (w, h): (u32, u32)) -> (f64, f64) {
    (
        rng.gen_range(0.0..f64::from(w.max(1))),
        rng.gen_range(0.0..f64::from(h.max(1))),
    )
}

/// Builder for a [`SimulatedSource`].
#[derive(Debug, Clone)]
pub struct SimulatedSourceBuilder {
    resolution: (u32, u32),
    noise: f64,
    blink_rate: f64,
    saccade_rate: f64,
}

impl Default for SimulatedSourceBuilder {
    fn default() -> Self {
        Self {
            resolution: (1920, 1080),
            noise: 8.0,
            blink_rate: 0.01,
            saccade_rate: 0.005,
        }
    }
}

impl SimulatedSourceBuilder {
    /// Screen size in pixels.
    pub fn resolution(mut self, resolution: (u32, u32)) -> Self {
        self.resolution = resolution;
        self
    }

    /// Largest jitter, in pixels, either side of the fixation point.
    pub fn noise(mut self, noise: f64) -> Self {
        self.noise = noise.abs();
        self
    }

    /// Chance per sample of a blink.
    pub fn blink_rate(mut self, rate: f64) -> Self {
        self.blink_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Chance per sample of jumping to a new fixation point.
    pub fn saccade_rate(mut self, rate: f64) -> Self {
        self.saccade_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn build(self) -> SimulatedSource {
        let (w, h) = self.resolution;
        SimulatedSource {
            resolution: self.resolution,
            noise: self.noise,
            blink_rate: self.blink_rate,
            saccade_rate: self.saccade_rate,
            fixation: (f64::from(w) / 2.0, f64::from(h) / 2.0),
            count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_on_screen() {
        let mut source = SimulatedSource::builder()
            .resolution((200, 100))
            .noise(500.0)
            .blink_rate(0.0)
            .saccade_rate(0.5)
            .build();

        for _ in 0..1000 {
            let sample = source.next_sample().unwrap().unwrap();
            for pos in [sample.right, sample.left] {
                assert!(pos.is_valid());
                assert!(pos.x < 200 && pos.y < 100, "{pos} off screen");
            }
        }
    }

    #[test]
    fn blinks_are_invalid() {
        let mut source = SimulatedSource::builder().blink_rate(1.0).build();
        let sample = source.next_sample().unwrap().unwrap();
        assert_eq!(sample.right, Position::INVALID);
        assert_eq!(sample.left, Position::INVALID);
    }

    #[test]
    fn jitter_is_bounded() {
        let mut source = SimulatedSource::builder()
            .resolution((1000, 1000))
            .noise(5.0)
            .blink_rate(0.0)
            .saccade_rate(0.0)
            .build();

        for i in 1..=100 {
            let sample = source.next_sample().unwrap().unwrap();
            assert_eq!(sample.sequence, f64::from(i));
            assert!(sample.right.distance_sq(&Position::new(500, 500)) <= 2.0 * 25.0 + 1.0);
        }
    }
}
