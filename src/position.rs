//! Screen positions in whole pixels, with a reserved "no data" value.

use std::fmt::{self, Display};

/// The coordinate value that stands for "no data".
///
/// This is an unsigned coordinate holding the *signed* 32-bit maximum, so a
/// downstream program that reads the recorded data back into a signed integer
/// still sees the same number.
pub const INVALID_COORD: u32 = i32::MAX as u32;

/// A pixel position on the screen, `(0, 0)` being the top left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Horizontal pixel coordinate
    pub x: u32,
    /// Vertical pixel coordinate
    pub y: u32,
}

impl Position {
    /// A position with both coordinates set to [`INVALID_COORD`].
    pub const INVALID: Position = Position {
        x: INVALID_COORD,
        y: INVALID_COORD,
    };

    /// Builds a position from raw pixel coordinates.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Builds a position from signed coordinates as reported by an operating
    /// system or device. Any coordinate that is negative or does not fit below
    /// the sentinel is replaced by [`INVALID_COORD`] rather than wrapped.
    pub fn from_signed(x: i64, y: i64) -> Self {
        Self {
            x: clamp_coord(x),
            y: clamp_coord(y),
        }
    }

    /// Scales a pair of screen fractions (`0.0..=1.0`) to pixels on a screen
    /// of the given resolution. Each axis is invalidated on its own when the
    /// fraction is out of range, or for both axes when `valid` is false.
    pub fn from_fraction(valid: bool, fx: f64, fy: f64, resolution: (u32, u32)) -> Self {
        Self {
            x: scale_fraction(valid, fx, resolution.0),
            y: scale_fraction(valid, fy, resolution.1),
        }
    }

    /// True iff neither coordinate is the sentinel.
    pub fn is_valid(&self) -> bool {
        self.x != INVALID_COORD && self.y != INVALID_COORD
    }

    /// Componentwise integer mean of two positions, rounding down.
    pub fn midpoint(&self, other: &Self) -> Self {
        Self {
            x: mean(self.x, other.x),
            y: mean(self.y, other.y),
        }
    }

    /// Squared euclidean distance to `other`, in floating point.
    pub fn distance_sq(&self, other: &Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.powi(2) + dy.powi(2)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::INVALID
    }
}

impl From<(u32, u32)> for Position {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

fn clamp_coord(v: i64) -> u32 {
    match u32::try_from(v) {
        Ok(v) if v < INVALID_COORD => v,
        _ => INVALID_COORD,
    }
}

fn scale_fraction(valid: bool, fraction: f64, extent: u32) -> u32 {
    if !valid || !(0.0..=1.0).contains(&fraction) {
        return INVALID_COORD;
    }
    // fraction is within [0, 1] so the product fits in the extent
    (f64::from(extent) * fraction) as u32
}

fn mean(a: u32, b: u32) -> u32 {
    // the mean of two u32 values always fits back into a u32
    ((u64::from(a) + u64::from(b)) / 2) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_signed_max() {
        assert_eq!(INVALID_COORD, 2_147_483_647);
        assert!(!Position::INVALID.is_valid());
        assert!(!Position::new(3, INVALID_COORD).is_valid());
        assert!(!Position::new(INVALID_COORD, 3).is_valid());
        assert!(Position::new(0, 0).is_valid());
    }

    #[test]
    fn negative_coordinates_clamp_to_sentinel() {
        assert_eq!(Position::from_signed(-1, 20), Position::new(INVALID_COORD, 20));
        assert_eq!(Position::from_signed(20, -2), Position::new(20, INVALID_COORD));
        assert_eq!(
            Position::from_signed(i64::from(u32::MAX), 0),
            Position::new(INVALID_COORD, 0)
        );
        assert_eq!(Position::from_signed(100, 200), Position::new(100, 200));
    }

    #[test]
    fn fractions_scale_to_screen() {
        let res = (1920, 1080);
        assert_eq!(Position::from_fraction(true, 0.5, 0.5, res), Position::new(960, 540));
        assert_eq!(
            Position::from_fraction(true, 1.08, 0.5, res),
            Position::new(INVALID_COORD, 540)
        );
        assert_eq!(Position::from_fraction(false, 0.5, 0.5, res), Position::INVALID);
    }

    #[test]
    fn midpoint_rounds_down() {
        let a = Position::new(101, 10);
        let b = Position::new(200, 21);
        assert_eq!(a.midpoint(&b), Position::new(150, 15));
    }
}
