//! Triangle-wave servo sweep.
//!
//! Each call to [`Sweep::advance`] moves the angle one fixed step. When a step
//! lands on or past a bound the angle is clamped to the bound and the
//! direction flips in the same call, so position and direction never
//! disagree.

use crate::error::ConfigError;

/// Which way the sweep is currently moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    /// Towards the upper bound (`+1`).
    Up,
    /// Towards the lower bound (`-1`).
    Down,
}

impl SweepDirection {
    /// `+1.0` or `-1.0`.
    pub fn sign(self) -> f64 {
        match self {
            SweepDirection::Up => 1.0,
            SweepDirection::Down => -1.0,
        }
    }

    /// The opposite direction.
    pub fn flipped(self) -> Self {
        match self {
            SweepDirection::Up => SweepDirection::Down,
            SweepDirection::Down => SweepDirection::Up,
        }
    }
}

/// Sweep state: bounds, step, and the current position and direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    min:       f64,
    max:       f64,
    step:      f64,
    position:  f64,
    direction: SweepDirection,
}

impl Sweep {
    /// Creates a sweep starting at `min`, moving up.
    ///
    /// # Errors
    ///
    /// [`ConfigError::SweepBounds`] unless `0 <= min < max <= 180`, and
    /// [`ConfigError::SweepStep`] unless `0 < step <= max - min`.
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self, ConfigError> {
        if !(min.is_finite() && max.is_finite() && 0.0 <= min && min < max && max <= 180.0) {
            return Err(ConfigError::SweepBounds { min, max });
        }
        if !(step.is_finite() && step > 0.0 && step <= max - min) {
            return Err(ConfigError::SweepStep {
                step,
                span: max - min,
            });
        }
        Ok(Self {
            min,
            max,
            step,
            position: min,
            direction: SweepDirection::Up,
        })
    }

    /// Moves the sweep to `position` (clamped to the bounds) heading in
    /// `direction`. At a bound the direction is forced to point back inside.
    pub fn start_at(mut self, position: f64, direction: SweepDirection) -> Self {
        self.position = position.clamp(self.min, self.max);
        self.direction = if self.position >= self.max {
            SweepDirection::Down
        } else if self.position <= self.min {
            SweepDirection::Up
        } else {
            direction
        };
        self
    }

    /// Takes one step and returns the new position and direction.
    pub fn advance(&mut self) -> (f64, SweepDirection) {
        let next = self.position + self.step * self.direction.sign();
        if next >= self.max {
            self.position = self.max;
            self.direction = SweepDirection::Down;
        } else if next <= self.min {
            self.position = self.min;
            self.direction = SweepDirection::Up;
        } else {
            self.position = next;
        }
        (self.position, self.direction)
    }

    /// Returns to the lower bound, heading up.
    pub fn reset(&mut self) {
        self.position = self.min;
        self.direction = SweepDirection::Up;
    }

    /// Current angle in degrees.
    pub fn position(&self) -> f64 { self.position }

    /// Current direction.
    pub fn direction(&self) -> SweepDirection { self.direction }

    /// Lower bound in degrees.
    pub fn min(&self) -> f64 { self.min }

    /// Upper bound in degrees.
    pub fn max(&self) -> f64 { self.max }

    /// Step in degrees.
    pub fn step(&self) -> f64 { self.step }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn from_forty_reaches_eighty_after_twenty_steps() {
        let mut sweep = Sweep::new(40.0, 80.0, 2.0).unwrap();
        for _ in 0..19 {
            sweep.advance();
        }
        assert_eq!(sweep.position(), 78.0);
        assert_eq!(sweep.direction(), SweepDirection::Up);

        assert_eq!(sweep.advance(), (80.0, SweepDirection::Down));
        assert_eq!(sweep.advance(), (78.0, SweepDirection::Down));
    }

    #[test]
    fn full_cycle_returns_to_start() {
        let mut sweep = Sweep::new(40.0, 80.0, 2.0).unwrap();
        for _ in 0..40 {
            sweep.advance();
        }
        assert_eq!(sweep.position(), 40.0);
        assert_eq!(sweep.direction(), SweepDirection::Up);
    }

    #[test]
    fn uneven_step_clamps_to_bound() {
        let mut sweep = Sweep::new(0.0, 10.0, 4.0).unwrap();
        assert_eq!(sweep.advance(), (4.0, SweepDirection::Up));
        assert_eq!(sweep.advance(), (8.0, SweepDirection::Up));
        assert_eq!(sweep.advance(), (10.0, SweepDirection::Down));
        assert_eq!(sweep.advance(), (6.0, SweepDirection::Down));
        assert_eq!(sweep.advance(), (2.0, SweepDirection::Down));
        assert_eq!(sweep.advance(), (0.0, SweepDirection::Up));
    }

    #[test]
    fn reset_goes_back_to_min_heading_up() {
        let mut sweep = Sweep::new(40.0, 80.0, 2.0).unwrap().start_at(70.0, SweepDirection::Down);
        sweep.reset();
        assert_eq!((sweep.position(), sweep.direction()), (40.0, SweepDirection::Up));
    }

    #[test]
    fn start_at_bound_points_inside() {
        let sweep = Sweep::new(40.0, 80.0, 2.0).unwrap().start_at(95.0, SweepDirection::Up);
        assert_eq!((sweep.position(), sweep.direction()), (80.0, SweepDirection::Down));
    }

    #[rstest]
    #[case(80.0, 40.0, 2.0)]
    #[case(40.0, 40.0, 2.0)]
    #[case(-5.0, 40.0, 2.0)]
    #[case(40.0, 181.0, 2.0)]
    #[case(f64::NAN, 80.0, 2.0)]
    fn rejects_bad_bounds(#[case] min: f64, #[case] max: f64, #[case] step: f64) {
        assert!(matches!(Sweep::new(min, max, step), Err(ConfigError::SweepBounds { .. })));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-2.0)]
    #[case(41.0)]
    fn rejects_bad_step(#[case] step: f64) {
        assert!(matches!(Sweep::new(40.0, 80.0, step), Err(ConfigError::SweepStep { .. })));
    }
}
