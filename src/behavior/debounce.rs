//! Consecutive-reading debounce.
//!
//! A [`Debounce`] counts samples in a row that satisfy a predicate. Any
//! sample that does not match clears the streak. The filter fires once, on
//! the sample that brings the streak up to the threshold; further matches in
//! the same streak do not fire again.
//!
//! # Example
//!
//! ```
//! use skittish::behavior::debounce::Debounce;
//!
//! let mut near = Debounce::new(2);
//! let is_near = |cm: f64| cm <= 35.0;
//! assert!(!near.observe(50.0, is_near));
//! assert!(!near.observe(30.0, is_near));
//! assert!(near.observe(30.0, is_near));
//! assert!(!near.observe(30.0, is_near));
//! ```

/// Counts consecutive matching samples up to a threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debounce {
    threshold: u32,
    count:     u32,
}

impl Debounce {
    /// Creates a filter that fires after `threshold` matches in a row. A
    /// threshold of zero is treated as one.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            count:     0,
        }
    }

    /// Feeds one sample. Returns `true` exactly when this sample completes a
    /// streak of `threshold` matches.
    pub fn observe<T>(&mut self, sample: T, predicate: impl FnOnce(T) -> bool) -> bool {
        if predicate(sample) {
            self.count = self.count.saturating_add(1);
            self.count == self.threshold
        } else {
            self.count = 0;
            false
        }
    }

    /// Clears the streak.
    pub fn reset(&mut self) { self.count = 0; }

    /// Length of the current streak.
    pub fn count(&self) -> u32 { self.count }

    /// Streak length that fires.
    pub fn threshold(&self) -> u32 { self.threshold }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn even(n: i32) -> bool { n % 2 == 0 }

    #[test]
    fn fires_at_nth_match_not_before() {
        let mut f = Debounce::new(3);
        assert!(!f.observe(2, even));
        assert!(!f.observe(4, even));
        assert!(f.observe(6, even));
    }

    #[test]
    fn fires_once_per_streak() {
        let mut f = Debounce::new(2);
        let fired: Vec<bool> =
            [2, 2, 2, 2, 1, 2, 2].into_iter().map(|n| f.observe(n, even)).collect();
        assert_eq!(fired, vec![false, true, false, false, false, false, true]);
    }

    #[test]
    fn single_miss_clears_long_streak() {
        let mut f = Debounce::new(4);
        for _ in 0..50 {
            f.observe(2, even);
        }
        assert_eq!(f.count(), 50);
        f.observe(3, even);
        assert_eq!(f.count(), 0);
    }

    #[test]
    fn zero_threshold_behaves_as_one() {
        let mut f = Debounce::new(0);
        assert_eq!(f.threshold(), 1);
        assert!(f.observe(2, even));
    }

    #[test]
    fn reset_clears_count() {
        let mut f = Debounce::new(2);
        f.observe(2, even);
        f.reset();
        assert!(!f.observe(2, even));
        assert!(f.observe(2, even));
    }
}
