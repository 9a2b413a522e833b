//! Limits applied while decoding untrusted input.

use core::ops::{Bound, RangeBounds};

/// Default maximum record nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Range of accepted values for a quantity read from the stream.
///
/// Used to bound the lengths of dynamic arrays and length-prefixed strings before anything
/// is allocated for them.
///
/// # Examples
///
/// ```
/// use commonware_marshal::RangeCfg;
///
/// let cfg = RangeCfg::new(0..=1024);
/// assert!(cfg.contains(&500));
/// assert!(!cfg.contains(&2000));
///
/// let cfg_min = RangeCfg::from(1..);
/// assert!(cfg_min.contains(&1));
/// assert!(!cfg_min.contains(&0));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RangeCfg<T: Copy + PartialOrd> {
    /// The lower bound of the range.
    start: Bound<T>,

    /// The upper bound of the range.
    end: Bound<T>,
}

macro_rules! impl_range_from {
    ($($range:ty),*) => {
        $(
            impl<T: Copy + PartialOrd> From<$range> for RangeCfg<T> {
                fn from(r: $range) -> Self {
                    Self::new(r)
                }
            }
        )*
    };
}

impl_range_from!(
    core::ops::Range<T>,
    core::ops::RangeInclusive<T>,
    core::ops::RangeFrom<T>,
    core::ops::RangeTo<T>,
    core::ops::RangeToInclusive<T>
);

impl<T: Copy + PartialOrd> From<core::ops::RangeFull> for RangeCfg<T> {
    fn from(_: core::ops::RangeFull) -> Self {
        Self::new(..)
    }
}

impl<T: Copy + PartialOrd> RangeCfg<T> {
    /// Creates a new `RangeCfg` from any type implementing `RangeBounds<T>`.
    pub fn new(r: impl RangeBounds<T>) -> Self {
        RangeCfg {
            start: r.start_bound().cloned(),
            end: r.end_bound().cloned(),
        }
    }

    /// Creates a `RangeCfg` that only accepts exactly `value`.
    pub fn exact(value: T) -> Self {
        Self {
            start: Bound::Included(value),
            end: Bound::Included(value),
        }
    }

    /// Returns true if the value is within this range.
    pub fn contains(&self, value: &T) -> bool {
        match &self.start {
            Bound::Included(s) if value < s => return false,
            Bound::Excluded(s) if value <= s => return false,
            _ => {}
        }
        match &self.end {
            Bound::Included(e) if value > e => return false,
            Bound::Excluded(e) if value >= e => return false,
            _ => {}
        }
        true
    }
}

impl<T: Copy + PartialOrd> RangeBounds<T> for RangeCfg<T> {
    fn start_bound(&self) -> Bound<&T> {
        self.start.as_ref()
    }

    fn end_bound(&self) -> Bound<&T> {
        self.end.as_ref()
    }
}

/// Decode-time configuration shared by every field of a call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Accepted lengths for dynamic arrays and length-prefixed strings.
    pub lengths: RangeCfg<usize>,

    /// Maximum depth of nested records (including array-of-record elements).
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lengths: RangeCfg::from(..),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    /// Restricts the lengths accepted for dynamic arrays and length-prefixed strings.
    pub fn with_lengths(mut self, lengths: impl Into<RangeCfg<usize>>) -> Self {
        self.lengths = lengths.into();
        self
    }

    /// Sets the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
