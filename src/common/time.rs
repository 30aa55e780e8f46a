//! Compensated Time Accumulation.
//!
//! Simulated time advances by adding clock half-periods to a running total.
//! After hundreds of millions of additions of femtosecond-scale deltas to a
//! microsecond-scale total, a plain floating-point sum stops moving at all:
//! each delta is below half an ulp of the total and rounds away. The
//! accumulator here tracks the lost low-order bits in a correction term and
//! adds it back whenever the current time is reported.

use serde::{Deserialize, Serialize};

/// Summation algorithm used by a [`TimeAccumulator`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Summation {
    /// Plain running sum. Drifts; kept for comparison only.
    Naive,
    /// Classic Kahan summation (correction folded into the next delta).
    Kahan,
    /// Kahan-Babuska-Neumaier summation, robust when a delta exceeds the total.
    #[default]
    Neumaier,
    /// Second-order Kahan-Babuska (Klein) summation.
    Klein,
}

/// Running simulated-time total with a compensation term.
///
/// Single writer, no interior mutability. Cloning copies the whole state,
/// which is how a derived clock inherits its master's time on
/// resynchronization.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeAccumulator {
    strategy: Summation,
    sum: f64,
    c: f64,
    cs: f64,
    ccs: f64,
}

impl Default for TimeAccumulator {
    fn default() -> Self {
        Self::new(Summation::default())
    }
}

impl TimeAccumulator {
    /// Creates an accumulator starting at time zero.
    pub fn new(strategy: Summation) -> Self {
        Self::with_start(strategy, 0.0)
    }

    /// Creates an accumulator starting at `start`.
    pub fn with_start(strategy: Summation, start: f64) -> Self {
        Self {
            strategy,
            sum: start,
            c: 0.0,
            cs: 0.0,
            ccs: 0.0,
        }
    }

    /// Returns the summation algorithm in use.
    pub fn strategy(&self) -> Summation {
        self.strategy
    }

    /// Adds `delta` and returns the new current time.
    pub fn advance(&mut self, delta: f64) -> f64 {
        match self.strategy {
            Summation::Naive => {
                self.sum += delta;
            }
            Summation::Kahan => {
                let y = delta - self.c;
                let t = self.sum + y;
                self.c = (t - self.sum) - y;
                self.sum = t;
            }
            Summation::Neumaier => {
                let t = self.sum + delta;
                self.c += two_sum_error(self.sum, delta, t);
                self.sum = t;
            }
            Summation::Klein => {
                let t = self.sum + delta;
                let c = two_sum_error(self.sum, delta, t);
                self.sum = t;

                let t = self.cs + c;
                let cc = two_sum_error(self.cs, c, t);
                self.cs = t;
                self.ccs += cc;
            }
        }
        self.now()
    }

    /// Returns the current time, including the compensation term.
    pub fn now(&self) -> f64 {
        match self.strategy {
            Summation::Naive | Summation::Kahan => self.sum,
            Summation::Neumaier => self.sum + self.c,
            Summation::Klein => self.sum + self.cs + self.ccs,
        }
    }
}

/// Rounding error of `t = a + b`, ordered by magnitude.
#[inline]
fn two_sum_error(a: f64, b: f64, t: f64) -> f64 {
    if a.abs() >= b.abs() {
        (a - t) + b
    } else {
        (b - t) + a
    }
}
