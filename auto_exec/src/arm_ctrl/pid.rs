//! PID controller for the arm axes

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller.
///
/// Time is passed in explicitly by the caller, sampled from the tick clock.
/// The controller never reads a wall clock itself, so a tick that was delayed
/// by the host still integrates over the real elapsed interval.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Derivative gain
    k_d: f64,

    /// Time at which the error was last passed in
    prev_time_s: Option<f64>,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            prev_time_s: None,
            prev_error: None,
            integral: 0.0,
        }
    }

    /// Clear the accumulated state, ready for a new target.
    pub fn reset(&mut self) {
        self.prev_time_s = None;
        self.prev_error = None;
        self.integral = 0.0;
    }

    /// Get the value of the controller for the given error at the given time.
    pub fn get(&mut self, error: f64, time_s: f64) -> f64 {
        let dt = self.prev_time_s.map(|t0| time_s - t0);

        // Accumulate the integral term.
        //
        // If there's no time difference then we don't accumulate the
        // integral. The other option is to add on the error and that would
        // produce a large spike in integral compared to normal operation, so
        // we don't do this.
        self.integral += match dt {
            Some(t) => error * t,
            None => 0.0,
        };

        // Calculate the derivative, again assuming none when there is no
        // time difference.
        let deriv = match (self.prev_error, dt) {
            (Some(e), Some(t)) if t > 0.0 => (error - e) / t,
            _ => 0.0,
        };

        let out = self.k_p * error + self.k_i * self.integral + self.k_d * deriv;

        self.prev_error = Some(error);
        self.prev_time_s = Some(time_s);

        out
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_proportional_only() {
        let mut pid = PidController::new(0.5, 0.0, 0.0);

        assert_eq!(pid.get(10.0, 0.0), 5.0);
        assert_eq!(pid.get(-4.0, 0.1), -2.0);
    }

    #[test]
    fn test_integral_accumulates_over_tick_time() {
        let mut pid = PidController::new(0.0, 1.0, 0.0);

        // First sample has no dt so no accumulation
        assert_eq!(pid.get(2.0, 0.0), 0.0);
        // One second at error 2 adds 2 to the integral
        assert_eq!(pid.get(2.0, 1.0), 2.0);
        assert_eq!(pid.get(2.0, 2.0), 4.0);

        pid.reset();
        assert_eq!(pid.get(2.0, 3.0), 0.0);
    }
}
