//! Progress reporting for iterative solves.
//!
//! # Example
//!
//! ```
//! use arap_deform::algo::Progress;
//!
//! let progress = Progress::new(|iteration, max_iterations, energy| {
//!     println!("[{}/{}] energy {:.3e}", iteration, max_iterations, energy);
//! });
//! progress.report(1, 10, 0.5);
//! ```

/// A callback that receives updates after each solver iteration.
///
/// The callback receives:
/// - `iteration`: Iterations completed so far (1-based)
/// - `max_iterations`: Configured iteration cap
/// - `energy`: Energy after this iteration
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, f64) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, f64) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, iteration: usize, max_iterations: usize, energy: f64) {
        (self.callback)(iteration, max_iterations, energy);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_report_forwards_arguments() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let progress = Progress::new(move |i, n, e| sink.lock().unwrap().push((i, n, e)));

        progress.report(1, 3, 2.0);
        progress.report(2, 3, 1.5);

        assert_eq!(*log.lock().unwrap(), vec![(1, 3, 2.0), (2, 3, 1.5)]);
    }

    #[test]
    fn test_none_is_silent() {
        Progress::default().report(1, 1, 0.0);
    }
}
