//! Error taxonomy for the benchmark harness.
//!
//! Configuration errors are handled at the CLI boundary before any of these
//! can occur; everything in here is produced by the library itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    /// Requested alignment is not a power of two.
    #[error("alignment {alignment} is not a power of two")]
    InvalidAlignment { alignment: usize },

    /// The allocator could not satisfy the request. Fatal: the harness
    /// cannot measure anything without its working set.
    #[error("failed to allocate {bytes} bytes of aligned vector memory")]
    Allocation { bytes: usize },

    /// The iteration calibrator exhausted its attempt budget without
    /// producing a timing inside the duration window.
    #[error("calibration for kernel {kernel} did not converge after {attempts} attempts")]
    CalibrationDidNotConverge {
        kernel: &'static str,
        attempts: usize,
    },

    /// A vector sum deviated from the analytically predicted value.
    #[error("validation failed on vector {vector}: expected {expected:e}, observed {observed:e}")]
    Validation {
        vector: char,
        expected: f64,
        observed: f64,
    },

    #[error("result output failed: {0}")]
    Io(#[from] std::io::Error),
}
