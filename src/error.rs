//! Error taxonomy of the estimator
//!
//! None of these stop the control loop. They describe why a tick held the
//! last orientation, reset it, or why a calibration command was rejected.

/// Estimator errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EstimatorError {
    /// No sensor sample arrived within the acquisition timeout
    #[error("sensor sample not available within timeout")]
    SensorUnavailable,

    /// Measured or expected gravity too short to define a correction
    #[error("gravity vector magnitude below threshold")]
    DegenerateGeometry,

    /// Orientation quaternion collapsed or became NaN
    #[error("orientation quaternion diverged")]
    NumericalDivergence,

    /// Trim load requested before any sample was collected
    #[error("trim load requested with no collected samples")]
    TrimWithoutSamples,

    /// Trim load requested without a collection in progress
    #[error("trim load requested while not collecting")]
    TrimNotCollecting,
}

pub type Result<T> = core::result::Result<T, EstimatorError>;
