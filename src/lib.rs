#![cfg_attr(not(test), no_std)]

//! CC Attitude - gyro and accelerometer attitude estimation for small flight controllers
//!
//! A complementary filter that integrates body rates into a unit quaternion
//! and slowly pulls it toward the gravity direction measured by the
//! accelerometer. Roll and pitch gyro bias is learned from the same
//! correction; yaw bias is driven toward a zero-mean rate.
//!
//! # Features
//!
//! - Quaternion propagation with proportional and integral gravity correction
//! - Fourth-order low-pass filtering of the measured and expected gravity
//! - Board mount rotation and accelerometer bias calibration
//! - Trim flight to learn the accelerometer bias in level flight
//! - Fast-convergence gains during start-up and arming
//! - Settings delivered as whole snapshots between tasks
//! - `#![no_std]` compatible for embedded systems
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use cc_attitude::{AttitudePropagator, Gains, GyroBias, SensorSample};
//!
//! let mut propagator = AttitudePropagator::new();
//! let mut bias = GyroBias::new();
//!
//! // Conditioned sensor readings
//! let sample = SensorSample {
//!     gyro: Vector3::new(0.1, 0.2, 0.3),     // deg/s
//!     accel: Vector3::new(0.0, 0.0, -9.81),  // m/s²
//!     temperature: 25.0,
//! };
//!
//! // Update the orientation
//! let estimate = propagator.update(&sample, &Gains::FAST_CONVERGENCE, &mut bias, 0.004).unwrap();
//!
//! // Euler angles in degrees
//! let (roll, pitch, yaw) = (estimate.roll, estimate.pitch, estimate.yaw);
//! # assert!(roll.abs() < 0.01 && pitch.abs() < 0.01 && yaw.abs() < 0.01);
//! ```
//!
//! On a flight controller the pieces are driven by [`ControlLoop`], fed by a
//! [`SensorSource`] and a [`Platform`], with settings arriving through a
//! [`CalibrationManager`].

mod attitude;
mod bias;
pub mod calibration;
mod error;
mod filter;
mod math;
mod schedule;
pub mod sensor;
pub mod task;
mod types;

pub use attitude::{AttitudePropagator, EstimatorState, MIN_NORM};
pub use bias::GyroBias;
pub use calibration::{
    Calibration, CalibrationChannel, CalibrationManager, GainSchedule, MAX_TRIM_SAMPLES,
    MountRotation, TrimSession, TrimState,
};
pub use error::{EstimatorError, Result};
pub use filter::{FourthOrderFilter, VectorFilter};
pub use math::{DEG_TO_RAD, QuaternionExt, RAD_TO_DEG};
pub use schedule::{BOOTSTRAP_END_MS, BOOTSTRAP_START_MS, GainRegime, GainScheduler, Gains};
pub use sensor::{SENSOR_TIMEOUT_MS, SensorConditioner, SensorSource, condition};
pub use task::{
    AttitudeOutput, Clock, ControlLoop, FaultSignal, FlightStatusSource, NOMINAL_DT, Platform,
    SettingsStore, Watchdog, delta_time,
};
pub use types::*;
