//! Sensor acquisition and conditioning
//!
//! Order applied to every raw sample:
//! 1. mount rotation, gyro and accel, when enabled
//! 2. accelerometer bias removal
//! 3. learned gyro bias fed forward, when enabled
//! 4. yaw bias zero-mean update, every sample

use crate::bias::GyroBias;
use crate::calibration::Calibration;
use crate::error::{EstimatorError, Result};
use crate::types::{RawSample, SensorSample};

/// Acquisition timeout per control tick in milliseconds
pub const SENSOR_TIMEOUT_MS: u32 = 4;

/// Upstream source of raw inertial samples
pub trait SensorSource {
    /// Wait up to `timeout_ms` for the next sample
    fn next_sample(&mut self, timeout_ms: u32) -> Option<RawSample>;
}

impl<S: SensorSource + ?Sized> SensorSource for &mut S {
    fn next_sample(&mut self, timeout_ms: u32) -> Option<RawSample> {
        (**self).next_sample(timeout_ms)
    }
}

/// Condition a raw sample into body-frame gyro rates and acceleration
///
/// Updates the yaw component of `bias` as a side effect.
///
/// # Example
/// ```
/// use cc_attitude::{Calibration, GyroBias, RawSample, condition};
/// use nalgebra::Vector3;
///
/// let calibration = Calibration::default();
/// let mut bias = GyroBias::from_settings([100, 0, 0]);
/// let raw = RawSample {
///     gyro: Vector3::new(0.5, 0.0, 0.0),
///     accel: Vector3::new(0.0, 0.0, -9.81),
///     temperature: 30.0,
/// };
///
/// let sample = condition(&raw, &calibration, 0.0, &mut bias);
/// assert_eq!(sample.gyro.x, 1.5);
/// ```
pub fn condition(
    raw: &RawSample,
    calibration: &Calibration,
    yaw_bias_rate: f32,
    bias: &mut GyroBias,
) -> SensorSample {
    let schedule = &calibration.schedule;

    let (mut gyro, mut accel) = (raw.gyro, raw.accel);
    if schedule.rotate_enabled {
        gyro = calibration.mount.apply(gyro);
        accel = calibration.mount.apply(accel);
    }

    accel -= schedule.accel_bias;

    if schedule.bias_correct_enabled {
        gyro = bias.feed_forward(gyro);
    }

    // gravity says nothing about yaw, so weakly pull the yaw rate to zero mean
    bias.decay_yaw(gyro.z, yaw_bias_rate);

    SensorSample {
        gyro,
        accel,
        temperature: raw.temperature,
    }
}

/// Sensor conditioner wrapping a [`SensorSource`]
pub struct SensorConditioner<S> {
    source: S,
}

impl<S: SensorSource> SensorConditioner<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Acquire and condition one sample
    ///
    /// Returns the raw sample alongside the conditioned one. On timeout
    /// nothing is mutated.
    pub fn acquire(
        &mut self,
        calibration: &Calibration,
        yaw_bias_rate: f32,
        bias: &mut GyroBias,
    ) -> Result<(RawSample, SensorSample)> {
        let raw = self
            .source
            .next_sample(SENSOR_TIMEOUT_MS)
            .ok_or(EstimatorError::SensorUnavailable)?;

        Ok((raw, condition(&raw, calibration, yaw_bias_rate, bias)))
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
