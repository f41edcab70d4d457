//! Complementary-filter attitude propagation
//!
//! Each tick the measured acceleration is compared with the gravity direction
//! predicted by the current orientation. Their cross product is the small
//! rotation that would align them; it feeds the gyro bias integrator and is
//! added proportionally to the body rates before the quaternion is integrated.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::bias::GyroBias;
use crate::error::{EstimatorError, Result};
use crate::filter::VectorFilter;
use crate::math::{DEG_TO_RAD, QuaternionExt};
use crate::schedule::Gains;
use crate::types::{AttitudeEstimate, FilteredVectors, SensorSample};

/// Shortest vector or quaternion the estimator will normalize
pub const MIN_NORM: f32 = 1.0e-3;

/// Attitude propagator
///
/// Owns the orientation and the six low-pass filter channels: three for the
/// measured acceleration, three for the predicted gravity direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudePropagator {
    /// Orientation (WXYZ), unit length with w >= 0 after every integration
    quaternion: Quaternion<f32>,
    accel_filter: VectorFilter,
    gravity_filter: VectorFilter,
    filtered: FilteredVectors,
}

impl AttitudePropagator {
    pub fn new() -> Self {
        Self {
            quaternion: Quaternion::identity(),
            accel_filter: VectorFilter::new(),
            gravity_filter: VectorFilter::new(),
            filtered: FilteredVectors {
                accel: Vector3::zeros(),
                gravity: Vector3::zeros(),
            },
        }
    }

    /// Current orientation
    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::new_unchecked(self.quaternion)
    }

    /// Overwrite the orientation as-is, without normalizing
    pub fn set_quaternion(&mut self, quaternion: Quaternion<f32>) {
        self.quaternion = quaternion;
    }

    /// Orientation with its Euler angles in degrees
    pub fn estimate(&self) -> AttitudeEstimate {
        let quaternion = self.quaternion();
        let rpy = quaternion.to_rpy_degrees();
        AttitudeEstimate {
            quaternion,
            roll: rpy.x,
            pitch: rpy.y,
            yaw: rpy.z,
        }
    }

    /// Vectors that went into the last gravity correction
    pub fn filtered(&self) -> FilteredVectors {
        self.filtered
    }

    /// Expected gravity direction in the body frame
    ///
    /// Negated third column of the earth-to-body matrix, so a level vehicle
    /// expects (0, 0, -1) just as its accelerometer reads -g on Z.
    pub fn gravity(&self) -> Vector3<f32> {
        let q = &self.quaternion;
        Vector3::new(
            -2.0 * (q.i * q.k - q.w * q.j),
            -2.0 * (q.j * q.k + q.w * q.i),
            -(q.w * q.w - q.i * q.i - q.j * q.j + q.k * q.k),
        )
    }

    /// Run one propagation step
    ///
    /// `sample.gyro` is in deg/s, `dt` in seconds. Learned roll and pitch
    /// bias is accumulated into `bias`.
    ///
    /// Returns [`EstimatorError::DegenerateGeometry`] without touching the
    /// orientation when either gravity vector is too short to normalize. A
    /// quaternion that collapses or turns NaN is reset to identity.
    ///
    /// # Example
    /// ```
    /// use cc_attitude::{AttitudePropagator, Gains, GyroBias, SensorSample};
    /// use nalgebra::Vector3;
    ///
    /// let mut propagator = AttitudePropagator::new();
    /// let mut bias = GyroBias::new();
    /// let sample = SensorSample {
    ///     gyro: Vector3::new(0.0, 0.0, 90.0),
    ///     accel: Vector3::new(0.0, 0.0, -9.81),
    ///     temperature: 25.0,
    /// };
    ///
    /// for _ in 0..250 {
    ///     propagator.update(&sample, &Gains::FAST_CONVERGENCE, &mut bias, 0.004).unwrap();
    /// }
    /// let estimate = propagator.estimate();
    /// assert!((estimate.yaw - 90.0).abs() < 0.5);
    /// ```
    pub fn update(
        &mut self,
        sample: &SensorSample,
        gains: &Gains,
        bias: &mut GyroBias,
        dt: f32,
    ) -> Result<AttitudeEstimate> {
        if let Err(error) = check_norm(&self.quaternion) {
            log::warn!("{}, resetting orientation before update", error);
            self.quaternion = Quaternion::identity();
        }

        let accel = self.accel_filter.apply_if(gains.filter_enabled, sample.accel);
        let gravity = self.gravity_filter.apply_if(gains.filter_enabled, self.gravity());
        self.filtered = FilteredVectors { accel, gravity };

        let error = accel.cross(&gravity);

        // written so that NaN norms count as degenerate too
        let accel_norm = accel.norm();
        if !(accel_norm >= MIN_NORM) {
            return Err(EstimatorError::DegenerateGeometry);
        }
        let gravity_norm = if gains.filter_enabled { gravity.norm() } else { 1.0 };
        if !(gravity_norm >= MIN_NORM) {
            return Err(EstimatorError::DegenerateGeometry);
        }

        // |a x g| / (|a| |g|) is the sine of the misalignment
        let error = error / (accel_norm * gravity_norm);

        bias.integrate(error, gains.ki);

        let rates = sample.gyro + error * gains.kp / dt;
        self.integrate(rates, dt);

        Ok(self.estimate())
    }

    /// First-order quaternion integration of body rates in deg/s
    fn integrate(&mut self, rates: Vector3<f32>, dt: f32) {
        let derivative = self.quaternion * Quaternion::from_imag(rates);
        let mut q = self.quaternion + derivative * (dt * DEG_TO_RAD * 0.5);

        // q and -q are the same rotation; keep w >= 0
        if q.w < 0.0 {
            q = -q;
        }

        self.quaternion = match check_norm(&q) {
            Ok(norm) => q / norm,
            Err(error) => {
                log::warn!("{}, resetting orientation", error);
                Quaternion::identity()
            }
        };
    }
}

impl Default for AttitudePropagator {
    fn default() -> Self {
        Self::new()
    }
}

fn check_norm(q: &Quaternion<f32>) -> Result<f32> {
    let norm = q.norm();
    if norm >= MIN_NORM {
        Ok(norm)
    } else {
        Err(EstimatorError::NumericalDivergence)
    }
}

/// Estimator state owned by the control loop
///
/// The loop is the only writer of the orientation, filter history and the
/// roll/pitch bias feedback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EstimatorState {
    pub propagator: AttitudePropagator,
    pub bias: GyroBias,
}
