//! Learned gyroscope bias
//!
//! Roll and pitch bias are learned by integral feedback from the gravity
//! error. Gravity carries no heading information, so the yaw bias is instead
//! driven weakly towards a zero long-run yaw rate.

use nalgebra::Vector3;

use crate::types::GYRO_BIAS_DIVISOR;

/// Gyroscope bias estimate in deg/s
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GyroBias {
    estimate: Vector3<f32>,
}

impl GyroBias {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the estimate from the stored settings counts
    ///
    /// # Example
    /// ```
    /// use cc_attitude::GyroBias;
    ///
    /// let bias = GyroBias::from_settings([150, -20, 0]);
    /// assert_eq!(bias.estimate().x, 1.5);
    /// assert_eq!(bias.estimate().y, -0.2);
    /// ```
    pub fn from_settings(counts: [i16; 3]) -> Self {
        Self {
            estimate: Vector3::new(
                counts[0] as f32 / GYRO_BIAS_DIVISOR,
                counts[1] as f32 / GYRO_BIAS_DIVISOR,
                counts[2] as f32 / GYRO_BIAS_DIVISOR,
            ),
        }
    }

    /// Estimate converted back to settings counts, rounded and saturated
    pub fn to_settings(&self) -> [i16; 3] {
        // float to int casts saturate
        let count = |v: f32| libm::roundf(v * GYRO_BIAS_DIVISOR) as i16;
        [count(self.estimate.x), count(self.estimate.y), count(self.estimate.z)]
    }

    /// Current estimate in deg/s
    pub fn estimate(&self) -> Vector3<f32> {
        self.estimate
    }

    /// Add the estimate onto a gyro reading
    pub fn feed_forward(&self, gyro: Vector3<f32>) -> Vector3<f32> {
        gyro + self.estimate
    }

    /// Weak negative feedback on the yaw rate, applied once per sample
    pub fn decay_yaw(&mut self, yaw_rate: f32, yaw_bias_rate: f32) {
        self.estimate.z -= yaw_rate * yaw_bias_rate;
    }

    /// Integral feedback of the normalized gravity error into roll and pitch
    pub fn integrate(&mut self, error: Vector3<f32>, ki: f32) {
        self.estimate.x += error.x * ki;
        self.estimate.y += error.y * ki;
    }
}
