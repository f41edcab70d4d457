//! Settings-driven calibration: gain snapshot, board mount rotation and the
//! trim-flight accelerometer calibration.
//!
//! Settings changes arrive on a different thread of control than the
//! estimator. [`CalibrationManager`] turns each change into one immutable
//! [`Calibration`] and publishes it on a [`CalibrationChannel`]; the control
//! loop takes the latest one at the start of a tick, so a tick never sees a
//! half-applied update.
//!
//! # Example
//! ```
//! use cc_attitude::{AttitudeSettings, CalibrationChannel, CalibrationManager};
//!
//! static CHANNEL: CalibrationChannel = CalibrationChannel::new();
//!
//! let manager = CalibrationManager::new(&CHANNEL);
//! manager.on_settings_updated(&AttitudeSettings {
//!     board_rotation: [0.0, 0.0, 45.0],
//!     ..Default::default()
//! });
//!
//! let calibration = CHANNEL.try_take().unwrap();
//! assert!(calibration.schedule.rotate_enabled);
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::bias::GyroBias;
use crate::error::{EstimatorError, Result};
use crate::math::QuaternionExt;
use crate::types::{ACCEL_SCALE, AttitudeSettings, GRAVITY, TrimFlight};

/// Upper bound on collected trim samples
pub const MAX_TRIM_SAMPLES: u32 = 65535;

/// Latest-value-wins mailbox between the settings path and the control loop
pub type CalibrationChannel = Signal<CriticalSectionRawMutex, Calibration>;

/// Tunable parameters consumed once per control tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainSchedule {
    /// Proportional gain of the gravity correction
    pub kp: f32,
    /// Integral gain of the gravity correction
    pub ki: f32,
    /// Yaw bias zero-mean rate
    pub yaw_bias_rate: f32,
    /// Accelerometer bias in m/s²
    pub accel_bias: Vector3<f32>,
    /// Low-pass the gravity correction inputs in steady state
    pub filter_enabled: bool,
    /// Apply the mount rotation to raw samples
    pub rotate_enabled: bool,
    /// Re-learn the gyro bias while arming
    pub zero_during_arming: bool,
    /// Feed the learned gyro bias forward
    pub bias_correct_enabled: bool,
}

impl GainSchedule {
    pub fn from_settings(settings: &AttitudeSettings) -> Self {
        let bias = settings.accel_bias;
        Self {
            kp: settings.accel_kp,
            ki: settings.accel_ki,
            yaw_bias_rate: settings.yaw_bias_rate,
            accel_bias: Vector3::new(bias[0] as f32, bias[1] as f32, bias[2] as f32) * ACCEL_SCALE,
            filter_enabled: true,
            rotate_enabled: settings.board_rotation != [0.0; 3],
            zero_during_arming: settings.zero_during_arming,
            bias_correct_enabled: settings.bias_correct_gyro,
        }
    }
}

impl Default for GainSchedule {
    fn default() -> Self {
        Self::from_settings(&AttitudeSettings::default())
    }
}

/// Board mounting rotation, earth-to-body form of the configured offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountRotation {
    matrix: Matrix3<f32>,
}

impl MountRotation {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Build from a roll, pitch, yaw offset in degrees
    pub fn from_board_rotation(rpy: [f32; 3]) -> Self {
        if rpy == [0.0; 3] {
            return Self::identity();
        }
        let q = UnitQuaternion::from_rpy_degrees(rpy[0], rpy[1], rpy[2]);
        Self {
            matrix: q.earth_to_body(),
        }
    }

    pub fn apply(&self, v: Vector3<f32>) -> Vector3<f32> {
        self.matrix * v
    }

    pub fn matrix(&self) -> &Matrix3<f32> {
        &self.matrix
    }
}

impl Default for MountRotation {
    fn default() -> Self {
        Self::identity()
    }
}

/// Everything the estimator derives from one settings change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub schedule: GainSchedule,
    pub mount: MountRotation,
    /// Gyro bias to reseed the estimate with
    pub gyro_bias: GyroBias,
    /// Trim-flight command carried by the change
    pub trim: TrimFlight,
    /// The settings this snapshot was built from
    pub settings: AttitudeSettings,
}

impl Calibration {
    pub fn from_settings(settings: &AttitudeSettings) -> Self {
        Self {
            schedule: GainSchedule::from_settings(settings),
            mount: MountRotation::from_board_rotation(settings.board_rotation),
            gyro_bias: GyroBias::from_settings(settings.gyro_bias),
            trim: settings.trim_flight,
            settings: *settings,
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::from_settings(&AttitudeSettings::default())
    }
}

/// Settings-change handler
///
/// Runs on the notification path. Holds no estimator state; it only
/// publishes snapshots.
pub struct CalibrationManager<'a> {
    channel: &'a CalibrationChannel,
}

impl<'a> CalibrationManager<'a> {
    pub fn new(channel: &'a CalibrationChannel) -> Self {
        Self { channel }
    }

    /// Convert a changed settings record and publish it for the next tick
    pub fn on_settings_updated(&self, settings: &AttitudeSettings) {
        let calibration = Calibration::from_settings(settings);
        log::debug!(
            "attitude settings updated: kp={} ki={} rotate={} trim={:?}",
            calibration.schedule.kp,
            calibration.schedule.ki,
            calibration.schedule.rotate_enabled,
            calibration.trim
        );
        self.channel.signal(calibration);
    }
}

/// Trim-flight collection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimState {
    #[default]
    Idle,
    Collecting,
}

/// Accelerometer trim-flight session
///
/// Accumulates raw accelerometer samples, in [`ACCEL_SCALE`] counts, while
/// collecting. Loading ends the session and turns the mean into the
/// accelerometer bias that cancels it, leaving -g on the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrimSession {
    accumulator: Vector3<f64>,
    samples: u32,
    state: TrimState,
}

impl TrimSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TrimState {
        self.state
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Discard any previous collection and start a new one
    pub fn start(&mut self) {
        self.accumulator = Vector3::zeros();
        self.samples = 0;
        self.state = TrimState::Collecting;
    }

    /// Return to idle, dropping any collection in progress
    pub fn abort(&mut self) {
        self.state = TrimState::Idle;
    }

    /// Add one raw accelerometer sample in m/s²
    ///
    /// Returns whether the sample was taken. Samples are ignored unless
    /// collecting, and once [`MAX_TRIM_SAMPLES`] have been taken.
    pub fn accumulate(&mut self, accel: Vector3<f32>) -> bool {
        if self.state != TrimState::Collecting || self.samples >= MAX_TRIM_SAMPLES {
            return false;
        }
        self.accumulator += (accel / ACCEL_SCALE).cast::<f64>();
        self.samples += 1;
        true
    }

    /// Finish the collection and return the accelerometer bias counts
    ///
    /// Fails without samples or without a collection in progress; the
    /// session is left idle in both cases.
    ///
    /// # Example
    /// ```
    /// use cc_attitude::{ACCEL_SCALE, GRAVITY, TrimSession};
    /// use nalgebra::Vector3;
    ///
    /// let mut trim = TrimSession::new();
    /// trim.start();
    /// trim.accumulate(Vector3::new(3.0 * ACCEL_SCALE, 0.0, -GRAVITY));
    /// assert_eq!(trim.load(), Ok([3, 0, 0]));
    /// ```
    pub fn load(&mut self) -> Result<[i16; 3]> {
        if self.state != TrimState::Collecting {
            self.state = TrimState::Idle;
            return Err(EstimatorError::TrimNotCollecting);
        }
        if self.samples == 0 {
            self.state = TrimState::Idle;
            return Err(EstimatorError::TrimWithoutSamples);
        }

        let mean = self.accumulator / self.samples as f64;
        // the vertical axis rests at -g, the stored bias must cancel it
        let gravity_counts = (GRAVITY / ACCEL_SCALE) as f64;
        let count = |v: f64| libm::round(v) as i16;

        self.state = TrimState::Idle;
        Ok([count(mean.x), count(mean.y), count(mean.z + gravity_counts)])
    }
}
